use criterion::{black_box, criterion_group, criterion_main, Criterion};
use link_preview::{is_bot_protected, MetadataExtractor};
use std::time::Duration;

const MOCK_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>Test Page &amp; Friends</title>
    <meta property="og:title" content="Test Title">
    <meta content="Test Description" property="og:description">
    <meta property="og:image" content="https://example.com/image.jpg">
    <meta property="og:site_name" content="Example">
</head>
<body>
    <h1>Test Content</h1>
</body>
</html>"#;

fn capped_page() -> String {
    let filler = "<p>Lorem ipsum dolor sit amet, consectetur adipiscing elit.</p>\n";
    let mut page = String::from(MOCK_HTML);
    while page.len() < 50 * 1024 {
        page.push_str(filler);
    }
    page
}

fn bench_extraction(c: &mut Criterion) {
    let extractor = MetadataExtractor::new();
    let large = capped_page();

    let mut group = c.benchmark_group("metadata_extraction");
    group
        .sample_size(50)
        .measurement_time(Duration::from_secs(10))
        .warm_up_time(Duration::from_secs(3));

    group.bench_function("small_page", |b| {
        b.iter(|| black_box(extractor.extract(black_box(MOCK_HTML))))
    });

    group.bench_function("capped_page", |b| {
        b.iter(|| black_box(extractor.extract(black_box(&large))))
    });

    group.bench_function("bot_detection", |b| {
        b.iter(|| black_box(is_bot_protected(black_box(&large))))
    });

    group.finish();
}

criterion_group!(benches, bench_extraction);
criterion_main!(benches);
