use regex::{Captures, Regex};
use std::sync::LazyLock;
use tracing::debug;

static ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(?:amp|lt|gt|quot|#[xX]27|#[0-9]+);").expect("entity pattern is valid")
});
static META_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<meta\s[^>]*>").expect("meta pattern is valid"));
static KEY_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)\s(?:property|name)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
        .expect("key attribute pattern is valid")
});
static CONTENT_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)\scontent\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
        .expect("content attribute pattern is valid")
});

/// Raw page metadata as found in the HTML, before truncation or image validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMetadata {
    pub title: String,
    pub description: String,
    pub image: String,
    pub site_name: String,
}

/// Metadata extractor, responsible for pulling preview fields out of raw HTML.
///
/// Matching is pattern based and tolerant of partial or malformed documents;
/// a missing tag yields an empty string.
#[derive(Debug, Clone, Default)]
pub struct MetadataExtractor;

impl MetadataExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, html: &str) -> PageMetadata {
        let title = or_else(extract_meta(html, "og:title"), || {
            extract_tag(html, "title")
        });
        let description = or_else(extract_meta(html, "og:description"), || {
            extract_meta(html, "description")
        });
        let image = or_else(extract_meta(html, "og:image"), || {
            extract_meta(html, "twitter:image")
        });
        let site_name = extract_meta(html, "og:site_name");

        debug!(
            title = %title,
            has_description = !description.is_empty(),
            has_image = !image.is_empty(),
            "Extracted page metadata"
        );

        PageMetadata {
            title,
            description,
            image,
            site_name,
        }
    }
}

fn or_else(value: String, fallback: impl FnOnce() -> String) -> String {
    if value.is_empty() {
        fallback()
    } else {
        value
    }
}

/// Returns the decoded, trimmed `content` of the first `<meta>` tag whose
/// `property` or `name` attribute equals `name`, compared case-insensitively.
///
/// The name attribute may come before or after `content`.
pub fn extract_meta(html: &str, name: &str) -> String {
    META_TAG_RE
        .find_iter(html)
        .find_map(|tag| {
            let tag = tag.as_str();
            let matches_name = KEY_ATTR_RE
                .captures_iter(tag)
                .filter_map(|caps| attr_value(&caps))
                .any(|key| key.eq_ignore_ascii_case(name));
            if !matches_name {
                return None;
            }
            CONTENT_ATTR_RE
                .captures(tag)
                .and_then(|caps| attr_value(&caps))
        })
        .map(|content| decode_html_entities(content).trim().to_string())
        .unwrap_or_default()
}

fn attr_value<'h>(caps: &Captures<'h>) -> Option<&'h str> {
    caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str())
}

/// Returns the decoded, trimmed inner text of the first `<tag>` element.
pub fn extract_tag(html: &str, tag: &str) -> String {
    // ASCII lower-casing keeps byte offsets valid for `html`.
    let lower = html.to_ascii_lowercase();
    let tag = tag.to_ascii_lowercase();
    let open = format!("<{tag}");
    let close = format!("</{tag}");

    let mut from = 0;
    while let Some(pos) = lower[from..].find(&open) {
        let after = from + pos + open.len();
        from = after;

        if !lower[after..].starts_with(|c: char| c == '>' || c.is_ascii_whitespace()) {
            continue;
        }
        let Some(gt) = lower[after..].find('>') else {
            break;
        };
        let inner_start = after + gt + 1;
        let Some(len) = lower[inner_start..].find(&close) else {
            break;
        };
        return decode_html_entities(&html[inner_start..inner_start + len])
            .trim()
            .to_string();
    }

    String::new()
}

/// Decodes `&amp; &lt; &gt; &quot; &#39; &#x27;` and decimal character references
/// in a single pass. References to invalid code points or to control characters
/// other than whitespace are left untouched.
pub fn decode_html_entities(text: &str) -> String {
    ENTITY_RE
        .replace_all(text, |caps: &Captures| {
            let entity = &caps[0];
            match entity {
                "&amp;" => "&".to_string(),
                "&lt;" => "<".to_string(),
                "&gt;" => ">".to_string(),
                "&quot;" => "\"".to_string(),
                "&#x27;" | "&#X27;" => "'".to_string(),
                numeric => numeric[2..numeric.len() - 1]
                    .parse::<u32>()
                    .ok()
                    .and_then(char::from_u32)
                    .filter(|c| !c.is_control() || c.is_ascii_whitespace())
                    .map(String::from)
                    .unwrap_or_else(|| numeric.to_string()),
            }
        })
        .into_owned()
}
