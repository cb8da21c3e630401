use crate::PreviewResponse;
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt as subscriber_fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

#[derive(Debug)]
pub struct LogConfig {
    pub log_dir: PathBuf,
    pub log_level: String,
    pub console_output: bool,
    pub file_output: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_dir: "logs".into(),
            log_level: "info".into(),
            console_output: true,
            file_output: false,
        }
    }
}

fn or_na(value: &str) -> &str {
    if value.is_empty() {
        "N/A"
    } else {
        value
    }
}

pub fn log_preview_card(response: &PreviewResponse) {
    const CARD_WIDTH: usize = 80;

    let preview = &response.preview;
    let horizontal_line = "═".repeat(CARD_WIDTH - 2);
    let listing = response
        .listing
        .as_ref()
        .map(|l| {
            format!(
                "\n         Listing: {} | {} | {} | {}",
                l.source,
                or_na(&l.address),
                or_na(&l.price),
                l.details.join(", ")
            )
        })
        .unwrap_or_default();

    info!(
        "\n╔{}╗\n\
         URL: {}\n\
         Domain: {}\n\
         Title: {}\n\
         Desc: {}\n\
         Image: {}\n\
         Site: {}{}\n\
         ╚{}╝",
        horizontal_line,
        preview.url,
        preview.domain,
        or_na(&preview.title),
        or_na(&preview.description),
        or_na(&preview.image),
        or_na(&preview.site_name),
        listing,
        horizontal_line,
    );
}

/// Installs the global subscriber: env filter, optional pretty console layer,
/// optional daily rolling file layer.
pub fn setup_logging(config: LogConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let mut layers = Vec::new();

    if config.console_output {
        let console_layer = subscriber_fmt::layer()
            .with_target(true)
            .with_line_number(true)
            .with_writer(std::io::stderr);
        layers.push(console_layer.boxed());
    }

    if config.file_output {
        std::fs::create_dir_all(&config.log_dir)?;

        let file_appender =
            RollingFileAppender::new(Rotation::DAILY, &config.log_dir, "link-preview.log");

        let file_layer = subscriber_fmt::layer()
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(true)
            .with_line_number(true)
            .with_file(true)
            .with_writer(file_appender);

        layers.push(file_layer.boxed());
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init()?;

    debug!("Logging system initialized with config: {:?}", config);
    Ok(())
}
