use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

mod bot_detect;
mod error;
mod extractor;
mod fallback;
mod fetcher;
mod image;
mod listing;
#[cfg(feature = "logging")]
mod logging;
mod preview_service;
mod security;
#[cfg(feature = "server")]
pub mod server;
mod utils;

pub use bot_detect::is_bot_protected;
pub use error::{PreviewError, MANUAL_ENTRY_MESSAGE};
pub use extractor::{decode_html_entities, extract_meta, extract_tag, MetadataExtractor, PageMetadata};
pub use fallback::FallbackFetcher;
pub use fetcher::Fetcher;
pub use image::{resolve_image_url, ImageValidator};
pub use listing::{BasicListingParser, ListingEnrichment, ListingMeta, ListingParser};
#[cfg(feature = "logging")]
pub use logging::{log_preview_card, setup_logging, LogConfig};
pub use preview_service::{
    PreviewMode, PreviewResponse, PreviewService, PreviewServiceConfig, DEFAULT_FALLBACK_ENDPOINT,
};
pub use security::{display_domain, UrlGuard};
pub use utils::truncate_chars;

pub const TITLE_MAX_CHARS: usize = 200;
pub const DESCRIPTION_MAX_CHARS: usize = 500;
pub const IMAGE_MAX_CHARS: usize = 1000;
pub const SITE_NAME_MAX_CHARS: usize = 100;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResult {
    pub url: String,
    pub title: String,
    pub description: String,
    pub image: String,
    pub site_name: String,
    pub domain: String,
}

impl PreviewResult {
    /// Builds a preview for `url`, truncating every field to its limit.
    pub fn new(
        url: &Url,
        title: &str,
        description: &str,
        image: &str,
        site_name: &str,
    ) -> Self {
        Self {
            url: url.to_string(),
            title: truncate_chars(title, TITLE_MAX_CHARS),
            description: truncate_chars(description, DESCRIPTION_MAX_CHARS),
            image: truncate_chars(image, IMAGE_MAX_CHARS),
            site_name: truncate_chars(site_name, SITE_NAME_MAX_CHARS),
            domain: display_domain(url),
        }
    }

    /// A preview carrying only the request URL and its domain.
    pub fn empty(url: &Url) -> Self {
        Self::new(url, "", "", "", "")
    }

    pub fn has_content(&self) -> bool {
        !(self.title.is_empty()
            && self.description.is_empty()
            && self.image.is_empty()
            && self.site_name.is_empty())
    }
}

/// One way of acquiring a preview. Strategies never fail loudly: every error is
/// absorbed and reported as `None` so the caller can move on to the next one.
#[async_trait]
pub trait PreviewStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch_preview(&self, url: &Url) -> Option<PreviewResult>;
}
