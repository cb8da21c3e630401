use crate::image::ImageValidator;
use crate::listing::{BasicListingParser, ListingEnrichment, ListingParser};
use crate::{
    truncate_chars, FallbackFetcher, Fetcher, PreviewError, PreviewResult, PreviewStrategy,
    UrlGuard, TITLE_MAX_CHARS,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

pub const DEFAULT_FALLBACK_ENDPOINT: &str = "https://api.microlink.io/";

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
    AppleWebKit/537.36 (KHTML, like Gecko) \
    Chrome/124.0.0.0 Safari/537.36";

/// Whether the caller asked for listing enrichment on top of the preview.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PreviewMode {
    #[default]
    Standard,
    Listing,
}

impl PreviewMode {
    /// Exactly `listing` selects listing mode; anything else, or nothing, is standard.
    pub fn from_param(mode: Option<&str>) -> Self {
        match mode {
            Some("listing") => PreviewMode::Listing,
            _ => PreviewMode::Standard,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewResponse {
    #[serde(flatten)]
    pub preview: PreviewResult,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub listing: Option<ListingEnrichment>,
}

pub struct PreviewServiceConfig {
    pub user_agent: String,
    pub direct_timeout: Duration,
    pub image_check_timeout: Duration,
    pub fallback_timeout: Duration,
    pub max_body_bytes: usize,
    pub max_redirects: usize,
    pub fallback_endpoint: String,
}

impl Default for PreviewServiceConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            direct_timeout: Duration::from_secs(8),
            image_check_timeout: Duration::from_secs(3),
            fallback_timeout: Duration::from_secs(10),
            max_body_bytes: 50 * 1024,
            max_redirects: 10,
            fallback_endpoint: DEFAULT_FALLBACK_ENDPOINT.to_string(),
        }
    }
}

impl PreviewServiceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `LINK_PREVIEW_FALLBACK_ENDPOINT` and `LINK_PREVIEW_USER_AGENT`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(endpoint) = std::env::var("LINK_PREVIEW_FALLBACK_ENDPOINT") {
            debug!(endpoint = %endpoint, "Using fallback endpoint from environment");
            config.fallback_endpoint = endpoint;
        }
        if let Ok(user_agent) = std::env::var("LINK_PREVIEW_USER_AGENT") {
            config.user_agent = user_agent;
        }
        config
    }

    pub fn with_fallback_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.fallback_endpoint = endpoint.into();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_direct_timeout(mut self, timeout: Duration) -> Self {
        self.direct_timeout = timeout;
        self
    }

    pub fn with_image_check_timeout(mut self, timeout: Duration) -> Self {
        self.image_check_timeout = timeout;
        self
    }

    pub fn with_fallback_timeout(mut self, timeout: Duration) -> Self {
        self.fallback_timeout = timeout;
        self
    }

    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }
}

/// PreviewService runs the preview pipeline for one URL at a time.
///
/// It holds no per-request state: the pooled HTTP client inside the strategies is
/// shared, everything else is built fresh for each call.
#[derive(Clone)]
pub struct PreviewService {
    guard: UrlGuard,
    direct: Arc<dyn PreviewStrategy>,
    fallback: Arc<dyn PreviewStrategy>,
    listing_parser: Arc<dyn ListingParser>,
}

impl PreviewService {
    pub fn new() -> Result<Self, PreviewError> {
        Self::new_with_config(PreviewServiceConfig::default())
    }

    pub fn new_with_config(config: PreviewServiceConfig) -> Result<Self, PreviewError> {
        debug!("Initializing PreviewService with custom configuration");

        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| PreviewError::FetchError(format!("failed to build HTTP client: {e}")))?;

        let endpoint = Url::parse(&config.fallback_endpoint).map_err(|e| {
            PreviewError::InvalidUrl(format!("fallback endpoint {}: {e}", config.fallback_endpoint))
        })?;

        let images = ImageValidator::new(client.clone(), config.image_check_timeout);
        let direct = Fetcher::new(
            client.clone(),
            images,
            config.direct_timeout,
            config.max_body_bytes,
        );
        let fallback = FallbackFetcher::new(client, endpoint, config.fallback_timeout);

        Ok(Self::with_strategies(
            Arc::new(direct),
            Arc::new(fallback),
            Arc::new(BasicListingParser::new()),
        ))
    }

    pub fn with_strategies(
        direct: Arc<dyn PreviewStrategy>,
        fallback: Arc<dyn PreviewStrategy>,
        listing_parser: Arc<dyn ListingParser>,
    ) -> Self {
        Self {
            guard: UrlGuard::new(),
            direct,
            fallback,
            listing_parser,
        }
    }

    pub fn with_listing_parser(mut self, listing_parser: Arc<dyn ListingParser>) -> Self {
        self.listing_parser = listing_parser;
        self
    }

    /// Validates an untrusted URL and builds its preview.
    ///
    /// Validation errors are returned before any network activity.
    pub async fn generate_preview(
        &self,
        url: &str,
        mode: PreviewMode,
    ) -> Result<PreviewResponse, PreviewError> {
        let url = self.guard.validate(url)?;
        self.generate_preview_for(&url, mode).await
    }

    /// Builds the preview for a URL that has already passed validation.
    #[instrument(level = "debug", skip(self), fields(url = %url))]
    pub async fn generate_preview_for(
        &self,
        url: &Url,
        mode: PreviewMode,
    ) -> Result<PreviewResponse, PreviewError> {
        let fetched = match self.direct.fetch_preview(url).await {
            Some(preview) => Some(preview),
            None => {
                debug!(
                    strategy = self.fallback.name(),
                    "Direct fetch yielded nothing, trying fallback"
                );
                self.fallback.fetch_preview(url).await
            }
        };

        match mode {
            PreviewMode::Standard => {
                let preview = fetched.ok_or(PreviewError::PreviewUnavailable)?;
                Ok(PreviewResponse {
                    preview,
                    listing: None,
                })
            }
            PreviewMode::Listing => self.enrich_listing(url, fetched),
        }
    }

    fn enrich_listing(
        &self,
        url: &Url,
        fetched: Option<PreviewResult>,
    ) -> Result<PreviewResponse, PreviewError> {
        let found = fetched.is_some();
        let mut preview = fetched.unwrap_or_else(|| PreviewResult::empty(url));

        let meta = self.listing_parser.parse_listing_url(url);
        let text = format!("{} {}", preview.title, preview.description);
        let price = self.listing_parser.extract_price(&text);
        let details = self.listing_parser.extract_details(&text);

        if preview.title.is_empty() && !meta.address.is_empty() {
            preview.title = truncate_chars(&meta.address, TITLE_MAX_CHARS);
        }

        if !found && preview.title.is_empty() {
            return Err(PreviewError::PreviewUnavailable);
        }

        let address = if meta.address.is_empty() {
            preview.title.clone()
        } else {
            meta.address
        };

        debug!(source = %meta.source, address = %address, "Listing enrichment complete");

        Ok(PreviewResponse {
            preview,
            listing: Some(ListingEnrichment {
                source: meta.source,
                address,
                price,
                details,
                image_blocked: meta.image_blocked,
                zpid: meta.zpid,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StaticStrategy {
        result: Option<PreviewResult>,
        calls: AtomicUsize,
    }

    impl StaticStrategy {
        fn new(result: Option<PreviewResult>) -> Arc<Self> {
            Arc::new(Self {
                result,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PreviewStrategy for StaticStrategy {
        fn name(&self) -> &'static str {
            "static"
        }

        async fn fetch_preview(&self, _url: &Url) -> Option<PreviewResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }
    }

    fn listing_url() -> Url {
        Url::parse(
            "https://www.zillow.com/homedetails/123-Main-St-Springfield-IL-62704/98765_zpid/",
        )
        .unwrap()
    }

    fn service(
        direct: Arc<StaticStrategy>,
        fallback: Arc<StaticStrategy>,
    ) -> PreviewService {
        PreviewService::with_strategies(direct, fallback, Arc::new(BasicListingParser::new()))
    }

    #[test]
    fn test_mode_from_param() {
        assert_eq!(PreviewMode::from_param(Some("listing")), PreviewMode::Listing);
        assert_eq!(PreviewMode::from_param(Some("other")), PreviewMode::Standard);
        assert_eq!(PreviewMode::from_param(Some("LISTING")), PreviewMode::Standard);
        assert_eq!(PreviewMode::from_param(Some(" listing")), PreviewMode::Standard);
        assert_eq!(PreviewMode::from_param(None), PreviewMode::Standard);
    }

    #[tokio::test]
    async fn test_direct_result_skips_fallback() {
        let url = Url::parse("https://example.com").unwrap();
        let direct = StaticStrategy::new(Some(PreviewResult::new(&url, "Direct", "", "", "")));
        let fallback = StaticStrategy::new(Some(PreviewResult::new(&url, "Fallback", "", "", "")));
        let service = service(direct.clone(), fallback.clone());

        let response = service
            .generate_preview_for(&url, PreviewMode::Standard)
            .await
            .unwrap();

        assert_eq!(response.preview.title, "Direct");
        assert!(response.listing.is_none());
        assert_eq!(direct.calls(), 1);
        assert_eq!(fallback.calls(), 0);
    }

    #[tokio::test]
    async fn test_fallback_used_when_direct_fails() {
        let url = Url::parse("https://example.com").unwrap();
        let direct = StaticStrategy::new(None);
        let fallback = StaticStrategy::new(Some(PreviewResult::new(&url, "Fallback", "", "", "")));
        let service = service(direct.clone(), fallback.clone());

        let response = service
            .generate_preview_for(&url, PreviewMode::Standard)
            .await
            .unwrap();

        assert_eq!(response.preview.title, "Fallback");
        assert_eq!(fallback.calls(), 1);
    }

    #[tokio::test]
    async fn test_both_strategies_fail() {
        let url = Url::parse("https://example.com").unwrap();
        let service = service(StaticStrategy::new(None), StaticStrategy::new(None));

        let result = service.generate_preview_for(&url, PreviewMode::Standard).await;
        assert!(matches!(result, Err(PreviewError::PreviewUnavailable)));
    }

    #[tokio::test]
    async fn test_listing_backfills_title_from_address() {
        let service = service(StaticStrategy::new(None), StaticStrategy::new(None));

        let response = service
            .generate_preview_for(&listing_url(), PreviewMode::Listing)
            .await
            .unwrap();

        assert_eq!(response.preview.title, "123 Main St Springfield IL 62704");
        assert_eq!(response.preview.domain, "zillow.com");
        let listing = response.listing.unwrap();
        assert_eq!(listing.address, "123 Main St Springfield IL 62704");
        assert_eq!(listing.source, "zillow");
        assert_eq!(listing.zpid.as_deref(), Some("98765"));
        assert!(listing.image_blocked);
        assert_eq!(listing.price, "");
    }

    #[tokio::test]
    async fn test_listing_extracts_price_and_details() {
        let url = listing_url();
        let direct = StaticStrategy::new(Some(PreviewResult::new(
            &url,
            "123 Main St, Springfield, IL 62704 | Zillow",
            "$349,900 - 3 bd, 2 ba, 1,600 sqft home for sale",
            "",
            "Zillow",
        )));
        let service = service(direct, StaticStrategy::new(None));

        let response = service
            .generate_preview_for(&url, PreviewMode::Listing)
            .await
            .unwrap();
        let listing = response.listing.unwrap();

        assert_eq!(listing.price, "$349,900");
        assert_eq!(listing.details, vec!["3 bd", "2 ba", "1,600 sqft"]);
        // Address from the URL wins over the page title.
        assert_eq!(listing.address, "123 Main St Springfield IL 62704");
    }

    #[tokio::test]
    async fn test_listing_address_falls_back_to_title() {
        let url = Url::parse("https://homes.example.com/listing/42").unwrap();
        let direct = StaticStrategy::new(Some(PreviewResult::new(&url, "Cozy Cottage", "", "", "")));
        let service = service(direct, StaticStrategy::new(None));

        let response = service
            .generate_preview_for(&url, PreviewMode::Listing)
            .await
            .unwrap();
        let listing = response.listing.unwrap();

        assert_eq!(listing.source, "other");
        assert_eq!(listing.address, "Cozy Cottage");
        assert_eq!(listing.zpid, None);
    }

    #[tokio::test]
    async fn test_listing_without_any_fields_fails() {
        let url = Url::parse("https://homes.example.com/listing/42").unwrap();
        let service = service(StaticStrategy::new(None), StaticStrategy::new(None));

        let result = service.generate_preview_for(&url, PreviewMode::Listing).await;
        assert!(matches!(result, Err(PreviewError::PreviewUnavailable)));
    }

    #[tokio::test]
    async fn test_invalid_url_never_reaches_strategies() {
        let direct = StaticStrategy::new(None);
        let fallback = StaticStrategy::new(None);
        let service = service(direct.clone(), fallback.clone());

        let result = service
            .generate_preview("http://192.168.0.10/admin", PreviewMode::Standard)
            .await;

        assert!(matches!(result, Err(PreviewError::InternalUrlBlocked(_))));
        assert_eq!(direct.calls(), 0);
        assert_eq!(fallback.calls(), 0);
    }

    #[test]
    fn test_response_serialization_flattens_preview() {
        let url = listing_url();
        let response = PreviewResponse {
            preview: PreviewResult::new(&url, "Home", "", "", ""),
            listing: Some(ListingEnrichment {
                source: "zillow".into(),
                image_blocked: true,
                ..Default::default()
            }),
        };
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["title"], "Home");
        assert_eq!(json["domain"], "zillow.com");
        assert_eq!(json["listing"]["imageBlocked"], true);
        assert!(json["listing"]["zpid"].is_null());
    }
}
