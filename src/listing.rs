use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use url::Url;

static ZPID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)_zpid").expect("zpid pattern is valid"));
static PRICE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\$\s?(?:\d{1,3}(?:,\d{3})+|\d+)(?:\.\d+)?(?:\s?[km]\b)?")
        .expect("price pattern is valid")
});
static BEDS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d+(?:\.\d+)?)\s*(?:bd|bds|beds?|bedrooms?)\b").expect("beds pattern is valid")
});
static BATHS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d+(?:\.\d+)?)\s*(?:ba|baths?|bathrooms?)\b").expect("baths pattern is valid")
});
static SQFT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,3}(?:,\d{3})+|\d+)\s*(?:sq\.?\s?ft\.?|sqft|square\s+feet)")
        .expect("sqft pattern is valid")
});

/// What a listing URL says about the listing before any page is fetched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingMeta {
    pub source: String,
    pub address: String,
    pub zpid: Option<String>,
    pub image_blocked: bool,
}

/// Listing fields returned alongside the preview in listing mode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingEnrichment {
    pub source: String,
    pub address: String,
    pub price: String,
    pub details: Vec<String>,
    pub image_blocked: bool,
    pub zpid: Option<String>,
}

/// Real-estate listing analysis used by listing mode. Implementations must be pure.
pub trait ListingParser: Send + Sync {
    fn parse_listing_url(&self, url: &Url) -> ListingMeta;

    fn extract_price(&self, text: &str) -> String;

    fn extract_details(&self, text: &str) -> Vec<String>;
}

/// URL-slug and text-pattern listing parser for the common listing sites.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicListingParser;

impl BasicListingParser {
    pub fn new() -> Self {
        Self
    }
}

fn source_for_host(host: &str) -> &'static str {
    let host = host.strip_prefix("www.").unwrap_or(host);
    if host.ends_with("zillow.com") {
        "zillow"
    } else if host.ends_with("redfin.com") {
        "redfin"
    } else if host.ends_with("realtor.com") {
        "realtor"
    } else if host.ends_with("trulia.com") {
        "trulia"
    } else {
        "other"
    }
}

fn slug_to_words(slug: &str) -> String {
    slug.split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn address_from_path(source: &str, segments: &[&str]) -> String {
    match source {
        // /homedetails/123-Main-St-Springfield-IL-62704/12345_zpid/
        "zillow" | "trulia" => segments
            .iter()
            .position(|s| *s == "homedetails" || *s == "home")
            .and_then(|i| segments.get(i + 1))
            .map(|slug| slug_to_words(slug))
            .unwrap_or_default(),
        // /IL/Springfield/123-Main-St-62704/home/12345
        "redfin" => segments
            .iter()
            .position(|s| *s == "home")
            .and_then(|i| i.checked_sub(1))
            .and_then(|i| segments.get(i))
            .map(|slug| slug_to_words(slug))
            .unwrap_or_default(),
        // /realestateandhomes-detail/123-Main-St_Springfield_IL_62704_M12345-67890
        "realtor" => segments
            .iter()
            .position(|s| *s == "realestateandhomes-detail")
            .and_then(|i| segments.get(i + 1))
            .map(|slug| {
                slug.split('_')
                    .filter(|part| !part.starts_with('M') || !part[1..].starts_with(char::is_numeric))
                    .map(slug_to_words)
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_default(),
        _ => String::new(),
    }
}

impl ListingParser for BasicListingParser {
    fn parse_listing_url(&self, url: &Url) -> ListingMeta {
        let source = source_for_host(&url.host_str().unwrap_or_default().to_lowercase());
        let segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).collect())
            .unwrap_or_default();

        let zpid = ZPID_RE
            .captures(url.path())
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string());

        ListingMeta {
            source: source.to_string(),
            address: address_from_path(source, &segments),
            zpid,
            image_blocked: matches!(source, "zillow" | "realtor"),
        }
    }

    fn extract_price(&self, text: &str) -> String {
        PRICE_RE
            .find(text)
            .map(|m| m.as_str().split_whitespace().collect())
            .unwrap_or_default()
    }

    fn extract_details(&self, text: &str) -> Vec<String> {
        let mut details = Vec::new();
        if let Some(caps) = BEDS_RE.captures(text) {
            details.push(format!("{} bd", &caps[1]));
        }
        if let Some(caps) = BATHS_RE.captures(text) {
            details.push(format!("{} ba", &caps[1]));
        }
        if let Some(caps) = SQFT_RE.captures(text) {
            details.push(format!("{} sqft", &caps[1]));
        }
        details
    }
}
