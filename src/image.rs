use crate::PreviewError;
use reqwest::{header::CONTENT_TYPE, Client};
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

/// Resolves a possibly relative image reference against the page URL.
pub fn resolve_image_url(candidate: &str, base: &Url) -> Option<Url> {
    let candidate = candidate.trim();
    if candidate.is_empty() {
        return None;
    }

    match Url::parse(candidate) {
        Ok(url) => Some(url),
        Err(_) => base.join(candidate).ok(),
    }
}

/// Confirms that a preview image exists and is served as an image before it is
/// handed to the caller.
#[derive(Clone)]
pub struct ImageValidator {
    client: Client,
    timeout: Duration,
}

impl ImageValidator {
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Returns the absolute image URL, or an empty string when the candidate cannot
    /// be resolved or is not served as an image.
    #[instrument(level = "debug", skip(self, base), fields(base = %base))]
    pub async fn validate(&self, candidate: &str, base: &Url) -> String {
        let Some(image_url) = resolve_image_url(candidate, base) else {
            debug!("Image URL could not be resolved");
            return String::new();
        };

        match self.check(&image_url).await {
            Ok(()) => image_url.to_string(),
            Err(e) => {
                e.log();
                String::new()
            }
        }
    }

    async fn check(&self, image_url: &Url) -> Result<(), PreviewError> {
        let request = self
            .client
            .head(image_url.as_str())
            .timeout(self.timeout)
            .send();

        let response = tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| PreviewError::TimeoutError(format!("image check {image_url}")))?
            .map_err(|e| PreviewError::FetchError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PreviewError::FetchError(format!(
                "image check returned status {}",
                response.status()
            )));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if !content_type.starts_with("image/") {
            return Err(PreviewError::InvalidContentType(content_type));
        }

        debug!(image = %image_url, content_type = %content_type, "Image check succeeded");
        Ok(())
    }
}
