use crate::{PreviewError, PreviewResult, PreviewStrategy};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

const SERVICE_NAME: &str = "metadata-service";

#[derive(Debug, Deserialize)]
struct MetadataServiceResponse {
    status: String,
    data: Option<MetadataServiceData>,
}

#[derive(Debug, Default, Deserialize)]
struct MetadataServiceData {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    image: Option<MetadataServiceImage>,
    #[serde(default)]
    publisher: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct MetadataServiceImage {
    #[serde(default)]
    url: Option<String>,
}

/// Third-party URL metadata service, used when the direct scrape yields nothing.
#[derive(Clone)]
pub struct FallbackFetcher {
    client: Client,
    endpoint: Url,
    timeout: Duration,
}

impl FallbackFetcher {
    pub fn new(client: Client, endpoint: Url, timeout: Duration) -> Self {
        Self {
            client,
            endpoint,
            timeout,
        }
    }

    async fn query(&self, url: &Url) -> Result<PreviewResult, PreviewError> {
        let request = self
            .client
            .get(self.endpoint.as_str())
            .query(&[("url", url.as_str())])
            .timeout(self.timeout)
            .send();

        let response = tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| PreviewError::TimeoutError(format!("{SERVICE_NAME} call")))?
            .map_err(|e| service_error(e.to_string()))?;

        if !response.status().is_success() {
            return Err(service_error(format!("HTTP {}", response.status())));
        }

        let body = response.json::<MetadataServiceResponse>();
        let body = tokio::time::timeout(self.timeout, body)
            .await
            .map_err(|_| PreviewError::TimeoutError(format!("{SERVICE_NAME} body")))?
            .map_err(|e| service_error(format!("unexpected payload: {e}")))?;

        if body.status != "success" {
            return Err(service_error(format!("status {}", body.status)));
        }
        let data = body
            .data
            .ok_or_else(|| service_error("missing data".to_string()))?;

        let image = data.image.and_then(|i| i.url).unwrap_or_default();
        let preview = PreviewResult::new(
            url,
            data.title.as_deref().unwrap_or_default(),
            data.description.as_deref().unwrap_or_default(),
            &image,
            data.publisher.as_deref().unwrap_or_default(),
        );

        if !preview.has_content() {
            return Err(service_error("no metadata fields".to_string()));
        }
        Ok(preview)
    }
}

fn service_error(message: String) -> PreviewError {
    PreviewError::ExternalServiceError {
        service: SERVICE_NAME.to_string(),
        message,
    }
}

#[async_trait]
impl PreviewStrategy for FallbackFetcher {
    fn name(&self) -> &'static str {
        "fallback"
    }

    #[instrument(level = "debug", skip(self), fields(url = %url))]
    async fn fetch_preview(&self, url: &Url) -> Option<PreviewResult> {
        match self.query(url).await {
            Ok(preview) => {
                debug!(title = %preview.title, "Metadata service returned a preview");
                Some(preview)
            }
            Err(e) => {
                e.log();
                None
            }
        }
    }
}
