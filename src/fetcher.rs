use crate::image::ImageValidator;
use crate::utils::Utf8StreamDecoder;
use crate::{is_bot_protected, MetadataExtractor, PreviewError, PreviewResult, PreviewStrategy};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_ENCODING, ACCEPT_LANGUAGE, CONTENT_TYPE};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

/// Direct page scrape: a capped, time-bounded GET of the target page followed by
/// metadata extraction.
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
    extractor: MetadataExtractor,
    image_validator: ImageValidator,
    timeout: Duration,
    max_body_bytes: usize,
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));
    headers.insert("Upgrade-Insecure-Requests", HeaderValue::from_static("1"));
    headers
}

impl Fetcher {
    pub fn new(
        client: Client,
        image_validator: ImageValidator,
        timeout: Duration,
        max_body_bytes: usize,
    ) -> Self {
        Self {
            client,
            extractor: MetadataExtractor::new(),
            image_validator,
            timeout,
            max_body_bytes,
        }
    }

    /// Fetches at most `max_body_bytes` of an HTML page.
    ///
    /// The whole exchange, headers and streamed body, shares one deadline. Once the
    /// cap is reached the response is dropped, which closes the connection instead
    /// of draining the rest of the body.
    #[instrument(level = "debug", skip(self), fields(url = %url))]
    pub async fn fetch_html(&self, url: &Url) -> Result<String, PreviewError> {
        tokio::time::timeout(self.timeout, self.read_capped(url))
            .await
            .map_err(|_| {
                PreviewError::TimeoutError(format!("page fetch exceeded {:?}", self.timeout))
            })?
    }

    async fn read_capped(&self, url: &Url) -> Result<String, PreviewError> {
        let response = self
            .client
            .get(url.as_str())
            .headers(browser_headers())
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| PreviewError::FetchError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PreviewError::FetchError(format!("HTTP {status}")));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();
        if !(content_type.contains("text/html") || content_type.contains("application/xhtml+xml"))
        {
            return Err(PreviewError::InvalidContentType(content_type));
        }

        let mut stream = response.bytes_stream();
        let mut decoder = Utf8StreamDecoder::new();
        let mut html = String::new();
        let mut consumed = 0usize;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| PreviewError::FetchError(e.to_string()))?;
            let take = chunk.len().min(self.max_body_bytes - consumed);
            decoder.decode(&chunk[..take], &mut html);
            consumed += take;

            if consumed >= self.max_body_bytes {
                debug!(consumed, "Body cap reached, releasing connection");
                return Ok(html);
            }
        }

        decoder.finish(&mut html);
        debug!(consumed, "Read complete body");
        Ok(html)
    }

    async fn scrape(&self, url: &Url) -> Result<PreviewResult, PreviewError> {
        let html = self.fetch_html(url).await?;

        if is_bot_protected(&html) {
            return Err(PreviewError::BotProtection(url.to_string()));
        }

        let meta = self.extractor.extract(&html);
        if meta.title.is_empty() {
            return Err(PreviewError::ExtractError("page has no title".into()));
        }

        let image = self.image_validator.validate(&meta.image, url).await;

        Ok(PreviewResult::new(
            url,
            &meta.title,
            &meta.description,
            &image,
            &meta.site_name,
        ))
    }
}

#[async_trait]
impl PreviewStrategy for Fetcher {
    fn name(&self) -> &'static str {
        "direct"
    }

    #[instrument(level = "debug", skip(self), fields(url = %url))]
    async fn fetch_preview(&self, url: &Url) -> Option<PreviewResult> {
        match self.scrape(url).await {
            Ok(preview) => Some(preview),
            Err(e) => {
                e.log();
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher(max_body_bytes: usize) -> Fetcher {
        let client = Client::new();
        let images = ImageValidator::new(client.clone(), Duration::from_secs(3));
        Fetcher::new(client, images, Duration::from_secs(8), max_body_bytes)
    }

    fn html_response(body: impl Into<String>) -> ResponseTemplate {
        let body: String = body.into();
        ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=utf-8")
    }

    #[tokio::test]
    async fn test_fetch_html_sends_browser_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .and(header("accept-encoding", "identity"))
            .respond_with(html_response("<title>Hi</title>"))
            .expect(1)
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/page", server.uri())).unwrap();
        let html = fetcher(51_200).fetch_html(&url).await.unwrap();
        assert_eq!(html, "<title>Hi</title>");
    }

    #[tokio::test]
    async fn test_fetch_html_stops_at_cap() {
        let server = MockServer::start().await;
        let body = format!("<title>Big</title>{}", "a".repeat(200_000));
        Mock::given(method("GET"))
            .respond_with(html_response(body))
            .mount(&server)
            .await;

        let url = Url::parse(&server.uri()).unwrap();
        let html = fetcher(51_200).fetch_html(&url).await.unwrap();
        assert_eq!(html.len(), 51_200);
        assert!(html.starts_with("<title>Big</title>"));
    }

    #[tokio::test]
    async fn test_fetch_html_rejects_non_html() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw("{}", "application/json"),
            )
            .mount(&server)
            .await;

        let url = Url::parse(&server.uri()).unwrap();
        assert!(matches!(
            fetcher(51_200).fetch_html(&url).await,
            Err(PreviewError::InvalidContentType(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_preview_rejects_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let url = Url::parse(&server.uri()).unwrap();
        assert!(fetcher(51_200).fetch_preview(&url).await.is_none());
    }

    #[tokio::test]
    async fn test_fetch_preview_rejects_bot_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(html_response(
                "<title>Hold on</title><p>Please verify you are a human</p>",
            ))
            .mount(&server)
            .await;

        let url = Url::parse(&server.uri()).unwrap();
        assert!(fetcher(51_200).fetch_preview(&url).await.is_none());
    }

    #[tokio::test]
    async fn test_fetch_preview_requires_title() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(html_response(
                r#"<meta property="og:description" content="No title here">"#,
            ))
            .mount(&server)
            .await;

        let url = Url::parse(&server.uri()).unwrap();
        assert!(fetcher(51_200).fetch_preview(&url).await.is_none());
    }

    #[tokio::test]
    async fn test_fetch_preview_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(html_response("<title>Late</title>").set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let client = Client::new();
        let images = ImageValidator::new(client.clone(), Duration::from_secs(3));
        let fetcher = Fetcher::new(client, images, Duration::from_millis(200), 51_200);

        let url = Url::parse(&server.uri()).unwrap();
        assert!(fetcher.fetch_preview(&url).await.is_none());
    }
}
