use thiserror::Error;
use tracing::{debug, error, warn};

pub const MANUAL_ENTRY_MESSAGE: &str =
    "Could not auto-fetch preview. Please enter the details manually.";

#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Internal URLs are not allowed: {0}")]
    InternalUrlBlocked(String),

    #[error("Only HTTP and HTTPS URLs are supported, got: {0}")]
    UnsupportedScheme(String),

    #[error("{}", MANUAL_ENTRY_MESSAGE)]
    PreviewUnavailable,

    #[error("Failed to fetch content: {0}")]
    FetchError(String),

    #[error("Request timeout: {0}")]
    TimeoutError(String),

    #[error("Invalid content type: {0}")]
    InvalidContentType(String),

    #[error("Bot protection detected: {0}")]
    BotProtection(String),

    #[error("Failed to extract metadata: {0}")]
    ExtractError(String),

    #[error("External service error: {service} - {message}")]
    ExternalServiceError { service: String, message: String },
}

impl PreviewError {
    /// Input validation failures are surfaced to the caller as 400s.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            PreviewError::InvalidUrl(_)
                | PreviewError::InternalUrlBlocked(_)
                | PreviewError::UnsupportedScheme(_)
        )
    }

    pub fn status_code(&self) -> u16 {
        match self {
            e if e.is_validation() => 400,
            PreviewError::PreviewUnavailable => 422,
            _ => 500,
        }
    }

    pub fn log(&self) {
        match self {
            PreviewError::InvalidUrl(e) => {
                warn!(error = %e, "URL parsing failed");
            }
            PreviewError::InternalUrlBlocked(host) => {
                warn!(host = %host, "Blocked internal URL");
            }
            PreviewError::UnsupportedScheme(scheme) => {
                warn!(scheme = %scheme, "Rejected unsupported URL scheme");
            }
            PreviewError::PreviewUnavailable => {
                debug!("No preview strategy produced a result");
            }
            PreviewError::FetchError(e) => {
                debug!(error = %e, "Content fetch failed");
            }
            PreviewError::TimeoutError(e) => {
                warn!(error = %e, "Request timed out");
            }
            PreviewError::InvalidContentType(e) => {
                debug!(content_type = %e, "Invalid content type received");
            }
            PreviewError::BotProtection(url) => {
                debug!(url = %url, "Page looks like a bot-protection challenge");
            }
            PreviewError::ExtractError(e) => {
                debug!(error = %e, "Metadata extraction failed");
            }
            PreviewError::ExternalServiceError { service, message } => {
                error!(
                    service = %service,
                    error = %message,
                    "External service error occurred"
                );
            }
        }
    }
}
