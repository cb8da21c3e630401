use crate::error::PreviewError;
use url::Url;

/// Hosts that are never fetched, compared after lower-casing.
const BLOCKED_HOSTS: &[&str] = &["localhost", "127.0.0.1", "0.0.0.0"];

/// Host prefixes treated as private network ranges.
///
/// This is prefix matching on the host string, not CIDR matching. `172.` over-blocks
/// public addresses outside `172.16.0.0/12`, IPv6 private ranges are not covered, and a
/// public hostname that resolves to a private address is not caught.
const BLOCKED_HOST_PREFIXES: &[&str] = &["192.168.", "10.", "172."];

const ALLOWED_SCHEMES: &[&str] = &["http", "https"];

/// Validates untrusted, user-supplied URLs before any network activity.
#[derive(Debug, Clone, Copy, Default)]
pub struct UrlGuard;

impl UrlGuard {
    pub fn new() -> Self {
        Self
    }

    /// Parses and validates a URL string.
    ///
    /// Checks run in order: parse, internal host, scheme.
    pub fn validate(&self, url_str: &str) -> Result<Url, PreviewError> {
        let url = Url::parse(url_str.trim())
            .map_err(|e| PreviewError::InvalidUrl(format!("{url_str}: {e}")))?;

        if let Some(host) = url.host_str() {
            let host = host.to_lowercase();
            if is_internal_host(&host) {
                return Err(PreviewError::InternalUrlBlocked(host));
            }
        }

        if !ALLOWED_SCHEMES.contains(&url.scheme()) {
            return Err(PreviewError::UnsupportedScheme(url.scheme().to_string()));
        }

        Ok(url)
    }
}

fn is_internal_host(host: &str) -> bool {
    BLOCKED_HOSTS.contains(&host)
        || host.ends_with(".local")
        || BLOCKED_HOST_PREFIXES
            .iter()
            .any(|prefix| host.starts_with(prefix))
}

/// Hostname with a leading `www.` removed.
pub fn display_domain(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    host.strip_prefix("www.").unwrap_or(host).to_string()
}
