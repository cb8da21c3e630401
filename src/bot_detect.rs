/// Phrases that show up on block and challenge pages served to automated clients.
const BLOCK_PHRASES: &[&str] = &[
    "access denied",
    "please verify you are a human",
    "captcha",
    "challenge-platform",
    "just a moment...",
    "checking your browser",
    "attention required! | cloudflare",
    "pardon our interruption",
    "are you a robot",
    "unusual traffic",
    "px-captcha",
    "cf-browser-verification",
    "request unsuccessful. incapsula",
];

/// Heuristic check for bot-protection pages. False negatives are expected.
pub fn is_bot_protected(html: &str) -> bool {
    let lowered = html.to_lowercase();
    BLOCK_PHRASES.iter().any(|phrase| lowered.contains(phrase))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_challenge_pages() {
        assert!(is_bot_protected(
            "<html><body><h1>Please verify you are a human</h1></body></html>"
        ));
        assert!(is_bot_protected("<title>Access Denied</title>"));
        assert!(is_bot_protected(
            r#"<script src="/cdn-cgi/challenge-platform/h/b/orchestrate"></script>"#
        ));
        assert!(is_bot_protected("<div id=\"px-captcha\"></div>"));
    }

    #[test]
    fn test_regular_page_passes() {
        assert!(!is_bot_protected(
            r#"<html><head><meta property="og:title" content="Acme"></head></html>"#
        ));
        assert!(!is_bot_protected(""));
    }
}
