//! URL manipulation utilities.
//!
//! Every URL that reaches a work queue or the sitemap goes through
//! [`normalize_url`] first, so the normalized string doubles as the dedup
//! fingerprint for that URL.

use url::Url;

/// Check if a URL is valid
#[must_use]
pub fn is_valid_url(url: &str) -> bool {
    if url.is_empty() {
        return false;
    }

    // Skip data URLs, javascript URLs, and other non-http schemes
    if url.starts_with("data:") || url.starts_with("javascript:") || url.starts_with("mailto:") {
        return false;
    }

    match Url::parse(url) {
        Ok(parsed) => {
            matches!(parsed.scheme(), "http" | "https")
        }
        Err(_) => false,
    }
}

/// Normalize an absolute URL into its canonical queue form
///
/// The fragment is stripped, the host is lowercased and default ports are
/// dropped (the `url` crate does the last two while parsing). Returns `None`
/// for anything that is not an absolute http(s) URL.
#[must_use]
pub fn normalize_url(url: &str) -> Option<String> {
    let trimmed = url.trim();
    if !is_valid_url(trimmed) {
        return None;
    }

    let mut parsed = Url::parse(trimmed).ok()?;
    parsed.set_fragment(None);
    Some(parsed.to_string())
}

/// Resolve a possibly-relative reference against `base` and normalize it
///
/// # Example
/// ```rust
/// # use kodegen_tools_webaudit::utils::resolve_url;
/// assert_eq!(
///     resolve_url("https://example.com/a/b", "../c#top").as_deref(),
///     Some("https://example.com/c")
/// );
/// ```
#[must_use]
pub fn resolve_url(base: &str, reference: &str) -> Option<String> {
    let reference = reference.trim();
    if reference.is_empty()
        || reference.starts_with("javascript:")
        || reference.starts_with("mailto:")
        || reference.starts_with("data:")
    {
        return None;
    }

    let base = Url::parse(base).ok()?;
    let joined = base.join(reference).ok()?;
    normalize_url(joined.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_fragment_and_default_port() {
        assert_eq!(
            normalize_url("https://Example.com:443/path#section").as_deref(),
            Some("https://example.com/path")
        );
    }

    #[test]
    fn rejects_non_http() {
        assert_eq!(normalize_url("mailto:someone@example.com"), None);
        assert_eq!(normalize_url("/relative/only"), None);
        assert_eq!(resolve_url("https://example.com/", "javascript:void(0)"), None);
    }

    #[test]
    fn resolves_relative_reference() {
        assert_eq!(
            resolve_url("https://example.com/dir/page", "other?x=1").as_deref(),
            Some("https://example.com/dir/other?x=1")
        );
    }
}
