//! Origin canonicalization and slug to URL mapping.

use pagesync_core::title::normalize_slug;

/// Error type for URL construction failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("slug not allowed: {0}")]
    InvalidSlug(String),
}

/// Canonicalize the configured source origin.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Default scheme to https:// if missing
/// 3. Lowercase the host
/// 4. Remove query and fragment
/// 5. Ensure the path ends with `/` so slugs join beneath it
pub fn canonicalize(input: &str) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let url_str = if trimmed.contains("://") { trimmed.to_string() } else { format!("https://{trimmed}") };

    let mut parsed = url::Url::parse(&url_str).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if let Some(host) = parsed.host_str() {
        let host = host.to_lowercase();
        parsed
            .set_host(Some(&host))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_query(None);
    parsed.set_fragment(None);

    if !parsed.path().ends_with('/') {
        let path = format!("{}/", parsed.path());
        parsed.set_path(&path);
    }

    Ok(parsed)
}

/// Target URL for `slug` beneath `origin`.
///
/// The slug is normalized first; the home slug maps to the origin itself.
/// Slugs that could escape the origin or carry their own query are rejected.
pub fn page_url(origin: &url::Url, slug: &str) -> Result<url::Url, UrlError> {
    let slug = normalize_slug(slug);
    if slug.is_empty() {
        return Ok(origin.clone());
    }

    // A colon in the first segment would be read as a scheme by `join`.
    let first = slug.split('/').next().unwrap_or_default();
    if first.contains(':')
        || slug.contains(['?', '#', '\\'])
        || slug.split('/').any(|part| part == ".." || part == ".")
    {
        return Err(UrlError::InvalidSlug(slug));
    }

    let url = origin.join(&slug).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    if !same_origin(origin, &url) || !url.path().starts_with(origin.path()) {
        return Err(UrlError::InvalidSlug(slug));
    }

    Ok(url)
}

fn same_origin(origin: &url::Url, url: &url::Url) -> bool {
    url.scheme() == origin.scheme()
        && url.host_str() == origin.host_str()
        && url.port_or_known_default() == origin.port_or_known_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> url::Url {
        canonicalize("https://example.org/").unwrap()
    }

    #[test]
    fn test_canonicalize_basic() {
        let url = canonicalize("https://example.org").unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.host_str(), Some("example.org"));
        assert_eq!(url.path(), "/");
    }

    #[test]
    fn test_canonicalize_default_scheme() {
        let url = canonicalize("example.org").unwrap();
        assert_eq!(url.scheme(), "https");
    }

    #[test]
    fn test_canonicalize_lowercase_host() {
        let url = canonicalize("https://EXAMPLE.ORG").unwrap();
        assert_eq!(url.host_str(), Some("example.org"));
    }

    #[test]
    fn test_canonicalize_strips_query_and_fragment() {
        let url = canonicalize("https://example.org/site?a=1#top").unwrap();
        assert_eq!(url.as_str(), "https://example.org/site/");
    }

    #[test]
    fn test_canonicalize_unsupported_scheme() {
        let result = canonicalize("file:///etc/passwd");
        assert!(matches!(result, Err(UrlError::UnsupportedScheme(_))));
    }

    #[test]
    fn test_canonicalize_empty() {
        assert!(matches!(canonicalize("   "), Err(UrlError::Empty)));
    }

    #[test]
    fn test_page_url_home() {
        assert_eq!(page_url(&origin(), "").unwrap().as_str(), "https://example.org/");
        assert_eq!(page_url(&origin(), "home").unwrap().as_str(), "https://example.org/");
        assert_eq!(page_url(&origin(), "/").unwrap().as_str(), "https://example.org/");
    }

    #[test]
    fn test_page_url_nested_slug() {
        let url = page_url(&origin(), "/events/summer-camp/").unwrap();
        assert_eq!(url.as_str(), "https://example.org/events/summer-camp");
    }

    #[test]
    fn test_page_url_under_origin_path() {
        let origin = canonicalize("https://example.org/club").unwrap();
        let url = page_url(&origin, "about-us").unwrap();
        assert_eq!(url.as_str(), "https://example.org/club/about-us");
    }

    #[test]
    fn test_page_url_rejects_escapes() {
        for slug in [
            "../admin",
            "a/../../b",
            "news?x=1",
            "news#top",
            "https://evil.test/x",
            "a\\b",
            "http:evil.test/x",
            "mailto:a@b",
            "data:text/html,hi",
        ] {
            assert!(matches!(page_url(&origin(), slug), Err(UrlError::InvalidSlug(_))), "{slug}");
        }
    }

    #[test]
    fn test_page_url_stays_on_origin() {
        let origin = canonicalize("http://example.org:8080/club").unwrap();
        for slug in ["about-us", "events/summer-camp", "news/2024:recap"] {
            let url = page_url(&origin, slug).unwrap();
            assert_eq!(url.host_str(), Some("example.org"), "{slug}");
            assert_eq!(url.port(), Some(8080), "{slug}");
            assert!(url.path().starts_with("/club/"), "{slug}");
        }
    }
}
