//! HTTP fetch of page markup from the external source.
//!
//! ### URL mapping
//! - The configured origin is canonicalized once (lowercase host, no query)
//! - A slug is normalized and joined beneath the origin; the home slug maps
//!   to the origin root
//!
//! ### Safety gates
//! - Slugs that escape the origin are rejected before any request
//! - Max redirects: 5
//! - Max body bytes: 5MB (configurable), enforced while streaming

pub mod url;

use async_trait::async_trait;
use bytes::BytesMut;
use reqwest::{Client, header};
use std::time::{Duration, Instant};

pub use url::{UrlError, canonicalize, page_url};

use pagesync_core::{AppConfig, Error};

/// Anything that can produce raw markup for a slug.
///
/// The page cache only sees this trait, so tests can swap in stubs.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn fetch(&self, slug: &str) -> Result<String, Error>;
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Origin that slugs are resolved against (default: "https://example.org/")
    pub source_url: String,

    /// User agent string (default: "pagesync/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            source_url: "https://example.org/".to_string(),
            user_agent: "pagesync/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            source_url: config.source_url.clone(),
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Self::default()
        }
    }
}

/// HTTP fetch client bound to one origin.
pub struct FetchClient {
    http: Client,
    origin: ::url::Url,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let origin = canonicalize(&config.source_url).map_err(|e| Error::InvalidUrl(e.to_string()))?;

        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::HttpError(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, origin, config })
    }

    /// Canonical origin every slug is resolved against.
    pub fn origin(&self) -> &::url::Url {
        &self.origin
    }

    fn transport_error(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::FetchTimeout(format!("no response within {}ms", self.config.timeout.as_millis()))
        } else {
            Error::HttpError(format!("network error: {err}"))
        }
    }

    fn too_large(&self, len: usize) -> Error {
        Error::FetchTooLarge(format!("{len} bytes exceeds {}", self.config.max_bytes))
    }
}

#[async_trait]
impl ContentSource for FetchClient {
    /// One GET for the slug's URL.
    ///
    /// Non-2xx statuses, transport errors, timeouts and oversized bodies are
    /// all reported as fetch failures.
    async fn fetch(&self, slug: &str) -> Result<String, Error> {
        let start = Instant::now();
        let url = page_url(&self.origin, slug).map_err(|e| Error::InvalidUrl(e.to_string()))?;

        let mut response = self
            .http
            .get(url.as_str())
            .header(header::ACCEPT, "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8")
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpError(format!("status {} for {url}", status.as_u16())));
        }

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(self.too_large(len as usize));
        }

        let mut body = BytesMut::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| self.transport_error(e))? {
            if body.len() + chunk.len() > self.config.max_bytes {
                return Err(self.too_large(body.len() + chunk.len()));
            }
            body.extend_from_slice(&chunk);
        }

        let markup = String::from_utf8_lossy(&body).into_owned();

        tracing::debug!(
            slug,
            url = %url,
            status = status.as_u16(),
            bytes = markup.len(),
            fetch_ms = start.elapsed().as_millis() as u64,
            "fetched page markup"
        );

        Ok(markup)
    }
}

#[async_trait]
impl<T: ContentSource + ?Sized> ContentSource for std::sync::Arc<T> {
    async fn fetch(&self, slug: &str) -> Result<String, Error> {
        (**self).fetch(slug).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, "pagesync/0.1");
        assert_eq!(config.max_bytes, 5 * 1024 * 1024);
        assert_eq!(config.timeout, Duration::from_millis(20000));
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_fetch_config_from_app_config() {
        let app = AppConfig { source_url: "https://club.example/".into(), timeout_ms: 1500, ..AppConfig::default() };
        let config = FetchConfig::from(&app);
        assert_eq!(config.source_url, "https://club.example/");
        assert_eq!(config.timeout, Duration::from_millis(1500));
        assert_eq!(config.max_redirects, 5);
    }

    #[tokio::test]
    async fn test_fetch_client_new() {
        let client = FetchClient::new(FetchConfig::default()).unwrap();
        assert_eq!(client.origin().as_str(), "https://example.org/");
    }

    #[test]
    fn test_fetch_client_rejects_bad_origin() {
        let config = FetchConfig { source_url: "ftp://example.org".into(), ..FetchConfig::default() };
        assert!(matches!(FetchClient::new(config), Err(Error::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_fetch_rejects_escaping_slug_without_request() {
        let client = FetchClient::new(FetchConfig::default()).unwrap();
        for slug in ["../secret", "http:evil.test/x"] {
            let err = client.fetch(slug).await.unwrap_err();
            assert!(matches!(err, Error::InvalidUrl(_)), "{slug}");
            assert!(err.is_fetch_failure());
        }
    }

    #[tokio::test]
    async fn test_fetch_unreachable_host_is_fetch_failure() {
        let config = FetchConfig {
            source_url: "http://127.0.0.1:9/".into(),
            timeout: Duration::from_millis(500),
            ..FetchConfig::default()
        };
        let client = FetchClient::new(config).unwrap();
        let err = client.fetch("about-us").await.unwrap_err();
        assert!(err.is_fetch_failure(), "{err}");
    }
}
