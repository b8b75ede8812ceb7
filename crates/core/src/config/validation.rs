//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Longest page TTL accepted (30 days).
const MAX_PAGE_TTL_SECS: u64 = 30 * 24 * 3_600;

/// Longest query cache TTL accepted (1 hour).
const MAX_QUERY_TTL_SECS: u64 = 3_600;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    /// - `source_url` is not an absolute http(s) URL
    /// - `page_ttl_secs` or `query_ttl_secs` is out of range
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_bytes == 0 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must be greater than 0".into() });
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must not exceed 50MB".into() });
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        match url::Url::parse(&self.source_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && url.host_str().is_some() => {}
            Ok(url) => {
                return Err(ConfigError::Invalid {
                    field: "source_url".into(),
                    reason: format!("unsupported scheme or missing host: {url}"),
                });
            }
            Err(e) => {
                return Err(ConfigError::Invalid { field: "source_url".into(), reason: e.to_string() });
            }
        }

        if self.page_ttl_secs > MAX_PAGE_TTL_SECS {
            return Err(ConfigError::Invalid { field: "page_ttl_secs".into(), reason: "must not exceed 30 days".into() });
        }

        if self.query_ttl_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "query_ttl_secs".into(),
                reason: "must be greater than 0; bypass the cache instead".into(),
            });
        }
        if self.query_ttl_secs > MAX_QUERY_TTL_SECS {
            return Err(ConfigError::Invalid { field: "query_ttl_secs".into(), reason: "must not exceed 1 hour".into() });
        }

        if self.page_ttl_secs == 0 {
            tracing::warn!("page_ttl_secs is 0; every page lookup will re-fetch the external source");
        }

        Ok(())
    }
}
