//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (PAGESYNC_*)
//! 2. TOML config file (if PAGESYNC_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::policy::{DuplicateKeyPolicy, SyncPolicy};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (PAGESYNC_*)
/// 2. TOML config file (if PAGESYNC_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite database holding pages and sections.
    ///
    /// Set via PAGESYNC_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Origin of the external site that pages are synchronized from.
    ///
    /// Set via PAGESYNC_SOURCE_URL environment variable. The empty slug maps
    /// to this URL's root path.
    #[serde(default = "default_source_url")]
    pub source_url: String,

    /// User-Agent string for outbound requests.
    ///
    /// Set via PAGESYNC_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per page.
    ///
    /// Set via PAGESYNC_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via PAGESYNC_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Seconds a synchronized page is served without re-fetching.
    ///
    /// Set via PAGESYNC_PAGE_TTL_SECS environment variable.
    #[serde(default = "default_page_ttl_secs")]
    pub page_ttl_secs: u64,

    /// Seconds a cached query result is served without re-reading the store.
    ///
    /// Set via PAGESYNC_QUERY_TTL_SECS environment variable.
    #[serde(default = "default_query_ttl_secs")]
    pub query_ttl_secs: u64,

    /// Whether a refresh deletes sections whose keys vanished from the source.
    ///
    /// Set via PAGESYNC_PRUNE_MISSING_SECTIONS environment variable.
    #[serde(default)]
    pub prune_missing_sections: bool,

    /// How repeated element identifiers in fetched markup are handled.
    ///
    /// Set via PAGESYNC_DUPLICATE_SECTIONS (`last_wins` or `reject`).
    #[serde(default)]
    pub duplicate_sections: DuplicateKeyPolicy,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./pagesync.sqlite")
}

fn default_source_url() -> String {
    "https://example.org/".into()
}

fn default_user_agent() -> String {
    "pagesync/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_page_ttl_secs() -> u64 {
    3_600
}

fn default_query_ttl_secs() -> u64 {
    10
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            source_url: default_source_url(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            page_ttl_secs: default_page_ttl_secs(),
            query_ttl_secs: default_query_ttl_secs(),
            prune_missing_sections: false,
            duplicate_sections: DuplicateKeyPolicy::default(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Page freshness window.
    pub fn page_ttl(&self) -> Duration {
        Duration::from_secs(self.page_ttl_secs)
    }

    /// Query cache freshness window.
    pub fn query_ttl(&self) -> Duration {
        Duration::from_secs(self.query_ttl_secs)
    }

    /// Reconciliation policy handed to the page cache.
    pub fn sync_policy(&self) -> SyncPolicy {
        SyncPolicy {
            page_ttl: self.page_ttl(),
            prune_missing: self.prune_missing_sections,
            duplicates: self.duplicate_sections,
        }
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `PAGESYNC_`
    /// 2. TOML file from `PAGESYNC_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("PAGESYNC_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("PAGESYNC_")
                .ignore(&["config_file"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
