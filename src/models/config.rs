//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// GitHub API endpoints and credentials
    #[serde(default)]
    pub api: ApiConfig,

    /// Poll scheduling behavior
    #[serde(default)]
    pub harvest: HarvestConfig,

    /// Cache lifetimes
    #[serde(default)]
    pub ttl: TtlConfig,

    /// Word filtering limits
    #[serde(default)]
    pub words: WordConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.api.base_url)
            .map_err(|e| AppError::validation(format!("api.base_url is invalid: {e}")))?;
        if self.api.user_agent.trim().is_empty() {
            return Err(AppError::validation("api.user_agent is empty"));
        }
        if self.api.timeout_secs == 0 {
            return Err(AppError::validation("api.timeout_secs must be > 0"));
        }
        if self.harvest.base_interval_ms == 0 {
            return Err(AppError::validation("harvest.base_interval_ms must be > 0"));
        }
        if self.harvest.default_rate_limit == 0 {
            return Err(AppError::validation(
                "harvest.default_rate_limit must be > 0",
            ));
        }
        if self.harvest.max_concurrent == 0 {
            return Err(AppError::validation("harvest.max_concurrent must be > 0"));
        }
        if self.words.min_length == 0 || self.words.min_length > self.words.max_length {
            return Err(AppError::validation(
                "words.min_length must be > 0 and <= words.max_length",
            ));
        }
        Ok(())
    }

    /// Full URL of the global events feed endpoint.
    pub fn events_url(&self) -> String {
        format!("{}{}", self.api.base_url, self.api.events_path)
    }
}

/// GitHub API endpoint and credential settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API base URL
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// Path of the global events feed
    #[serde(default = "defaults::events_path")]
    pub events_path: String,

    /// Path suffix of the per-repository languages endpoint
    #[serde(default = "defaults::languages_path")]
    pub languages_path: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// OAuth client id sent as a query parameter
    #[serde(default)]
    pub client_id: String,

    /// OAuth client secret sent as a query parameter
    #[serde(default)]
    pub client_secret: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            events_path: defaults::events_path(),
            languages_path: defaults::languages_path(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            client_id: String::new(),
            client_secret: String::new(),
        }
    }
}

/// Poll scheduling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestConfig {
    /// Fallback delay between poll cycles in milliseconds
    #[serde(default = "defaults::base_interval")]
    pub base_interval_ms: u64,

    /// Fallback hourly request ceiling when the rate-limit header is absent
    #[serde(default = "defaults::default_rate_limit")]
    pub default_rate_limit: u64,

    /// Maximum concurrent repository decorations per batch
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            base_interval_ms: defaults::base_interval(),
            default_rate_limit: defaults::default_rate_limit(),
            max_concurrent: defaults::max_concurrent(),
        }
    }
}

/// Cache entry lifetimes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtlConfig {
    /// Repository metadata TTL in seconds
    #[serde(default = "defaults::repo_ttl")]
    pub repo_secs: u64,

    /// Word batch snapshot TTL in seconds
    #[serde(default = "defaults::word_ttl")]
    pub word_batch_secs: u64,
}

impl Default for TtlConfig {
    fn default() -> Self {
        Self {
            repo_secs: defaults::repo_ttl(),
            word_batch_secs: defaults::word_ttl(),
        }
    }
}

/// Word length limits.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WordConfig {
    /// Minimum word length in characters
    #[serde(default = "defaults::min_word_length")]
    pub min_length: usize,

    /// Maximum word length in characters
    #[serde(default = "defaults::max_word_length")]
    pub max_length: usize,
}

impl Default for WordConfig {
    fn default() -> Self {
        Self {
            min_length: defaults::min_word_length(),
            max_length: defaults::max_word_length(),
        }
    }
}

mod defaults {
    // Api defaults
    pub fn base_url() -> String {
        "https://api.github.com".into()
    }
    pub fn events_path() -> String {
        "/events".into()
    }
    pub fn languages_path() -> String {
        "/languages".into()
    }
    pub fn user_agent() -> String {
        "wordstream/0.1".into()
    }
    pub fn timeout() -> u64 {
        10
    }

    // Harvest defaults
    pub fn base_interval() -> u64 {
        30_000
    }
    pub fn default_rate_limit() -> u64 {
        5_000
    }
    pub fn max_concurrent() -> usize {
        5
    }

    // TTL defaults
    pub fn repo_ttl() -> u64 {
        3_600
    }
    pub fn word_ttl() -> u64 {
        30
    }

    // Word defaults
    pub fn min_word_length() -> usize {
        3
    }
    pub fn max_word_length() -> usize {
        20
    }
}
