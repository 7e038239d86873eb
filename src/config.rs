//! Analyzer configuration.

use serde::{Deserialize, Serialize};

/// Default Torn API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.torn.com/v2";

/// Runtime settings for fetching and caching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Torn API key (read-only access to money logs is enough)
    pub api_key: Option<String>,

    /// API base URL, without trailing slash
    pub base_url: String,

    /// Entries requested per log page (API maximum is 100)
    pub page_limit: u32,

    /// Hard cap on pages fetched per log category
    pub max_pages_per_category: u32,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,

    /// Give up retrying rate-limited requests after this many seconds
    pub max_retry_secs: u64,

    /// How long the item name cache stays valid
    pub item_cache_ttl_hours: i64,

    /// Item categories fetched in parallel when rebuilding the cache
    pub catalog_concurrency: usize,

    /// SQLite URL for the cache store
    pub database_url: String,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            page_limit: 100,
            max_pages_per_category: 50,
            request_timeout_secs: 30,
            max_retry_secs: 60,
            item_cache_ttl_hours: 24,
            catalog_concurrency: 4,
            database_url: "sqlite:./tornprofit.db?mode=rwc".to_string(),
        }
    }
}

impl AnalyzerConfig {
    /// Defaults overlaid with `TORN_API_KEY` and `TORN_API_BASE`.
    ///
    /// Loads a `.env` file first if one exists.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let mut config = Self::default();
        if let Ok(key) = std::env::var("TORN_API_KEY") {
            config = config.with_api_key(Some(key));
        }
        if let Ok(base) = std::env::var("TORN_API_BASE") {
            if !base.trim().is_empty() {
                config.base_url = base.trim().trim_end_matches('/').to_string();
            }
        }
        config
    }

    /// Replace the key, treating blank values as unset.
    pub fn with_api_key(mut self, key: Option<String>) -> Self {
        self.api_key = key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());
        self
    }

    /// Key with all but the last four characters hidden.
    pub fn masked_key(&self) -> String {
        match &self.api_key {
            None => "(not set)".to_string(),
            Some(key) => {
                let chars: Vec<char> = key.chars().collect();
                if chars.len() <= 4 {
                    "*".repeat(chars.len())
                } else {
                    let tail: String = chars[chars.len() - 4..].iter().collect();
                    format!("{}{}", "*".repeat(chars.len() - 4), tail)
                }
            }
        }
    }
}
