//! Torn API client for money logs and the item catalog.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use backoff::{future::retry_notify, ExponentialBackoff};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::AnalyzerConfig;

use super::types::*;
use super::{ItemCatalog, LogSource};

/// Read-only client for the Torn v2 API.
pub struct TornClient {
    client: Client,
    base_url: String,
    api_key: String,
    max_retry: Duration,
}

impl TornClient {
    /// Create a client. Refuses to build without an API key.
    pub fn new(api_key: &str, base_url: &str, timeout: Duration, max_retry: Duration) -> Result<Self> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            anyhow::bail!("Configuration error: Torn API key is not set (TORN_API_KEY)");
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            max_retry,
        })
    }

    pub fn from_config(config: &AnalyzerConfig) -> Result<Self> {
        Self::new(
            config.api_key.as_deref().unwrap_or_default(),
            &config.base_url,
            Duration::from_secs(config.request_timeout_secs),
            Duration::from_secs(config.max_retry_secs),
        )
    }

    /// GET a JSON document, retrying rate limits and transport failures.
    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let policy = ExponentialBackoff {
            max_elapsed_time: Some(self.max_retry),
            ..ExponentialBackoff::default()
        };

        let body = retry_notify(
            policy,
            || self.get_once(url),
            |err: anyhow::Error, wait: Duration| {
                warn!(wait_ms = wait.as_millis() as u64, "Retrying Torn API request: {:#}", err);
            },
        )
        .await?;

        serde_json::from_value(body).context("Failed to parse Torn API response")
    }

    async fn get_once(&self, url: &str) -> Result<Value, backoff::Error<anyhow::Error>> {
        let response = self
            .client
            .get(url)
            .header("Authorization", format!("ApiKey {}", self.api_key))
            .send()
            .await
            .map_err(|e| backoff::Error::transient(anyhow!("Request error: {}", e)))?;

        let status = response.status();
        if status.as_u16() == 429 || status.is_server_error() {
            return Err(backoff::Error::transient(anyhow!("HTTP {}", status)));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(backoff::Error::permanent(anyhow!(
                "Torn API request failed: {} - {}",
                status,
                body
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| backoff::Error::permanent(anyhow!("Invalid JSON from Torn API: {}", e)))?;

        if let Some(error) = body.get("error") {
            let error: ApiErrorBody = serde_json::from_value(error.clone()).map_err(|e| {
                backoff::Error::permanent(anyhow!("Unreadable Torn API error payload: {}", e))
            })?;
            let err = anyhow!("Torn API error {}: {}", error.code, error.error);
            return Err(if error.is_transient() {
                backoff::Error::transient(err)
            } else {
                backoff::Error::permanent(err)
            });
        }

        Ok(body)
    }
}

impl LogSource for TornClient {
    async fn fetch_log_page(
        &self,
        category: LogCategory,
        from: Option<i64>,
        to: Option<i64>,
        limit: u32,
    ) -> Result<LogPage> {
        let limit = limit.min(MAX_PAGE_LIMIT);
        let mut url = format!(
            "{}/user/log?cat={}&limit={}",
            self.base_url,
            category.id(),
            limit
        );
        if let Some(f) = from {
            url = format!("{}&from={}", url, f);
        }
        if let Some(t) = to {
            url = format!("{}&to={}", url, t);
        }

        debug!(url = %url, category = category.as_str(), "Fetching log page");

        let response: LogResponse = self
            .get_json(&url)
            .await
            .with_context(|| format!("Failed to fetch {} money log", category.as_str()))?;

        let has_more = response.log.len() as u32 >= limit;
        Ok(LogPage {
            entries: response.log,
            has_more,
        })
    }
}

impl ItemCatalog for TornClient {
    async fn fetch_items_by_category(&self, category: &str) -> Result<Vec<CatalogItem>> {
        let url = format!(
            "{}/torn/items?cat={}",
            self.base_url,
            category.replace(' ', "%20")
        );

        debug!(url = %url, "Fetching item category");

        let response: ItemsResponse = self
            .get_json(&url)
            .await
            .with_context(|| format!("Failed to fetch item category {}", category))?;

        Ok(response.items)
    }
}
