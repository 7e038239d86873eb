//! Torn API clients for money logs and the item catalog.

mod torn_client;
mod types;

pub use torn_client::TornClient;
pub use types::*;

use anyhow::Result;

/// Paginated money log access.
#[allow(async_fn_in_trait)]
pub trait LogSource {
    /// Fetch one page of `category` logs, newest first, bounded by the
    /// optional `from`/`to` epoch seconds.
    async fn fetch_log_page(
        &self,
        category: LogCategory,
        from: Option<i64>,
        to: Option<i64>,
        limit: u32,
    ) -> Result<LogPage>;
}

/// Item catalog access, used only to build the id to name cache.
#[allow(async_fn_in_trait)]
pub trait ItemCatalog {
    async fn fetch_items_by_category(&self, category: &str) -> Result<Vec<CatalogItem>>;
}
