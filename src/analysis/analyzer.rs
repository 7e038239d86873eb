//! Async orchestration of an analysis run: item cache, log fetch, engine.

use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::{Duration, TimeZone, Utc};
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::api::{ItemCatalog, LogCategory, LogSource, ITEM_CATEGORIES, MAX_PAGE_LIMIT};
use crate::config::AnalyzerConfig;
use crate::db::CacheStore;
use crate::models::{AnalysisReport, BazaarAnalytics, ItemCache, LogEntry};

use super::context::AnalysisContext;
use super::engine::AnalysisEngine;
use super::resolver::ItemNameResolver;

/// Cache key of the item id to name table.
pub const ITEM_CACHE_KEY: &str = "item_names";

/// Profit analyzer over a Torn API client and a cache store.
pub struct ProfitAnalyzer<C> {
    client: C,
    cache: CacheStore,
    config: AnalyzerConfig,
}

impl<C: LogSource + ItemCatalog> ProfitAnalyzer<C> {
    pub fn new(client: C, cache: CacheStore, config: AnalyzerConfig) -> Self {
        Self {
            client,
            cache,
            config,
        }
    }

    /// Return the cached item table, refetching it when absent, expired or `force`d.
    pub async fn load_item_cache(&self, force: bool) -> Result<ItemCache> {
        let now = Utc::now();

        if !force {
            if let Some(cached) = self.cache.get::<ItemCache>(ITEM_CACHE_KEY).await? {
                if !cached.is_expired(now) && !cached.is_empty() {
                    debug!(items = cached.len(), expires_at = %cached.expires_at, "Using cached item names");
                    return Ok(cached);
                }
            }
        }

        info!("Fetching item catalog");
        let items = fetch_item_catalog(&self.client, self.config.catalog_concurrency).await;
        let ttl = Duration::hours(self.config.item_cache_ttl_hours);
        let fresh = ItemCache::new(items, ttl, now);

        if fresh.is_empty() {
            // Nothing to persist; every id resolves to a placeholder this run
            warn!("Item catalog is empty, item names will not be resolved");
            return Ok(fresh);
        }

        self.cache
            .set(ITEM_CACHE_KEY, &fresh, ttl)
            .await
            .context("Failed to store item names")?;
        info!(items = fresh.len(), "Cached item names");

        Ok(fresh)
    }

    /// Analyze the last `days` local calendar days, today included.
    pub async fn analyze_profit_for_days(&self, days: u32) -> Result<AnalysisReport> {
        self.analyze_with(AnalysisEngine::local(days)).await
    }

    /// Run a full analysis over `engine`'s window.
    ///
    /// Each call builds its own [`AnalysisContext`]; nothing carries over
    /// from previous runs except the persisted item cache.
    pub async fn analyze_with<Tz: TimeZone>(&self, engine: AnalysisEngine<Tz>) -> Result<AnalysisReport> {
        let item_cache = self.load_item_cache(false).await?;
        let mut ctx = AnalysisContext::new(ItemNameResolver::from_cache(&item_cache));

        let window = engine.window();
        let from_ts = engine
            .window_start_timestamp()
            .context("Window start does not exist in the local time zone")?;

        info!(
            run_id = %ctx.run_id,
            start = %window.start,
            end = %window.end,
            known_items = ctx.resolver.known_items(),
            "Starting profit analysis"
        );

        let entries = fetch_all_logs(
            &self.client,
            from_ts,
            self.config.page_limit,
            self.config.max_pages_per_category,
        )
        .await;

        let days = engine.run(entries, &mut ctx);
        let range_bazaar = BazaarAnalytics::rollup(days.iter().map(|d| &d.bazaar_analytics));
        let issues = ctx.issues();
        let elapsed_ms = (Utc::now() - ctx.started_at).num_milliseconds();

        if issues.has_issues() {
            warn!(
                run_id = %ctx.run_id,
                elapsed_ms = elapsed_ms,
                unknown = issues.unknown_transaction_count,
                missing_amount = issues.missing_amount_extraction_count,
                incorrect = issues.incorrect_classification_count,
                unresolved_items = issues.unresolved_item_id_count,
                "Analysis finished with data quality issues"
            );
        } else {
            info!(run_id = %ctx.run_id, elapsed_ms = elapsed_ms, "Analysis finished cleanly");
        }
        let unresolved_item_ids = ctx.resolver.unresolved_ids();
        if !unresolved_item_ids.is_empty() {
            debug!(run_id = %ctx.run_id, ids = ?unresolved_item_ids, "Unresolved item ids");
        }

        Ok(AnalysisReport {
            run_id: ctx.run_id.to_string(),
            generated_at: Utc::now(),
            days,
            range_bazaar,
            issues,
            unresolved_item_ids,
        })
    }
}

/// Fetch every money log category back to `from_ts`.
///
/// Pages are walked newest to oldest. A failed page ends that category early
/// and keeps whatever was already collected.
pub async fn fetch_all_logs<S: LogSource>(
    source: &S,
    from_ts: i64,
    page_limit: u32,
    max_pages: u32,
) -> Vec<LogEntry> {
    // A full page is only as long as the API allows
    let page_limit = page_limit.clamp(1, MAX_PAGE_LIMIT);
    let mut all = Vec::new();

    for category in LogCategory::ALL {
        let mut to: Option<i64> = None;
        let mut fetched = 0usize;

        for page_no in 0..max_pages {
            let page = match source
                .fetch_log_page(category, Some(from_ts), to, page_limit)
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    warn!(
                        category = category.as_str(),
                        page = page_no,
                        error = %e,
                        "Log page fetch failed, keeping partial data"
                    );
                    break;
                }
            };

            if page.entries.is_empty() {
                break;
            }

            let oldest = page.entries.iter().map(|e| e.timestamp).min();
            let last_page = !page.has_more || (page.entries.len() as u32) < page_limit;
            fetched += page.entries.len();
            all.extend(page.entries);

            match oldest {
                Some(ts) if !last_page && ts > from_ts => to = Some(ts - 1),
                _ => break,
            }

            if page_no + 1 == max_pages {
                warn!(category = category.as_str(), max_pages, "Page cap reached");
            }
        }

        debug!(category = category.as_str(), entries = fetched, "Fetched log category");
    }

    all
}

/// Build the item id to name table from every catalog category.
///
/// Categories are fetched `concurrency` at a time. A failed category is
/// skipped.
pub async fn fetch_item_catalog<C: ItemCatalog>(catalog: &C, concurrency: usize) -> HashMap<u64, String> {
    let results: Vec<_> = stream::iter(ITEM_CATEGORIES)
        .map(|category| async move { (category, catalog.fetch_items_by_category(category).await) })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let mut names = HashMap::new();
    for (category, result) in results {
        match result {
            Ok(items) => {
                for item in items {
                    names.insert(item.id, item.name);
                }
            }
            Err(e) => warn!(category = category, error = %e, "Skipping item category"),
        }
    }

    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::daily::DayWindow;
    use crate::api::{CatalogItem, LogPage};
    use chrono::{FixedOffset, NaiveDate};
    use rust_decimal_macros::dec;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TODAY_NOON: i64 = 1_710_072_000; // 2024-03-10 12:00:00 UTC

    struct FakeTorn {
        logs: Vec<(LogCategory, LogEntry)>,
        broken_category: Option<LogCategory>,
        catalog_calls: AtomicUsize,
    }

    impl FakeTorn {
        fn new(logs: Vec<(LogCategory, LogEntry)>) -> Self {
            Self {
                logs,
                broken_category: None,
                catalog_calls: AtomicUsize::new(0),
            }
        }
    }

    impl LogSource for FakeTorn {
        async fn fetch_log_page(
            &self,
            category: LogCategory,
            from: Option<i64>,
            to: Option<i64>,
            limit: u32,
        ) -> Result<LogPage> {
            if self.broken_category == Some(category) {
                anyhow::bail!("Torn API error 17: Backend error");
            }

            let mut entries: Vec<LogEntry> = self
                .logs
                .iter()
                .filter(|(c, e)| {
                    *c == category
                        && from.map_or(true, |f| e.timestamp >= f)
                        && to.map_or(true, |t| e.timestamp <= t)
                })
                .map(|(_, e)| e.clone())
                .collect();
            let limit = limit.min(MAX_PAGE_LIMIT);
            entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
            entries.truncate(limit as usize);

            let has_more = entries.len() as u32 >= limit;
            Ok(LogPage { entries, has_more })
        }
    }

    impl ItemCatalog for FakeTorn {
        async fn fetch_items_by_category(&self, category: &str) -> Result<Vec<CatalogItem>> {
            self.catalog_calls.fetch_add(1, Ordering::SeqCst);
            match category {
                "Drug" => Ok(vec![CatalogItem {
                    id: 206,
                    name: "Xanax".to_string(),
                }]),
                "Virus" => anyhow::bail!("Torn API error 5: Too many requests"),
                _ => Ok(Vec::new()),
            }
        }
    }

    fn entry(id: &str, ts: i64, title: &str, category: &str, data: Value) -> LogEntry {
        serde_json::from_value(json!({
            "id": id,
            "timestamp": ts,
            "details": { "title": title, "category": category },
            "data": data
        }))
        .unwrap()
    }

    fn bet(id: &str, ts: i64) -> LogEntry {
        entry(id, ts, "Lottery bet", "Casino", json!({ "cost": 10 }))
    }

    async fn analyzer(fake: FakeTorn) -> ProfitAnalyzer<FakeTorn> {
        let cache = CacheStore::in_memory().await.unwrap();
        ProfitAnalyzer::new(fake, cache, AnalyzerConfig::default())
    }

    #[test]
    fn test_fetch_all_logs_walks_pages_backward() {
        let logs = (0..5)
            .map(|i| (LogCategory::General, bet(&format!("g{}", i), TODAY_NOON - i * 60)))
            .collect();
        let fake = FakeTorn::new(logs);

        let entries = tokio_test::block_on(fetch_all_logs(&fake, TODAY_NOON - 3600, 2, 10));

        let mut ids: Vec<&str> = entries.iter().map(|e| e.id.as_str()).collect();
        ids.sort();
        assert_eq!(ids, vec!["g0", "g1", "g2", "g3", "g4"]);
    }

    #[test]
    fn test_fetch_all_logs_pages_past_the_api_limit() {
        let logs = (0..150)
            .map(|i| (LogCategory::General, bet(&format!("g{}", i), TODAY_NOON - i * 10)))
            .collect();
        let fake = FakeTorn::new(logs);

        // Pages come back at 100 entries however many were asked for
        let entries = tokio_test::block_on(fetch_all_logs(&fake, 0, 250, 10));

        assert_eq!(entries.len(), 150);
    }

    #[test]
    fn test_fetch_all_logs_respects_page_cap_and_failures() {
        let mut logs: Vec<(LogCategory, LogEntry)> = (0..6)
            .map(|i| (LogCategory::Incoming, bet(&format!("i{}", i), TODAY_NOON - i * 60)))
            .collect();
        logs.push((LogCategory::Outgoing, bet("o1", TODAY_NOON)));

        let mut fake = FakeTorn::new(logs);
        fake.broken_category = Some(LogCategory::Outgoing);

        let entries = tokio_test::block_on(fetch_all_logs(&fake, 0, 2, 2));

        // Two pages of two from incoming; outgoing failed and contributes nothing
        assert_eq!(entries.len(), 4);
        assert!(entries.iter().all(|e| e.id.starts_with('i')));
    }

    #[test]
    fn test_item_cache_is_reused_until_forced() {
        tokio_test::block_on(async {
            let analyzer = analyzer(FakeTorn::new(Vec::new())).await;
            let calls = || analyzer.client.catalog_calls.load(Ordering::SeqCst);

            let first = analyzer.load_item_cache(false).await.unwrap();
            assert_eq!(first.name(206), Some("Xanax"));
            assert_eq!(calls(), ITEM_CATEGORIES.len());

            let second = analyzer.load_item_cache(false).await.unwrap();
            assert_eq!(second, first);
            assert_eq!(calls(), ITEM_CATEGORIES.len());

            analyzer.load_item_cache(true).await.unwrap();
            assert_eq!(calls(), 2 * ITEM_CATEGORIES.len());
        });
    }

    #[test]
    fn test_expired_item_cache_is_refetched() {
        tokio_test::block_on(async {
            let analyzer = analyzer(FakeTorn::new(Vec::new())).await;

            // Still readable from the store, but past its own expiry
            let stale = ItemCache::new(
                HashMap::from([(1u64, "Hammer".to_string())]),
                Duration::hours(-1),
                Utc::now(),
            );
            analyzer
                .cache
                .set(ITEM_CACHE_KEY, &stale, Duration::hours(24))
                .await
                .unwrap();

            let loaded = analyzer.load_item_cache(false).await.unwrap();

            assert_eq!(analyzer.client.catalog_calls.load(Ordering::SeqCst), ITEM_CATEGORIES.len());
            assert_eq!(loaded.name(206), Some("Xanax"));
            assert_eq!(loaded.name(1), None);
            assert!(!loaded.is_expired(Utc::now()));
        });
    }

    #[test]
    fn test_analysis_counts_cross_category_duplicates_once() {
        let sale = entry(
            "s1",
            TODAY_NOON,
            "Bazaar sell",
            "Bazaars",
            json!({ "items": [{ "id": 206, "qty": 2 }], "buyer": 7, "cost_total": 1600 }),
        );
        let logs = vec![
            (LogCategory::General, sale.clone()),
            (LogCategory::Incoming, sale),
            (LogCategory::Outgoing, bet("b1", TODAY_NOON + 30)),
            (LogCategory::General, bet("old", TODAY_NOON - 3 * 86_400)),
        ];
        let tz = FixedOffset::east_opt(0).unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let engine = AnalysisEngine::new(tz, DayWindow::ending_on(today, 2));

        let report = tokio_test::block_on(async {
            analyzer(FakeTorn::new(logs)).await.analyze_with(engine).await
        })
        .unwrap();

        assert_eq!(report.days.len(), 2);
        assert_eq!(report.total_income(), dec!(1600));
        assert_eq!(report.total_expenses(), dec!(10));
        assert_eq!(report.net_profit(), dec!(1590));
        assert_eq!(report.range_bazaar.total_trades, 1);
        assert_eq!(report.range_bazaar.items[0].item_name, "Xanax");
        assert_eq!(report.range_bazaar.items[0].avg_sell_price, dec!(800));
        assert!(report.unresolved_item_ids.is_empty());
        assert!(!report.issues.has_issues());
    }
}
