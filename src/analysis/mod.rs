//! Money log reconciliation: classification, bazaar parsing and daily aggregation.

mod amount;
mod analyzer;
mod bazaar_analytics;
mod bazaar_parser;
mod classifier;
mod context;
mod daily;
mod dedup;
mod engine;
mod resolver;

pub use analyzer::{ProfitAnalyzer, ITEM_CACHE_KEY};
