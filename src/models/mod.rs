//! Data models for money log entries, bazaar trades, analytics and daily results.

mod analytics;
mod bazaar;
mod item_cache;
mod log_entry;
mod profit;

pub use analytics::{BazaarAnalytics, ItemAnalytics, TradingPartnerAnalytics};
pub use bazaar::BazaarTrade;
pub use item_cache::ItemCache;
pub use log_entry::{ColorHint, LogEntry};
pub use profit::{
    AnalysisHealth, AnalysisIssues, AnalysisReport, Classification, DailyProfit,
    TransactionSummary,
};
