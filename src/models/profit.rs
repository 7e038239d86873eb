//! Daily profit records, per-title summaries and run diagnostics.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::analytics::{saturating_sum, BazaarAnalytics};
use super::bazaar::BazaarTrade;

/// How a log entry affects profit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Income,
    Expense,
    /// Internal moves (piggy bank, bank, trade escrow). Recorded, never totalled.
    Neutral,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Income => "income",
            Classification::Expense => "expense",
            Classification::Neutral => "neutral",
        }
    }
}

/// Accumulated amount for one (title, classification) pair within a day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionSummary {
    pub kind: Classification,
    pub category: String,
    pub title: String,
    pub amount: Decimal,
    pub count: u32,
    pub is_income: bool,
    pub is_neutral: bool,
}

impl TransactionSummary {
    pub fn new(kind: Classification, category: &str, title: &str) -> Self {
        Self {
            kind,
            category: category.to_string(),
            title: title.to_string(),
            amount: Decimal::ZERO,
            count: 0,
            is_income: kind == Classification::Income,
            is_neutral: kind == Classification::Neutral,
        }
    }
}

/// Profit for one local calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyProfit {
    /// Local calendar day (YYYY-MM-DD)
    pub date: NaiveDate,
    pub income: Decimal,
    pub expenses: Decimal,
    pub net_profit: Decimal,

    /// Sorted by accumulated amount, highest first
    pub transactions: Vec<TransactionSummary>,

    pub bazaar_analytics: BazaarAnalytics,

    /// Parsed trades behind `bazaar_analytics`
    pub bazaar_trades: Vec<BazaarTrade>,
}

/// Data-quality counters collected during one analysis run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisIssues {
    /// Entries only the default fallback could classify
    pub unknown_transaction_count: u32,

    /// In-window entries without a recognised positive amount
    pub missing_amount_extraction_count: u32,

    /// Classifier verdicts overridden by the piggy bank guard or contradicted by color
    pub incorrect_classification_count: u32,

    /// Distinct item ids that fell back to a placeholder name
    pub unresolved_item_id_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisHealth {
    Healthy,
    Degraded,
}

impl AnalysisIssues {
    pub fn total(&self) -> u32 {
        self.unknown_transaction_count
            + self.missing_amount_extraction_count
            + self.incorrect_classification_count
            + self.unresolved_item_id_count
    }

    pub fn has_issues(&self) -> bool {
        self.total() > 0
    }

    pub fn health(&self) -> AnalysisHealth {
        if self.has_issues() {
            AnalysisHealth::Degraded
        } else {
            AnalysisHealth::Healthy
        }
    }
}

/// Output of a full analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub run_id: String,
    pub generated_at: DateTime<Utc>,

    /// Oldest day first
    pub days: Vec<DailyProfit>,

    /// Bazaar analytics merged over every day in `days`
    pub range_bazaar: BazaarAnalytics,

    pub issues: AnalysisIssues,

    /// Item ids that could not be resolved, for diagnostics
    pub unresolved_item_ids: Vec<u64>,
}

impl AnalysisReport {
    pub fn total_income(&self) -> Decimal {
        saturating_sum(self.days.iter().map(|d| d.income))
    }

    pub fn total_expenses(&self) -> Decimal {
        saturating_sum(self.days.iter().map(|d| d.expenses))
    }

    pub fn net_profit(&self) -> Decimal {
        self.total_income().saturating_sub(self.total_expenses())
    }
}
