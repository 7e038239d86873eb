//! Bazaar trade model: a player-to-player marketplace transaction.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Structured facts extracted from a bazaar log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BazaarTrade {
    /// Log entry the trade was parsed from
    pub log_id: String,

    /// Resolved item name, or `Item #<id>` when the id is unknown
    pub item_name: String,

    /// Catalog id when the entry carried one
    pub item_id: Option<u64>,

    /// Units traded (always at least 1)
    pub quantity: u32,

    /// Price per unit
    pub unit_price: Decimal,

    /// Total money that changed hands
    pub total_amount: Decimal,

    /// Counterparty display name, or `Player [<id>]`
    pub trading_partner: String,

    pub player_id: Option<String>,

    /// True when we sold to the counterparty, false when we bought from them
    pub is_sale: bool,

    pub timestamp: DateTime<Utc>,

    /// Log title kept for audit
    pub original_title: String,
}
