//! API response types for the Torn v2 endpoints.

use serde::Deserialize;

use crate::models::LogEntry;

/// Money log categories queried for an analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogCategory {
    General,
    Outgoing,
    Incoming,
}

impl LogCategory {
    pub const ALL: [LogCategory; 3] = [
        LogCategory::General,
        LogCategory::Outgoing,
        LogCategory::Incoming,
    ];

    /// Numeric category id expected by the log endpoint.
    pub fn id(&self) -> u32 {
        match self {
            LogCategory::General => 17,
            LogCategory::Outgoing => 14,
            LogCategory::Incoming => 15,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogCategory::General => "general",
            LogCategory::Outgoing => "outgoing",
            LogCategory::Incoming => "incoming",
        }
    }
}

/// Item categories enumerated when building the name cache.
pub const ITEM_CATEGORIES: [&str; 28] = [
    "Alcohol",
    "Armor",
    "Artifact",
    "Book",
    "Booster",
    "Candy",
    "Car",
    "Clothing",
    "Collectible",
    "Defensive",
    "Drug",
    "Energy Drink",
    "Enhancer",
    "Flower",
    "Jewelry",
    "Material",
    "Medical",
    "Melee",
    "Other",
    "Plushie",
    "Primary",
    "Secondary",
    "Special",
    "Supply Pack",
    "Temporary",
    "Tool",
    "Unused",
    "Virus",
];

/// Most entries /user/log returns per request.
pub const MAX_PAGE_LIMIT: u32 = 100;

/// One page of money logs.
#[derive(Debug, Clone, Default)]
pub struct LogPage {
    pub entries: Vec<LogEntry>,
    /// Whether an older page may exist
    pub has_more: bool,
}

/// Response from /user/log.
#[derive(Debug, Clone, Deserialize)]
pub struct LogResponse {
    #[serde(default)]
    pub log: Vec<LogEntry>,
}

/// Item from /torn/items.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogItem {
    pub id: u64,
    pub name: String,
}

/// Response from /torn/items.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemsResponse {
    #[serde(default)]
    pub items: Vec<CatalogItem>,
}

/// Error payload returned with HTTP 200 by the API.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub code: i64,
    pub error: String,
}

impl ApiErrorBody {
    /// Rate limit exceeded
    pub const TOO_MANY_REQUESTS: i64 = 5;
    /// Temporary backend failure
    pub const BACKEND_ERROR: i64 = 17;

    pub fn is_transient(&self) -> bool {
        matches!(self.code, Self::TOO_MANY_REQUESTS | Self::BACKEND_ERROR)
    }
}
