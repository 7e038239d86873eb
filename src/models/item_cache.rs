//! Cached item id to name mapping with an expiry.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot of the item catalog names.
///
/// Once `expires_at` has passed the mapping must be treated as absent and
/// refetched before any id is resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemCache {
    pub items: HashMap<u64, String>,
    pub last_updated: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl ItemCache {
    pub fn new(items: HashMap<u64, String>, ttl: Duration, now: DateTime<Utc>) -> Self {
        Self {
            items,
            last_updated: now,
            expires_at: now + ttl,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn name(&self, id: u64) -> Option<&str> {
        self.items.get(&id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
