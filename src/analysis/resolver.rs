//! Item id to display name resolution for one analysis run.

use std::collections::{BTreeSet, HashMap};

use crate::models::ItemCache;

/// Resolves item ids against a prefetched name mapping.
///
/// Misses never fail: they produce `Item #<id>` and are remembered for the
/// end-of-run diagnostics.
#[derive(Debug, Default)]
pub struct ItemNameResolver {
    names: HashMap<u64, String>,
    unresolved: BTreeSet<u64>,
}

impl ItemNameResolver {
    pub fn new(names: HashMap<u64, String>) -> Self {
        Self {
            names,
            unresolved: BTreeSet::new(),
        }
    }

    pub fn from_cache(cache: &ItemCache) -> Self {
        Self::new(cache.items.clone())
    }

    pub fn resolve(&mut self, item_id: u64) -> String {
        match self.names.get(&item_id) {
            Some(name) => name.clone(),
            None => {
                self.unresolved.insert(item_id);
                format!("Item #{}", item_id)
            }
        }
    }

    /// Ids that fell back to a placeholder, ascending.
    pub fn unresolved_ids(&self) -> Vec<u64> {
        self.unresolved.iter().copied().collect()
    }

    pub fn unresolved_count(&self) -> usize {
        self.unresolved.len()
    }

    pub fn known_items(&self) -> usize {
        self.names.len()
    }
}
