//! State owned by a single analysis run.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::AnalysisIssues;

use super::resolver::ItemNameResolver;

/// Everything a run mutates besides its day buckets.
///
/// Built fresh at the start of each run and dropped with it, so counters and
/// unresolved ids never leak between runs.
#[derive(Debug)]
pub struct AnalysisContext {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub resolver: ItemNameResolver,
    pub issues: AnalysisIssues,
}

impl AnalysisContext {
    pub fn new(resolver: ItemNameResolver) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            resolver,
            issues: AnalysisIssues::default(),
        }
    }

    /// Final diagnostics including the unresolved item count.
    pub fn issues(&self) -> AnalysisIssues {
        let mut issues = self.issues.clone();
        issues.unresolved_item_id_count =
            u32::try_from(self.resolver.unresolved_count()).unwrap_or(u32::MAX);
        issues
    }
}
