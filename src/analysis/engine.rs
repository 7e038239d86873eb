//! Synchronous reconciliation pipeline over a fully fetched log set.
//!
//! dedupe -> order by (timestamp, id) -> bucket by local day -> extract
//! amount -> classify -> record -> parse bazaar trades -> finalize days.

use chrono::{Local, TimeZone, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::models::{DailyProfit, LogEntry};

use super::amount::extract_amount;
use super::bazaar_parser::parse_bazaar_trade;
use super::classifier::{classify_detailed, is_bazaar_candidate, VerdictBasis};
use super::context::AnalysisContext;
use super::daily::{DailyAggregator, DayWindow, RecordOutcome};
use super::dedup::dedupe;

/// Runs the pipeline for one day window in one time zone.
pub struct AnalysisEngine<Tz: TimeZone> {
    tz: Tz,
    window: DayWindow,
}

impl AnalysisEngine<Local> {
    /// Window of `num_days` ending today in the machine's local time zone.
    pub fn local(num_days: u32) -> Self {
        Self::for_days(Local, num_days)
    }
}

impl<Tz: TimeZone> AnalysisEngine<Tz> {
    pub fn new(tz: Tz, window: DayWindow) -> Self {
        Self { tz, window }
    }

    pub fn for_days(tz: Tz, num_days: u32) -> Self {
        let today = Utc::now().with_timezone(&tz).date_naive();
        let window = DayWindow::ending_on(today, num_days);
        Self { tz, window }
    }

    pub fn window(&self) -> DayWindow {
        self.window
    }

    /// Epoch seconds of the window's first local midnight.
    pub fn window_start_timestamp(&self) -> Option<i64> {
        self.window.start_timestamp(&self.tz)
    }

    /// Aggregate `entries` into one record per day of the window.
    ///
    /// Output depends only on entry ids and timestamps, never on the order
    /// pages arrived in.
    pub fn run(&self, entries: Vec<LogEntry>, ctx: &mut AnalysisContext) -> Vec<DailyProfit> {
        let fetched = entries.len();
        let mut entries = dedupe(entries);
        entries.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));

        debug!(
            run_id = %ctx.run_id,
            fetched = fetched,
            unique = entries.len(),
            "Deduplicated log entries"
        );

        let mut aggregator = DailyAggregator::new(self.window);
        let mut counted = 0usize;
        let mut trades = 0usize;

        for entry in &entries {
            let Some(date) = DayWindow::local_date(&self.tz, entry.timestamp) else {
                continue;
            };
            if !aggregator.contains(date) {
                continue;
            }

            let amount = extract_amount(entry);
            if amount <= Decimal::ZERO {
                ctx.issues.missing_amount_extraction_count += 1;
                debug!(log_id = %entry.id, title = %entry.title(), "No amount field");
                continue;
            }

            let verdict = classify_detailed(entry);
            if verdict.basis == VerdictBasis::Default {
                ctx.issues.unknown_transaction_count += 1;
                debug!(log_id = %entry.id, title = %entry.title(), "Unrecognised transaction");
            }
            if verdict.contradicts(entry.color_hint()) {
                ctx.issues.incorrect_classification_count += 1;
            }

            match aggregator.record(date, entry, verdict.classification, amount) {
                RecordOutcome::GuardOverride => {
                    ctx.issues.incorrect_classification_count += 1;
                    counted += 1;
                }
                RecordOutcome::Skipped => {}
                _ => counted += 1,
            }

            if is_bazaar_candidate(entry) {
                if let Some(trade) = parse_bazaar_trade(entry, amount, &mut ctx.resolver) {
                    aggregator.add_trade(date, trade);
                    trades += 1;
                }
            }
        }

        info!(
            run_id = %ctx.run_id,
            entries = counted,
            bazaar_trades = trades,
            days = self.window.num_days(),
            "Aggregated log entries"
        );

        aggregator.finish()
    }
}
