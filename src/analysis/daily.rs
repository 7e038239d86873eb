//! Calendar-day bucketing of classified log entries.

use std::collections::{BTreeMap, HashMap};

use chrono::{Duration, NaiveDate, TimeZone};
use rust_decimal::Decimal;

use crate::models::{BazaarTrade, Classification, DailyProfit, LogEntry, TransactionSummary};

use super::bazaar_analytics::BazaarAnalyticsCalculator;

/// Inclusive range of local calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DayWindow {
    /// `num_days` days ending on (and including) `today`. At least one day.
    pub fn ending_on(today: NaiveDate, num_days: u32) -> Self {
        let span = i64::from(num_days.max(1)) - 1;
        Self {
            start: today - Duration::days(span),
            end: today,
        }
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start.iter_days().take_while(move |d| *d <= self.end)
    }

    pub fn num_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Epoch seconds of local midnight on the first day.
    pub fn start_timestamp<Tz: TimeZone>(&self, tz: &Tz) -> Option<i64> {
        let midnight = self.start.and_hms_opt(0, 0, 0)?;
        tz.from_local_datetime(&midnight)
            .earliest()
            .map(|dt| dt.timestamp())
    }

    /// Local calendar day of an epoch timestamp.
    pub fn local_date<Tz: TimeZone>(tz: &Tz, timestamp: i64) -> Option<NaiveDate> {
        tz.timestamp_opt(timestamp, 0)
            .single()
            .map(|dt| dt.date_naive())
    }
}

/// What happened to an entry handed to [`DailyAggregator::record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Added to income or expenses
    Counted,
    /// Kept for display only
    Neutral,
    /// Looked like a piggy bank deposit although the classifier said otherwise
    GuardOverride,
    /// Date not in the window or amount not positive
    Skipped,
}

#[derive(Debug, Default)]
struct DayBucket {
    income: Decimal,
    expenses: Decimal,
    summaries: HashMap<(String, Classification), TransactionSummary>,
    trades: Vec<BazaarTrade>,
}

/// Mutable per-run accumulator: one bucket per day in the window.
pub struct DailyAggregator {
    buckets: BTreeMap<NaiveDate, DayBucket>,
}

impl DailyAggregator {
    pub fn new(window: DayWindow) -> Self {
        let buckets = window.dates().map(|d| (d, DayBucket::default())).collect();
        Self { buckets }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.buckets.contains_key(&date)
    }

    /// Add one classified entry to its day.
    pub fn record(
        &mut self,
        date: NaiveDate,
        entry: &LogEntry,
        classification: Classification,
        amount: Decimal,
    ) -> RecordOutcome {
        if amount <= Decimal::ZERO {
            return RecordOutcome::Skipped;
        }
        let Some(bucket) = self.buckets.get_mut(&date) else {
            return RecordOutcome::Skipped;
        };

        // Piggy bank deposits never count, whatever the classifier said
        let guarded = entry.title().to_lowercase().contains("piggy bank deposit");
        let kind = if guarded {
            Classification::Neutral
        } else {
            classification
        };

        // Totals saturate at the Decimal bounds instead of overflowing
        match kind {
            Classification::Income => bucket.income = bucket.income.saturating_add(amount),
            Classification::Expense => bucket.expenses = bucket.expenses.saturating_add(amount),
            Classification::Neutral => {}
        }

        let summary = bucket
            .summaries
            .entry((entry.title().to_string(), kind))
            .or_insert_with(|| TransactionSummary::new(kind, entry.category(), entry.title()));
        summary.amount = summary.amount.saturating_add(amount);
        summary.count += 1;

        match kind {
            Classification::Neutral if guarded && classification != Classification::Neutral => {
                RecordOutcome::GuardOverride
            }
            Classification::Neutral => RecordOutcome::Neutral,
            _ => RecordOutcome::Counted,
        }
    }

    /// Attach a parsed bazaar trade to its day.
    pub fn add_trade(&mut self, date: NaiveDate, trade: BazaarTrade) -> bool {
        match self.buckets.get_mut(&date) {
            Some(bucket) => {
                bucket.trades.push(trade);
                true
            }
            None => false,
        }
    }

    /// Finalize every bucket, oldest day first.
    pub fn finish(self) -> Vec<DailyProfit> {
        self.buckets
            .into_iter()
            .map(|(date, bucket)| {
                let mut transactions: Vec<TransactionSummary> =
                    bucket.summaries.into_values().collect();
                transactions.sort_by(|a, b| {
                    b.amount
                        .cmp(&a.amount)
                        .then_with(|| a.title.cmp(&b.title))
                        .then_with(|| a.kind.cmp(&b.kind))
                });

                DailyProfit {
                    date,
                    income: bucket.income,
                    expenses: bucket.expenses,
                    net_profit: bucket.income.saturating_sub(bucket.expenses),
                    transactions,
                    bazaar_analytics: BazaarAnalyticsCalculator::calculate(&bucket.trades),
                    bazaar_trades: bucket.trades,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn entry(title: &str) -> LogEntry {
        serde_json::from_value(json!({
            "id": "1",
            "timestamp": 0,
            "details": { "title": title, "category": "Money" }
        }))
        .unwrap()
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_window_bounds() {
        let window = DayWindow::ending_on(day(2024, 3, 10), 3);
        assert_eq!(window.start, day(2024, 3, 8));
        assert_eq!(window.num_days(), 3);
        assert_eq!(window.dates().count(), 3);
        assert_eq!(window.dates().last(), Some(day(2024, 3, 10)));

        let single = DayWindow::ending_on(day(2024, 3, 10), 0);
        assert_eq!(single.num_days(), 1);
    }

    #[test]
    fn test_day_start_belongs_to_that_day() {
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let window = DayWindow::ending_on(day(2024, 3, 10), 2);
        let midnight = window.start_timestamp(&tz).unwrap();

        assert_eq!(DayWindow::local_date(&tz, midnight), Some(day(2024, 3, 9)));
        assert_eq!(DayWindow::local_date(&tz, midnight - 1), Some(day(2024, 3, 8)));
        assert_eq!(DayWindow::local_date(&Utc, midnight), Some(day(2024, 3, 8)));
    }

    #[test]
    fn test_record_totals_and_summaries() {
        let date = day(2024, 3, 10);
        let mut agg = DailyAggregator::new(DayWindow::ending_on(date, 1));

        assert_eq!(
            agg.record(date, &entry("Bazaar sell"), Classification::Income, dec!(300)),
            RecordOutcome::Counted
        );
        agg.record(date, &entry("Bazaar sell"), Classification::Income, dec!(200));
        agg.record(date, &entry("Lottery bet"), Classification::Expense, dec!(1000));
        assert_eq!(
            agg.record(date, &entry("Bank deposit"), Classification::Neutral, dec!(50)),
            RecordOutcome::Neutral
        );
        assert_eq!(
            agg.record(date, &entry("Lottery bet"), Classification::Expense, Decimal::ZERO),
            RecordOutcome::Skipped
        );
        assert_eq!(
            agg.record(day(2024, 3, 9), &entry("Lottery bet"), Classification::Expense, dec!(5)),
            RecordOutcome::Skipped
        );

        let days = agg.finish();
        assert_eq!(days.len(), 1);
        let d = &days[0];
        assert_eq!(d.income, dec!(500));
        assert_eq!(d.expenses, dec!(1000));
        assert_eq!(d.net_profit, dec!(-500));
        assert_eq!(d.transactions.len(), 3);
        assert_eq!(d.transactions[0].title, "Lottery bet");
        assert_eq!(d.transactions[1].title, "Bazaar sell");
        assert_eq!(d.transactions[1].count, 2);
        assert!(d.transactions[2].is_neutral);
        assert!(d.bazaar_analytics.is_empty());
    }

    #[test]
    fn test_piggy_bank_guard() {
        let date = day(2024, 3, 10);
        let mut agg = DailyAggregator::new(DayWindow::ending_on(date, 1));

        let outcome = agg.record(
            date,
            &entry("Piggy bank deposit"),
            Classification::Income,
            dec!(2000),
        );
        assert_eq!(outcome, RecordOutcome::GuardOverride);

        let days = agg.finish();
        assert_eq!(days[0].income, Decimal::ZERO);
        assert!(days[0].transactions[0].is_neutral);
        assert_eq!(days[0].transactions[0].amount, dec!(2000));
    }
}
