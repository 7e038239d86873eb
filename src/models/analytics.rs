//! Bazaar analytics rollups per traded item and per trading partner.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::bazaar::BazaarTrade;

/// Placeholder shown when there is nothing to report.
pub const NOT_AVAILABLE: &str = "N/A";

/// Buy/sell totals for one item.
///
/// Averages and the margin are always derived from the totals, so merging two
/// partials never averages averages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemAnalytics {
    pub item_name: String,

    /// Money spent buying this item
    pub total_bought: Decimal,

    /// Money received selling this item
    pub total_sold: Decimal,

    pub quantity_bought: u64,
    pub quantity_sold: u64,

    /// Quantity-weighted average purchase price
    pub avg_buy_price: Decimal,

    /// Quantity-weighted average sale price
    pub avg_sell_price: Decimal,

    /// (avg sell - avg buy) / avg buy * 100, or 0 without purchases
    pub profit_margin: f64,

    /// total sold - total bought
    pub net_profit: Decimal,

    pub transaction_count: u32,

    pub last_activity: Option<DateTime<Utc>>,
}

impl ItemAnalytics {
    pub fn new(item_name: String) -> Self {
        Self {
            item_name,
            total_bought: Decimal::ZERO,
            total_sold: Decimal::ZERO,
            quantity_bought: 0,
            quantity_sold: 0,
            avg_buy_price: Decimal::ZERO,
            avg_sell_price: Decimal::ZERO,
            profit_margin: 0.0,
            net_profit: Decimal::ZERO,
            transaction_count: 0,
            last_activity: None,
        }
    }

    /// Fold one trade into the totals.
    pub fn record(&mut self, trade: &BazaarTrade) {
        if trade.is_sale {
            self.total_sold = self.total_sold.saturating_add(trade.total_amount);
            self.quantity_sold += u64::from(trade.quantity);
        } else {
            self.total_bought = self.total_bought.saturating_add(trade.total_amount);
            self.quantity_bought += u64::from(trade.quantity);
        }
        self.transaction_count += 1;
        self.last_activity = latest(self.last_activity, Some(trade.timestamp));
        self.recompute();
    }

    /// Combine another partial for the same item.
    pub fn merge(&mut self, other: &ItemAnalytics) {
        self.total_bought = self.total_bought.saturating_add(other.total_bought);
        self.total_sold = self.total_sold.saturating_add(other.total_sold);
        self.quantity_bought += other.quantity_bought;
        self.quantity_sold += other.quantity_sold;
        self.transaction_count += other.transaction_count;
        self.last_activity = latest(self.last_activity, other.last_activity);
        self.recompute();
    }

    fn recompute(&mut self) {
        self.avg_buy_price = average(self.total_bought, self.quantity_bought);
        self.avg_sell_price = average(self.total_sold, self.quantity_sold);
        self.net_profit = self.total_sold.saturating_sub(self.total_bought);
        self.profit_margin = self
            .avg_sell_price
            .checked_sub(self.avg_buy_price)
            .and_then(|spread| spread.checked_div(self.avg_buy_price))
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
            .and_then(|margin| margin.to_f64())
            .unwrap_or(0.0);
    }
}

/// Activity with one counterparty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingPartnerAnalytics {
    /// Display name (or `Player [<id>]`)
    pub partner: String,

    pub player_id: Option<String>,

    pub transaction_count: u32,

    /// Sum of trade amounts in both directions
    pub total_volume: Decimal,

    /// Item traded most often with this partner, first seen wins ties
    pub most_traded_item: String,

    pub last_transaction: Option<DateTime<Utc>>,

    // Occurrences per item in first-seen order
    #[serde(skip)]
    item_counts: Vec<(String, u32)>,
}

impl TradingPartnerAnalytics {
    pub fn new(partner: String, player_id: Option<String>) -> Self {
        Self {
            partner,
            player_id,
            transaction_count: 0,
            total_volume: Decimal::ZERO,
            most_traded_item: NOT_AVAILABLE.to_string(),
            last_transaction: None,
            item_counts: Vec::new(),
        }
    }

    pub fn record(&mut self, trade: &BazaarTrade) {
        self.transaction_count += 1;
        self.total_volume = self.total_volume.saturating_add(trade.total_amount);
        self.last_transaction = latest(self.last_transaction, Some(trade.timestamp));
        if self.player_id.is_none() {
            self.player_id = trade.player_id.clone();
        }
        self.bump_item(&trade.item_name, 1);
        self.refresh_most_traded();
    }

    pub fn merge(&mut self, other: &TradingPartnerAnalytics) {
        self.transaction_count += other.transaction_count;
        self.total_volume = self.total_volume.saturating_add(other.total_volume);
        self.last_transaction = latest(self.last_transaction, other.last_transaction);
        if self.player_id.is_none() {
            self.player_id = other.player_id.clone();
        }

        if other.item_counts.is_empty() {
            // Deserialized partials only carry the winner
            if other.most_traded_item != NOT_AVAILABLE {
                self.bump_item(&other.most_traded_item, other.transaction_count);
            }
        } else {
            for (item, count) in &other.item_counts {
                self.bump_item(item, *count);
            }
        }
        self.refresh_most_traded();
    }

    fn bump_item(&mut self, item: &str, by: u32) {
        match self.item_counts.iter_mut().find(|(name, _)| name == item) {
            Some((_, count)) => *count += by,
            None => self.item_counts.push((item.to_string(), by)),
        }
    }

    fn refresh_most_traded(&mut self) {
        let mut best: Option<&(String, u32)> = None;
        for entry in &self.item_counts {
            if best.map_or(true, |b| entry.1 > b.1) {
                best = Some(entry);
            }
        }
        self.most_traded_item = best
            .map(|(name, _)| name.clone())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string());
    }
}

/// Bazaar activity for one day bucket (or a merged range).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BazaarAnalytics {
    /// Sorted by net profit, highest first
    pub items: Vec<ItemAnalytics>,

    /// Sorted by total volume, highest first
    pub partners: Vec<TradingPartnerAnalytics>,

    pub total_trades: u32,
    pub total_bought: Decimal,
    pub total_sold: Decimal,
    pub net_profit: Decimal,

    /// Most profitable item or `N/A`
    pub top_item: String,

    /// Highest volume partner or `N/A`
    pub top_partner: String,
}

impl BazaarAnalytics {
    /// Zeroed record used when there were no trades.
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            partners: Vec::new(),
            total_trades: 0,
            total_bought: Decimal::ZERO,
            total_sold: Decimal::ZERO,
            net_profit: Decimal::ZERO,
            top_item: NOT_AVAILABLE.to_string(),
            top_partner: NOT_AVAILABLE.to_string(),
        }
    }

    /// Build the sorted record from grouped partials.
    pub fn from_groups(
        mut items: Vec<ItemAnalytics>,
        mut partners: Vec<TradingPartnerAnalytics>,
    ) -> Self {
        if items.is_empty() && partners.is_empty() {
            return Self::empty();
        }

        items.sort_by(|a, b| {
            b.net_profit
                .cmp(&a.net_profit)
                .then_with(|| a.item_name.cmp(&b.item_name))
        });
        partners.sort_by(|a, b| {
            b.total_volume
                .cmp(&a.total_volume)
                .then_with(|| a.partner.cmp(&b.partner))
        });

        let total_trades = items.iter().map(|i| i.transaction_count).sum();
        let total_bought = saturating_sum(items.iter().map(|i| i.total_bought));
        let total_sold = saturating_sum(items.iter().map(|i| i.total_sold));

        let top_item = items
            .first()
            .map(|i| i.item_name.clone())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string());
        let top_partner = partners
            .first()
            .map(|p| p.partner.clone())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string());

        Self {
            items,
            partners,
            total_trades,
            total_bought,
            total_sold,
            net_profit: total_sold.saturating_sub(total_bought),
            top_item,
            top_partner,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total_trades == 0
    }

    /// Merge several buckets (typically every day of a range) into one view.
    pub fn rollup<'a>(buckets: impl IntoIterator<Item = &'a BazaarAnalytics>) -> Self {
        let mut items: Vec<ItemAnalytics> = Vec::new();
        let mut partners: Vec<TradingPartnerAnalytics> = Vec::new();

        for bucket in buckets {
            for item in &bucket.items {
                match items.iter_mut().find(|i| i.item_name == item.item_name) {
                    Some(existing) => existing.merge(item),
                    None => items.push(item.clone()),
                }
            }
            for partner in &bucket.partners {
                match partners.iter_mut().find(|p| p.partner == partner.partner) {
                    Some(existing) => existing.merge(partner),
                    None => partners.push(partner.clone()),
                }
            }
        }

        Self::from_groups(items, partners)
    }
}

impl Default for BazaarAnalytics {
    fn default() -> Self {
        Self::empty()
    }
}

fn average(total: Decimal, quantity: u64) -> Decimal {
    if quantity == 0 {
        Decimal::ZERO
    } else {
        total / Decimal::from(quantity)
    }
}

/// Sum that clamps at the Decimal bounds.
pub fn saturating_sum(values: impl IntoIterator<Item = Decimal>) -> Decimal {
    values
        .into_iter()
        .fold(Decimal::ZERO, |acc, v| acc.saturating_add(v))
}

fn latest(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.max(y)),
        (x, None) => x,
        (None, y) => y,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn trade(item: &str, partner: &str, qty: u32, total: Decimal, is_sale: bool, ts: i64) -> BazaarTrade {
        BazaarTrade {
            log_id: format!("{}-{}", item, ts),
            item_name: item.to_string(),
            item_id: None,
            quantity: qty,
            unit_price: total / Decimal::from(qty),
            total_amount: total,
            trading_partner: partner.to_string(),
            player_id: None,
            is_sale,
            timestamp: Utc.timestamp_opt(ts, 0).unwrap(),
            original_title: String::new(),
        }
    }

    #[test]
    fn test_merge_recomputes_margin_from_totals() {
        // 1 unit bought at 100, sold at 200 -> margin 100%
        let mut a = ItemAnalytics::new("Xanax".to_string());
        a.record(&trade("Xanax", "Bob", 1, dec!(100), false, 10));
        a.record(&trade("Xanax", "Bob", 1, dec!(200), true, 20));
        assert!((a.profit_margin - 100.0).abs() < 1e-9);

        // 9 units bought at 100, sold at 110 -> margin 10%
        let mut b = ItemAnalytics::new("Xanax".to_string());
        b.record(&trade("Xanax", "Amy", 9, dec!(900), false, 30));
        b.record(&trade("Xanax", "Amy", 9, dec!(990), true, 40));
        assert!((b.profit_margin - 10.0).abs() < 1e-9);

        a.merge(&b);

        // Combined: avg buy 100, avg sell 1190/10 = 119 -> 19%, not (100+10)/2
        assert_eq!(a.avg_buy_price, dec!(100));
        assert_eq!(a.avg_sell_price, dec!(119));
        assert!((a.profit_margin - 19.0).abs() < 1e-9);
        assert_eq!(a.net_profit, dec!(190));
        assert_eq!(a.transaction_count, 4);
        assert_eq!(a.last_activity, Some(Utc.timestamp_opt(40, 0).unwrap()));
    }

    #[test]
    fn test_margin_zero_without_purchases() {
        let mut a = ItemAnalytics::new("Xanax".to_string());
        a.record(&trade("Xanax", "Bob", 5, dec!(5000), true, 10));

        assert_eq!(a.avg_buy_price, Decimal::ZERO);
        assert_eq!(a.avg_sell_price, dec!(1000));
        assert_eq!(a.profit_margin, 0.0);
        assert_eq!(a.net_profit, dec!(5000));
    }

    #[test]
    fn test_partner_most_traded_first_seen_tiebreak() {
        let mut p = TradingPartnerAnalytics::new("Bob".to_string(), None);
        p.record(&trade("Xanax", "Bob", 1, dec!(10), true, 1));
        p.record(&trade("Vicodin", "Bob", 1, dec!(20), false, 2));
        assert_eq!(p.most_traded_item, "Xanax");

        p.record(&trade("Vicodin", "Bob", 1, dec!(20), false, 3));
        assert_eq!(p.most_traded_item, "Vicodin");
        assert_eq!(p.total_volume, dec!(50));
        assert_eq!(p.transaction_count, 3);
    }

    #[test]
    fn test_empty_analytics_placeholders() {
        let empty = BazaarAnalytics::from_groups(Vec::new(), Vec::new());
        assert!(empty.is_empty());
        assert_eq!(empty.top_item, NOT_AVAILABLE);
        assert_eq!(empty.top_partner, NOT_AVAILABLE);
        assert_eq!(empty.net_profit, Decimal::ZERO);
    }

    #[test]
    fn test_rollup_merges_buckets() {
        let mut day1_item = ItemAnalytics::new("Xanax".to_string());
        day1_item.record(&trade("Xanax", "Bob", 2, dec!(2000), false, 1));
        let mut day1_partner = TradingPartnerAnalytics::new("Bob".to_string(), None);
        day1_partner.record(&trade("Xanax", "Bob", 2, dec!(2000), false, 1));
        let day1 = BazaarAnalytics::from_groups(vec![day1_item], vec![day1_partner]);

        let mut day2_item = ItemAnalytics::new("Xanax".to_string());
        day2_item.record(&trade("Xanax", "Bob", 2, dec!(3000), true, 2));
        let mut day2_partner = TradingPartnerAnalytics::new("Bob".to_string(), None);
        day2_partner.record(&trade("Xanax", "Bob", 2, dec!(3000), true, 2));
        let day2 = BazaarAnalytics::from_groups(vec![day2_item], vec![day2_partner]);

        let range = BazaarAnalytics::rollup([&day1, &day2]);

        assert_eq!(range.items.len(), 1);
        assert_eq!(range.total_trades, 2);
        assert_eq!(range.net_profit, dec!(1000));
        assert!((range.items[0].profit_margin - 50.0).abs() < 1e-9);
        assert_eq!(range.partners[0].total_volume, dec!(5000));
        assert_eq!(range.top_partner, "Bob");
    }

    #[test]
    fn test_totals_saturate_at_decimal_bounds() {
        let mut item = ItemAnalytics::new("Xanax".to_string());
        item.record(&trade("Xanax", "Bob", 1, Decimal::MAX, true, 10));
        item.record(&trade("Xanax", "Bob", 1, Decimal::MAX, true, 20));
        assert_eq!(item.total_sold, Decimal::MAX);
        assert_eq!(item.net_profit, Decimal::MAX);

        let mut partner = TradingPartnerAnalytics::new("Bob".to_string(), None);
        partner.record(&trade("Xanax", "Bob", 1, Decimal::MAX, true, 10));
        let copy = partner.clone();
        partner.merge(&copy);
        assert_eq!(partner.total_volume, Decimal::MAX);

        let day = BazaarAnalytics::from_groups(vec![item], vec![partner]);
        let range = BazaarAnalytics::rollup([&day, &day]);
        assert_eq!(range.total_sold, Decimal::MAX);
        assert_eq!(range.net_profit, Decimal::MAX);
    }
}
