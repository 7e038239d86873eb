//! Per-item and per-partner rollups of parsed bazaar trades.

use crate::models::{BazaarAnalytics, BazaarTrade, ItemAnalytics, TradingPartnerAnalytics};

/// Calculator for bazaar analytics over one day bucket of trades.
pub struct BazaarAnalyticsCalculator;

impl BazaarAnalyticsCalculator {
    /// Group trades by item name and by trading partner.
    ///
    /// Groups keep first-seen order until the final sort, which is what the
    /// "most traded item" tie-break relies on. An empty slice yields the
    /// zeroed `N/A` record.
    pub fn calculate(trades: &[BazaarTrade]) -> BazaarAnalytics {
        if trades.is_empty() {
            return BazaarAnalytics::empty();
        }

        let mut items: Vec<ItemAnalytics> = Vec::new();
        let mut partners: Vec<TradingPartnerAnalytics> = Vec::new();

        for trade in trades {
            match items.iter_mut().find(|i| i.item_name == trade.item_name) {
                Some(item) => item.record(trade),
                None => {
                    let mut item = ItemAnalytics::new(trade.item_name.clone());
                    item.record(trade);
                    items.push(item);
                }
            }

            match partners
                .iter_mut()
                .find(|p| p.partner == trade.trading_partner)
            {
                Some(partner) => partner.record(trade),
                None => {
                    let mut partner = TradingPartnerAnalytics::new(
                        trade.trading_partner.clone(),
                        trade.player_id.clone(),
                    );
                    partner.record(trade);
                    partners.push(partner);
                }
            }
        }

        BazaarAnalytics::from_groups(items, partners)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn trade(item: &str, partner: &str, qty: u32, total: Decimal, is_sale: bool, ts: i64) -> BazaarTrade {
        BazaarTrade {
            log_id: ts.to_string(),
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
    fn test_calculate_groups_and_sorts() {
        let trades = vec![
            trade("Xanax", "Bob", 2, dec!(1600), false, 10),
            trade("Xanax", "Amy", 2, dec!(2000), true, 20),
            trade("Beer", "Bob", 10, dec!(500), true, 30),
            trade("Vicodin", "Carl", 1, dec!(300), false, 40),
        ];

        let analytics = BazaarAnalyticsCalculator::calculate(&trades);

        assert_eq!(analytics.total_trades, 4);
        assert_eq!(analytics.total_bought, dec!(1900));
        assert_eq!(analytics.total_sold, dec!(2500));
        assert_eq!(analytics.net_profit, dec!(600));

        let names: Vec<&str> = analytics.items.iter().map(|i| i.item_name.as_str()).collect();
        assert_eq!(names, vec!["Beer", "Xanax", "Vicodin"]);
        assert_eq!(analytics.top_item, "Beer");

        let xanax = &analytics.items[1];
        assert_eq!(xanax.avg_buy_price, dec!(800));
        assert_eq!(xanax.avg_sell_price, dec!(1000));
        assert!((xanax.profit_margin - 25.0).abs() < 1e-9);
        assert_eq!(xanax.last_activity, Some(Utc.timestamp_opt(20, 0).unwrap()));

        let partners: Vec<&str> = analytics.partners.iter().map(|p| p.partner.as_str()).collect();
        assert_eq!(partners, vec!["Bob", "Amy", "Carl"]);
        assert_eq!(analytics.partners[0].total_volume, dec!(2100));
        assert_eq!(analytics.partners[0].most_traded_item, "Xanax");
        assert_eq!(analytics.top_partner, "Bob");
    }

    #[test]
    fn test_empty_input() {
        let analytics = BazaarAnalyticsCalculator::calculate(&[]);
        assert_eq!(analytics, BazaarAnalytics::empty());
        assert_eq!(analytics.top_item, "N/A");
    }
}
