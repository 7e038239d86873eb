//! Monetary amount extraction from heterogeneous log payloads.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::Value;

use crate::models::LogEntry;

/// Candidate amount fields, most specific first.
pub const AMOUNT_FIELDS: [&str; 20] = [
    "cost_total",
    "money_gained",
    "money_mugged",
    "bet_amount",
    "bet",
    "withdrawn",
    "cost",
    "money",
    "won_amount",
    "pot",
    "credits",
    "pay",
    "rent",
    "upkeep_paid",
    "donated",
    "bounty_reward",
    "deposited",
    "amount",
    "fee",
    "value",
];

/// Return the amount an entry represents, or zero when no candidate field
/// holds a strictly positive value.
pub fn extract_amount(entry: &LogEntry) -> Decimal {
    matched_amount_field(entry)
        .map(|(_, amount)| amount)
        .unwrap_or(Decimal::ZERO)
}

/// Like [`extract_amount`] but also reports which field won.
pub fn matched_amount_field(entry: &LogEntry) -> Option<(&'static str, Decimal)> {
    AMOUNT_FIELDS.iter().find_map(|field| {
        entry
            .field(field)
            .and_then(decimal_from_value)
            .filter(|amount| *amount > Decimal::ZERO)
            .map(|amount| (*field, amount))
    })
}

/// Numbers or numeric strings ("1,500") as a decimal.
pub(crate) fn decimal_from_value(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(Decimal::from(i))
            } else if let Some(u) = n.as_u64() {
                Some(Decimal::from(u))
            } else {
                n.as_f64().and_then(|f| Decimal::try_from(f).ok())
            }
        }
        Value::String(s) => {
            let cleaned: String = s.trim().chars().filter(|c| *c != ',' && *c != '$').collect();
            Decimal::from_str(&cleaned).ok()
        }
        _ => None,
    }
}

/// Non-negative integer from a number or numeric string.
pub(crate) fn u64_from_value(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn entry(data: Value) -> LogEntry {
        serde_json::from_value(json!({
            "id": "1",
            "timestamp": 1_700_000_000,
            "details": { "title": "Test", "category": "Test" },
            "data": data
        }))
        .unwrap()
    }

    #[test]
    fn test_priority_order() {
        let e = entry(json!({ "money_gained": 50, "cost_total": 100 }));
        assert_eq!(extract_amount(&e), dec!(100));
        assert_eq!(matched_amount_field(&e).map(|(f, _)| f), Some("cost_total"));
    }

    #[test]
    fn test_non_positive_fields_are_skipped() {
        let e = entry(json!({ "cost_total": 0, "money_gained": -5, "fee": 25 }));
        assert_eq!(extract_amount(&e), dec!(25));
    }

    #[test]
    fn test_all_non_positive_extracts_zero() {
        let e = entry(json!({ "cost_total": 0, "money": -10, "value": 0 }));
        assert_eq!(extract_amount(&e), Decimal::ZERO);

        let e = entry(json!({ "items": [{ "id": 1 }] }));
        assert_eq!(extract_amount(&e), Decimal::ZERO);
    }

    #[test]
    fn test_numeric_strings() {
        let e = entry(json!({ "withdrawn": "1,500" }));
        assert_eq!(extract_amount(&e), dec!(1500));

        let e = entry(json!({ "cost": "abc", "money": 12.5 }));
        assert_eq!(extract_amount(&e), dec!(12.5));
    }
}
