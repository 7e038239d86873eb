//! Bazaar trade extraction from log entries.
//!
//! Two canonical titles ("Bazaar sell" / "Bazaar buy") carry structured
//! fields and are parsed exactly. Anything else goes through an ordered list
//! of free-text patterns; the first match wins and unmatched entries yield
//! `None` rather than a guess.

use std::sync::OnceLock;

use regex::{Captures, Regex};
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::debug;

use crate::models::{BazaarTrade, LogEntry};

use super::amount::{decimal_from_value, u64_from_value};
use super::resolver::ItemNameResolver;

/// Which side of the trade we were on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeDirection {
    /// We sold to the counterparty
    Sale,
    /// We bought from the counterparty
    Purchase,
}

impl TradeDirection {
    pub fn is_sale(&self) -> bool {
        matches!(self, TradeDirection::Sale)
    }
}

/// One free-text title shape.
struct TextPattern {
    name: &'static str,
    direction: TradeDirection,
    regex: fn() -> &'static Regex,
    /// Extra check on the captured item text
    accepts_item: fn(&str) -> bool,
}

const TEXT_PATTERNS: [TextPattern; 4] = [
    TextPattern {
        name: "you_bought_from",
        direction: TradeDirection::Purchase,
        regex: you_bought_re,
        accepts_item: |_| true,
    },
    TextPattern {
        name: "you_sold_to",
        direction: TradeDirection::Sale,
        regex: you_sold_re,
        accepts_item: |_| true,
    },
    TextPattern {
        name: "partner_bought",
        direction: TradeDirection::Sale,
        regex: partner_bought_re,
        // Leave the bazaar form to the next pattern
        accepts_item: |item| !item.to_lowercase().ends_with(" from your bazaar"),
    },
    TextPattern {
        name: "partner_bought_from_bazaar",
        direction: TradeDirection::Sale,
        regex: partner_bought_bazaar_re,
        accepts_item: |_| true,
    },
];

fn you_bought_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*you bought (?P<item>.+?) from (?P<name>.+?) \[(?P<id>\d+)\] for \$[\d,.]+")
            .expect("invalid you-bought regex")
    })
}

fn you_sold_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*you sold (?P<item>.+?) to (?P<name>.+?) \[(?P<id>\d+)\] for \$[\d,.]+")
            .expect("invalid you-sold regex")
    })
}

fn partner_bought_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*(?P<name>.+?) \[(?P<id>\d+)\] bought (?P<item>.+?) for \$[\d,.]+")
            .expect("invalid partner-bought regex")
    })
}

fn partner_bought_bazaar_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)^\s*(?P<name>.+?) \[(?P<id>\d+)\] bought (?P<item>.+?) from your bazaar for \$[\d,.]+",
        )
        .expect("invalid partner-bought-bazaar regex")
    })
}

fn item_quantity_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?P<name>.+?)\s+x(?P<qty>\d+)$").expect("invalid quantity regex"))
}

/// "you bought/sold ... [id] for $..." anywhere in the title.
pub(crate) fn own_trade_shape_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)you (?:bought|sold) .+ \[\d+\] for \$").expect("invalid own-trade regex")
    })
}

/// "<name> [id] bought ... for $..." at the start of the title.
pub(crate) fn partner_trade_shape_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*.+ \[\d+\] bought .+ for \$").expect("invalid partner-trade regex")
    })
}

/// Split "Xanax x3" into ("Xanax", 3). Without a suffix the quantity is 1.
pub fn split_item_quantity(text: &str) -> (String, u32) {
    let text = text.trim();
    if let Some(caps) = item_quantity_re().captures(text) {
        if let Ok(qty) = caps["qty"].parse::<u32>() {
            if qty > 0 {
                return (caps["name"].trim().to_string(), qty);
            }
        }
    }
    (text.to_string(), 1)
}

/// Parse a bazaar candidate into a trade.
///
/// `total_amount` is the extracted amount of the entry and must be positive.
pub fn parse_bazaar_trade(
    entry: &LogEntry,
    total_amount: Decimal,
    resolver: &mut ItemNameResolver,
) -> Option<BazaarTrade> {
    if total_amount <= Decimal::ZERO {
        return None;
    }

    let title = entry.title().trim().to_lowercase();
    let structured = match title.as_str() {
        "bazaar sell" => Some((TradeDirection::Sale, "buyer")),
        "bazaar buy" => Some((TradeDirection::Purchase, "seller")),
        _ => None,
    };

    if let Some((direction, partner_field)) = structured {
        if let Some(trade) = parse_structured(entry, direction, partner_field, total_amount, resolver) {
            return Some(trade);
        }
        debug!(log_id = %entry.id, "Structured bazaar entry without item data");
    }

    parse_free_text(entry, total_amount)
}

fn parse_structured(
    entry: &LogEntry,
    direction: TradeDirection,
    partner_field: &str,
    total_amount: Decimal,
    resolver: &mut ItemNameResolver,
) -> Option<BazaarTrade> {
    let item = entry.field("items")?.as_array()?.first()?;
    let item_id = item.get("id").and_then(u64_from_value)?;
    let quantity = item
        .get("qty")
        .or_else(|| item.get("quantity"))
        .and_then(u64_from_value)
        .and_then(|q| u32::try_from(q).ok())
        .filter(|q| *q > 0)
        .unwrap_or(1);

    let unit_price = entry
        .field("cost_each")
        .and_then(decimal_from_value)
        .filter(|p| *p > Decimal::ZERO)
        .unwrap_or_else(|| total_amount / Decimal::from(quantity));

    let (trading_partner, player_id) = partner_identity(entry.field(partner_field));

    Some(BazaarTrade {
        log_id: entry.id.clone(),
        item_name: resolver.resolve(item_id),
        item_id: Some(item_id),
        quantity,
        unit_price,
        total_amount,
        trading_partner,
        player_id,
        is_sale: direction.is_sale(),
        timestamp: entry.datetime()?,
        original_title: entry.title().to_string(),
    })
}

fn parse_free_text(entry: &LogEntry, total_amount: Decimal) -> Option<BazaarTrade> {
    let title = entry.title();

    for pattern in &TEXT_PATTERNS {
        let Some(caps) = (pattern.regex)().captures(title) else {
            continue;
        };
        if !(pattern.accepts_item)(&caps["item"]) {
            continue;
        }

        debug!(log_id = %entry.id, pattern = pattern.name, "Bazaar title matched");
        return build_text_trade(entry, &caps, pattern.direction, total_amount);
    }

    debug!(log_id = %entry.id, title = %title, "Unparseable bazaar title");
    None
}

fn build_text_trade(
    entry: &LogEntry,
    caps: &Captures<'_>,
    direction: TradeDirection,
    total_amount: Decimal,
) -> Option<BazaarTrade> {
    let (item_name, quantity) = split_item_quantity(&caps["item"]);

    Some(BazaarTrade {
        log_id: entry.id.clone(),
        item_name,
        item_id: None,
        quantity,
        unit_price: total_amount / Decimal::from(quantity),
        total_amount,
        trading_partner: caps["name"].trim().to_string(),
        player_id: Some(caps["id"].to_string()),
        is_sale: direction.is_sale(),
        timestamp: entry.datetime()?,
        original_title: entry.title().to_string(),
    })
}

/// Counterparty from a `buyer`/`seller` field: ids become `Player [<id>]`.
fn partner_identity(value: Option<&Value>) -> (String, Option<String>) {
    if let Some(id) = value.and_then(u64_from_value) {
        return (format!("Player [{}]", id), Some(id.to_string()));
    }
    match value {
        Some(Value::String(name)) if !name.trim().is_empty() => (name.trim().to_string(), None),
        _ => ("Unknown".to_string(), None),
    }
}
