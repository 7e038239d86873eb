//! Log entry model as returned by the Torn money log endpoints.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A single entry from a money log page.
///
/// The `data` payload is an open mapping whose shape depends on the kind of
/// transaction, so it is kept as raw JSON and inspected field by field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Unique log identifier
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,

    /// Epoch seconds
    pub timestamp: i64,

    #[serde(default)]
    pub details: LogDetails,

    /// Transaction specific fields (amounts, items, counterparties)
    #[serde(default, deserialize_with = "lenient_map")]
    pub data: Map<String, Value>,

    /// Display parameters, notably the income/expense color hint
    #[serde(default, deserialize_with = "lenient_map")]
    pub params: Map<String, Value>,
}

/// Title and grouping of a log entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogDetails {
    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub category: String,
}

/// Income/expense hint the game attaches to some entries. Not authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorHint {
    Green,
    Red,
}

impl LogEntry {
    pub fn title(&self) -> &str {
        &self.details.title
    }

    pub fn category(&self) -> &str {
        &self.details.category
    }

    pub fn color_hint(&self) -> Option<ColorHint> {
        match self.params.get("color").and_then(Value::as_str) {
            Some(c) if c.eq_ignore_ascii_case("green") => Some(ColorHint::Green),
            Some(c) if c.eq_ignore_ascii_case("red") => Some(ColorHint::Red),
            _ => None,
        }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }

    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.timestamp, 0).single()
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

// The API sends `[]` instead of `{}` for empty payloads.
fn lenient_map<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Object(map) => Ok(map),
        _ => Ok(Map::new()),
    }
}
