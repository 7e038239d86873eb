//! Collapse log entries fetched through several category queries.

use std::collections::HashSet;

use crate::models::LogEntry;

/// Keep the first occurrence of every entry id, preserving input order.
pub fn dedupe(entries: Vec<LogEntry>) -> Vec<LogEntry> {
    let mut seen: HashSet<String> = HashSet::with_capacity(entries.len());
    entries
        .into_iter()
        .filter(|entry| seen.insert(entry.id.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(id: &str, title: &str) -> LogEntry {
        serde_json::from_value(json!({
            "id": id,
            "timestamp": 1_700_000_000,
            "details": { "title": title, "category": "Money" }
        }))
        .unwrap()
    }

    #[test]
    fn test_keeps_first_occurrence() {
        let out = dedupe(vec![
            entry("1", "first"),
            entry("2", "other"),
            entry("1", "second"),
        ]);

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].title(), "first");
        assert_eq!(out[1].id, "2");
    }

    #[test]
    fn test_idempotent() {
        let input = vec![entry("a", "x"), entry("b", "y"), entry("a", "x"), entry("c", "z")];
        let once = dedupe(input);
        let twice = dedupe(once.clone());
        assert_eq!(once, twice);
    }
}
