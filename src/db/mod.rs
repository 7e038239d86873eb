//! Key/value cache persisted in SQLite.
//!
//! Values are stored as JSON text with an absolute expiry timestamp, so any
//! serde type can be cached. The item name table lives here between runs.

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use serde::{de::DeserializeOwned, Serialize};
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use tracing::debug;

/// SQLite-backed cache store.
pub struct CacheStore {
    pool: SqlitePool,
}

impl CacheStore {
    /// Open (or create) the cache database.
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .context("Failed to connect to cache database")?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    /// Throwaway store for tests and `analyze --no-cache`.
    pub async fn in_memory() -> Result<Self> {
        // A single connection keeps every query on the same in-memory database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .context("Failed to open in-memory cache")?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS cache_entries (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                expires_at INTEGER NOT NULL,
                updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Fetch a live entry. Expired or undecodable rows read as absent.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let row: Option<(String, i64)> =
            sqlx::query_as("SELECT value, expires_at FROM cache_entries WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        let Some((value, expires_at)) = row else {
            return Ok(None);
        };

        if expires_at <= Utc::now().timestamp() {
            debug!(key = key, "Cache entry expired");
            return Ok(None);
        }

        match serde_json::from_str(&value) {
            Ok(decoded) => Ok(Some(decoded)),
            Err(e) => {
                debug!(key = key, error = %e, "Discarding unreadable cache entry");
                Ok(None)
            }
        }
    }

    /// Insert or replace an entry valid for `ttl` from now.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        let json = serde_json::to_string(value).context("Failed to serialize cache value")?;
        let expires_at = (Utc::now() + ttl).timestamp();

        sqlx::query(
            r#"
            INSERT INTO cache_entries (key, value, expires_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                expires_at = excluded.expires_at,
                updated_at = datetime('now')
            "#,
        )
        .bind(key)
        .bind(json)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Drop every entry. Returns the number removed.
    pub async fn clear(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM cache_entries")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Drop expired entries. Returns the number removed.
    pub async fn purge_expired(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM cache_entries WHERE expires_at <= ?")
            .bind(Utc::now().timestamp())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_set_get_roundtrip() {
        let store = CacheStore::in_memory().await.unwrap();
        let names = HashMap::from([(206u64, "Xanax".to_string())]);

        store.set("names", &names, Duration::hours(1)).await.unwrap();
        let loaded: Option<HashMap<u64, String>> = store.get("names").await.unwrap();

        assert_eq!(loaded, Some(names));
    }

    #[tokio::test]
    async fn test_expired_entries_read_as_missing() {
        let store = CacheStore::in_memory().await.unwrap();
        store.set("stale", &1u32, Duration::seconds(-5)).await.unwrap();
        store.set("fresh", &2u32, Duration::hours(1)).await.unwrap();

        assert_eq!(store.get::<u32>("stale").await.unwrap(), None);
        assert_eq!(store.purge_expired().await.unwrap(), 1);
        assert_eq!(store.get::<u32>("fresh").await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn test_set_replaces_and_clear_empties() {
        let store = CacheStore::in_memory().await.unwrap();
        store.set("a", &"x", Duration::hours(1)).await.unwrap();
        store.set("a", &"z", Duration::hours(1)).await.unwrap();
        store.set("b", &"y", Duration::hours(1)).await.unwrap();

        assert_eq!(store.get::<String>("a").await.unwrap(), Some("z".to_string()));
        assert_eq!(store.clear().await.unwrap(), 2);
        assert_eq!(store.get::<String>("b").await.unwrap(), None);
    }
}
