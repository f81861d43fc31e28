//! TTL marker operations.
//!
//! A marker says "this cache file was built recently enough". Its presence
//! means FRESH in TTL mode; its absence or expiry means REBUILD.

use super::connection::MarkerDb;
use crate::Error;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_rusqlite::params;

/// A stored marker row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Marker {
    pub key: String,
    pub remembered_at: String,
    pub expires_at: DateTime<Utc>,
}

impl MarkerDb {
    /// Remember a key for `ttl` from now.
    pub async fn remember(&self, key: &str, ttl: Duration) -> Result<(), Error> {
        let ttl = chrono::Duration::from_std(ttl).map_err(|e| Error::InvalidInput(format!("ttl out of range: {e}")))?;
        self.remember_until(key, Utc::now() + ttl).await
    }

    /// Remember a key until an absolute instant.
    ///
    /// Uses UPSERT semantics: an existing marker is replaced.
    pub async fn remember_until(&self, key: &str, expires_at: DateTime<Utc>) -> Result<(), Error> {
        let key = key.to_string();
        let remembered_at = Utc::now().to_rfc3339();
        let expires_at_ms = expires_at.timestamp_millis();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO ttl_markers (key, remembered_at, expires_at_ms)
                    VALUES (?1, ?2, ?3)
                    ON CONFLICT(key) DO UPDATE SET
                        remembered_at = excluded.remembered_at,
                        expires_at_ms = excluded.expires_at_ms",
                    params![key, remembered_at, expires_at_ms],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Whether an unexpired marker exists for the key.
    pub async fn is_present(&self, key: &str) -> Result<bool, Error> {
        let key = key.to_string();
        let now = Utc::now().timestamp_millis();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let present: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM ttl_markers WHERE key = ?1 AND expires_at_ms > ?2)",
                    params![key, now],
                    |row| row.get(0),
                )?;
                Ok(present)
            })
            .await
            .map_err(Error::from)
    }

    /// Get the marker row for a key, expired or not.
    pub async fn get(&self, key: &str) -> Result<Option<Marker>, Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<Marker>, Error> {
                let result = conn.query_row(
                    "SELECT key, remembered_at, expires_at_ms FROM ttl_markers WHERE key = ?1",
                    params![key],
                    |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, i64>(2)?)),
                );

                match result {
                    Ok((key, remembered_at, ms)) => Ok(DateTime::from_timestamp_millis(ms)
                        .map(|expires_at| Marker { key, remembered_at, expires_at })),
                    Err(tokio_rusqlite::rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Drop the marker for a key. Returns whether one existed.
    pub async fn forget(&self, key: &str) -> Result<bool, Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM ttl_markers WHERE key = ?1", params![key])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete expired markers.
    ///
    /// Returns the number of deleted entries.
    pub async fn purge_expired(&self) -> Result<u64, Error> {
        let now = Utc::now().timestamp_millis();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM ttl_markers WHERE expires_at_ms <= ?1", params![now])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
