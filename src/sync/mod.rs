//! Watchlist synchronization protocol
//!
//! A watchlist is shared between devices under a short sync code. The server
//! keeps, per code, the full row list and the epoch-millis timestamp of the
//! last write. Clients poll that record and adopt it whenever its timestamp
//! is newer than the last one they accepted (last write wins), and push their
//! full list, debounced, after local edits.

mod client;
mod state;
mod transport;

pub use client::SyncClient;
pub use state::{SyncSnapshot, SyncStatus};
pub use transport::{HttpSyncTransport, SyncTransport};

use crate::error::{AppError, Result};
use crate::watchlist::WatchlistRow;
use once_cell::sync::Lazy;
use rand::distributions::Alphanumeric;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::warn;

/// Sync code format, shared by client and server
pub const SYNC_ID_PATTERN: &str = r"^[A-Za-z0-9_-]{6,64}$";

/// Length of codes produced by [`SyncId::generate`]
pub const GENERATED_ID_LEN: usize = 10;

static SYNC_ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(SYNC_ID_PATTERN).expect("sync id pattern is a valid regex")
});

/// Validated sync code
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SyncId(String);

impl SyncId {
    pub fn parse(raw: &str) -> Result<Self> {
        if SYNC_ID_RE.is_match(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(AppError::Validation("bad id".to_string()))
        }
    }

    /// Fresh random code. Not coordinated with other clients.
    pub fn generate() -> Self {
        let code: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(GENERATED_ID_LEN)
            .map(char::from)
            .collect();
        Self(code)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Store key of the row list
    pub fn rows_key(&self) -> String {
        format!("watchlist:{}", self.0)
    }

    /// Store key of the last-write timestamp
    pub fn ts_key(&self) -> String {
        format!("watchlist:{}:ts", self.0)
    }
}

impl fmt::Display for SyncId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Remote record as seen by clients
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRecord {
    #[serde(deserialize_with = "deserialize_lenient_rows")]
    pub rows: Vec<WatchlistRow>,
    #[serde(rename = "updatedAt")]
    pub updated_at: u64,
}

/// Row list stored by any client. Rows without a string ticker are
/// skipped so one bad row cannot block the whole record.
fn deserialize_lenient_rows<'de, D>(deserializer: D) -> std::result::Result<Vec<WatchlistRow>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<Value>::deserialize(deserializer)?;
    let total = raw.len();
    let rows: Vec<WatchlistRow> = raw
        .into_iter()
        .filter_map(|row| serde_json::from_value(row).ok())
        .collect();
    if rows.len() < total {
        warn!("Skipped {} unreadable rows in sync record", total - rows.len());
    }
    Ok(rows)
}

/// Body of a push
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushBody {
    pub rows: Vec<WatchlistRow>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_id_validation() {
        assert!(SyncId::parse("ABCDEF12").is_ok());
        assert!(SyncId::parse("abc_de-F").is_ok());
        assert!(SyncId::parse(&"a".repeat(64)).is_ok());

        assert!(SyncId::parse("SHORT").is_err());
        assert!(SyncId::parse(&"a".repeat(65)).is_err());
        assert!(SyncId::parse("has space").is_err());
        assert!(SyncId::parse("semi;colon").is_err());
        assert!(SyncId::parse("ABCDEF12\n").is_err());
        assert!(SyncId::parse("").is_err());
    }

    #[test]
    fn test_generated_ids_are_valid() {
        for _ in 0..50 {
            let id = SyncId::generate();
            assert_eq!(id.as_str().len(), GENERATED_ID_LEN);
            assert!(SyncId::parse(id.as_str()).is_ok());
        }
    }

    #[test]
    fn test_store_keys() {
        let id = SyncId::parse("ABCDEF12").unwrap();
        assert_eq!(id.rows_key(), "watchlist:ABCDEF12");
        assert_eq!(id.ts_key(), "watchlist:ABCDEF12:ts");
    }

    #[test]
    fn test_record_wire_format() {
        let record: SyncRecord = serde_json::from_str(
            r#"{"rows":[{"ticker":"NVDA","name":"","sector":"","catalyst":""}],"updatedAt":100}"#,
        )
        .unwrap();
        assert_eq!(record.updated_at, 100);
        assert_eq!(record.rows[0].ticker, "NVDA");

        assert!(serde_json::from_str::<SyncRecord>(r#"{"rows":{},"updatedAt":1}"#).is_err());
    }

    #[test]
    fn test_record_tolerates_loose_rows() {
        let record: SyncRecord = serde_json::from_str(
            r#"{"rows":[{"ticker":"NVDA","name":null,"sector":3},{"name":"no ticker"},"AAPL",{"ticker":"AMD"}],"updatedAt":7}"#,
        )
        .unwrap();
        assert_eq!(record.updated_at, 7);
        assert_eq!(
            record.rows,
            vec![WatchlistRow::new("NVDA").with_sector("3"), WatchlistRow::new("AMD")]
        );
    }
}
