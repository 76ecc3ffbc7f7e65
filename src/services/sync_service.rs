//! Sync Service
//!
//! Reads and writes the per-code record behind `/sync`. The row list is kept
//! as the JSON array the client sent and the timestamp as a decimal string,
//! under two keys (see [`SyncId::rows_key`] and [`SyncId::ts_key`]).

use crate::error::{AppError, Result};
use crate::state::AppState;
use crate::sync::SyncId;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

/// Row fields required in strict mode
const ROW_FIELDS: [&str; 4] = ["ticker", "name", "sector", "catalyst"];

/// Record as served by `GET /sync`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredRecord {
    pub rows: Value,
    #[serde(rename = "updatedAt")]
    pub updated_at: u64,
}

impl Default for StoredRecord {
    fn default() -> Self {
        Self {
            rows: Value::Array(Vec::new()),
            updated_at: 0,
        }
    }
}

/// Result of a push
#[derive(Debug, Clone, Serialize)]
pub struct SaveResult {
    pub ok: bool,
    #[serde(rename = "updatedAt")]
    pub updated_at: u64,
}

/// Sync service for business logic
pub struct SyncService;

impl SyncService {
    /// Load the record stored under `raw_id`
    pub async fn load(state: &AppState, raw_id: Option<&str>) -> Result<StoredRecord> {
        let id = Self::parse_id(raw_id)?;
        let store = state.store()?;

        let rows = store.get(&id.rows_key()).await?;
        let ts = store.get(&id.ts_key()).await?;

        let mut record = StoredRecord::default();
        if let Some(raw) = rows {
            record.rows = Self::decode_stored_rows(&raw)?;
        }
        if let Some(raw) = ts {
            record.updated_at = raw
                .trim()
                .parse()
                .map_err(|_| AppError::Store(format!("Malformed timestamp under {}", id.ts_key())))?;
        }

        debug!("SyncService::load - {} (updatedAt {})", id, record.updated_at);
        Ok(record)
    }

    /// Replace the record stored under `raw_id` with the rows in `body`
    pub async fn save(state: &AppState, raw_id: Option<&str>, body: &[u8]) -> Result<SaveResult> {
        let id = Self::parse_id(raw_id)?;
        let store = state.store()?;
        let rows = Self::validate_body(body, state.strict_rows)?;

        let count = rows.as_array().map(Vec::len).unwrap_or(0);
        let serialized = serde_json::to_string(&rows)?;

        // Stamp and write under the code's lock so stamps land in order
        let lock = state.write_lock(id.as_str());
        let _guard = lock.lock().await;
        let updated_at = state.clock.now_ms();

        store
            .set_many(&[
                (id.rows_key(), serialized),
                (id.ts_key(), updated_at.to_string()),
            ])
            .await?;

        info!("SyncService::save - {} ({} rows, updatedAt {})", id, count, updated_at);
        Ok(SaveResult { ok: true, updated_at })
    }

    // ========================================================================
    // Private Helper Methods
    // ========================================================================

    fn parse_id(raw_id: Option<&str>) -> Result<SyncId> {
        raw_id
            .ok_or_else(|| AppError::Validation("bad id".to_string()))
            .and_then(SyncId::parse)
    }

    /// Extract the `rows` array from a push body
    fn validate_body(body: &[u8], strict: bool) -> Result<Value> {
        let bad_rows = || AppError::Validation("bad rows".to_string());

        let body: Value =
            serde_json::from_slice(body).map_err(|_| AppError::Validation("bad json".to_string()))?;

        let rows = match body {
            Value::Object(mut map) => map.remove("rows").ok_or_else(bad_rows)?,
            _ => return Err(bad_rows()),
        };

        let valid = rows.as_array().map_or(false, |rows| {
            rows.iter().all(|row| match row.as_object() {
                Some(row) if strict => ROW_FIELDS.iter().all(|f| row.get(*f).map_or(false, Value::is_string)),
                Some(row) => row.get("ticker").map_or(false, Value::is_string),
                None => false,
            })
        });

        if !valid {
            return Err(bad_rows());
        }
        Ok(rows)
    }

    fn decode_stored_rows(raw: &str) -> Result<Value> {
        match serde_json::from_str::<Value>(raw) {
            Ok(rows @ Value::Array(_)) => Ok(rows),
            _ => Err(AppError::Store("Malformed rows in store".to_string())),
        }
    }
}
