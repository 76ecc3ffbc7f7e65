//! Server state management

use crate::clock::MonotonicClock;
use crate::config::{ServerConfig, StoreConfig};
use crate::error::{AppError, Result};
use crate::kv::{KvStore, MemoryKvStore, RestKvStore, SqliteKvStore};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// State shared across all sync handlers
pub struct AppState {
    /// Remote record store, `None` when no backend is configured
    pub store: Option<Arc<dyn KvStore>>,

    /// Source of `updatedAt` stamps
    pub clock: MonotonicClock,

    /// Require all four string fields on pushed rows
    pub strict_rows: bool,

    /// One writer at a time per sync code
    write_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl AppState {
    pub fn new(store: Option<Arc<dyn KvStore>>, strict_rows: bool) -> Self {
        Self {
            store,
            clock: MonotonicClock::new(),
            strict_rows,
            write_locks: DashMap::new(),
        }
    }

    /// Open the configured backend
    pub fn from_config(config: &ServerConfig) -> Result<Self> {
        let store: Option<Arc<dyn KvStore>> = match &config.store {
            Some(StoreConfig::Memory) => Some(Arc::new(MemoryKvStore::new())),
            Some(StoreConfig::Sqlite { path }) => Some(Arc::new(SqliteKvStore::open(path)?)),
            Some(StoreConfig::Rest { url, token }) => Some(Arc::new(RestKvStore::new(url, token)?)),
            None => None,
        };

        match &store {
            Some(store) => info!(
                "Sync store: {} ({})",
                store.name(),
                if store.is_atomic() { "atomic writes" } else { "independent writes" }
            ),
            None => info!("Sync store not configured, /sync will answer 501"),
        }

        Ok(Self::new(store, config.strict_rows))
    }

    /// The configured store, or the "not configured" error
    pub fn store(&self) -> Result<&Arc<dyn KvStore>> {
        self.store
            .as_ref()
            .ok_or_else(|| AppError::NotConfigured("sync not configured".to_string()))
    }

    /// Lock serializing saves under `id`
    pub fn write_lock(&self, id: &str) -> Arc<Mutex<()>> {
        self.write_locks
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
