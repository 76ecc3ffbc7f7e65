//! Remote key-value store backends
//!
//! The sync server only needs `get` and `set`. Backends that can write
//! several keys atomically override [`KvStore::set_many`]; the default
//! issues independent writes, so readers may observe a partial update.

mod memory;
mod rest;
mod sqlite;

pub use memory::MemoryKvStore;
pub use rest::RestKvStore;
pub use sqlite::SqliteKvStore;

use crate::error::Result;
use async_trait::async_trait;

/// Key-value accessor used by the sync service
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &'static str;

    /// Read a value, `None` if the key is absent
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Write several entries. Not atomic unless [`KvStore::is_atomic`].
    async fn set_many(&self, entries: &[(String, String)]) -> Result<()> {
        for (key, value) in entries {
            self.set(key, value).await?;
        }
        Ok(())
    }

    /// Whether `set_many` is all-or-nothing
    fn is_atomic(&self) -> bool {
        false
    }
}
