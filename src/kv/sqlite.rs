//! SQLite-backed store. Multi-key writes share one transaction.

use crate::db::SqliteDb;
use crate::error::Result;
use crate::kv::KvStore;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

pub struct SqliteKvStore {
    db: Arc<SqliteDb>,
}

impl SqliteKvStore {
    pub fn new(db: Arc<SqliteDb>) -> Self {
        Self { db }
    }

    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::new(Arc::new(SqliteDb::new(path)?)))
    }
}

#[async_trait]
impl KvStore for SqliteKvStore {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.db.kv_get(key)
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.db.kv_set(key, value)
    }

    async fn set_many(&self, entries: &[(String, String)]) -> Result<()> {
        self.db.kv_set_many(entries)
    }

    fn is_atomic(&self) -> bool {
        true
    }
}
