//! In-memory local store, used for tests and ephemeral sessions

use crate::db::LocalStore;
use crate::error::Result;
use crate::watchlist::WatchlistRow;
use parking_lot::RwLock;

#[derive(Debug, Default)]
pub struct MemoryLocalStore {
    rows: RwLock<Option<Vec<WatchlistRow>>>,
    sync_id: RwLock<Option<String>>,
}

impl MemoryLocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a watchlist
    pub fn with_rows(rows: Vec<WatchlistRow>) -> Self {
        Self {
            rows: RwLock::new(Some(rows)),
            sync_id: RwLock::new(None),
        }
    }
}

impl LocalStore for MemoryLocalStore {
    fn load_watchlist(&self) -> Result<Option<Vec<WatchlistRow>>> {
        Ok(self.rows.read().clone())
    }

    fn save_watchlist(&self, rows: &[WatchlistRow]) -> Result<()> {
        *self.rows.write() = Some(rows.to_vec());
        Ok(())
    }

    fn load_sync_id(&self) -> Result<Option<String>> {
        Ok(self.sync_id.read().clone())
    }

    fn save_sync_id(&self, sync_id: Option<&str>) -> Result<()> {
        *self.sync_id.write() = sync_id.map(str::to_string);
        Ok(())
    }
}
