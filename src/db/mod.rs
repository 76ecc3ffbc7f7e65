//! Local durable storage

pub mod memory;
pub mod sqlite;

use crate::error::Result;
use crate::watchlist::WatchlistRow;

pub use memory::MemoryLocalStore;
pub use sqlite::SqliteDb;

/// Persistence port for the device-local watchlist and the active sync code
pub trait LocalStore: Send + Sync {
    /// Saved watchlist, `None` if nothing was ever saved
    fn load_watchlist(&self) -> Result<Option<Vec<WatchlistRow>>>;

    /// Replace the saved watchlist
    fn save_watchlist(&self, rows: &[WatchlistRow]) -> Result<()>;

    /// Saved sync code, if any
    fn load_sync_id(&self) -> Result<Option<String>>;

    /// Save (or clear with `None`) the sync code
    fn save_sync_id(&self, sync_id: Option<&str>) -> Result<()>;
}
