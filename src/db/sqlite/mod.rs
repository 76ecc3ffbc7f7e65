//! SQLite database module
//!
//! One file serves both roles of the crate: the device-local watchlist
//! (rows plus the active sync code) and, on the server, the key-value
//! table behind [`crate::kv::SqliteKvStore`].

mod migrations;
mod settings;
mod watchlist;
mod kv;

use crate::db::LocalStore;
use crate::error::Result;
use crate::watchlist::WatchlistRow;
use parking_lot::Mutex;
use rusqlite::Connection;
use std::path::Path;

/// Settings key holding the active sync code
const SYNC_ID_KEY: &str = "sync_id";

/// SQLite database wrapper
pub struct SqliteDb {
    conn: Mutex<Connection>,
}

impl SqliteDb {
    /// Open (or create) the database file and run migrations
    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrent access
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        Self::from_connection(conn)
    }

    /// Private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let db = Self {
            conn: Mutex::new(conn),
        };

        db.run_migrations()?;

        Ok(db)
    }

    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn.lock();
        migrations::run_migrations(&conn)
    }

    // ========== Key-Value Methods ==========

    pub fn kv_get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock();
        kv::get(&conn, key)
    }

    pub fn kv_set(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock();
        kv::set(&conn, key, value)
    }

    /// Write several entries in one transaction
    pub fn kv_set_many(&self, entries: &[(String, String)]) -> Result<()> {
        let mut conn = self.conn.lock();
        kv::set_many(&mut conn, entries)
    }
}

impl LocalStore for SqliteDb {
    fn load_watchlist(&self) -> Result<Option<Vec<WatchlistRow>>> {
        let conn = self.conn.lock();
        watchlist::load_rows(&conn)
    }

    fn save_watchlist(&self, rows: &[WatchlistRow]) -> Result<()> {
        let mut conn = self.conn.lock();
        watchlist::save_rows(&mut conn, rows)
    }

    fn load_sync_id(&self) -> Result<Option<String>> {
        let conn = self.conn.lock();
        settings::get_setting(&conn, SYNC_ID_KEY)
    }

    fn save_sync_id(&self, sync_id: Option<&str>) -> Result<()> {
        let conn = self.conn.lock();
        match sync_id {
            Some(id) => settings::set_setting(&conn, SYNC_ID_KEY, id),
            None => settings::delete_setting(&conn, SYNC_ID_KEY),
        }
    }
}
