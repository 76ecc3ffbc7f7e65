//! Key-value table used by the server-side SQLite store backend

use crate::error::Result;
use rusqlite::{Connection, OptionalExtension};

const UPSERT: &str = "INSERT INTO kv (key, value) VALUES (?1, ?2)
     ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = datetime('now')";

pub fn get(conn: &Connection, key: &str) -> Result<Option<String>> {
    let value = conn
        .query_row("SELECT value FROM kv WHERE key = ?", [key], |row| row.get(0))
        .optional()?;
    Ok(value)
}

pub fn set(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(UPSERT, [key, value])?;
    Ok(())
}

pub fn set_many(conn: &mut Connection, entries: &[(String, String)]) -> Result<()> {
    let tx = conn.transaction()?;
    for (key, value) in entries {
        tx.execute(UPSERT, [key.as_str(), value.as_str()])?;
    }
    tx.commit()?;
    Ok(())
}
