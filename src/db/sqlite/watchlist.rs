//! Local watchlist rows

use crate::db::sqlite::settings;
use crate::error::Result;
use crate::watchlist::WatchlistRow;
use rusqlite::{params, Connection};

const SAVED_MARKER: &str = "watchlist_saved";

/// Load rows in list order, `None` if the list was never saved
pub fn load_rows(conn: &Connection) -> Result<Option<Vec<WatchlistRow>>> {
    let saved = settings::get_setting(conn, SAVED_MARKER)?;
    if saved.as_deref() != Some("1") {
        return Ok(None);
    }

    let mut stmt = conn.prepare(
        "SELECT ticker, name, sector, catalyst FROM watchlist_rows ORDER BY position",
    )?;

    let rows = stmt
        .query_map([], |row| {
            Ok(WatchlistRow {
                ticker: row.get(0)?,
                name: row.get(1)?,
                sector: row.get(2)?,
                catalyst: row.get(3)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(Some(rows))
}

/// Replace all rows in one transaction
pub fn save_rows(conn: &mut Connection, rows: &[WatchlistRow]) -> Result<()> {
    let tx = conn.transaction()?;

    tx.execute("DELETE FROM watchlist_rows", [])?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO watchlist_rows (position, ticker, name, sector, catalyst)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for (position, row) in rows.iter().enumerate() {
            stmt.execute(params![
                position as i64,
                row.ticker,
                row.name,
                row.sector,
                row.catalyst,
            ])?;
        }
    }
    settings::set_setting(&tx, SAVED_MARKER, "1")?;

    tx.commit()?;
    Ok(())
}
