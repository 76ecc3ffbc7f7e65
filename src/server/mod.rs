//! Sync HTTP server module
//!
//! Provides:
//! - `GET /sync?id=<code>` returning `{rows, updatedAt}`
//! - `PUT /sync?id=<code>` with `{rows}`, stamped with a server timestamp
//! - `GET /health`
//!
//! Usage:
//! 1. Pick a backend (`WATCHLIST_STORE`, or KV REST credentials)
//! 2. Run `watchlist-sync`
//! 3. Point clients at `http://<host>:<port>`

mod handlers;
mod server;
mod types;

pub use server::{router, SyncServer};
pub use types::{ErrorBody, HealthResponse};
