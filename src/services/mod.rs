//! Services Layer
//!
//! Business logic behind the HTTP handlers. Handlers only translate between
//! HTTP and these calls.
//!
//! # Services
//!
//! - `SyncService` - Load and save the shared watchlist record

pub mod sync_service;

pub use sync_service::{SaveResult, StoredRecord, SyncService};
