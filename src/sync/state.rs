//! Client sync state

use crate::error::SyncErrorKind;
use crate::sync::SyncId;
use serde::Serialize;

/// Coarse sync indicator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    #[default]
    Off,
    Joining,
    On,
    Error,
}

/// Mutable state owned by the sync client
#[derive(Debug, Default)]
pub(crate) struct ClientSyncState {
    pub sync_id: Option<SyncId>,
    pub status: SyncStatus,
    pub last_seen: u64,
    /// At least one fetch for `sync_id` has been accepted
    pub synced: bool,
    /// Bumped on every create/join/leave; late results from older sessions are dropped
    pub generation: u64,
    pub last_error: Option<SyncErrorKind>,
}

impl ClientSyncState {
    /// Start a new session for `sync_id`, returning its generation
    pub fn begin(&mut self, sync_id: SyncId) -> u64 {
        self.generation += 1;
        self.sync_id = Some(sync_id);
        self.status = SyncStatus::Joining;
        self.last_seen = 0;
        self.synced = false;
        self.last_error = None;
        self.generation
    }

    pub fn end(&mut self) {
        self.generation += 1;
        self.sync_id = None;
        self.status = SyncStatus::Off;
        self.last_seen = 0;
        self.synced = false;
        self.last_error = None;
    }

    /// Whether a result started under `generation` may still be applied
    pub fn is_current(&self, generation: u64) -> bool {
        self.sync_id.is_some() && self.generation == generation
    }

    pub fn can_push(&self) -> bool {
        self.sync_id.is_some() && self.synced
    }

    pub fn snapshot(&self) -> SyncSnapshot {
        SyncSnapshot {
            sync_id: self.sync_id.as_ref().map(|id| id.as_str().to_string()),
            status: self.status,
            last_seen: self.last_seen,
            last_error: self.last_error,
        }
    }
}

/// Read-only view of the client state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncSnapshot {
    pub sync_id: Option<String>,
    pub status: SyncStatus,
    pub last_seen: u64,
    pub last_error: Option<SyncErrorKind>,
}
