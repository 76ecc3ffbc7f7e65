//! Sync client state machine
//!
//! `Off → Joining → On`, with `Error` reachable from `Joining` and `On`.
//! Every poll tick moves `Error` back to `Joining` before fetching.
//!
//! Fetch and push results are applied only if the session that issued them
//! is still the active one (see [`ClientSyncState::generation`]). Polls and
//! pushes are not serialized against each other; the timestamp rule alone
//! decides whether a fetched list replaces the local one. A successful push
//! advances the last seen timestamp to the stamp the server gave it.

use crate::config::SyncClientConfig;
use crate::error::{AppError, Result};
use crate::scheduler::{Debouncer, Poller};
use crate::sync::state::ClientSyncState;
use crate::sync::{HttpSyncTransport, SyncId, SyncSnapshot, SyncStatus, SyncTransport};
use crate::watchlist::{ChangeListener, WatchlistStore};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Handle to the sync machinery of one local watchlist
pub struct SyncClient {
    inner: Arc<Inner>,
}

struct Inner {
    me: Weak<Inner>,
    transport: Arc<dyn SyncTransport>,
    watchlist: Arc<WatchlistStore>,
    state: Mutex<ClientSyncState>,
    status_tx: watch::Sender<SyncStatus>,
    debouncer: Debouncer,
    poller: Poller,
}

impl SyncClient {
    /// HTTP client against `config.base_url`
    pub fn new(config: &SyncClientConfig, watchlist: Arc<WatchlistStore>) -> Result<Self> {
        let transport = Arc::new(HttpSyncTransport::new(config)?);
        Self::with_transport(transport, watchlist, config.poll_interval, config.debounce)
    }

    /// Must be called inside a Tokio runtime. Timers run on that runtime,
    /// so the watchlist may then be edited from any thread.
    pub fn with_transport(
        transport: Arc<dyn SyncTransport>,
        watchlist: Arc<WatchlistStore>,
        poll_interval: Duration,
        debounce: Duration,
    ) -> Result<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| AppError::Internal(format!("Sync client needs a Tokio runtime: {}", e)))?;
        let (status_tx, _) = watch::channel(SyncStatus::Off);

        let inner = Arc::new_cyclic(|me| Inner {
            me: me.clone(),
            transport,
            watchlist,
            state: Mutex::new(ClientSyncState::default()),
            status_tx,
            debouncer: Debouncer::new(debounce, runtime.clone()),
            poller: Poller::new(poll_interval, runtime),
        });

        let listener: Weak<dyn ChangeListener> = Arc::downgrade(&inner) as Weak<dyn ChangeListener>;
        inner.watchlist.set_listener(listener);

        Ok(Self { inner })
    }

    pub fn watchlist(&self) -> &Arc<WatchlistStore> {
        &self.inner.watchlist
    }

    pub fn status(&self) -> SyncStatus {
        self.inner.state.lock().status
    }

    pub fn snapshot(&self) -> SyncSnapshot {
        self.inner.state.lock().snapshot()
    }

    /// Receiver of the status indicator
    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.inner.status_tx.subscribe()
    }

    /// Start sharing the local list under a freshly generated code.
    /// The local list is pushed immediately and becomes the remote list.
    pub async fn create(&self) -> Result<SyncId> {
        let id = SyncId::generate();
        let generation = self.inner.begin_session(id.clone());
        {
            let mut state = self.inner.state.lock();
            state.synced = true;
        }
        info!("Created sync code {}", id);

        self.inner.push_now(generation).await;
        self.inner.start_polling();
        Ok(id)
    }

    /// Adopt the remote list stored under `raw_id`
    pub async fn join(&self, raw_id: &str) -> Result<SyncStatus> {
        let id = SyncId::parse(raw_id)?;
        let generation = self.inner.begin_session(id.clone());
        info!("Joining sync code {}", id);

        self.inner.fetch_and_apply(generation, &id).await;
        self.inner.start_polling();
        Ok(self.status())
    }

    /// Rejoin the code saved by a previous session, if any
    pub async fn resume(&self) -> Result<Option<SyncStatus>> {
        let saved = self.inner.watchlist.persistence().load_sync_id()?;
        match saved {
            Some(raw) => match SyncId::parse(&raw) {
                Ok(id) => self.join(id.as_str()).await.map(Some),
                Err(_) => {
                    warn!("Discarding invalid saved sync code");
                    self.inner.watchlist.persistence().save_sync_id(None)?;
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    /// Fetch the remote record now, outside the poll cadence
    pub async fn poll_once(&self) -> SyncStatus {
        self.inner.poll().await;
        self.status()
    }

    /// Push the current list now, dropping any pending debounced push
    pub async fn flush(&self) -> SyncStatus {
        self.inner.debouncer.cancel();
        let generation = {
            let state = self.inner.state.lock();
            if !state.can_push() {
                return state.status;
            }
            state.generation
        };
        self.inner.push_now(generation).await;
        self.status()
    }

    /// Stop syncing. The local list is kept.
    pub fn leave(&self) -> Result<()> {
        self.inner.debouncer.cancel();
        self.inner.poller.stop();
        {
            let mut state = self.inner.state.lock();
            if let Some(id) = &state.sync_id {
                info!("Leaving sync code {}", id);
            }
            state.end();
            self.inner.status_tx.send_replace(SyncStatus::Off);
        }
        self.inner.watchlist.persistence().save_sync_id(None)
    }

    /// Cancel all timers without changing the sync state
    pub fn shutdown(&self) {
        self.inner.debouncer.cancel();
        self.inner.poller.stop();
    }
}

impl Drop for SyncClient {
    fn drop(&mut self) {
        self.shutdown();
        self.inner.watchlist.clear_listener();
    }
}

impl Inner {
    fn set_status(&self, state: &mut ClientSyncState, status: SyncStatus) {
        if state.status != status {
            info!("Sync status {:?} -> {:?}", state.status, status);
        }
        state.status = status;
        self.status_tx.send_replace(status);
    }

    /// Reset timers and state for a new code; persists the code
    fn begin_session(&self, id: SyncId) -> u64 {
        self.debouncer.cancel();
        self.poller.stop();

        let generation = {
            let mut state = self.state.lock();
            let generation = state.begin(id.clone());
            self.status_tx.send_replace(SyncStatus::Joining);
            generation
        };

        if let Err(e) = self.watchlist.persistence().save_sync_id(Some(id.as_str())) {
            warn!("Failed to save sync code: {}", e);
        }
        generation
    }

    fn start_polling(&self) {
        let me = self.me.clone();
        self.poller.start(move || {
            let me = me.clone();
            async move {
                if let Some(inner) = me.upgrade() {
                    inner.poll().await;
                }
            }
        });
    }

    async fn poll(&self) {
        let (generation, id) = {
            let mut state = self.state.lock();
            let id = match state.sync_id.clone() {
                Some(id) => id,
                None => return,
            };
            if state.status == SyncStatus::Error {
                self.set_status(&mut state, SyncStatus::Joining);
            }
            (state.generation, id)
        };

        self.fetch_and_apply(generation, &id).await;
    }

    /// Fetch the remote record and adopt it if it is newer than the last
    /// accepted one. The first accepted fetch of a session adopts it
    /// unconditionally.
    async fn fetch_and_apply(&self, generation: u64, id: &SyncId) {
        let result = self.transport.fetch(id).await;

        let mut state = self.state.lock();
        if !state.is_current(generation) {
            debug!("Dropping fetch result for inactive sync session {}", id);
            return;
        }

        match result {
            Ok(record) => {
                if !state.synced || record.updated_at > state.last_seen {
                    debug!(
                        "Applying remote list ({} rows, updatedAt {})",
                        record.rows.len(),
                        record.updated_at
                    );
                    if let Err(e) = self.watchlist.replace_all(record.rows) {
                        warn!("Failed to save synced watchlist: {}", e);
                    }
                    state.last_seen = state.last_seen.max(record.updated_at);
                    state.synced = true;
                }
                state.last_error = None;
                self.set_status(&mut state, SyncStatus::On);
            }
            Err(e) => {
                warn!("Sync fetch for {} failed: {}", id, e);
                state.last_error = Some(e.kind());
                self.set_status(&mut state, SyncStatus::Error);
            }
        }
    }

    /// Write the full local list under the session's code
    async fn push_now(&self, generation: u64) {
        let id = {
            let state = self.state.lock();
            if !state.is_current(generation) || !state.can_push() {
                return;
            }
            match state.sync_id.clone() {
                Some(id) => id,
                None => return,
            }
        };
        let rows = self.watchlist.rows();

        let result = self.transport.push(&id, &rows).await;

        let mut state = self.state.lock();
        if !state.is_current(generation) {
            debug!("Dropping push result for inactive sync session {}", id);
            return;
        }

        match result {
            Ok(stamp) => {
                debug!("Pushed {} rows to {}", rows.len(), id);
                // Our own write needs no re-adoption on the next poll
                if let Some(updated_at) = stamp {
                    state.last_seen = state.last_seen.max(updated_at);
                }
                state.last_error = None;
                self.set_status(&mut state, SyncStatus::On);
            }
            Err(e) => {
                warn!("Sync push for {} failed: {}", id, e);
                state.last_error = Some(e.kind());
                self.set_status(&mut state, SyncStatus::Error);
            }
        }
    }
}

impl ChangeListener for Inner {
    fn on_local_change(&self) {
        let generation = {
            let state = self.state.lock();
            if !state.can_push() {
                return;
            }
            state.generation
        };

        let me = self.me.clone();
        self.debouncer.schedule(move || async move {
            if let Some(inner) = me.upgrade() {
                inner.push_now(generation).await;
            }
        });
    }
}
