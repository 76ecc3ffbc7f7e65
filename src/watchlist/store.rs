//! Canonical local watchlist
//!
//! Every mutation is applied in memory and flushed to the local persistence
//! port under one write lock, then handed to the registered change listener
//! (the sync client's push path). A failed flush is reported but the
//! in-memory change stands.

use crate::db::LocalStore;
use crate::error::Result;
use crate::watchlist::{dedupe_rows, normalize_ticker, RowField, WatchlistRow};
use parking_lot::RwLock;
use std::sync::{Arc, Weak};
use tracing::debug;

/// Receives notice of local (user-originated) mutations
pub trait ChangeListener: Send + Sync {
    fn on_local_change(&self);
}

pub struct WatchlistStore {
    rows: RwLock<Vec<WatchlistRow>>,
    persistence: Arc<dyn LocalStore>,
    listener: RwLock<Option<Weak<dyn ChangeListener>>>,
}

impl WatchlistStore {
    /// Load the saved watchlist (or start empty) from the persistence port
    pub fn open(persistence: Arc<dyn LocalStore>) -> Result<Self> {
        let rows = persistence.load_watchlist()?.unwrap_or_default();
        let rows = dedupe_rows(rows);
        debug!("Loaded {} watchlist rows", rows.len());

        Ok(Self {
            rows: RwLock::new(rows),
            persistence,
            listener: RwLock::new(None),
        })
    }

    pub fn persistence(&self) -> &Arc<dyn LocalStore> {
        &self.persistence
    }

    /// Register the listener notified on local mutations. Held weakly.
    pub fn set_listener(&self, listener: Weak<dyn ChangeListener>) {
        *self.listener.write() = Some(listener);
    }

    pub fn clear_listener(&self) {
        *self.listener.write() = None;
    }

    /// Snapshot of the current rows, newest first
    pub fn rows(&self) -> Vec<WatchlistRow> {
        self.rows.read().clone()
    }

    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    pub fn get(&self, ticker: &str) -> Option<WatchlistRow> {
        let ticker = normalize_ticker(ticker);
        self.rows.read().iter().find(|r| r.ticker == ticker).cloned()
    }

    /// Prepend a row. Returns `false` when the normalized ticker is empty or
    /// already present.
    pub fn add(&self, mut row: WatchlistRow) -> Result<bool> {
        row.ticker = normalize_ticker(&row.ticker);
        if row.ticker.is_empty() {
            return Ok(false);
        }

        self.commit_local(|rows| {
            if rows.iter().any(|r| r.ticker == row.ticker) {
                return false;
            }
            debug!("Adding {} to watchlist", row.ticker);
            rows.insert(0, row);
            true
        })
    }

    /// Remove a row by ticker. Returns `false` if it was not present.
    pub fn remove(&self, ticker: &str) -> Result<bool> {
        let ticker = normalize_ticker(ticker);

        self.commit_local(|rows| {
            let before = rows.len();
            rows.retain(|r| r.ticker != ticker);
            if rows.len() == before {
                return false;
            }
            debug!("Removed {} from watchlist", ticker);
            true
        })
    }

    /// Replace one field of a row. Returns `false` if the ticker is absent.
    pub fn update_field(&self, ticker: &str, field: RowField, value: impl Into<String>) -> Result<bool> {
        let ticker = normalize_ticker(ticker);
        let value = value.into();

        self.commit_local(|rows| match rows.iter_mut().find(|r| r.ticker == ticker) {
            Some(row) => {
                *row.field_mut(field) = value;
                true
            }
            None => false,
        })
    }

    /// Overwrite the whole list with rows received from the remote store.
    /// Persists, but does not notify the change listener.
    pub fn replace_all(&self, rows: Vec<WatchlistRow>) -> Result<()> {
        let rows = dedupe_rows(rows);
        let mut current = self.rows.write();
        *current = rows;
        self.persistence.save_watchlist(&current)
    }

    /// Apply `mutate` and persist the result under the write lock, so saves
    /// land in the same order as the mutations. The listener is notified
    /// after the lock is released, even if the save failed.
    fn commit_local<F>(&self, mutate: F) -> Result<bool>
    where
        F: FnOnce(&mut Vec<WatchlistRow>) -> bool,
    {
        let saved = {
            let mut rows = self.rows.write();
            if !mutate(&mut rows) {
                return Ok(false);
            }
            self.persistence.save_watchlist(&rows)
        };

        let listener = self.listener.read().as_ref().and_then(Weak::upgrade);
        if let Some(listener) = listener {
            listener.on_local_change();
        }

        saved.map(|_| true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryLocalStore;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    struct CountingListener(AtomicUsize);

    impl ChangeListener for CountingListener {
        fn on_local_change(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Local store whose first save is slow
    struct SlowFirstSave {
        inner: MemoryLocalStore,
        first: AtomicBool,
    }

    impl LocalStore for SlowFirstSave {
        fn load_watchlist(&self) -> Result<Option<Vec<WatchlistRow>>> {
            self.inner.load_watchlist()
        }

        fn save_watchlist(&self, rows: &[WatchlistRow]) -> Result<()> {
            if self.first.swap(false, Ordering::SeqCst) {
                std::thread::sleep(Duration::from_millis(300));
            }
            self.inner.save_watchlist(rows)
        }

        fn load_sync_id(&self) -> Result<Option<String>> {
            self.inner.load_sync_id()
        }

        fn save_sync_id(&self, sync_id: Option<&str>) -> Result<()> {
            self.inner.save_sync_id(sync_id)
        }
    }

    fn open_store() -> (WatchlistStore, Arc<MemoryLocalStore>) {
        let persistence = Arc::new(MemoryLocalStore::new());
        let store = WatchlistStore::open(persistence.clone()).unwrap();
        (store, persistence)
    }

    #[test]
    fn test_add_prepends_and_normalizes() {
        let (store, _) = open_store();
        assert!(store.add(WatchlistRow::new("aapl")).unwrap());
        assert!(store.add(WatchlistRow::new("msft")).unwrap());

        let tickers: Vec<_> = store.rows().into_iter().map(|r| r.ticker).collect();
        assert_eq!(tickers, vec!["MSFT", "AAPL"]);
    }

    #[test]
    fn test_add_duplicate_is_noop() {
        let (store, _) = open_store();
        assert!(store.add(WatchlistRow::new("AAPL")).unwrap());
        assert!(!store.add(WatchlistRow::new("AAPL")).unwrap());
        assert!(!store.add(WatchlistRow::new(" aapl ")).unwrap());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_add_many_never_duplicates() {
        let (store, _) = open_store();
        for ticker in ["a", "b", "A", "c", "b", "C", "d", "a"] {
            store.add(WatchlistRow::new(ticker)).unwrap();
        }
        let rows = store.rows();
        assert_eq!(rows.len(), 4);
        assert_eq!(dedupe_rows(rows.clone()), rows);
    }

    #[test]
    fn test_add_empty_ticker_rejected() {
        let (store, persistence) = open_store();
        assert!(!store.add(WatchlistRow::new("!!")).unwrap());
        assert!(store.is_empty());
        assert!(persistence.load_watchlist().unwrap().is_none());
    }

    #[test]
    fn test_remove() {
        let (store, _) = open_store();
        store.add(WatchlistRow::new("AAPL")).unwrap();
        assert!(store.remove("aapl").unwrap());
        assert!(!store.remove("AAPL").unwrap());
        assert!(store.is_empty());
    }

    #[test]
    fn test_update_field() {
        let (store, _) = open_store();
        store.add(WatchlistRow::new("NVDA")).unwrap();

        assert!(store.update_field("NVDA", RowField::Catalyst, "earnings").unwrap());
        assert!(!store.update_field("AMD", RowField::Catalyst, "earnings").unwrap());
        assert_eq!(store.get("nvda").unwrap().catalyst, "earnings");
    }

    #[test]
    fn test_mutations_persist() {
        let (store, persistence) = open_store();
        store.add(WatchlistRow::new("AAPL").with_name("Apple")).unwrap();
        store.add(WatchlistRow::new("MSFT")).unwrap();
        store.remove("MSFT").unwrap();

        let saved = persistence.load_watchlist().unwrap().unwrap();
        assert_eq!(saved, vec![WatchlistRow::new("AAPL").with_name("Apple")]);

        let reopened = WatchlistStore::open(persistence).unwrap();
        assert_eq!(reopened.rows(), saved);
    }

    #[test]
    fn test_listener_fires_on_local_changes_only() {
        let (store, _) = open_store();
        let listener = Arc::new(CountingListener(AtomicUsize::new(0)));
        let weak: Weak<dyn ChangeListener> = Arc::downgrade(&(listener.clone() as Arc<dyn ChangeListener>));
        store.set_listener(weak);

        store.add(WatchlistRow::new("AAPL")).unwrap();
        store.add(WatchlistRow::new("AAPL")).unwrap();
        store.update_field("AAPL", RowField::Name, "Apple").unwrap();
        store.remove("TSLA").unwrap();
        store.replace_all(vec![WatchlistRow::new("TSLA")]).unwrap();

        assert_eq!(listener.0.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_replace_all_dedupes_and_persists() {
        let (store, persistence) = open_store();
        store
            .replace_all(vec![
                WatchlistRow::new("AAPL"),
                WatchlistRow::new("AAPL").with_name("dup"),
                WatchlistRow::new("MSFT"),
            ])
            .unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(persistence.load_watchlist().unwrap().unwrap().len(), 2);
    }

    #[test]
    fn test_concurrent_saves_match_memory() {
        let persistence = Arc::new(SlowFirstSave {
            inner: MemoryLocalStore::new(),
            first: AtomicBool::new(true),
        });
        let store = Arc::new(WatchlistStore::open(persistence.clone()).unwrap());

        let slow = {
            let store = store.clone();
            std::thread::spawn(move || store.add(WatchlistRow::new("AAPL")).unwrap())
        };
        std::thread::sleep(Duration::from_millis(50));
        store.add(WatchlistRow::new("MSFT")).unwrap();
        slow.join().unwrap();

        let saved = persistence.load_watchlist().unwrap().unwrap();
        assert_eq!(saved, store.rows());
        assert_eq!(saved.len(), 2);
    }

    #[test]
    fn test_listener_sees_persisted_list() {
        struct CheckingListener {
            persistence: Arc<MemoryLocalStore>,
            seen: parking_lot::Mutex<Vec<usize>>,
        }

        impl ChangeListener for CheckingListener {
            fn on_local_change(&self) {
                let saved = self.persistence.load_watchlist().unwrap().unwrap_or_default();
                self.seen.lock().push(saved.len());
            }
        }

        let (store, persistence) = open_store();
        let listener = Arc::new(CheckingListener {
            persistence: persistence.clone(),
            seen: parking_lot::Mutex::new(Vec::new()),
        });
        let weak: Weak<dyn ChangeListener> = Arc::downgrade(&(listener.clone() as Arc<dyn ChangeListener>));
        store.set_listener(weak);

        store.add(WatchlistRow::new("AAPL")).unwrap();
        store.add(WatchlistRow::new("MSFT")).unwrap();

        assert_eq!(*listener.seen.lock(), vec![1, 2]);
    }
}
