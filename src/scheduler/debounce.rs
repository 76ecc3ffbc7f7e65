//! Single-slot delayed task
//!
//! The slot holds the cancellation token (a oneshot sender) of the pending
//! task. Scheduling again drops the previous token, which wakes and cancels
//! the previous task, so a burst of triggers runs the action once, `delay`
//! after the last trigger. Once the delay has elapsed the action runs to
//! completion even if a new trigger arrives.

use parking_lot::Mutex;
use std::future::Future;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::debug;

pub struct Debouncer {
    delay: Duration,
    runtime: Handle,
    slot: Mutex<Option<oneshot::Sender<()>>>,
}

impl Debouncer {
    /// Tasks run on `runtime`, so `schedule` may be called from any thread
    pub fn new(delay: Duration, runtime: Handle) -> Self {
        Self {
            delay,
            runtime,
            slot: Mutex::new(None),
        }
    }

    /// Schedule `action` to run after the quiet period, replacing any pending one
    pub fn schedule<F, Fut>(&self, action: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (token, mut cancelled) = oneshot::channel::<()>();
        if self.slot.lock().replace(token).is_some() {
            debug!("Debounced task rescheduled");
        }

        let delay = self.delay;
        self.runtime.spawn(async move {
            tokio::select! {
                _ = &mut cancelled => {}
                _ = tokio::time::sleep(delay) => action().await,
            }
        });
    }

    /// Cancel the pending task, if any. Returns whether one was pending.
    pub fn cancel(&self) -> bool {
        match self.slot.lock().take() {
            Some(token) => !token.is_closed(),
            None => false,
        }
    }

    /// Whether the last scheduled task has not finished yet
    pub fn is_pending(&self) -> bool {
        self.slot
            .lock()
            .as_ref()
            .map(|token| !token.is_closed())
            .unwrap_or(false)
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
