//! Periodic task with explicit shutdown
//!
//! The first tick fires one full period after `start`; callers that need an
//! immediate run do it themselves before starting the poller.

use parking_lot::Mutex;
use std::future::Future;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

pub struct Poller {
    period: Duration,
    runtime: Handle,
    shutdown_tx: Mutex<Option<oneshot::Sender<()>>>,
}

impl Poller {
    /// The loop runs on `runtime`, so `start` may be called from any thread
    pub fn new(period: Duration, runtime: Handle) -> Self {
        Self {
            period,
            runtime,
            shutdown_tx: Mutex::new(None),
        }
    }

    /// Start ticking, replacing (and stopping) any running loop
    pub fn start<F, Fut>(&self, tick: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        if let Some(previous) = self.shutdown_tx.lock().replace(shutdown_tx) {
            let _ = previous.send(());
        }

        let period = self.period;
        self.runtime.spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            info!("Poller started ({:?} period)", period);
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = interval.tick() => {
                        // A tick in flight is abandoned on shutdown
                        tokio::select! {
                            _ = &mut shutdown_rx => break,
                            _ = tick() => {}
                        }
                    }
                }
            }
            debug!("Poller stopped");
        });
    }

    /// Stop the running loop, if any
    pub fn stop(&self) {
        if let Some(tx) = self.shutdown_tx.lock().take() {
            let _ = tx.send(());
        }
    }

    pub fn is_running(&self) -> bool {
        self.shutdown_tx
            .lock()
            .as_ref()
            .map(|tx| !tx.is_closed())
            .unwrap_or(false)
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.stop();
    }
}
