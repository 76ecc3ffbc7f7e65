//! Timers driving the sync client
//!
//! - Debounced push: a single-slot delayed task, replaced on every trigger
//! - Periodic poll: an interval task stopped through a shutdown channel

mod debounce;
mod poller;

pub use debounce::Debouncer;
pub use poller::Poller;
