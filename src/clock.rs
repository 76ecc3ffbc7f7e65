//! Server timestamp source

use chrono::Utc;
use parking_lot::Mutex;

/// Epoch-millis clock that never repeats or goes backwards.
///
/// Each reading is `max(wall_ms, last + 1)`, so two writes through the same
/// server always carry distinct, increasing timestamps even within one
/// millisecond or across a wall-clock step back.
#[derive(Debug, Default)]
pub struct MonotonicClock {
    last: Mutex<u64>,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now_ms(&self) -> u64 {
        self.next_after(wall_ms())
    }

    fn next_after(&self, wall: u64) -> u64 {
        let mut last = self.last.lock();
        let next = wall.max(*last + 1);
        *last = next;
        next
    }
}

fn wall_ms() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracks_wall_clock() {
        let clock = MonotonicClock::new();
        let before = wall_ms();
        let now = clock.now_ms();
        assert!(now >= before);
    }

    #[test]
    fn test_strictly_increasing() {
        let clock = MonotonicClock::new();
        let mut previous = 0;
        for _ in 0..1000 {
            let now = clock.now_ms();
            assert!(now > previous);
            previous = now;
        }
    }

    #[test]
    fn test_wall_clock_step_back() {
        let clock = MonotonicClock::new();
        assert_eq!(clock.next_after(5_000), 5_000);
        assert_eq!(clock.next_after(4_000), 5_001);
        assert_eq!(clock.next_after(5_001), 5_002);
        assert_eq!(clock.next_after(9_000), 9_000);
    }
}
