//! Monotonic time source
//!
//! Everything below the binary takes `now_ms` as an argument; this is the
//! one place that reads the host clock.

use std::time::Instant;

/// Source of "ms since start" timestamps
pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// Milliseconds elapsed since the monitor started
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    start: Instant,
}

impl MonotonicClock {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}
