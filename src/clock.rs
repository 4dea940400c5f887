use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Monotonic tick source in milliseconds
pub trait Clock: Send {
    fn now_ms(&self) -> u64;
}

/// Milliseconds since the clock was created
#[derive(Debug)]
pub struct MonotonicClock {
    start: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

/// Advances a fixed step on every reading.
///
/// Used to replay recordings at their nominal tick spacing regardless of how
/// fast the host processes them.
#[derive(Debug)]
pub struct SteppingClock {
    next: AtomicU64,
    step_ms: u64,
}

impl SteppingClock {
    pub fn new(start_ms: u64, step_ms: u64) -> Self {
        Self {
            next: AtomicU64::new(start_ms),
            step_ms,
        }
    }
}

impl Clock for SteppingClock {
    fn now_ms(&self) -> u64 {
        self.next.fetch_add(self.step_ms, Ordering::Relaxed)
    }
}
