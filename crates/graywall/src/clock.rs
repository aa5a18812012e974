//! Monotonic nanosecond clock seam.
//!
//! The filter only ever compares timestamps taken from the same [`Clock`],
//! so the epoch is arbitrary. Wall-clock time is never consulted.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Source of monotonically non-decreasing nanosecond timestamps.
pub trait Clock: Send + Sync {
    /// Current timestamp in nanoseconds.
    fn now_ns(&self) -> u64;
}

/// Clock backed by [`Instant`], counting from its construction.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Create a clock whose zero is now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ns(&self) -> u64 {
        // u64 nanoseconds covers ~584 years of uptime.
        self.origin.elapsed().as_nanos() as u64
    }
}

/// Manually driven clock for tests and trace replay.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    /// Create a clock fixed at `start_ns`.
    #[must_use]
    pub const fn new(start_ns: u64) -> Self {
        Self {
            now: AtomicU64::new(start_ns),
        }
    }

    /// Move the clock to `at_ns`. Earlier values are ignored.
    pub fn set(&self, at_ns: u64) {
        self.now.fetch_max(at_ns, Ordering::AcqRel);
    }

    /// Advance the clock by `delta_ns` and return the new time.
    pub fn advance(&self, delta_ns: u64) -> u64 {
        self.now
            .fetch_add(delta_ns, Ordering::AcqRel)
            .saturating_add(delta_ns)
    }
}

impl Clock for ManualClock {
    fn now_ns(&self) -> u64 {
        self.now.load(Ordering::Acquire)
    }
}
