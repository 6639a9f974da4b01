//! Monotonic clock abstraction.
//!
//! The control and routine state machines never read the OS clock
//! directly; they hold an `Rc<dyn Clock>` so tests can substitute a
//! manually advanced fake and step through transitions tick by tick.
//! All duration checks in the core are "now minus recorded stamp",
//! never scheduled callbacks.

use std::cell::Cell;
use std::time::Instant;

/// A source of monotonic time, read in whole milliseconds.
pub trait Clock {
    /// Current monotonic reading in milliseconds.
    fn now_ms(&self) -> u64;

    /// Milliseconds elapsed since an earlier reading.
    fn elapsed_ms(&self, since_ms: u64) -> u64 {
        self.now_ms().saturating_sub(since_ms)
    }
}

/// OS-backed clock. Readings count from clock construction.
#[derive(Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Create a clock whose readings start at zero.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// Manually advanced clock for deterministic tests.
#[derive(Debug, Default)]
pub struct FakeClock {
    now_ms: Cell<u64>,
}

impl FakeClock {
    /// Create a fake clock at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the current reading.
    pub fn set_ms(&self, now_ms: u64) {
        self.now_ms.set(now_ms);
    }

    /// Advance the current reading.
    pub fn advance_ms(&self, delta_ms: u64) {
        self.now_ms.set(self.now_ms.get() + delta_ms);
    }
}

impl Clock for FakeClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.get()
    }
}
