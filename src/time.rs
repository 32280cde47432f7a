//! Clock abstraction.
//!
//! Timestamps attached to watcher events come from a [`Clock`] so tests
//! can pin time instead of racing the real clock.

use std::time::SystemTime;

/// Source of "now" for timestamping.
pub trait Clock: Send + Sync {
    /// Returns the current wall-clock time.
    fn now(&self) -> SystemTime;
}

/// Production clock backed by [`SystemTime::now()`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}
