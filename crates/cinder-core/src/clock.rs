//! The controllable time source behind all TTL expiry.
//!
//! By default the clock tracks the wall clock. Tests pin it to a fixed
//! instant and advance it explicitly, which makes expiration fully
//! deterministic: no sleeps, no flaky timing windows.

use std::time::{Duration, SystemTime};

/// A swappable time source. Unpinned, `now()` is the wall clock; once
/// pinned it returns the pinned instant until pinned again or advanced.
#[derive(Debug, Clone, Default)]
pub struct Clock {
    pinned: Option<SystemTime>,
}

impl Clock {
    /// Creates an unpinned clock that follows the wall clock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current instant: the pinned time if set, otherwise
    /// the wall clock. Never blocks, never fails.
    pub fn now(&self) -> SystemTime {
        self.pinned.unwrap_or_else(SystemTime::now)
    }

    /// Freezes the clock at `instant`. Subsequent `now()` calls return
    /// it until the clock is pinned again or advanced.
    pub fn pin(&mut self, instant: SystemTime) {
        self.pinned = Some(instant);
    }

    /// Moves the clock forward by `delta`. An unpinned clock becomes
    /// pinned at wall-now plus `delta`.
    pub fn advance(&mut self, delta: Duration) {
        self.pinned = Some(self.now() + delta);
    }

    /// Returns `true` when the clock is under test control.
    pub fn is_pinned(&self) -> bool {
        self.pinned.is_some()
    }
}
