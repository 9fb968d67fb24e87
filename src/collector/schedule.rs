//! Refresh windows for expensive metadata.
//!
//! Server settings, the database list and the standby application list are
//! re-fetched on independent timers instead of every cycle. A window is
//! marked refreshed only after its fetch succeeded, so a failed refresh is
//! retried on the next cycle rather than after a full interval.

use std::time::{Duration, Instant};

/// One named refresh timer: last successful run plus configured interval.
#[derive(Debug, Clone, Copy)]
pub struct RefreshWindow {
    interval: Duration,
    last_run: Option<Instant>,
}

impl RefreshWindow {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_run: None,
        }
    }

    /// Returns true when the window should fire this cycle.
    ///
    /// A window that never ran is always stale; a zero interval disables
    /// caching entirely (refresh every cycle, useful for tests).
    pub fn is_stale(&self, now: Instant) -> bool {
        if self.interval.is_zero() {
            return true;
        }
        match self.last_run {
            Some(last) => now.duration_since(last) > self.interval,
            None => true,
        }
    }

    /// Records a successful refresh.
    pub fn mark_refreshed(&mut self, now: Instant) {
        self.last_run = Some(now);
    }
}
