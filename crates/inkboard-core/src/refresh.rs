//! Periodic refresh scheduling.
//!
//! The board re-fetches pinned threads and the thread list on a fixed
//! interval. The schedule only tracks timing; whoever owns it drives the
//! actual fetch and must call [`RefreshSchedule::stop`] on teardown.

#[cfg(not(target_arch = "wasm32"))]
use std::time::{Duration, Instant};

#[cfg(target_arch = "wasm32")]
use web_time::{Duration, Instant};

/// Default refresh interval in seconds.
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 60;

/// Start/stop bookkeeping for a fixed-interval refresh.
#[derive(Debug, Clone)]
pub struct RefreshSchedule {
    interval: Duration,
    running: bool,
    last_run: Option<Instant>,
    runs: u64,
}

impl RefreshSchedule {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            running: false,
            last_run: None,
            runs: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Start ticking. The first refresh is due one interval after `now`.
    pub fn start(&mut self, now: Instant) {
        self.running = true;
        self.last_run = Some(now);
    }

    /// Stop ticking. A stopped schedule is never due.
    pub fn stop(&mut self) {
        self.running = false;
        self.last_run = None;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// When the next refresh is due, or `None` if stopped.
    pub fn next_due(&self) -> Option<Instant> {
        if !self.running {
            return None;
        }
        self.last_run.map(|last| last + self.interval)
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.next_due().is_some_and(|due| now >= due)
    }

    /// Record a completed refresh. Ignored when stopped, so a fetch that
    /// finishes after teardown cannot restart the schedule.
    pub fn mark_run(&mut self, now: Instant) {
        if self.running {
            self.last_run = Some(now);
            self.runs += 1;
        }
    }

    /// Refreshes completed since creation.
    pub fn runs(&self) -> u64 {
        self.runs
    }
}

impl Default for RefreshSchedule {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_REFRESH_INTERVAL_SECS))
    }
}
