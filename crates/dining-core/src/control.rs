//! Run control shared by the runner and every actor task.
//!
//! Actors loop forever in production. [`RunControl`] is the one way to end
//! them: a stop flag plus a notification so that actors parked on a sleep or
//! a grant wake up and leave their loop.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::Notify;
use tokio::time::Instant;

/// Shared stop flag and run bound.
#[derive(Debug)]
pub struct RunControl {
    /// Whether a stop has been requested.
    stop_requested: AtomicBool,

    /// Wakes every task parked in [`stopped`](Self::stopped).
    stop_notify: Notify,

    /// Wall-clock time when the table was set.
    started_at: DateTime<Utc>,

    /// Runtime clock reading at the same moment; elapsed time and the
    /// run bound are both measured on this clock.
    started: Instant,

    /// Maximum run time in seconds (0 = unlimited).
    max_real_time_seconds: u64,
}

impl RunControl {
    /// Create control state bounded to `max_real_time_seconds` (0 = unlimited).
    pub fn new(max_real_time_seconds: u64) -> Self {
        Self {
            stop_requested: AtomicBool::new(false),
            stop_notify: Notify::new(),
            started_at: Utc::now(),
            started: Instant::now(),
            max_real_time_seconds,
        }
    }

    /// Control state for a run that only ends on request.
    pub fn unbounded() -> Self {
        Self::new(0)
    }

    // -----------------------------------------------------------------------
    // Stop
    // -----------------------------------------------------------------------

    /// Request every actor to stop after its current phase.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
        self.stop_notify.notify_waiters();
    }

    /// Check whether a stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// Wait until a stop is requested.
    ///
    /// Returns immediately if one already was.
    pub async fn stopped(&self) {
        loop {
            let notified = self.stop_notify.notified();
            tokio::pin!(notified);
            // Register before checking the flag; `notify_waiters` stores no
            // permit for late arrivals.
            notified.as_mut().enable();
            if self.is_stop_requested() {
                return;
            }
            notified.await;
        }
    }

    /// Sleep for `ms` milliseconds unless a stop arrives first.
    ///
    /// Returns `true` if the full duration elapsed.
    pub async fn sleep_unless_stopped(&self, ms: u64) -> bool {
        tokio::select! {
            biased;
            () = self.stopped() => false,
            () = tokio::time::sleep(std::time::Duration::from_millis(ms)) => true,
        }
    }

    // -----------------------------------------------------------------------
    // Boundaries
    // -----------------------------------------------------------------------

    /// Configured run bound in seconds (0 = unlimited).
    pub const fn max_real_time_seconds(&self) -> u64 {
        self.max_real_time_seconds
    }

    /// Wall-clock time when the table was set.
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Whole seconds elapsed since the table was set, on the runtime clock.
    pub fn elapsed_seconds(&self) -> u64 {
        self.started.elapsed().as_secs()
    }
}

impl Default for RunControl {
    fn default() -> Self {
        Self::unbounded()
    }
}
