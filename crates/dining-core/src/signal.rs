//! Per-actor grant signal.
//!
//! A [`GrantSignal`] is a binary semaphore that starts lowered. The protocol
//! raises it once per hunger episode, possibly from a neighbour's task, and
//! the owning actor consumes it exactly once before it starts eating.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

/// "Signal once, wait once" primitive with a capacity of one.
#[derive(Debug, Default)]
pub struct GrantSignal {
    /// Whether a grant is waiting to be consumed.
    granted: AtomicBool,

    /// Wakes the owning actor when the grant is raised.
    notify: Notify,
}

impl GrantSignal {
    /// Create a lowered signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the signal and wake the waiter, if any.
    ///
    /// Returns `false` without side effects when a grant is already
    /// outstanding. Signals never buffer more than one grant.
    pub fn raise(&self) -> bool {
        if self.granted.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.notify.notify_one();
        true
    }

    /// Whether a grant is waiting to be consumed.
    pub fn is_raised(&self) -> bool {
        self.granted.load(Ordering::Acquire)
    }

    /// Consume an outstanding grant without waiting.
    pub fn try_consume(&self) -> bool {
        self.granted.swap(false, Ordering::AcqRel)
    }

    /// Wait until the signal is raised, then consume it.
    ///
    /// Cancel-safe: dropping the future before it completes leaves any
    /// grant in place for the next call.
    pub async fn wait(&self) {
        loop {
            if self.try_consume() {
                return;
            }
            // `notify_one` stores a permit when nobody is waiting, so a raise
            // landing between the check above and this await is not lost.
            self.notify.notified().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[test]
    fn starts_lowered() {
        let signal = GrantSignal::new();
        assert!(!signal.is_raised());
        assert!(!signal.try_consume());
    }

    #[test]
    fn second_raise_is_rejected() {
        let signal = GrantSignal::new();
        assert!(signal.raise());
        assert!(!signal.raise());
        assert!(signal.try_consume());
        assert!(!signal.try_consume());
    }

    #[tokio::test]
    async fn wait_returns_immediately_when_raised() {
        let signal = GrantSignal::new();
        assert!(signal.raise());
        signal.wait().await;
        assert!(!signal.is_raised());
    }

    #[tokio::test]
    async fn raise_from_another_task_wakes_waiter() {
        let signal = Arc::new(GrantSignal::new());
        let waiter = {
            let signal = Arc::clone(&signal);
            tokio::spawn(async move { signal.wait().await })
        };
        tokio::task::yield_now().await;
        assert!(signal.raise());

        let joined = tokio::time::timeout(Duration::from_secs(5), waiter).await;
        assert!(matches!(joined, Ok(Ok(()))));
        assert!(!signal.is_raised());
    }

    #[tokio::test]
    async fn stale_wakeup_does_not_fake_a_grant() {
        let signal = GrantSignal::new();
        // Raise and consume without waiting: leaves a stored notify permit.
        assert!(signal.raise());
        signal.wait().await;

        let pending = tokio::time::timeout(Duration::from_millis(50), signal.wait()).await;
        assert!(pending.is_err(), "wait completed without a grant");
    }
}
