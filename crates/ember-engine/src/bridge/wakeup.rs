//! Cross-thread wakeup signalling toward the event-loop thread.

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Wakeup source the bridge fires when a continuation is queued.
///
/// Implementations wrap whatever native cross-thread wakeup mechanism the
/// embedding event loop provides; firing must be callable from any thread.
/// Redundant fires must be harmless: a drain always empties the whole
/// results queue, so coalescing is expected.
pub trait Wakeup: Send + Sync {
    /// Request a wakeup of the event-loop thread.
    fn fire(&self);
}

/// Condvar-backed [`Wakeup`] for embeddings that park between events.
///
/// `fire` latches the signal and notifies; a waiting loop thread wakes,
/// consumes the latch, and drains. Fires while nobody waits are not lost:
/// the latch stays set until consumed.
pub struct NotifyWakeup {
    pending: Mutex<bool>,
    notify: Condvar,
    fires: AtomicU64,
}

impl NotifyWakeup {
    /// Create an unfired wakeup.
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(false),
            notify: Condvar::new(),
            fires: AtomicU64::new(0),
        }
    }

    /// Block until fired, consuming the signal.
    pub fn wait(&self) {
        let mut pending = self.pending.lock();
        while !*pending {
            self.notify.wait(&mut pending);
        }
        *pending = false;
    }

    /// Block until fired or until `timeout` elapses.
    ///
    /// Returns `true` if the signal was consumed.
    pub fn wait_for(&self, timeout: Duration) -> bool {
        let mut pending = self.pending.lock();
        if !*pending {
            self.notify.wait_for(&mut pending, timeout);
        }
        let fired = *pending;
        *pending = false;
        fired
    }

    /// Number of times [`Wakeup::fire`] has been called.
    pub fn fired_count(&self) -> u64 {
        self.fires.load(Ordering::Relaxed)
    }
}

impl Wakeup for NotifyWakeup {
    fn fire(&self) {
        let mut pending = self.pending.lock();
        *pending = true;
        self.fires.fetch_add(1, Ordering::Relaxed);
        self.notify.notify_one();
    }
}

impl Default for NotifyWakeup {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_wakeup_latches_before_wait() {
        let wakeup = NotifyWakeup::new();
        wakeup.fire();

        // Signal fired before anyone waited is not lost.
        assert!(wakeup.wait_for(Duration::from_millis(0)));
        assert_eq!(wakeup.fired_count(), 1);
    }

    #[test]
    fn test_wakeup_timeout_when_unfired() {
        let wakeup = NotifyWakeup::new();
        assert!(!wakeup.wait_for(Duration::from_millis(10)));
    }

    #[test]
    fn test_wakeup_crosses_threads() {
        let wakeup = Arc::new(NotifyWakeup::new());

        let firer = {
            let wakeup = wakeup.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                wakeup.fire();
            })
        };

        wakeup.wait();
        firer.join().unwrap();
        assert_eq!(wakeup.fired_count(), 1);
    }

    #[test]
    fn test_wakeup_redundant_fires_coalesce() {
        let wakeup = NotifyWakeup::new();
        wakeup.fire();
        wakeup.fire();
        wakeup.fire();

        assert!(wakeup.wait_for(Duration::from_millis(0)));
        // Latch consumed: no second signal pending.
        assert!(!wakeup.wait_for(Duration::from_millis(0)));
        assert_eq!(wakeup.fired_count(), 3);
    }
}
