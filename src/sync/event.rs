// src/sync/event.rs

//! A wait/trigger synchronization event.
//!
//! This is the only place in the crate where a thread actually sleeps:
//! workers park on their private event while idle, and callers of
//! [`Task::sync`](crate::task::Task::sync) park on the task's wait handle.

use std::fmt;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Manual- or auto-reset event.
///
/// - Manual reset: once triggered, every waiter (present and future) is
///   released until [`SyncEvent::reset`] is called.
/// - Auto reset: a trigger releases exactly one wait, and the event resets
///   itself as that wait returns. A trigger with nobody waiting is remembered
///   until the next wait.
pub struct SyncEvent {
    signaled: Mutex<bool>,
    cond: Condvar,
    manual_reset: bool,
}

impl SyncEvent {
    pub fn new(manual_reset: bool) -> Self {
        Self {
            signaled: Mutex::new(false),
            cond: Condvar::new(),
            manual_reset,
        }
    }

    pub fn manual_reset() -> Self {
        Self::new(true)
    }

    pub fn auto_reset() -> Self {
        Self::new(false)
    }

    pub fn trigger(&self) {
        let mut signaled = self.signaled.lock();
        *signaled = true;
        if self.manual_reset {
            self.cond.notify_all();
        } else {
            self.cond.notify_one();
        }
    }

    pub fn reset(&self) {
        *self.signaled.lock() = false;
    }

    pub fn is_signaled(&self) -> bool {
        *self.signaled.lock()
    }

    /// Block until the event is triggered.
    pub fn wait(&self) {
        let mut signaled = self.signaled.lock();
        while !*signaled {
            self.cond.wait(&mut signaled);
        }
        if !self.manual_reset {
            *signaled = false;
        }
    }

    /// Block until the event is triggered or `timeout` elapses.
    ///
    /// Returns `true` if the event was triggered.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut signaled = self.signaled.lock();
        while !*signaled {
            if self.cond.wait_until(&mut signaled, deadline).timed_out() {
                break;
            }
        }
        let fired = *signaled;
        if fired && !self.manual_reset {
            *signaled = false;
        }
        fired
    }
}

impl Default for SyncEvent {
    fn default() -> Self {
        Self::auto_reset()
    }
}

impl fmt::Debug for SyncEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncEvent")
            .field("signaled", &self.is_signaled())
            .field("manual_reset", &self.manual_reset)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn auto_reset_remembers_trigger_and_consumes_it() {
        let ev = SyncEvent::auto_reset();
        ev.trigger();
        assert!(ev.wait_timeout(Duration::from_millis(10)));
        assert!(!ev.wait_timeout(Duration::from_millis(10)));
    }

    #[test]
    fn manual_reset_stays_signaled_until_reset() {
        let ev = SyncEvent::manual_reset();
        ev.trigger();
        assert!(ev.wait_timeout(Duration::from_millis(10)));
        assert!(ev.wait_timeout(Duration::from_millis(10)));
        ev.reset();
        assert!(!ev.wait_timeout(Duration::from_millis(10)));
    }

    #[test]
    fn manual_reset_releases_every_waiter() {
        let ev = Arc::new(SyncEvent::manual_reset());
        let waiters: Vec<_> = (0..3)
            .map(|_| {
                let ev = Arc::clone(&ev);
                thread::spawn(move || ev.wait_timeout(Duration::from_secs(5)))
            })
            .collect();
        thread::sleep(Duration::from_millis(20));
        ev.trigger();
        for w in waiters {
            assert!(w.join().unwrap());
        }
    }

    #[test]
    fn wait_blocks_until_triggered_from_another_thread() {
        let ev = Arc::new(SyncEvent::auto_reset());
        let trigger = Arc::clone(&ev);
        let t = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            trigger.trigger();
        });
        ev.wait();
        t.join().unwrap();
        assert!(!ev.is_signaled());
    }
}
