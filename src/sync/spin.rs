// src/sync/spin.rs

//! Compare-and-swap spinlocks.
//!
//! [`SpinLock`] owns the data it protects and hands out an RAII guard. Two
//! const parameters select the acquisition policy:
//!
//! - `WAIT`: spin until the lock is acquired, or fail fast and return `None`.
//! - `SLEEP`: yield the OS thread between spins instead of busy-polling.
//!
//! The scheduler uses the `WAIT = false` flavour to decide who gets to run a
//! scheduling pass: losing the race is not an error, it just means somebody
//! else is already doing the work.

use std::cell::UnsafeCell;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering::*};
use std::thread::{self, ThreadId};

use crossbeam_utils::Backoff;
use parking_lot::Mutex;

/// Waits for the lock, busy-polling between attempts.
pub type SpinLockWaitNoSleep<T> = SpinLock<T, true, false>;
/// Waits for the lock, yielding the thread between attempts.
pub type SpinLockWaitSleep<T> = SpinLock<T, true, true>;
/// Never waits: `lock` fails immediately when contended.
pub type SpinLockNoWait<T> = SpinLock<T, false, false>;

pub struct SpinLock<T, const WAIT: bool = true, const SLEEP: bool = false> {
    locked: AtomicBool,
    data: UnsafeCell<T>,
}

#[must_use = "dropping the guard releases the lock immediately"]
pub struct SpinGuard<'a, T> {
    data: &'a mut T,
    locked: &'a AtomicBool,
}

impl<T, const WAIT: bool, const SLEEP: bool> SpinLock<T, WAIT, SLEEP> {
    pub const fn new(data: T) -> Self {
        Self {
            locked: AtomicBool::new(false),
            data: UnsafeCell::new(data),
        }
    }

    /// Single acquisition attempt, regardless of `WAIT`.
    pub fn try_lock(&self) -> Option<SpinGuard<'_, T>> {
        if self
            .locked
            .compare_exchange(false, true, Acquire, Relaxed)
            .is_ok()
        {
            Some(self.guard())
        } else {
            None
        }
    }

    /// Acquire according to the lock's policy.
    ///
    /// Returns `None` only when `WAIT` is `false` and the lock is held.
    pub fn lock(&self) -> Option<SpinGuard<'_, T>> {
        let backoff = Backoff::new();
        loop {
            if !WAIT {
                // A weak CAS may fail spuriously, which would look like
                // contention here.
                return self.try_lock();
            }

            if self
                .locked
                .compare_exchange_weak(false, true, Acquire, Relaxed)
                .is_ok()
            {
                return Some(self.guard());
            }

            // test-and-test-and-set: read until the value changes before
            // trying to write again.
            while self.locked.load(Relaxed) {
                if SLEEP {
                    thread::yield_now();
                } else {
                    backoff.spin();
                }
            }
        }
    }

    pub fn is_locked(&self) -> bool {
        self.locked.load(Relaxed)
    }

    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }

    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }

    fn guard(&self) -> SpinGuard<'_, T> {
        SpinGuard {
            // Safety: the `locked` flag was just acquired, so no other guard
            // to this data exists until it is released.
            data: unsafe { &mut *self.data.get() },
            locked: &self.locked,
        }
    }
}

impl<T: Default, const WAIT: bool, const SLEEP: bool> Default for SpinLock<T, WAIT, SLEEP> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T, const WAIT: bool, const SLEEP: bool> fmt::Debug for SpinLock<T, WAIT, SLEEP> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpinLock")
            .field("locked", &self.is_locked())
            .field("wait", &WAIT)
            .field("sleep", &SLEEP)
            .finish_non_exhaustive()
    }
}

unsafe impl<T: Send, const WAIT: bool, const SLEEP: bool> Send for SpinLock<T, WAIT, SLEEP> {}
unsafe impl<T: Send, const WAIT: bool, const SLEEP: bool> Sync for SpinLock<T, WAIT, SLEEP> {}

// === impl SpinGuard ===

impl<T> Deref for SpinGuard<'_, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        self.data
    }
}

impl<T> DerefMut for SpinGuard<'_, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        self.data
    }
}

impl<T> Drop for SpinGuard<'_, T> {
    fn drop(&mut self) {
        self.locked.store(false, Release);
    }
}

impl<T: fmt::Debug> fmt::Debug for SpinGuard<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.data.fmt(f)
    }
}

/// A spinlock the owning thread may acquire more than once.
///
/// Every successful `lock` must be paired with an `unlock` on the same
/// thread; the lock is released when the level drops back to zero.
pub struct RecursiveSpinLock<const WAIT: bool = true, const SLEEP: bool = false> {
    guard: SpinLock<(), true, false>,
    level: AtomicUsize,
    owner: Mutex<Option<ThreadId>>,
}

impl<const WAIT: bool, const SLEEP: bool> RecursiveSpinLock<WAIT, SLEEP> {
    pub fn new() -> Self {
        Self {
            guard: SpinLock::new(()),
            level: AtomicUsize::new(0),
            owner: Mutex::new(None),
        }
    }

    pub fn lock(&self) -> bool {
        let me = thread::current().id();
        let backoff = Backoff::new();
        loop {
            {
                let _inner = self.guard.lock();
                let mut owner = self.owner.lock();
                if self.level.load(Acquire) == 0 {
                    self.level.store(1, Release);
                    *owner = Some(me);
                    return true;
                }
                if *owner == Some(me) {
                    self.level.fetch_add(1, AcqRel);
                    return true;
                }
            }

            if !WAIT {
                return false;
            }

            while self.level.load(Relaxed) != 0 {
                if SLEEP {
                    thread::yield_now();
                } else {
                    backoff.spin();
                }
            }
        }
    }

    pub fn unlock(&self) {
        let _inner = self.guard.lock();
        let mut owner = self.owner.lock();
        debug_assert_eq!(
            *owner,
            Some(thread::current().id()),
            "RecursiveSpinLock unlocked by a thread that does not own it"
        );
        let prev = self.level.fetch_sub(1, AcqRel);
        debug_assert!(prev > 0, "RecursiveSpinLock unlocked more times than locked");
        if prev == 1 {
            *owner = None;
        }
    }

    /// Current recursion depth; zero when unlocked.
    pub fn level(&self) -> usize {
        self.level.load(Acquire)
    }
}

impl<const WAIT: bool, const SLEEP: bool> Default for RecursiveSpinLock<WAIT, SLEEP> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const WAIT: bool, const SLEEP: bool> fmt::Debug for RecursiveSpinLock<WAIT, SLEEP> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecursiveSpinLock")
            .field("level", &self.level())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn no_wait_lock_fails_fast_when_held() {
        let lock: SpinLockNoWait<u32> = SpinLock::new(0);
        let guard = lock.lock().expect("uncontended lock must succeed");
        assert!(lock.is_locked());
        assert!(lock.lock().is_none());
        assert!(lock.try_lock().is_none());
        drop(guard);
        assert!(lock.lock().is_some());
    }

    #[test]
    fn uncontended_no_wait_lock_always_succeeds() {
        let lock: SpinLockNoWait<u32> = SpinLock::new(0);
        for _ in 0..100_000 {
            let mut guard = lock.lock().expect("nobody else holds the lock");
            *guard += 1;
        }
        assert_eq!(*lock.lock().unwrap(), 100_000);
    }

    #[test]
    fn waiting_lock_serialises_increments() {
        let lock = Arc::new(SpinLockWaitSleep::new(0u64));
        let threads: Vec<_> = (0..4)
            .map(|_| {
                let lock = Arc::clone(&lock);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        *lock.lock().unwrap() += 1;
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
        assert_eq!(*lock.lock().unwrap(), 4000);
    }

    #[test]
    fn recursive_lock_reenters_on_owner_thread_only() {
        let lock = Arc::new(RecursiveSpinLock::<false, false>::new());
        assert!(lock.lock());
        assert!(lock.lock());
        assert_eq!(lock.level(), 2);

        let other = Arc::clone(&lock);
        let acquired = thread::spawn(move || other.lock()).join().unwrap();
        assert!(!acquired);

        lock.unlock();
        lock.unlock();
        assert_eq!(lock.level(), 0);

        let other = Arc::clone(&lock);
        let acquired = thread::spawn(move || {
            let ok = other.lock();
            other.unlock();
            ok
        })
        .join()
        .unwrap();
        assert!(acquired);
    }
}
