// src/sync/counter.rs

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

/// An atomic integer shared between threads.
///
/// Used for fork/join child counts and for caller-owned "external" counters
/// that a batch of tasks decrements as each one completes. Every mutating
/// operation returns the value *after* the update.
#[derive(Default)]
pub struct ThreadSafeCounter {
    value: AtomicI64,
}

impl ThreadSafeCounter {
    pub const fn new(value: i64) -> Self {
        Self {
            value: AtomicI64::new(value),
        }
    }

    pub fn get(&self) -> i64 {
        self.value.load(Ordering::SeqCst)
    }

    pub fn increment(&self) -> i64 {
        self.add(1)
    }

    pub fn decrement(&self) -> i64 {
        self.sub(1)
    }

    pub fn add(&self, amount: i64) -> i64 {
        self.value.fetch_add(amount, Ordering::SeqCst) + amount
    }

    pub fn sub(&self, amount: i64) -> i64 {
        self.value.fetch_sub(amount, Ordering::SeqCst) - amount
    }

    pub fn is_zero(&self) -> bool {
        self.get() == 0
    }
}

impl fmt::Debug for ThreadSafeCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ThreadSafeCounter").field(&self.get()).finish()
    }
}
