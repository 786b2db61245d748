// src/sync/mod.rs

//! Low-level concurrency building blocks used by the scheduler.
//!
//! - [`spin`] holds the compare-and-swap spinlocks.
//! - [`counter`] provides [`ThreadSafeCounter`], used for fork/join counts.
//! - [`event`] provides [`SyncEvent`], the only blocking primitive.
//! - [`queue`] provides the lock-free MPMC [`LockFreeQueue`].

pub mod counter;
pub mod event;
pub mod queue;
pub mod spin;

pub use counter::ThreadSafeCounter;
pub use event::SyncEvent;
pub use queue::LockFreeQueue;
pub use spin::{
    RecursiveSpinLock, SpinGuard, SpinLock, SpinLockNoWait, SpinLockWaitNoSleep,
    SpinLockWaitSleep,
};
