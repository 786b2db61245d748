// src/scheduler/stats.rs

//! Scheduler counters.

use std::sync::atomic::{AtomicU64, Ordering::Relaxed};

/// Point-in-time copy of the scheduler counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Tasks accepted by `add_task`, dependencies included.
    pub submitted: u64,
    /// Tasks handed straight to an idle worker.
    pub dispatched_direct: u64,
    /// Tasks that had to wait on the ready queue.
    pub ready_enqueued: u64,
    pub completed: u64,
    /// Scheduling passes that ran.
    pub passes: u64,
    /// Pass requests that found another thread's pass in progress.
    pub passes_skipped: u64,
    /// Task bodies that panicked.
    pub panics: u64,
}

#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    pub submitted: AtomicU64,
    pub dispatched_direct: AtomicU64,
    pub ready_enqueued: AtomicU64,
    pub completed: AtomicU64,
    pub passes: AtomicU64,
    pub passes_skipped: AtomicU64,
    pub panics: AtomicU64,
}

impl StatsCounters {
    #[inline]
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Relaxed);
    }

    pub fn snapshot(&self) -> SchedulerStats {
        SchedulerStats {
            submitted: self.submitted.load(Relaxed),
            dispatched_direct: self.dispatched_direct.load(Relaxed),
            ready_enqueued: self.ready_enqueued.load(Relaxed),
            completed: self.completed.load(Relaxed),
            passes: self.passes.load(Relaxed),
            passes_skipped: self.passes_skipped.load(Relaxed),
            panics: self.panics.load(Relaxed),
        }
    }
}
