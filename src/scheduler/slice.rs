// src/scheduler/slice.rs

//! The scheduling pass.
//!
//! A pass:
//!
//! 1. Drains the pending queue. Tasks that finished their body outside the
//!    table are either completed on the spot or registered so a later pass
//!    completes them once their children are done. Unscheduled tasks are
//!    registered if anything depends on them or they have dependencies, and
//!    scheduled immediately if they have none.
//! 2. Walks the active table. Unscheduled tasks whose dependencies have all
//!    completed are scheduled (and dropped from the table unless somebody
//!    depends on them). Scheduled tasks that are fully executed are completed
//!    and dropped.
//! 3. Pairs queued ready tasks with idle workers.
//!
//! Only one pass runs at a time. Requests that arrive while a pass is running
//! set a flag that the running pass picks up before it releases the lock, so
//! no request is lost and re-entrant requests from inside a pass are safe.
//! Only requests that find another thread's pass running count as skipped.

use std::cell::Cell;
use std::sync::Arc;
use std::sync::atomic::{Ordering::SeqCst, fence};

use tracing::trace;

use crate::scheduler::Scheduler;
use crate::scheduler::stats::StatsCounters;
use crate::scheduler::table::ActiveTable;
use crate::task::TaskRef;

thread_local! {
    /// Address of the scheduler whose pass this thread is running, or 0.
    static PASS_OWNER: Cell<usize> = const { Cell::new(0) };
}

impl Scheduler {
    /// Request a scheduling pass, running it on this thread unless another
    /// thread is already running one.
    pub fn scheduler_slice(&self) {
        if self.is_exiting() {
            return;
        }
        let shared = &self.shared;
        shared.slice_requested.store(true, SeqCst);
        // Pairs with the fence after unlocking below.
        fence(SeqCst);

        loop {
            let Some(mut table) = shared.table.try_lock() else {
                // From inside our own pass the flag alone is enough.
                if !self.passing_on_this_thread() {
                    StatsCounters::bump(&shared.stats.passes_skipped);
                    if let Some(rescan) = &shared.rescan {
                        rescan.wake();
                    }
                }
                return;
            };
            let previous = PASS_OWNER.replace(self.shared_addr());
            while shared.slice_requested.swap(false, SeqCst) {
                if self.is_exiting() {
                    break;
                }
                self.run_pass(&mut table);
            }
            PASS_OWNER.set(previous);

            fence(SeqCst);
            if self.is_exiting() {
                // prepare_quit could not take the table while we held it.
                table.clear();
                return;
            }
            drop(table);

            // A request that landed between our last check and the unlock
            // would otherwise be lost.
            fence(SeqCst);
            if !shared.slice_requested.load(SeqCst) || self.is_exiting() {
                return;
            }
        }
    }

    fn shared_addr(&self) -> usize {
        Arc::as_ptr(&self.shared) as usize
    }

    fn passing_on_this_thread(&self) -> bool {
        PASS_OWNER.get() == self.shared_addr()
    }

    fn run_pass(&self, table: &mut ActiveTable) {
        StatsCounters::bump(&self.shared.stats.passes);

        while let Some(task) = self.shared.pending.deq() {
            self.drain_pending(table, task);
        }

        table.retain(|task| self.visit_active(task));

        self.balance();
        trace!(
            active = table.len(),
            ready = self.shared.ready.len(),
            idle = self.shared.idle.len(),
            "scheduling pass finished"
        );
    }

    fn drain_pending(&self, table: &mut ActiveTable, task: TaskRef) {
        if task.is_scheduled() {
            // Came back from a worker: body done, completion outstanding.
            if task.is_hashed() {
                return;
            }
            if task.is_executed() {
                task.on_executed(self);
            } else {
                table.insert(task);
            }
            return;
        }

        let deps = task.dependencies();
        if task.is_dependency() || !deps.is_empty() {
            table.insert(Arc::clone(&task));
        }
        if deps.is_empty() {
            self.schedule_task(task);
        }
    }

    /// Returns whether `task` stays in the table.
    fn visit_active(&self, task: &TaskRef) -> bool {
        if task.is_scheduled() {
            if task.is_executed() {
                task.flags.set_hashed(false);
                task.on_executed(self);
                return false;
            }
            return true;
        }

        let mut ready = true;
        for dep in task.dependencies() {
            if !dep.is_submitted() {
                // Reported dynamically after submission.
                dep.flags.set_dependency(true);
                self.submit(Arc::clone(&dep), true);
            }
            if !dep.is_completed() {
                ready = false;
            }
        }
        if !ready {
            return true;
        }

        let keep = task.is_dependency();
        if !keep {
            // Must be clear before a worker can observe the task.
            task.flags.set_hashed(false);
        }
        self.schedule_task(Arc::clone(task));
        keep
    }

    /// Hand queued ready tasks to queued idle workers until one side runs
    /// out.
    ///
    /// Both producers (after enqueuing a ready task) and workers (after
    /// enqueuing themselves as idle) call this; the fences make sure at
    /// least one of two racing callers sees both enqueues.
    pub(crate) fn balance(&self) {
        let shared = &self.shared;
        loop {
            if self.is_exiting() {
                return;
            }
            fence(SeqCst);
            let Some(worker) = shared.idle.deq() else {
                return;
            };
            match shared.ready.deq() {
                Some(task) => {
                    trace!(task = task.id(), worker = worker.index(), "ready task dispatched");
                    worker.set_task(task);
                }
                None => {
                    shared.idle.enq(worker);
                    fence(SeqCst);
                    if shared.ready.is_empty() {
                        return;
                    }
                }
            }
        }
    }
}
