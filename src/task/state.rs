// src/task/state.rs

//! Per-task state flags and the public run-state view.

use std::sync::atomic::{AtomicBool, Ordering::SeqCst};

/// The atomic flags every [`Task`](super::Task) carries.
///
/// All accesses are `SeqCst`: the scheduler relies on "store my flag, then
/// read yours" handshakes between a finishing dependency and a newly
/// submitted dependent, and those need a single total order.
#[derive(Debug, Default)]
pub(crate) struct TaskFlags {
    /// Handed to `add_task` (directly or as somebody's dependency).
    submitted: AtomicBool,
    /// Assigned to a worker or placed on the ready queue.
    scheduled: AtomicBool,
    /// A worker started running the body.
    triggered: AtomicBool,
    /// The body returned.
    executed: AtomicBool,
    /// Some thread claimed completion for this run.
    finishing: AtomicBool,
    /// Completion observers have been notified.
    completed: AtomicBool,
    /// Some other task lists this one as a dependency.
    dependency: AtomicBool,
    /// Registered in the scheduler's active table.
    hashed: AtomicBool,
}

macro_rules! flag_accessors {
    ($($field:ident => $get:ident, $set:ident;)*) => {
        $(
            #[inline]
            pub(crate) fn $get(&self) -> bool {
                self.$field.load(SeqCst)
            }

            #[inline]
            pub(crate) fn $set(&self, value: bool) {
                self.$field.store(value, SeqCst);
            }
        )*
    };
}

impl TaskFlags {
    flag_accessors! {
        submitted => submitted, set_submitted;
        scheduled => scheduled, set_scheduled;
        triggered => triggered, set_triggered;
        executed => executed, set_executed;
        completed => completed, set_completed;
        dependency => dependency, set_dependency;
        hashed => hashed, set_hashed;
    }

    /// Mark as submitted; returns `false` if it already was.
    pub(crate) fn try_submit(&self) -> bool {
        !self.submitted.swap(true, SeqCst)
    }

    /// Claim completion for this run; returns `false` if somebody already
    /// did. `completed` is only set once the observers have run.
    pub(crate) fn try_complete(&self) -> bool {
        !self.finishing.swap(true, SeqCst)
    }

    /// Clear everything that describes a single run.
    pub(crate) fn reset(&self) {
        self.set_submitted(false);
        self.set_scheduled(false);
        self.set_triggered(false);
        self.set_executed(false);
        self.finishing.store(false, SeqCst);
        self.set_completed(false);
        self.set_dependency(false);
    }
}

/// Public, read-only view of where a task is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskRunState {
    /// Built but never submitted (or reset since).
    Created,
    /// Submitted; waiting on dependencies or on a scheduling pass.
    Pending,
    /// Handed to a worker or sitting on the ready queue.
    Scheduled,
    /// The body is running.
    Executing,
    /// The body returned but spawned children are still in flight.
    AwaitingChildren,
    /// Completion has been signalled.
    Completed,
}

impl TaskRunState {
    pub(crate) fn from_flags(flags: &TaskFlags, children: i64) -> Self {
        if flags.completed() {
            TaskRunState::Completed
        } else if flags.executed() {
            if children > 0 {
                TaskRunState::AwaitingChildren
            } else {
                // Body and children are done; completion is one pass away.
                TaskRunState::Executing
            }
        } else if flags.triggered() {
            TaskRunState::Executing
        } else if flags.scheduled() {
            TaskRunState::Scheduled
        } else if flags.submitted() {
            TaskRunState::Pending
        } else {
            TaskRunState::Created
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claiming_completion_does_not_mark_completed() {
        let flags = TaskFlags::default();
        assert!(flags.try_complete());
        assert!(!flags.try_complete());
        assert!(!flags.completed());
        assert_eq!(TaskRunState::from_flags(&flags, 0), TaskRunState::Created);

        flags.set_completed(true);
        assert_eq!(TaskRunState::from_flags(&flags, 0), TaskRunState::Completed);
    }

    #[test]
    fn reset_allows_completion_to_be_claimed_again() {
        let flags = TaskFlags::default();
        flags.set_dependency(true);
        assert!(flags.try_complete());
        flags.set_completed(true);

        flags.reset();
        assert!(!flags.completed());
        assert!(!flags.dependency());
        assert!(flags.try_complete());
    }
}
