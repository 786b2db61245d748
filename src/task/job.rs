// src/task/job.rs

//! The body of a task.

use crate::scheduler::Scheduler;
use crate::task::TaskRef;

/// Work that a [`Task`](super::Task) runs on a worker thread.
///
/// Implementors only have to provide [`execute`](Job::execute). Closures of
/// the form `Fn(&Scheduler)` are jobs too.
///
/// A job may be run more than once over its lifetime (a task can be
/// [`reset`](super::Task::reset) and resubmitted), so it takes `&self`.
pub trait Job: Send + Sync + 'static {
    /// Run the body. The scheduler is passed in so the body can submit more
    /// work, including fork/join children of its own task.
    fn execute(&self, scheduler: &Scheduler);

    /// Dependencies reported dynamically, in addition to the ones declared
    /// on the task builder. Queried every time the scheduler needs them.
    fn dependencies(&self) -> Vec<TaskRef> {
        Vec::new()
    }

    /// Called once per run, when the task is complete: the body has returned
    /// and every child has completed too.
    fn completed(&self) {}

    fn name(&self) -> Option<&str> {
        None
    }
}

impl<F> Job for F
where
    F: Fn(&Scheduler) + Send + Sync + 'static,
{
    fn execute(&self, scheduler: &Scheduler) {
        self(scheduler)
    }
}
