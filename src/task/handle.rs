// src/task/handle.rs

//! The [`Task`] unit of work and its state machine.
//!
//! A run goes through these steps:
//!
//! 1. `Scheduler::add_task` marks it submitted.
//! 2. A scheduling pass (or `add_task` itself, for tasks with nothing to wait
//!    on) marks it scheduled and hands it to a worker or the ready queue.
//! 3. A worker calls [`Task::trigger`]: the body runs and the task is marked
//!    executed.
//! 4. Once the body has returned *and* every fork/join child has completed,
//!    [`Task::on_executed`] fires exactly once: external counter, wait
//!    handle, parent, and dependents are notified.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, error, trace};

use crate::scheduler::Scheduler;
use crate::sync::{SyncEvent, ThreadSafeCounter};
use crate::task::builder::TaskBuilder;
use crate::task::state::{TaskFlags, TaskRunState};
use crate::task::{Job, TaskId, TaskRef};

thread_local! {
    static CURRENT: RefCell<Option<TaskRef>> = const { RefCell::new(None) };
}

pub struct Task {
    pub(crate) id: TaskId,
    pub(crate) name: Option<String>,
    pub(crate) job: Box<dyn Job>,
    pub(crate) flags: TaskFlags,
    /// Dependencies declared up front (builder / `add_dependency`).
    pub(crate) declared: Mutex<Vec<TaskRef>>,
    /// Outstanding fork/join children.
    pub(crate) children: Arc<ThreadSafeCounter>,
    /// Decremented when this task completes.
    pub(crate) external: Option<Arc<ThreadSafeCounter>>,
    /// Set for tasks created through [`Task::spawn_child`].
    pub(crate) parent: Option<Weak<Task>>,
    /// Manual-reset event released on completion.
    pub(crate) wait_handle: Option<SyncEvent>,
}

impl Task {
    pub fn builder<J: Job>(job: J) -> TaskBuilder {
        TaskBuilder::new(job)
    }

    /// Build a task with no dependencies and no wait handle.
    pub fn new<J: Job>(job: J) -> TaskRef {
        TaskBuilder::new(job).build()
    }

    /// The task whose body is running on this thread, if any.
    pub fn current() -> Option<TaskRef> {
        CURRENT.with(|c| c.borrow().clone())
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    /// The builder-supplied name, falling back to the job's own name.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref().or_else(|| self.job.name())
    }

    /// Every dependency of this task: declared ones plus the ones the job
    /// reports dynamically.
    pub fn dependencies(&self) -> Vec<TaskRef> {
        let mut deps = self.declared.lock().clone();
        deps.extend(self.job.dependencies());
        deps
    }

    /// Declare another dependency. Only meaningful before submission.
    pub fn add_dependency(&self, dep: TaskRef) {
        debug_assert!(
            !self.is_submitted(),
            "dependencies must be declared before the task is submitted"
        );
        debug_assert!(dep.id != self.id, "a task cannot depend on itself");
        self.declared.lock().push(dep);
    }

    pub fn is_submitted(&self) -> bool {
        self.flags.submitted()
    }

    pub fn is_scheduled(&self) -> bool {
        self.flags.scheduled()
    }

    pub fn is_triggered(&self) -> bool {
        self.flags.triggered()
    }

    /// The body has returned and no fork/join child is outstanding.
    pub fn is_executed(&self) -> bool {
        self.flags.executed() && self.children.get() <= 0
    }

    /// Completion observers have been notified for the current run.
    pub fn is_completed(&self) -> bool {
        self.flags.completed()
    }

    pub fn is_dependency(&self) -> bool {
        self.flags.dependency()
    }

    pub fn is_hashed(&self) -> bool {
        self.flags.hashed()
    }

    /// Number of fork/join children that have not completed yet.
    pub fn child_count(&self) -> i64 {
        self.children.get()
    }

    pub fn run_state(&self) -> TaskRunState {
        TaskRunState::from_flags(&self.flags, self.children.get())
    }

    /// Block until this run has completed.
    ///
    /// Tasks built without a wait handle return immediately.
    pub fn sync(&self) {
        match &self.wait_handle {
            Some(event) => event.wait(),
            None => debug!(task = self.id, "sync on a task without a wait handle"),
        }
    }

    /// Like [`Task::sync`] but gives up after `timeout`.
    ///
    /// Returns whether the task has completed.
    pub fn sync_timeout(&self, timeout: Duration) -> bool {
        match &self.wait_handle {
            Some(event) => event.wait_timeout(timeout),
            None => self.is_completed(),
        }
    }

    /// Prepare for resubmission after the previous run completed.
    pub fn reset(&self) {
        debug_assert!(!self.is_hashed(), "reset while registered with a scheduler");
        self.flags.reset();
        if let Some(event) = &self.wait_handle {
            event.reset();
        }
    }

    /// Create and submit a fork/join child of this task.
    ///
    /// This task will not complete until the child has. Meant to be called
    /// from this task's own body, usually through [`Task::current`].
    pub fn spawn_child<J: Job>(self: &Arc<Self>, scheduler: &Scheduler, job: J) -> TaskRef {
        self.spawn_child_with(scheduler, TaskBuilder::new(job))
    }

    /// Like [`Task::spawn_child`] but with a caller-configured builder.
    pub fn spawn_child_with(self: &Arc<Self>, scheduler: &Scheduler, builder: TaskBuilder) -> TaskRef {
        let child = builder.parent(Arc::downgrade(self)).build();
        let outstanding = self.children.increment();
        trace!(parent = self.id, child = child.id, outstanding, "spawned child task");
        scheduler.add_task(Arc::clone(&child));
        child
    }

    /// Run the body on the calling worker thread.
    pub(crate) fn trigger(self: &Arc<Self>, scheduler: &Scheduler) {
        self.flags.set_triggered(true);
        trace!(task = self.id, name = ?self.name(), "task started");

        let previous = CURRENT.with(|c| c.replace(Some(Arc::clone(self))));
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.job.execute(scheduler)));
        CURRENT.with(|c| *c.borrow_mut() = previous);
        if let Err(payload) = outcome {
            error!(
                task = self.id,
                name = ?self.name(),
                panic = %panic_message(payload.as_ref()),
                "task body panicked"
            );
            scheduler.record_panic();
        }

        self.flags.set_executed(true);

        if !self.is_hashed() && self.is_executed() {
            self.on_executed(scheduler);
        } else {
            // Children still running, or the active table owns completion.
            scheduler.add_pending_task(Arc::clone(self));
            scheduler.scheduler_slice();
        }
    }

    /// Fire completion. Only the first call per run has any effect; returns
    /// whether this call was it.
    pub(crate) fn on_executed(&self, scheduler: &Scheduler) -> bool {
        if !self.flags.try_complete() {
            return false;
        }
        trace!(task = self.id, name = ?self.name(), "task completed");
        scheduler.record_completion();

        if let Some(counter) = &self.external {
            counter.decrement();
        }
        self.job.completed();
        // Dependents become ready on this flag, so it goes after the hook.
        self.flags.set_completed(true);
        if let Some(event) = &self.wait_handle {
            event.trigger();
        }

        if let Some(parent) = self.parent.as_ref().and_then(Weak::upgrade) {
            let remaining = parent.children.decrement();
            if remaining <= 0 && parent.flags.executed() {
                // The parent is parked waiting on us.
                scheduler.scheduler_slice();
            }
        }

        if self.is_dependency() {
            scheduler.scheduler_slice();
        }
        true
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("name", &self.name())
            .field("state", &self.run_state())
            .field("children", &self.children.get())
            .field("hashed", &self.is_hashed())
            .field("dependency", &self.is_dependency())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic payload>"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_task_is_created_and_not_executed() {
        let task = Task::new(|_: &Scheduler| {});
        assert_eq!(task.run_state(), TaskRunState::Created);
        assert!(!task.is_executed());
        assert!(!task.is_completed());
        assert!(!task.is_hashed());
    }

    #[test]
    fn executed_requires_children_to_finish() {
        let task = Task::new(|_: &Scheduler| {});
        task.children.increment();
        task.flags.set_executed(true);
        assert!(!task.is_executed());
        assert_eq!(task.run_state(), TaskRunState::AwaitingChildren);
        task.children.decrement();
        assert!(task.is_executed());
    }

    #[test]
    fn name_falls_back_to_job_name() {
        struct Named;
        impl Job for Named {
            fn execute(&self, _: &Scheduler) {}
            fn name(&self) -> Option<&str> {
                Some("named-job")
            }
        }
        assert_eq!(Task::new(Named).name(), Some("named-job"));
        assert_eq!(
            Task::builder(Named).name("override").build().name(),
            Some("override")
        );
    }

    #[test]
    fn dependencies_merge_declared_and_dynamic() {
        let a = Task::new(|_: &Scheduler| {});
        let b = Task::new(|_: &Scheduler| {});

        struct Dynamic(TaskRef);
        impl Job for Dynamic {
            fn execute(&self, _: &Scheduler) {}
            fn dependencies(&self) -> Vec<TaskRef> {
                vec![Arc::clone(&self.0)]
            }
        }

        let c = Task::builder(Dynamic(Arc::clone(&b)))
            .depends_on(&a)
            .build();
        let ids: Vec<_> = c.dependencies().iter().map(|t| t.id()).collect();
        assert_eq!(ids, vec![a.id(), b.id()]);
    }

    #[test]
    fn sync_timeout_without_handle_reports_completion() {
        let task = Task::new(|_: &Scheduler| {});
        assert!(!task.sync_timeout(Duration::from_millis(1)));
        task.flags.set_completed(true);
        assert!(task.sync_timeout(Duration::from_millis(1)));
    }

    #[test]
    fn reset_clears_run_flags_and_wait_handle() {
        let task = Task::builder(|_: &Scheduler| {}).wait_handle().build();
        task.flags.set_submitted(true);
        task.flags.set_scheduled(true);
        task.flags.set_executed(true);
        task.flags.set_completed(true);
        if let Some(ev) = &task.wait_handle {
            ev.trigger();
        }
        task.reset();
        assert_eq!(task.run_state(), TaskRunState::Created);
        assert!(!task.sync_timeout(Duration::from_millis(5)));
    }

    #[test]
    fn panic_message_handles_common_payloads() {
        let p: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(p.as_ref()), "boom");
        let p: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(p.as_ref()), "bang");
        let p: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(p.as_ref()), "<non-string panic payload>");
    }
}
