// src/task/builder.rs

//! Fluent construction of tasks.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::sync::{SyncEvent, ThreadSafeCounter};
use crate::task::state::TaskFlags;
use crate::task::{next_task_id, Job, Task, TaskRef};

/// Builder for [`Task`].
///
/// ```
/// use taskweave::{Scheduler, Task};
///
/// let load = Task::new(|_: &Scheduler| {});
/// let parse = Task::builder(|_: &Scheduler| {})
///     .name("parse")
///     .depends_on(&load)
///     .wait_handle()
///     .build();
/// assert_eq!(parse.dependencies().len(), 1);
/// ```
pub struct TaskBuilder {
    job: Box<dyn Job>,
    name: Option<String>,
    deps: Vec<TaskRef>,
    children: Option<Arc<ThreadSafeCounter>>,
    external: Option<Arc<ThreadSafeCounter>>,
    parent: Option<Weak<Task>>,
    wait_handle: bool,
}

impl TaskBuilder {
    pub fn new<J: Job>(job: J) -> Self {
        Self {
            job: Box::new(job),
            name: None,
            deps: Vec::new(),
            children: None,
            external: None,
            parent: None,
            wait_handle: false,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn depends_on(mut self, dep: &TaskRef) -> Self {
        self.deps.push(Arc::clone(dep));
        self
    }

    pub fn depends_on_all<'a>(mut self, deps: impl IntoIterator<Item = &'a TaskRef>) -> Self {
        self.deps.extend(deps.into_iter().map(Arc::clone));
        self
    }

    /// Share a child counter with other tasks instead of owning a fresh one.
    pub fn child_counter(mut self, counter: Arc<ThreadSafeCounter>) -> Self {
        self.children = Some(counter);
        self
    }

    /// Counter decremented once when the task completes.
    pub fn external_counter(mut self, counter: Arc<ThreadSafeCounter>) -> Self {
        self.external = Some(counter);
        self
    }

    /// Give the task a manual-reset event so callers can [`Task::sync`].
    pub fn wait_handle(mut self) -> Self {
        self.wait_handle = true;
        self
    }

    pub(crate) fn parent(mut self, parent: Weak<Task>) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn build(self) -> TaskRef {
        let id = next_task_id();
        debug_assert!(
            self.deps.iter().all(|d| d.id() != id),
            "a task cannot depend on itself"
        );
        Arc::new(Task {
            id,
            name: self.name,
            job: self.job,
            flags: TaskFlags::default(),
            declared: Mutex::new(self.deps),
            children: self.children.unwrap_or_default(),
            external: self.external,
            parent: self.parent,
            wait_handle: self.wait_handle.then(SyncEvent::manual_reset),
        })
    }
}
