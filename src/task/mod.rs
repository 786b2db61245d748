// src/task/mod.rs

//! Units of work.
//!
//! - [`job`] defines the [`Job`] trait: the body a task runs.
//! - [`handle`] defines [`Task`] and its run state machine.
//! - [`builder`] constructs tasks with dependencies, counters and wait
//!   handles.
//! - [`state`] holds the atomic per-task flags.

pub mod builder;
pub mod handle;
pub mod job;
pub mod state;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

pub use builder::TaskBuilder;
pub use handle::Task;
pub use job::Job;
pub use state::TaskRunState;

/// Process-unique task identifier. Also the key into the scheduler's table.
pub type TaskId = u64;

/// Tasks are shared between the submitter, the scheduler and the dependents
/// that reference them.
pub type TaskRef = Arc<Task>;

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_task_id() -> TaskId {
    NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed)
}
