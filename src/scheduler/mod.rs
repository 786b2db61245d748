// src/scheduler/mod.rs

//! Task scheduler: worker pool, dependency tracking and dispatch.
//!
//! Layout:
//! - [`core`] holds the [`Scheduler`] handle and the owning [`TaskScheduler`].
//! - [`slice`] implements the scheduling pass.
//! - [`table`] is the active table the pass walks.
//! - [`worker`] runs tasks on OS threads.
//! - [`rescan`] is the optional background pass thread.
//! - [`config`] and [`stats`] hold settings and counters.

pub mod config;
pub mod core;
pub(crate) mod rescan;
pub mod slice;
pub mod stats;
pub(crate) mod table;
pub(crate) mod worker;

pub use config::SchedulerConfig;
pub use core::{Scheduler, TaskScheduler};
pub use stats::SchedulerStats;
