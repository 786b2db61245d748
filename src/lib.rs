// src/lib.rs

//! `taskweave`: a multi-threaded task scheduler with dependency tracking and
//! fork/join.
//!
//! ```no_run
//! use taskweave::{Scheduler, Task, TaskScheduler};
//!
//! let scheduler = TaskScheduler::with_threads(4)?;
//! let load = Task::new(|_: &Scheduler| println!("load"));
//! let parse = Task::builder(|_: &Scheduler| println!("parse"))
//!     .depends_on(&load)
//!     .wait_handle()
//!     .build();
//! scheduler.add_task(parse.clone());
//! parse.sync();
//! # Ok::<(), taskweave::errors::TaskweaveError>(())
//! ```

pub mod cli;
pub mod config;
pub mod errors;
pub mod logging;
pub mod scheduler;
pub mod sync;
pub mod task;
pub mod types;
pub mod workload;

use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;

pub use crate::scheduler::{Scheduler, SchedulerConfig, SchedulerStats, TaskScheduler};
pub use crate::task::{Job, Task, TaskBuilder, TaskId, TaskRef, TaskRunState};
pub use crate::types::RescanMode;
pub use crate::workload::{Workload, WorkloadReport};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - workload loading
/// - scheduler start-up
/// - Ctrl-C handling
/// - running the workload on a blocking thread and printing the report
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_and_validate(&args.config)
        .with_context(|| format!("loading workload from {}", args.config))?;

    let mut sched_cfg = cfg.scheduler.to_scheduler_config();
    if let Some(threads) = args.threads {
        sched_cfg.num_threads = threads;
    }

    if args.dry_run {
        print_dry_run(&cfg, &sched_cfg);
        return Ok(());
    }

    let workload = Workload::from_config(&cfg)?;
    let scheduler = TaskScheduler::new(sched_cfg)?;

    // Ctrl-C → stop the scheduler; the workload then fails with ShuttingDown.
    let ctrl_c = {
        let handle = scheduler.handle();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            warn!("Ctrl-C received; shutting down");
            handle.prepare_quit();
        })
    };

    let handle = scheduler.handle();
    let timeout = args.timeout.map(Duration::from_secs);
    let outcome = tokio::task::spawn_blocking(move || workload.run(&handle, timeout)).await?;
    ctrl_c.abort();

    // Joining workers blocks; keep it off the async runtime.
    tokio::task::spawn_blocking(move || drop(scheduler)).await?;

    let report = outcome?;
    println!("{report}");
    info!("taskweave finished");
    Ok(())
}

/// Simple dry-run output: scheduler settings and the job graph.
fn print_dry_run(cfg: &ConfigFile, sched_cfg: &SchedulerConfig) {
    println!("taskweave dry-run");
    println!(
        "  scheduler.num_threads = {} (effective {})",
        sched_cfg.num_threads,
        sched_cfg.effective_threads()
    );
    println!("  scheduler.table_size = {}", sched_cfg.table_size);
    println!("  scheduler.max_tasks = {}", sched_cfg.max_tasks);
    println!("  scheduler.rescan = {:?}", sched_cfg.rescan);
    println!("  scheduler.rescan_interval = {:?}", sched_cfg.rescan_interval);
    println!();

    println!("jobs ({}):", cfg.job.len());
    for name in config::job_order(cfg) {
        let job = &cfg.job[&name];
        println!("  - {name}");
        println!("      work_ms: {}", job.work_ms);
        if job.children > 0 {
            println!("      children: {} x {}ms", job.children, job.child_work_ms);
        }
        if !job.after.is_empty() {
            println!("      after: {:?}", job.after);
        }
    }
    println!();
    println!("sinks: {:?}", cfg.sinks());

    debug!("dry-run complete (no execution)");
}
