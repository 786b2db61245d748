// src/workload/job.rs

//! The simulated job run for every `[job.<name>]` entry.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::config::JobConfig;
use crate::scheduler::Scheduler;
use crate::task::{Job, Task};

/// Orders start/completion events across all jobs of a run.
static SEQUENCE: AtomicU64 = AtomicU64::new(0);

fn next_seq() -> u64 {
    SEQUENCE.fetch_add(1, Ordering::SeqCst)
}

/// What a job observed about its own run. Shared between the job (which
/// fills it in) and the workload (which reports it).
#[derive(Debug, Default)]
pub struct JobProbe {
    started: Mutex<Option<(u64, Instant)>>,
    completed: Mutex<Option<(u64, Instant)>>,
    children_finished: AtomicU32,
}

impl JobProbe {
    pub fn started(&self) -> Option<(u64, Instant)> {
        *self.started.lock()
    }

    pub fn completed(&self) -> Option<(u64, Instant)> {
        *self.completed.lock()
    }

    pub fn children_finished(&self) -> u32 {
        self.children_finished.load(Ordering::SeqCst)
    }
}

pub struct SimulatedJob {
    name: String,
    work: Duration,
    children: u32,
    child_work: Duration,
    probe: Arc<JobProbe>,
}

impl SimulatedJob {
    pub fn new(name: &str, cfg: &JobConfig, probe: Arc<JobProbe>) -> Self {
        Self {
            name: name.to_string(),
            work: Duration::from_millis(cfg.work_ms),
            children: cfg.children,
            child_work: Duration::from_millis(cfg.child_work_ms),
            probe,
        }
    }
}

impl Job for SimulatedJob {
    fn execute(&self, scheduler: &Scheduler) {
        *self.probe.started.lock() = Some((next_seq(), Instant::now()));
        debug!(job = %self.name, children = self.children, "job started");

        if self.children > 0 {
            match Task::current() {
                Some(me) => {
                    for index in 0..self.children {
                        let probe = Arc::clone(&self.probe);
                        let work = self.child_work;
                        me.spawn_child_with(
                            scheduler,
                            Task::builder(move |_: &Scheduler| {
                                if !work.is_zero() {
                                    thread::sleep(work);
                                }
                                probe.children_finished.fetch_add(1, Ordering::SeqCst);
                            })
                            .name(format!("{}#{index}", self.name)),
                        );
                    }
                }
                None => warn!(job = %self.name, "no current task; children not spawned"),
            }
        }

        if !self.work.is_zero() {
            thread::sleep(self.work);
        }
    }

    fn completed(&self) {
        *self.probe.completed.lock() = Some((next_seq(), Instant::now()));
        debug!(job = %self.name, "job completed");
    }

    fn name(&self) -> Option<&str> {
        Some(&self.name)
    }
}
