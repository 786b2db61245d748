// src/workload/mod.rs

//! Config-described workloads.
//!
//! A [`Workload`] turns every `[job.<name>]` entry into a [`Task`] running a
//! [`SimulatedJob`], wires `after` lists into task dependencies, submits the
//! sinks (which pulls in everything upstream) and waits for them.

pub mod job;
pub mod report;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::info;

use crate::config::{job_order, ConfigFile};
use crate::errors::{Result, TaskweaveError};
use crate::scheduler::Scheduler;
use crate::task::{Task, TaskRef};

pub use job::{JobProbe, SimulatedJob};
pub use report::{JobReport, WorkloadReport};

/// Poll interval while waiting on sinks, so shutdown is noticed promptly.
const SYNC_SLICE: Duration = Duration::from_millis(50);

pub struct Workload {
    /// Jobs in dependency order.
    order: Vec<String>,
    tasks: BTreeMap<String, TaskRef>,
    probes: BTreeMap<String, Arc<JobProbe>>,
    sinks: Vec<String>,
}

impl Workload {
    pub fn from_config(cfg: &ConfigFile) -> Result<Self> {
        let order = job_order(cfg);
        let mut tasks: BTreeMap<String, TaskRef> = BTreeMap::new();
        let mut probes = BTreeMap::new();

        for name in &order {
            let job_cfg = cfg
                .job
                .get(name)
                .ok_or_else(|| TaskweaveError::UnknownJob(name.clone()))?;
            let probe = Arc::new(JobProbe::default());

            let mut builder = Task::builder(SimulatedJob::new(name, job_cfg, Arc::clone(&probe)))
                .name(name.clone())
                .wait_handle();
            for dep in &job_cfg.after {
                let dep_task = tasks.get(dep).ok_or_else(|| {
                    TaskweaveError::UnknownJob(format!("job '{name}' depends on unknown job '{dep}'"))
                })?;
                builder = builder.depends_on(dep_task);
            }

            tasks.insert(name.clone(), builder.build());
            probes.insert(name.clone(), probe);
        }

        Ok(Self {
            order,
            tasks,
            probes,
            sinks: cfg.sinks().into_iter().map(str::to_string).collect(),
        })
    }

    pub fn task(&self, name: &str) -> Option<&TaskRef> {
        self.tasks.get(name)
    }

    pub fn sinks(&self) -> &[String] {
        &self.sinks
    }

    /// Submit the workload and block until every job has completed.
    ///
    /// Fails if the scheduler shuts down first, or if `timeout` elapses.
    pub fn run(&self, scheduler: &Scheduler, timeout: Option<Duration>) -> Result<WorkloadReport> {
        let started = Instant::now();
        let deadline = timeout.map(|t| started + t);
        info!(jobs = self.order.len(), sinks = ?self.sinks, "submitting workload");

        for sink in &self.sinks {
            scheduler.add_task(Arc::clone(&self.tasks[sink]));
        }

        for sink in &self.sinks {
            let task = &self.tasks[sink];
            while !task.sync_timeout(SYNC_SLICE) {
                if scheduler.is_exiting() {
                    return Err(TaskweaveError::ShuttingDown);
                }
                if deadline.is_some_and(|d| Instant::now() >= d) {
                    return Err(TaskweaveError::Other(anyhow::anyhow!(
                        "job '{sink}' did not complete within {:?}",
                        timeout.unwrap_or_default()
                    )));
                }
            }
        }

        let wall = started.elapsed();
        info!(?wall, "workload complete");
        Ok(self.report(started, wall, scheduler))
    }

    fn report(&self, started: Instant, wall: Duration, scheduler: &Scheduler) -> WorkloadReport {
        let jobs = self
            .order
            .iter()
            .map(|name| {
                let probe = &self.probes[name];
                JobReport::from_probe(name, started, probe, &self.tasks[name])
            })
            .collect();
        WorkloadReport {
            jobs,
            wall,
            stats: scheduler.stats(),
        }
    }
}
