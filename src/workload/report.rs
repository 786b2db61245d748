// src/workload/report.rs

use std::fmt;
use std::time::{Duration, Instant};

use crate::scheduler::SchedulerStats;
use crate::task::TaskRef;
use crate::workload::JobProbe;

#[derive(Debug, Clone)]
pub struct JobReport {
    pub name: String,
    /// Global sequence numbers of the start and completion events.
    pub start_seq: Option<u64>,
    pub complete_seq: Option<u64>,
    /// Offsets from the start of the run.
    pub started_at: Option<Duration>,
    pub completed_at: Option<Duration>,
    pub children: u32,
    pub dependencies: Vec<String>,
}

impl JobReport {
    pub(crate) fn from_probe(name: &str, run_start: Instant, probe: &JobProbe, task: &TaskRef) -> Self {
        let started = probe.started();
        let completed = probe.completed();
        Self {
            name: name.to_string(),
            start_seq: started.map(|(seq, _)| seq),
            complete_seq: completed.map(|(seq, _)| seq),
            started_at: started.map(|(_, at)| at.saturating_duration_since(run_start)),
            completed_at: completed.map(|(_, at)| at.saturating_duration_since(run_start)),
            children: probe.children_finished(),
            dependencies: task
                .dependencies()
                .iter()
                .filter_map(|d| d.name().map(str::to_string))
                .collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WorkloadReport {
    /// In dependency order.
    pub jobs: Vec<JobReport>,
    pub wall: Duration,
    pub stats: SchedulerStats,
}

impl WorkloadReport {
    pub fn job(&self, name: &str) -> Option<&JobReport> {
        self.jobs.iter().find(|j| j.name == name)
    }
}

fn ms(d: Option<Duration>) -> String {
    d.map(|d| format!("{:.1}ms", d.as_secs_f64() * 1000.0))
        .unwrap_or_else(|| "-".to_string())
}

impl fmt::Display for WorkloadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "jobs ({}):", self.jobs.len())?;
        for job in &self.jobs {
            write!(
                f,
                "  - {:<20} start {:>9}  done {:>9}",
                job.name,
                ms(job.started_at),
                ms(job.completed_at)
            )?;
            if job.children > 0 {
                write!(f, "  children {}", job.children)?;
            }
            if !job.dependencies.is_empty() {
                write!(f, "  after {:?}", job.dependencies)?;
            }
            writeln!(f)?;
        }
        writeln!(f)?;
        writeln!(f, "wall time: {}", ms(Some(self.wall)))?;
        let s = &self.stats;
        write!(
            f,
            "scheduler: submitted {}, direct {}, queued {}, completed {}, passes {} (skipped {}), panics {}",
            s.submitted,
            s.dispatched_direct,
            s.ready_enqueued,
            s.completed,
            s.passes,
            s.passes_skipped,
            s.panics
        )
    }
}
