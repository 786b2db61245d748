// src/config/model.rs

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::scheduler::config::{
    DEFAULT_MAX_TASKS, DEFAULT_RESCAN_INTERVAL, DEFAULT_TABLE_SIZE, DEFAULT_THREAD_NAME_PREFIX,
};
use crate::scheduler::SchedulerConfig;
use crate::types::RescanMode;

/// Top-level workload file as read from TOML, before validation.
///
/// ```toml
/// [scheduler]
/// num_threads = 4
/// rescan = "background"
///
/// [job.read_file]
/// work_ms = 2
///
/// [job.load_mesh]
/// work_ms = 5
/// children = 3
/// after = ["read_file"]
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub scheduler: SchedulerSection,

    /// Jobs from `[job.<name>]`, keyed by name.
    #[serde(default)]
    pub job: BTreeMap<String, JobConfig>,
}

/// A validated workload file.
///
/// Only obtainable through `TryFrom<RawConfigFile>` (see `validate.rs`), so
/// holders can rely on the job graph being closed and acyclic.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub scheduler: SchedulerSection,
    pub job: BTreeMap<String, JobConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(scheduler: SchedulerSection, job: BTreeMap<String, JobConfig>) -> Self {
        Self { scheduler, job }
    }

    /// Jobs nothing else waits on. The runner syncs on these.
    pub fn sinks(&self) -> Vec<&str> {
        self.job
            .keys()
            .filter(|name| !self.job.values().any(|j| j.after.iter().any(|a| a == *name)))
            .map(String::as_str)
            .collect()
    }
}

/// `[scheduler]` section.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SchedulerSection {
    /// `0` means one worker per CPU.
    #[serde(default)]
    pub num_threads: usize,

    #[serde(default = "default_table_size")]
    pub table_size: usize,

    #[serde(default = "default_max_tasks")]
    pub max_tasks: usize,

    /// `"on-demand"` (default) or `"background"`.
    #[serde(default)]
    pub rescan: RescanMode,

    #[serde(default = "default_rescan_interval_ms")]
    pub rescan_interval_ms: u64,

    #[serde(default = "default_thread_name_prefix")]
    pub thread_name_prefix: String,
}

fn default_table_size() -> usize {
    DEFAULT_TABLE_SIZE
}

fn default_max_tasks() -> usize {
    DEFAULT_MAX_TASKS
}

fn default_rescan_interval_ms() -> u64 {
    DEFAULT_RESCAN_INTERVAL.as_millis() as u64
}

fn default_thread_name_prefix() -> String {
    DEFAULT_THREAD_NAME_PREFIX.to_string()
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            num_threads: 0,
            table_size: default_table_size(),
            max_tasks: default_max_tasks(),
            rescan: RescanMode::default(),
            rescan_interval_ms: default_rescan_interval_ms(),
            thread_name_prefix: default_thread_name_prefix(),
        }
    }
}

impl SchedulerSection {
    pub fn to_scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            num_threads: self.num_threads,
            table_size: self.table_size,
            max_tasks: self.max_tasks,
            rescan: self.rescan,
            rescan_interval: Duration::from_millis(self.rescan_interval_ms),
            thread_name_prefix: self.thread_name_prefix.clone(),
        }
    }
}

/// `[job.<name>]` section: a simulated unit of work.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
pub struct JobConfig {
    /// Busy time of the job body, in milliseconds.
    #[serde(default)]
    pub work_ms: u64,

    /// Fork/join children the body spawns, each doing `child_work_ms`.
    #[serde(default)]
    pub children: u32,

    #[serde(default)]
    pub child_work_ms: u64,

    /// Jobs that must complete before this one starts.
    #[serde(default)]
    pub after: Vec<String>,
}
