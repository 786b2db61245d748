// src/scheduler/config.rs

//! Runtime settings for a [`TaskScheduler`](super::TaskScheduler).

use std::thread;
use std::time::Duration;

use crate::errors::{Result, TaskweaveError};
use crate::types::RescanMode;

pub const DEFAULT_TABLE_SIZE: usize = 1024;
pub const DEFAULT_MAX_TASKS: usize = 2048;
pub const DEFAULT_RESCAN_INTERVAL: Duration = Duration::from_millis(66);
pub const DEFAULT_THREAD_NAME_PREFIX: &str = "taskweave-worker";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Worker thread count. `0` means one per available CPU.
    pub num_threads: usize,
    /// Bucket count of the active table. Must be a power of two.
    pub table_size: usize,
    /// Soft capacity used by `is_full` / `is_half_full`.
    pub max_tasks: usize,
    pub rescan: RescanMode,
    /// Period of the background rescan thread.
    pub rescan_interval: Duration,
    /// Workers are named `<prefix>-<index>`.
    pub thread_name_prefix: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            num_threads: 0,
            table_size: DEFAULT_TABLE_SIZE,
            max_tasks: DEFAULT_MAX_TASKS,
            rescan: RescanMode::OnDemand,
            rescan_interval: DEFAULT_RESCAN_INTERVAL,
            thread_name_prefix: DEFAULT_THREAD_NAME_PREFIX.to_string(),
        }
    }
}

impl SchedulerConfig {
    pub fn num_threads(mut self, n: usize) -> Self {
        self.num_threads = n;
        self
    }

    pub fn table_size(mut self, size: usize) -> Self {
        self.table_size = size;
        self
    }

    pub fn max_tasks(mut self, max: usize) -> Self {
        self.max_tasks = max;
        self
    }

    pub fn rescan(mut self, mode: RescanMode) -> Self {
        self.rescan = mode;
        self
    }

    pub fn rescan_interval(mut self, interval: Duration) -> Self {
        self.rescan_interval = interval;
        self
    }

    pub fn thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// The thread count actually used, with `0` resolved to the CPU count.
    pub fn effective_threads(&self) -> usize {
        if self.num_threads > 0 {
            self.num_threads
        } else {
            thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.table_size == 0 || !self.table_size.is_power_of_two() {
            return Err(TaskweaveError::ConfigError(format!(
                "table_size must be a non-zero power of two (got {})",
                self.table_size
            )));
        }
        if self.max_tasks < 2 {
            return Err(TaskweaveError::ConfigError(format!(
                "max_tasks must be >= 2 (got {})",
                self.max_tasks
            )));
        }
        if self.rescan_interval.is_zero() {
            return Err(TaskweaveError::ConfigError(
                "rescan_interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = SchedulerConfig::default();
        assert_eq!(cfg.table_size, 1024);
        assert_eq!(cfg.max_tasks, 2048);
        assert_eq!(cfg.rescan_interval, Duration::from_millis(66));
        assert_eq!(cfg.rescan, RescanMode::OnDemand);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn zero_threads_resolves_to_at_least_one() {
        assert!(SchedulerConfig::default().effective_threads() >= 1);
        assert_eq!(SchedulerConfig::default().num_threads(3).effective_threads(), 3);
    }

    #[test]
    fn rejects_non_power_of_two_table() {
        let err = SchedulerConfig::default().table_size(1000).validate().unwrap_err();
        assert!(matches!(err, TaskweaveError::ConfigError(msg) if msg.contains("power of two")));
    }

    #[test]
    fn rejects_tiny_capacity_and_zero_interval() {
        assert!(SchedulerConfig::default().max_tasks(1).validate().is_err());
        assert!(
            SchedulerConfig::default()
                .rescan_interval(Duration::ZERO)
                .validate()
                .is_err()
        );
    }
}
