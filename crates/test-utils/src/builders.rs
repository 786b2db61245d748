#![allow(dead_code)]

use taskweave::config::{ConfigFile, JobConfig, RawConfigFile, SchedulerSection};
use taskweave::RescanMode;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn with_job(mut self, name: &str, job: JobConfig) -> Self {
        self.config.job.insert(name.to_string(), job);
        self
    }

    pub fn with_threads(mut self, n: usize) -> Self {
        self.config.scheduler.num_threads = n;
        self
    }

    pub fn with_rescan(mut self, mode: RescanMode, interval_ms: u64) -> Self {
        self.config.scheduler.rescan = mode;
        self.config.scheduler.rescan_interval_ms = interval_ms;
        self
    }

    pub fn with_scheduler(mut self, section: SchedulerSection) -> Self {
        self.config.scheduler = section;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `JobConfig`.
pub struct JobConfigBuilder {
    job: JobConfig,
}

impl JobConfigBuilder {
    pub fn new() -> Self {
        Self {
            job: JobConfig::default(),
        }
    }

    pub fn work_ms(mut self, ms: u64) -> Self {
        self.job.work_ms = ms;
        self
    }

    pub fn children(mut self, n: u32, child_work_ms: u64) -> Self {
        self.job.children = n;
        self.job.child_work_ms = child_work_ms;
        self
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.job.after.push(dep.to_string());
        self
    }

    pub fn build(self) -> JobConfig {
        self.job
    }
}

impl Default for JobConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
