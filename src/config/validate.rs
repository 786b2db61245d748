// src/config/validate.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, TaskweaveError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = TaskweaveError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.scheduler, raw.job))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_jobs(cfg)?;
    validate_scheduler_section(cfg)?;
    validate_job_dependencies(cfg)?;
    validate_dag(cfg)?;
    Ok(())
}

fn ensure_has_jobs(cfg: &RawConfigFile) -> Result<()> {
    if cfg.job.is_empty() {
        return Err(TaskweaveError::ConfigError(
            "config must contain at least one [job.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_scheduler_section(cfg: &RawConfigFile) -> Result<()> {
    // `rescan` is strongly typed and checked during deserialization.
    cfg.scheduler
        .to_scheduler_config()
        .validate()
        .map_err(|e| match e {
            TaskweaveError::ConfigError(msg) => {
                TaskweaveError::ConfigError(format!("[scheduler].{msg}"))
            }
            other => other,
        })
}

fn validate_job_dependencies(cfg: &RawConfigFile) -> Result<()> {
    for (name, job) in cfg.job.iter() {
        for dep in job.after.iter() {
            if dep == name {
                return Err(TaskweaveError::ConfigError(format!(
                    "job '{}' cannot depend on itself in `after`",
                    name
                )));
            }
            if !cfg.job.contains_key(dep) {
                return Err(TaskweaveError::UnknownJob(format!(
                    "job '{}' has unknown dependency '{}' in `after`",
                    name, dep
                )));
            }
        }
    }
    Ok(())
}

fn validate_dag(cfg: &RawConfigFile) -> Result<()> {
    // Edge direction: dep -> job, so `[job.B] after = ["A"]` adds A -> B.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.job.keys() {
        graph.add_node(name.as_str());
    }

    for (name, job) in cfg.job.iter() {
        for dep in job.after.iter() {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(TaskweaveError::DagCycle(format!(
            "cycle detected in job graph involving job '{}'",
            cycle.node_id()
        ))),
    }
}

/// Topological order of the jobs in a validated config, dependencies first.
pub fn job_order(cfg: &ConfigFile) -> Vec<String> {
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
    for name in cfg.job.keys() {
        graph.add_node(name.as_str());
    }
    for (name, job) in cfg.job.iter() {
        for dep in job.after.iter() {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }
    // Validation already ruled out cycles.
    toposort(&graph, None)
        .map(|order| order.into_iter().map(str::to_string).collect())
        .unwrap_or_else(|_| cfg.job.keys().cloned().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::JobConfig;

    fn job(after: &[&str]) -> JobConfig {
        JobConfig {
            after: after.iter().map(|s| s.to_string()).collect(),
            ..JobConfig::default()
        }
    }

    fn raw(jobs: &[(&str, JobConfig)]) -> RawConfigFile {
        RawConfigFile {
            job: jobs
                .iter()
                .map(|(n, j)| (n.to_string(), j.clone()))
                .collect(),
            ..RawConfigFile::default()
        }
    }

    #[test]
    fn accepts_a_diamond() {
        let cfg = raw(&[
            ("a", job(&[])),
            ("b", job(&["a"])),
            ("c", job(&["a"])),
            ("d", job(&["b", "c"])),
        ]);
        let cfg = ConfigFile::try_from(cfg).unwrap();
        let order = job_order(&cfg);
        let pos = |n: &str| order.iter().position(|x| x == n).unwrap();
        assert!(pos("a") < pos("b") && pos("a") < pos("c"));
        assert!(pos("b") < pos("d") && pos("c") < pos("d"));
        assert_eq!(cfg.sinks(), vec!["d"]);
    }

    #[test]
    fn rejects_empty_config() {
        let err = ConfigFile::try_from(RawConfigFile::default()).unwrap_err();
        assert!(matches!(err, TaskweaveError::ConfigError(_)));
    }

    #[test]
    fn rejects_unknown_and_self_dependencies() {
        let err = ConfigFile::try_from(raw(&[("a", job(&["ghost"]))])).unwrap_err();
        assert!(matches!(err, TaskweaveError::UnknownJob(msg) if msg.contains("ghost")));

        let err = ConfigFile::try_from(raw(&[("a", job(&["a"]))])).unwrap_err();
        assert!(matches!(err, TaskweaveError::ConfigError(msg) if msg.contains("itself")));
    }

    #[test]
    fn rejects_cycles() {
        let err = ConfigFile::try_from(raw(&[("a", job(&["b"])), ("b", job(&["a"]))]))
            .unwrap_err();
        assert!(matches!(err, TaskweaveError::DagCycle(_)));
    }

    #[test]
    fn scheduler_section_errors_are_prefixed() {
        let mut cfg = raw(&[("a", job(&[]))]);
        cfg.scheduler.table_size = 3;
        let err = ConfigFile::try_from(cfg).unwrap_err();
        assert!(
            matches!(err, TaskweaveError::ConfigError(msg) if msg.starts_with("[scheduler].table_size"))
        );
    }
}
