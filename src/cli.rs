// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `taskweave`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "taskweave",
    version,
    about = "Run a dependency graph of simulated jobs on the taskweave scheduler.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the workload file (TOML).
    ///
    /// Default: `Taskweave.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Taskweave.toml")]
    pub config: String,

    /// Worker thread count; overrides `[scheduler].num_threads`.
    #[arg(long, value_name = "N")]
    pub threads: Option<usize>,

    /// Give up if the workload has not finished after this many seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TASKWEAVE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the job graph, but don't run anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_overrides() {
        let args = CliArgs::try_parse_from([
            "taskweave",
            "--config",
            "jobs.toml",
            "--threads",
            "3",
            "--log-level",
            "debug",
            "--dry-run",
        ])
        .unwrap();
        assert_eq!(args.config, "jobs.toml");
        assert_eq!(args.threads, Some(3));
        assert!(matches!(args.log_level, Some(LogLevel::Debug)));
        assert!(args.dry_run);
    }

    #[test]
    fn defaults() {
        let args = CliArgs::try_parse_from(["taskweave"]).unwrap();
        assert_eq!(args.config, "Taskweave.toml");
        assert_eq!(args.threads, None);
        assert_eq!(args.timeout, None);
        assert!(!args.dry_run);
    }
}
