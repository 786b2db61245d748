// src/errors.rs

//! Crate-wide error aliases and helpers.
//!
//! The scheduling operations themselves are infallible: shutdown races turn
//! into no-ops and task bodies have no failure channel. Errors only surface
//! from construction (thread spawning) and from configuration loading.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaskweaveError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Unknown job: {0}")]
    UnknownJob(String),

    #[error("Cycle detected in job graph: {0}")]
    DagCycle(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Failed to spawn worker thread: {0}")]
    ThreadSpawn(String),

    #[error("Scheduler is shutting down")]
    ShuttingDown,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, TaskweaveError>;
