// src/types.rs

//! Small config-facing enums shared across modules.

use std::str::FromStr;
use serde::Deserialize;

/// How scheduling passes are driven.
///
/// - `OnDemand`: passes run only when requested, i.e. when a task with
///   dependencies is submitted, when a tracked task finishes its body, and
///   when a worker goes idle.
/// - `Background`: same as `OnDemand`, plus a dedicated thread re-runs a pass
///   every `rescan_interval`, bounding dependency-resolution latency even if
///   every on-demand request is missed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RescanMode {
    OnDemand,
    Background,
}

impl Default for RescanMode {
    fn default() -> Self {
        RescanMode::OnDemand
    }
}

impl FromStr for RescanMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "on-demand" | "ondemand" | "on_demand" => Ok(RescanMode::OnDemand),
            "background" => Ok(RescanMode::Background),
            other => Err(format!(
                "invalid rescan mode: {other} (expected \"on-demand\" or \"background\")"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rescan_mode_from_str() {
        assert_eq!("background".parse::<RescanMode>(), Ok(RescanMode::Background));
        assert_eq!("On-Demand".parse::<RescanMode>(), Ok(RescanMode::OnDemand));
        assert!("sometimes".parse::<RescanMode>().is_err());
    }
}
