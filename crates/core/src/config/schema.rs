//! Configuration schema definitions
//!
//! Every section and field has a default, so an empty file is a valid
//! configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration schema
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ConfigSchema {
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub routes: RoutesConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which scheduler drives the simulation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerMode {
    /// Advance every registered journey each tick
    #[default]
    Multi,
    /// Keep exactly one automatically started journey running
    Auto,
}

impl std::str::FromStr for SchedulerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "multi" => Ok(Self::Multi),
            "auto" => Ok(Self::Auto),
            other => Err(format!("unknown scheduler mode '{other}' (expected multi or auto)")),
        }
    }
}

/// Scheduler tick configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SchedulerConfig {
    /// Scheduler flavor
    #[serde(default)]
    pub mode: SchedulerMode,

    /// Fixed tick interval in milliseconds
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Cooldown after a completed auto journey before the next one starts
    #[serde(default = "default_auto_start_delay_ms")]
    pub auto_start_delay_ms: u64,

    /// Speed for journeys started without an explicit speed (m/s)
    #[serde(default = "default_speed_mps")]
    pub default_speed_mps: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            mode: SchedulerMode::default(),
            tick_interval_ms: default_tick_interval_ms(),
            auto_start_delay_ms: default_auto_start_delay_ms(),
            default_speed_mps: default_speed_mps(),
        }
    }
}

fn default_tick_interval_ms() -> u64 {
    500
}

fn default_auto_start_delay_ms() -> u64 {
    5_000
}

fn default_speed_mps() -> f64 {
    // 50 km/h
    13.89
}

/// Route source configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RoutesConfig {
    /// Routes file (TOML or JSON). The built-in demo routes are used when unset.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Default filter directive when no env filter is set
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of compact text
    #[serde(default)]
    pub json: bool,

    /// Directory for a daily-rotated log file
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            directory: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
