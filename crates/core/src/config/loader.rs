//! Configuration file loading

use super::schema::ConfigSchema;
use crate::error::{Error, Result, ResultExt};
use std::path::{Path, PathBuf};

/// Overrides the scheduler tick interval in milliseconds.
pub const ENV_TICK_MS: &str = "WORLDVIEW_TICK_MS";

/// Overrides the default log level.
pub const ENV_LOG_LEVEL: &str = "WORLDVIEW_LOG";

/// Configuration wrapper
#[derive(Debug, Clone)]
pub struct Config {
    /// Parsed settings
    pub schema: ConfigSchema,
    /// File the settings came from, if any
    pub path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a file path or the standard locations, apply
    /// environment overrides and validate the result.
    ///
    /// An explicit `path` that does not exist is an error; when no path is
    /// given and no standard file exists, defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) if !p.exists() => return Err(Error::config_not_found(p)),
            Some(p) => Some(p.to_path_buf()),
            None => find_config_file(),
        };

        let schema = if let Some(ref p) = config_path {
            load_config_file(p)?
        } else {
            ConfigSchema::default()
        };

        let mut config = Self {
            schema,
            path: config_path,
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides using `lookup` to read variables.
    pub fn apply_env_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<()> {
        if let Some(raw) = lookup(ENV_TICK_MS) {
            self.schema.scheduler.tick_interval_ms = raw.trim().parse().map_err(|_| {
                Error::config_validation(format!("{ENV_TICK_MS} must be an integer, got '{raw}'"))
            })?;
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.schema.logging.level = level;
        }
        Ok(())
    }

    /// Check values that serde defaults cannot rule out.
    pub fn validate(&self) -> Result<()> {
        let scheduler = &self.schema.scheduler;
        if scheduler.tick_interval_ms == 0 {
            return Err(Error::config_validation("scheduler.tick_interval_ms must be > 0"));
        }
        if !scheduler.default_speed_mps.is_finite() || scheduler.default_speed_mps <= 0.0 {
            return Err(Error::config_validation(format!(
                "scheduler.default_speed_mps must be finite and > 0, got {}",
                scheduler.default_speed_mps
            )));
        }
        if self.schema.logging.level.trim().is_empty() {
            return Err(Error::config_validation("logging.level must not be empty"));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema: ConfigSchema::default(),
            path: None,
        }
    }
}

/// Find configuration file in standard locations
fn find_config_file() -> Option<PathBuf> {
    let candidates = [
        "worldview.toml",
        ".worldview.toml",
        ".config/worldview.toml",
    ];

    candidates
        .into_iter()
        .map(PathBuf::from)
        .find(|candidate| candidate.exists())
}

/// Load and parse a TOML configuration file
fn load_config_file(path: &Path) -> Result<ConfigSchema> {
    let content = std::fs::read_to_string(path)
        .map_err(Error::from)
        .context(format!("Failed to read config file {}", path.display()))?;

    toml::from_str(&content)
        .map_err(Error::from)
        .context(format!("Failed to parse config file {}", path.display()))
}
