//! Subcommand implementations

pub mod check_config;
pub mod routes;
pub mod run;

use std::path::PathBuf;
use worldview_core::config::Config;
use worldview_core::{Error, Result, ResultExt};
use worldview_journey::InMemoryRouteSource;

/// Routes file from the configuration, relative paths resolved against the
/// configuration file's directory.
pub fn routes_file(config: &Config) -> Option<PathBuf> {
    let file = config.schema.routes.file.as_ref()?;
    if file.is_absolute() {
        return Some(file.clone());
    }
    let base = config.path.as_ref().and_then(|p| p.parent());
    Some(base.map_or_else(|| file.clone(), |dir| dir.join(file)))
}

/// Configured routes, or the built-in demo set when no file is configured.
pub fn load_routes(config: &Config) -> Result<InMemoryRouteSource> {
    match routes_file(config) {
        Some(path) => InMemoryRouteSource::from_file(&path)
            .map_err(Error::from)
            .context(format!("routes.file = {}", path.display())),
        None => Ok(InMemoryRouteSource::demo()),
    }
}
