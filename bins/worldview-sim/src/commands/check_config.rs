//! The `check-config` command

use serde_json::json;
use std::time::Duration;
use worldview_cli::Status;
use worldview_cli::output::{format_duration, format_speed};
use worldview_core::Result;
use worldview_core::config::Config;
use worldview_journey::RouteSource;

/// Print the effective configuration. Loading already validated it; this
/// also loads the routes so a broken routes file is reported here.
pub fn run(config: &Config, json_output: bool) -> Result<()> {
    let routes = super::load_routes(config)?;

    if json_output {
        let report = json!({
            "path": config.path,
            "config": config.schema,
            "routes": routes.count(),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let scheduler = &config.schema.scheduler;
    let logging = &config.schema.logging;

    Status::header("Configuration");
    Status::field(
        "File",
        &config
            .path
            .as_ref()
            .map_or_else(|| "(defaults)".to_string(), |p| p.display().to_string()),
    );
    Status::field("Mode", &format!("{:?}", scheduler.mode).to_lowercase());
    Status::field(
        "Tick interval",
        &format_duration(Duration::from_millis(scheduler.tick_interval_ms)),
    );
    Status::field(
        "Auto start delay",
        &format_duration(Duration::from_millis(scheduler.auto_start_delay_ms)),
    );
    Status::field("Default speed", &format_speed(scheduler.default_speed_mps));
    Status::field(
        "Routes",
        &super::routes_file(config)
            .map_or_else(|| "built-in demo".to_string(), |p| p.display().to_string()),
    );
    Status::field("Route count", &routes.count().to_string());
    Status::field("Log level", &logging.level);

    if routes.count() == 0 {
        Status::warning("Routes file defines no routes");
    }
    Status::success("Configuration is valid");
    Ok(())
}
