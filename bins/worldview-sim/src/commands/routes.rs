//! The `routes` command: list available routes

use std::time::Duration;
use worldview_cli::Status;
use worldview_cli::output::{format_count, format_distance, format_duration};
use worldview_core::Result;
use worldview_core::config::Config;
use worldview_journey::{Route, RouteSource};

pub fn run(config: &Config, json_output: bool) -> Result<()> {
    let source = super::load_routes(config)?;
    let routes = source.find_all();

    if json_output {
        let routes: Vec<&Route> = routes.iter().map(AsRef::as_ref).collect();
        println!("{}", serde_json::to_string_pretty(&routes)?);
        return Ok(());
    }

    let origin = super::routes_file(config)
        .map_or_else(|| "built-in demo".to_string(), |p| p.display().to_string());
    Status::header(&format!(
        "{} ({})",
        format_count(routes.len(), "route", "routes"),
        origin
    ));

    for route in &routes {
        Status::field(route.id(), &describe(route));
    }

    if routes.is_empty() {
        Status::warning("No routes defined; journeys cannot start");
    }
    Ok(())
}

fn describe(route: &Route) -> String {
    format!(
        "{} · {} · {} · ~{}",
        route.name(),
        format_count(route.waypoint_count(), "waypoint", "waypoints"),
        format_distance(route.total_distance_meters()),
        format_duration(Duration::from_secs_f64(route.estimated_duration_seconds()))
    )
}
