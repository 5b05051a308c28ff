//! Route lookup for journeys.
//!
//! Routes come from a [`RouteSource`]. The in-memory source can be filled from
//! a TOML or JSON routes file or from the built-in demo set:
//!
//! ```toml
//! [[routes]]
//! id = "city-loop"
//! name = "City Loop"
//! description = "Around the old town"
//! # [latitude, longitude] pairs in travel order
//! waypoints = [[48.7784, 9.1800], [48.7840, 9.1817], [48.7725, 9.1650]]
//! # Optional; measured along the waypoints when omitted
//! total_distance_meters = 2500.0
//! # Optional; derived from average_speed_mps when omitted
//! estimated_duration_seconds = 240.0
//! average_speed_mps = 11.0
//! ```

use crate::error::{JourneyError, Result};
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};
use worldview_geo::{Coordinate, Route, path_length};

/// Average speed assumed for route durations when a file does not give one
/// (50 km/h).
pub const DEFAULT_AVERAGE_SPEED_MPS: f64 = 13.89;

/// Where journeys get their routes from.
pub trait RouteSource: Send + Sync {
    fn find_all(&self) -> Vec<Arc<Route>>;

    fn find_by_id(&self, route_id: &str) -> Option<Arc<Route>>;

    fn count(&self) -> usize;

    /// A uniformly chosen route.
    ///
    /// # Errors
    /// [`JourneyError::NoRoutesAvailable`] if the source is empty.
    fn get_random(&self) -> Result<Arc<Route>>;
}

/// Fixed set of routes held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRouteSource {
    routes: Vec<Arc<Route>>,
}

impl InMemoryRouteSource {
    /// # Errors
    /// [`JourneyError::RouteSource`] if two routes share an id.
    pub fn from_routes(routes: impl IntoIterator<Item = Route>) -> Result<Self> {
        let routes: Vec<Arc<Route>> = routes.into_iter().map(Arc::new).collect();
        let mut seen = HashSet::new();
        for route in &routes {
            if !seen.insert(route.id()) {
                return Err(JourneyError::RouteSource(format!(
                    "duplicate route id '{}'",
                    route.id()
                )));
            }
        }
        Ok(Self { routes })
    }

    /// Load routes from a `.json` file, or TOML for any other extension.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            JourneyError::RouteSource(format!("failed to read {}: {e}", path.display()))
        })?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let file: RoutesFile = if is_json {
            serde_json::from_str(&content).map_err(|e| {
                JourneyError::RouteSource(format!("failed to parse {}: {e}", path.display()))
            })?
        } else {
            toml::from_str(&content).map_err(|e| {
                JourneyError::RouteSource(format!("failed to parse {}: {e}", path.display()))
            })?
        };

        let source = file.into_source()?;
        info!(path = %path.display(), routes = source.count(), "Loaded routes");
        Ok(source)
    }

    /// Demo routes around Stuttgart.
    pub fn demo() -> Self {
        let definitions = [
            RouteDefinition::new(
                "stuttgart-city-loop",
                "Stuttgart City Loop",
                "Schlossplatz, Hauptbahnhof, Killesberg, Feuersee and back",
                &[
                    [48.7784, 9.1800],
                    [48.7840, 9.1817],
                    [48.7960, 9.1680],
                    [48.7725, 9.1650],
                    [48.7784, 9.1800],
                ],
            ),
            RouteDefinition::new(
                "zuffenhausen-to-untertuerkheim",
                "Zuffenhausen to Untertürkheim",
                "Across the Neckar valley via Pragsattel and Bad Cannstatt",
                &[
                    [48.8350, 9.1520],
                    [48.8075, 9.1850],
                    [48.8050, 9.2150],
                    [48.7830, 9.2500],
                ],
            ),
            RouteDefinition::new(
                "sindelfingen-to-boeblingen",
                "Sindelfingen to Böblingen",
                "Short plant-to-town transfer",
                &[[48.7050, 9.0050], [48.6950, 9.0100], [48.6850, 9.0150]],
            ),
        ];

        let routes = definitions
            .into_iter()
            .map(|definition| definition.into_route())
            .collect::<Result<Vec<_>>>();

        match routes.and_then(Self::from_routes) {
            Ok(source) => source,
            Err(err) => {
                // Built-in data; unreachable unless the table above is edited badly
                tracing::error!(error = %err, "Demo routes are invalid");
                Self::default()
            }
        }
    }
}

impl RouteSource for InMemoryRouteSource {
    fn find_all(&self) -> Vec<Arc<Route>> {
        self.routes.clone()
    }

    fn find_by_id(&self, route_id: &str) -> Option<Arc<Route>> {
        self.routes.iter().find(|r| r.id() == route_id).cloned()
    }

    fn count(&self) -> usize {
        self.routes.len()
    }

    fn get_random(&self) -> Result<Arc<Route>> {
        let route = self
            .routes
            .choose(&mut rand::rng())
            .cloned()
            .ok_or(JourneyError::NoRoutesAvailable)?;
        debug!(route_id = %route.id(), "Selected random route");
        Ok(route)
    }
}

/// On-disk routes document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutesFile {
    #[serde(default)]
    pub routes: Vec<RouteDefinition>,
}

impl RoutesFile {
    pub fn into_source(self) -> Result<InMemoryRouteSource> {
        let routes = self
            .routes
            .into_iter()
            .map(RouteDefinition::into_route)
            .collect::<Result<Vec<_>>>()?;
        InMemoryRouteSource::from_routes(routes)
    }
}

/// One route as written in a routes file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// `[latitude, longitude]` pairs
    pub waypoints: Vec<[f64; 2]>,
    #[serde(default)]
    pub total_distance_meters: Option<f64>,
    #[serde(default)]
    pub estimated_duration_seconds: Option<f64>,
    #[serde(default)]
    pub average_speed_mps: Option<f64>,
}

impl RouteDefinition {
    fn new(id: &str, name: &str, description: &str, waypoints: &[[f64; 2]]) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            waypoints: waypoints.to_vec(),
            total_distance_meters: None,
            estimated_duration_seconds: None,
            average_speed_mps: None,
        }
    }

    /// Validate and build the route, filling in omitted distance and duration.
    pub fn into_route(self) -> Result<Route> {
        let id = self.id;
        let waypoints = self
            .waypoints
            .iter()
            .map(|&[lat, lng]| Coordinate::new(lat, lng))
            .collect::<worldview_geo::Result<Vec<_>>>()
            .map_err(|e| JourneyError::RouteSource(format!("route '{id}': {e}")))?;

        let speed = self.average_speed_mps.unwrap_or(DEFAULT_AVERAGE_SPEED_MPS);
        if !speed.is_finite() || speed <= 0.0 {
            return Err(JourneyError::RouteSource(format!(
                "route '{id}': average_speed_mps must be positive, got {speed}"
            )));
        }

        let distance = self
            .total_distance_meters
            .unwrap_or_else(|| path_length(&waypoints));
        let duration = self
            .estimated_duration_seconds
            .unwrap_or(distance / speed);

        Route::new(id.clone(), self.name, self.description, waypoints, distance, duration)
            .map_err(|e| JourneyError::RouteSource(format!("route '{id}': {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn two_point(id: &str) -> Route {
        Route::from_waypoints(
            id,
            "Two Point",
            "",
            vec![Coordinate::new(48.0, 9.0).unwrap(), Coordinate::new(48.01, 9.0).unwrap()],
            10.0,
        )
        .unwrap()
    }

    #[test]
    fn test_empty_source_has_no_random_route() {
        let source = InMemoryRouteSource::default();
        assert_eq!(source.count(), 0);
        assert_eq!(source.get_random().unwrap_err(), JourneyError::NoRoutesAvailable);
    }

    #[test]
    fn test_lookup() {
        let source = InMemoryRouteSource::from_routes([two_point("a"), two_point("b")]).unwrap();
        assert_eq!(source.count(), 2);
        assert_eq!(source.find_by_id("b").unwrap().id(), "b");
        assert!(source.find_by_id("c").is_none());
        assert_eq!(source.find_all().len(), 2);

        let random = source.get_random().unwrap();
        assert!(random.id() == "a" || random.id() == "b");
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let err = InMemoryRouteSource::from_routes([two_point("a"), two_point("a")]).unwrap_err();
        assert!(matches!(err, JourneyError::RouteSource(_)));
    }

    #[test]
    fn test_demo_routes_are_valid() {
        let source = InMemoryRouteSource::demo();
        assert_eq!(source.count(), 3);
        for route in source.find_all() {
            assert!(route.total_distance_meters() > 1_000.0, "{} too short", route.id());
            assert!(route.waypoint_count() >= 3);
        }
    }

    #[test]
    fn test_load_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
            [[routes]]
            id = "loop"
            name = "Loop"
            waypoints = [[48.0, 9.0], [48.01, 9.0], [48.01, 9.01]]

            [[routes]]
            id = "fixed"
            name = "Fixed"
            waypoints = [[48.0, 9.0], [48.0, 9.01]]
            total_distance_meters = 800.0
            estimated_duration_seconds = 60.0
            "#
        )
        .unwrap();

        let source = InMemoryRouteSource::from_file(file.path()).unwrap();
        assert_eq!(source.count(), 2);

        let fixed = source.find_by_id("fixed").unwrap();
        assert_eq!(fixed.total_distance_meters(), 800.0);
        assert_eq!(fixed.estimated_duration_seconds(), 60.0);

        let measured = source.find_by_id("loop").unwrap();
        let expected = measured.distance_to_waypoint(2);
        assert!((measured.total_distance_meters() - expected).abs() < 1e-9);
        let expected_duration = expected / DEFAULT_AVERAGE_SPEED_MPS;
        assert!((measured.estimated_duration_seconds() - expected_duration).abs() < 1e-9);
    }

    #[test]
    fn test_load_json_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{"routes": [{{"id": "j", "name": "Json",
                "waypoints": [[1.0, 1.0], [1.0, 1.1]], "average_speed_mps": 20.0}}]}}"#
        )
        .unwrap();

        let source = InMemoryRouteSource::from_file(file.path()).unwrap();
        let route = source.find_by_id("j").unwrap();
        let covered = route.estimated_duration_seconds() * 20.0;
        assert!((covered - route.total_distance_meters()).abs() < 1e-6);
    }

    #[test]
    fn test_invalid_definitions_rejected() {
        let bad_coordinate = RouteDefinition::new("bad", "Bad", "", &[[95.0, 0.0], [0.0, 0.0]]);
        assert!(matches!(bad_coordinate.into_route(), Err(JourneyError::RouteSource(_))));

        let single = RouteDefinition::new("single", "Single", "", &[[1.0, 1.0]]);
        assert!(single.into_route().is_err());

        let mut slow = RouteDefinition::new("slow", "Slow", "", &[[1.0, 1.0], [1.0, 1.1]]);
        slow.average_speed_mps = Some(0.0);
        assert!(slow.into_route().is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = InMemoryRouteSource::from_file(Path::new("/no/such/routes.toml")).unwrap_err();
        assert!(matches!(err, JourneyError::RouteSource(_)));
    }
}
