//! Immutable routes made of ordered waypoints.

use crate::error::{GeoError, Result};
use crate::{Coordinate, path};
use serde::Serialize;

/// An ordered sequence of waypoints with distance and duration metadata.
///
/// All invariants are checked in [`Route::new`]; a constructed route is never
/// mutated and is usually shared between journeys behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Route {
    id: String,
    name: String,
    description: String,
    waypoints: Vec<Coordinate>,
    total_distance_meters: f64,
    estimated_duration_seconds: f64,
    #[serde(skip)]
    segment_lengths: Vec<f64>,
}

impl Route {
    /// Creates a route from explicit metadata.
    ///
    /// # Errors
    /// Returns [`GeoError::InvalidArgument`] if `id` or `name` is blank, there
    /// are fewer than two waypoints, or the distance or duration is not a
    /// finite positive number.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        waypoints: Vec<Coordinate>,
        total_distance_meters: f64,
        estimated_duration_seconds: f64,
    ) -> Result<Self> {
        let id = id.into();
        let name = name.into();

        if id.trim().is_empty() {
            return Err(GeoError::invalid_argument("route id must not be blank"));
        }
        if name.trim().is_empty() {
            return Err(GeoError::invalid_argument(format!(
                "route '{id}' name must not be blank"
            )));
        }
        if waypoints.len() < 2 {
            return Err(GeoError::invalid_argument(format!(
                "route '{id}' needs at least 2 waypoints, got {}",
                waypoints.len()
            )));
        }
        if !total_distance_meters.is_finite() || total_distance_meters <= 0.0 {
            return Err(GeoError::invalid_argument(format!(
                "route '{id}' total distance must be finite and positive, \
                 got {total_distance_meters}"
            )));
        }
        if !estimated_duration_seconds.is_finite() || estimated_duration_seconds <= 0.0 {
            return Err(GeoError::invalid_argument(format!(
                "route '{id}' estimated duration must be finite and positive, \
                 got {estimated_duration_seconds}"
            )));
        }

        let segment_lengths = path::segment_lengths(&waypoints);

        Ok(Self {
            id,
            name,
            description: description.into(),
            waypoints,
            total_distance_meters,
            estimated_duration_seconds,
            segment_lengths,
        })
    }

    /// Creates a route whose distance is measured along its waypoints and
    /// whose duration assumes `average_speed_mps`.
    ///
    /// # Errors
    /// Same as [`Route::new`], plus [`GeoError::InvalidArgument`] for a
    /// non-positive speed. A path whose points all coincide has zero length
    /// and is rejected.
    pub fn from_waypoints(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        waypoints: Vec<Coordinate>,
        average_speed_mps: f64,
    ) -> Result<Self> {
        if !average_speed_mps.is_finite() || average_speed_mps <= 0.0 {
            return Err(GeoError::invalid_argument(format!(
                "average speed must be finite and positive, got {average_speed_mps}"
            )));
        }
        let distance = path::path_length(&waypoints);
        Self::new(
            id,
            name,
            description,
            waypoints,
            distance,
            distance / average_speed_mps,
        )
    }

    /// Route identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Human-readable name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Free-form description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// All waypoints in travel order.
    pub fn waypoints(&self) -> &[Coordinate] {
        &self.waypoints
    }

    /// Number of waypoints (always at least 2).
    pub fn waypoint_count(&self) -> usize {
        self.waypoints.len()
    }

    pub fn total_distance_meters(&self) -> f64 {
        self.total_distance_meters
    }

    pub fn estimated_duration_seconds(&self) -> f64 {
        self.estimated_duration_seconds
    }

    /// First waypoint.
    pub fn start_point(&self) -> Coordinate {
        self.waypoints[0]
    }

    /// Last waypoint.
    pub fn end_point(&self) -> Coordinate {
        self.waypoints[self.waypoints.len() - 1]
    }

    /// Waypoint at `index`.
    ///
    /// # Errors
    /// Returns [`GeoError::IndexOutOfRange`] if `index >= waypoint_count()`.
    pub fn waypoint_at(&self, index: usize) -> Result<Coordinate> {
        self.waypoints
            .get(index)
            .copied()
            .ok_or(GeoError::IndexOutOfRange {
                index,
                len: self.waypoints.len(),
            })
    }

    /// Length in meters of each segment, `segment_lengths()[i]` being the
    /// distance from waypoint `i` to waypoint `i + 1`.
    pub fn segment_lengths(&self) -> &[f64] {
        &self.segment_lengths
    }

    /// Sum of the first `segments` segment lengths.
    pub fn distance_to_waypoint(&self, segments: usize) -> f64 {
        self.segment_lengths
            .iter()
            .take(segments)
            .sum()
    }
}
