//! Serializable journey views and position events.

use crate::state::{JourneyState, JourneyStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use worldview_geo::Coordinate;

/// Point-in-time view of a journey without the route's waypoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JourneySnapshot {
    pub journey_id: String,
    pub route_id: String,
    pub route_name: String,
    pub status: JourneyStatus,
    pub position: Coordinate,
    pub waypoint_index: usize,
    pub waypoint_count: usize,
    pub speed_meters_per_second: f64,
    pub progress_percentage: f64,
    pub remaining_distance_meters: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Event emitted to subscribers as journeys move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PositionEvent {
    CoordinateUpdate {
        journey_id: String,
        coordinate: Coordinate,
        /// Degrees clockwise from north towards the next waypoint, if any
        #[serde(skip_serializing_if = "Option::is_none")]
        heading: Option<f64>,
        journey: JourneySnapshot,
    },
    JourneyStarted {
        journey: JourneySnapshot,
    },
    JourneyCompleted {
        journey: JourneySnapshot,
    },
}

impl PositionEvent {
    pub fn coordinate_update(
        journey_id: &str,
        coordinate: Coordinate,
        state: &JourneyState,
    ) -> Self {
        let heading = state
            .route()
            .waypoints()
            .get(state.current_waypoint_index() + 1)
            .map(|next| coordinate.bearing_to(next));

        PositionEvent::CoordinateUpdate {
            journey_id: journey_id.to_string(),
            coordinate,
            heading,
            journey: state.snapshot(),
        }
    }

    pub fn journey_started(state: &JourneyState) -> Self {
        PositionEvent::JourneyStarted {
            journey: state.snapshot(),
        }
    }

    pub fn journey_completed(state: &JourneyState) -> Self {
        PositionEvent::JourneyCompleted {
            journey: state.snapshot(),
        }
    }

    /// Id of the journey this event is about.
    pub fn journey_id(&self) -> &str {
        match self {
            PositionEvent::CoordinateUpdate { journey_id, .. } => journey_id,
            PositionEvent::JourneyStarted { journey }
            | PositionEvent::JourneyCompleted { journey } => &journey.journey_id,
        }
    }

    /// Snapshot carried by the event.
    pub fn journey(&self) -> &JourneySnapshot {
        match self {
            PositionEvent::CoordinateUpdate { journey, .. }
            | PositionEvent::JourneyStarted { journey }
            | PositionEvent::JourneyCompleted { journey } => journey,
        }
    }
}
