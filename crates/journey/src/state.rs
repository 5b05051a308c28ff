//! Per-journey progress tracking and the advancement algorithm.
//!
//! A [`JourneyState`] walks a shared [`Route`] waypoint by waypoint. Status
//! transitions:
//!
//! ```text
//! NotStarted --start--> InProgress <--pause/resume--> Paused
//!                            |
//!                  advance reaches the end
//!                            v
//!                        Completed
//! ```

use crate::error::{JourneyError, Result};
use crate::events::JourneySnapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use worldview_geo::{Coordinate, Route};

/// Remaining travel within this many meters of the next waypoint counts as
/// reaching it, so `speed * (length / speed)` lands on the end despite rounding.
pub const ARRIVAL_TOLERANCE_METERS: f64 = 1e-6;

/// Lifecycle status of a journey.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JourneyStatus {
    NotStarted,
    InProgress,
    Paused,
    Completed,
}

impl fmt::Display for JourneyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JourneyStatus::NotStarted => "NOT_STARTED",
            JourneyStatus::InProgress => "IN_PROGRESS",
            JourneyStatus::Paused => "PAUSED",
            JourneyStatus::Completed => "COMPLETED",
        };
        f.write_str(s)
    }
}

/// Mutable progress of one simulated vehicle along a route.
#[derive(Debug, Clone)]
pub struct JourneyState {
    journey_id: String,
    route: Arc<Route>,
    current_waypoint_index: usize,
    current_position: Coordinate,
    status: JourneyStatus,
    speed_meters_per_second: f64,
    progress_percentage: f64,
    distance_travelled_meters: f64,
    started_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

fn check_speed(speed: f64) -> Result<()> {
    if speed.is_finite() && speed > 0.0 {
        Ok(())
    } else {
        Err(JourneyError::invalid_argument(format!(
            "speed must be finite and positive, got {speed}"
        )))
    }
}

impl JourneyState {
    /// Creates a journey at the start of `route`, not yet started.
    ///
    /// # Errors
    /// [`JourneyError::InvalidArgument`] for a blank id or a speed that is not
    /// finite and positive.
    pub fn new(
        journey_id: impl Into<String>,
        route: Arc<Route>,
        speed_meters_per_second: f64,
    ) -> Result<Self> {
        let journey_id = journey_id.into();
        if journey_id.trim().is_empty() {
            return Err(JourneyError::invalid_argument("journey id must not be blank"));
        }
        check_speed(speed_meters_per_second)?;

        Ok(Self {
            journey_id,
            current_position: route.start_point(),
            route,
            current_waypoint_index: 0,
            status: JourneyStatus::NotStarted,
            speed_meters_per_second,
            progress_percentage: 0.0,
            distance_travelled_meters: 0.0,
            started_at: None,
            updated_at: Utc::now(),
            completed_at: None,
        })
    }

    pub fn journey_id(&self) -> &str {
        &self.journey_id
    }

    pub fn route(&self) -> &Arc<Route> {
        &self.route
    }

    pub fn current_waypoint_index(&self) -> usize {
        self.current_waypoint_index
    }

    pub fn current_position(&self) -> Coordinate {
        self.current_position
    }

    pub fn status(&self) -> JourneyStatus {
        self.status
    }

    pub fn speed_meters_per_second(&self) -> f64 {
        self.speed_meters_per_second
    }

    /// Progress along the route, `0..=100`.
    pub fn progress_percentage(&self) -> f64 {
        self.progress_percentage
    }

    /// Distance covered along the route's segments.
    pub fn distance_travelled_meters(&self) -> f64 {
        self.distance_travelled_meters
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn is_completed(&self) -> bool {
        self.status == JourneyStatus::Completed
    }

    pub fn is_in_progress(&self) -> bool {
        self.status == JourneyStatus::InProgress
    }

    /// Distance left to the route's end, never negative.
    pub fn remaining_distance_meters(&self) -> f64 {
        if self.is_completed() {
            return 0.0;
        }
        (self.route.total_distance_meters() - self.distance_travelled_meters).max(0.0)
    }

    /// Seconds left at the current speed.
    pub fn estimated_seconds_remaining(&self) -> f64 {
        self.remaining_distance_meters() / self.speed_meters_per_second
    }

    /// Begins (or continues) travel.
    ///
    /// # Errors
    /// [`JourneyError::InvalidState`] if the journey is already in progress or
    /// completed.
    pub fn start(&mut self) -> Result<()> {
        match self.status {
            JourneyStatus::InProgress => Err(JourneyError::invalid_state(format!(
                "journey '{}' is already in progress",
                self.journey_id
            ))),
            JourneyStatus::Completed => Err(JourneyError::invalid_state(format!(
                "journey '{}' is already completed",
                self.journey_id
            ))),
            JourneyStatus::NotStarted | JourneyStatus::Paused => {
                self.status = JourneyStatus::InProgress;
                let now = Utc::now();
                if self.started_at.is_none() {
                    self.started_at = Some(now);
                }
                self.updated_at = now;
                Ok(())
            }
        }
    }

    /// # Errors
    /// [`JourneyError::InvalidState`] unless the journey is in progress.
    pub fn pause(&mut self) -> Result<()> {
        if self.status != JourneyStatus::InProgress {
            return Err(JourneyError::invalid_state(format!(
                "cannot pause journey '{}' while {}",
                self.journey_id, self.status
            )));
        }
        self.status = JourneyStatus::Paused;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// # Errors
    /// [`JourneyError::InvalidState`] unless the journey is paused.
    pub fn resume(&mut self) -> Result<()> {
        if self.status != JourneyStatus::Paused {
            return Err(JourneyError::invalid_state(format!(
                "cannot resume journey '{}' while {}",
                self.journey_id, self.status
            )));
        }
        self.status = JourneyStatus::InProgress;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// # Errors
    /// [`JourneyError::InvalidArgument`] for a speed that is not finite and
    /// positive, [`JourneyError::InvalidState`] once completed.
    pub fn set_speed(&mut self, speed_meters_per_second: f64) -> Result<()> {
        check_speed(speed_meters_per_second)?;
        if self.is_completed() {
            return Err(JourneyError::invalid_state(format!(
                "cannot change speed of completed journey '{}'",
                self.journey_id
            )));
        }
        self.speed_meters_per_second = speed_meters_per_second;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Moves the journey forward by `elapsed_seconds` of travel at its speed.
    ///
    /// One call may pass several waypoints. Outside `InProgress` nothing
    /// changes and the current completion flag is returned.
    ///
    /// # Returns
    /// `true` once the journey has reached the last waypoint.
    ///
    /// # Errors
    /// [`JourneyError::InvalidArgument`] if `elapsed_seconds` is not finite
    /// and positive.
    pub fn advance(&mut self, elapsed_seconds: f64) -> Result<bool> {
        if !elapsed_seconds.is_finite() || elapsed_seconds <= 0.0 {
            return Err(JourneyError::invalid_argument(format!(
                "elapsed seconds must be finite and positive, got {elapsed_seconds}"
            )));
        }
        if self.status != JourneyStatus::InProgress {
            return Ok(self.is_completed());
        }

        let waypoints = self.route.waypoints();
        let last_index = waypoints.len() - 1;
        let mut remaining = self.speed_meters_per_second * elapsed_seconds;

        while remaining > 0.0 && self.current_waypoint_index < last_index {
            let next = waypoints[self.current_waypoint_index + 1];
            let to_next = self.current_position.distance_to(&next);

            if remaining + ARRIVAL_TOLERANCE_METERS >= to_next {
                self.current_position = next;
                self.current_waypoint_index += 1;
                remaining = (remaining - to_next).max(0.0);
            } else {
                // to_next > remaining > 0 here, so the fraction is inside (0, 1)
                let fraction = remaining / to_next;
                self.current_position = self.current_position.interpolate_to(&next, fraction)?;
                remaining = 0.0;
            }
        }

        self.updated_at = Utc::now();
        self.recompute_progress();

        if self.current_waypoint_index == last_index {
            self.status = JourneyStatus::Completed;
            self.progress_percentage = 100.0;
            self.completed_at = Some(self.updated_at);
            return Ok(true);
        }
        Ok(false)
    }

    fn recompute_progress(&mut self) {
        let traversed = self.route.distance_to_waypoint(self.current_waypoint_index);
        let on_last_waypoint = self.current_waypoint_index + 1 >= self.route.waypoint_count();
        let partial = match self.route.waypoints().get(self.current_waypoint_index) {
            Some(segment_start) if !on_last_waypoint => {
                segment_start.distance_to(&self.current_position)
            }
            _ => 0.0,
        };

        self.distance_travelled_meters = traversed + partial;
        let fraction = self.distance_travelled_meters / self.route.total_distance_meters();
        self.progress_percentage = (fraction * 100.0).min(100.0);
    }

    /// Route-free, serializable view of this journey.
    pub fn snapshot(&self) -> JourneySnapshot {
        JourneySnapshot {
            journey_id: self.journey_id.clone(),
            route_id: self.route.id().to_string(),
            route_name: self.route.name().to_string(),
            status: self.status,
            position: self.current_position,
            waypoint_index: self.current_waypoint_index,
            waypoint_count: self.route.waypoint_count(),
            speed_meters_per_second: self.speed_meters_per_second,
            progress_percentage: self.progress_percentage,
            remaining_distance_meters: self.remaining_distance_meters(),
            started_at: self.started_at,
            updated_at: self.updated_at,
            completed_at: self.completed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coord(lat: f64, lng: f64) -> Coordinate {
        Coordinate::new(lat, lng).unwrap()
    }

    /// [(0,0), (0,0.001), (0,0.002)]: two ~111.2 m segments on the equator.
    fn equator_route() -> Arc<Route> {
        Arc::new(
            Route::from_waypoints(
                "equator",
                "Equator Strip",
                "",
                vec![coord(0.0, 0.0), coord(0.0, 0.001), coord(0.0, 0.002)],
                10.0,
            )
            .unwrap(),
        )
    }

    fn started(speed: f64) -> JourneyState {
        let mut journey = JourneyState::new("j-1", equator_route(), speed).unwrap();
        journey.start().unwrap();
        journey
    }

    #[test]
    fn test_new_journey_defaults() {
        let journey = JourneyState::new("j-1", equator_route(), 10.0).unwrap();
        assert_eq!(journey.status(), JourneyStatus::NotStarted);
        assert_eq!(journey.current_waypoint_index(), 0);
        assert_eq!(journey.current_position(), coord(0.0, 0.0));
        assert_eq!(journey.progress_percentage(), 0.0);
        assert!(journey.started_at().is_none());
    }

    #[test]
    fn test_new_rejects_bad_input() {
        assert!(matches!(
            JourneyState::new(" ", equator_route(), 10.0),
            Err(JourneyError::InvalidArgument(_))
        ));
        for speed in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(JourneyState::new("j", equator_route(), speed).is_err());
        }
    }

    #[test]
    fn test_start_rejects_in_progress_and_completed() {
        let mut journey = started(10.0);
        assert!(matches!(journey.start(), Err(JourneyError::InvalidState(_))));

        journey.advance(1_000.0).unwrap();
        assert!(journey.is_completed());
        assert!(matches!(journey.start(), Err(JourneyError::InvalidState(_))));
    }

    #[test]
    fn test_pause_and_resume_rules() {
        let mut journey = JourneyState::new("j-1", equator_route(), 10.0).unwrap();
        assert!(matches!(journey.pause(), Err(JourneyError::InvalidState(_))));
        assert!(matches!(journey.resume(), Err(JourneyError::InvalidState(_))));

        journey.start().unwrap();
        assert!(matches!(journey.resume(), Err(JourneyError::InvalidState(_))));

        journey.pause().unwrap();
        assert_eq!(journey.status(), JourneyStatus::Paused);
        assert!(matches!(journey.pause(), Err(JourneyError::InvalidState(_))));

        journey.resume().unwrap();
        assert_eq!(journey.status(), JourneyStatus::InProgress);
    }

    #[test]
    fn test_set_speed() {
        let mut journey = started(10.0);
        assert!(matches!(journey.set_speed(0.0), Err(JourneyError::InvalidArgument(_))));
        journey.set_speed(25.0).unwrap();
        assert_eq!(journey.speed_meters_per_second(), 25.0);

        journey.advance(1_000.0).unwrap();
        assert!(matches!(journey.set_speed(5.0), Err(JourneyError::InvalidState(_))));
    }

    #[test]
    fn test_advance_rejects_bad_elapsed() {
        let mut journey = started(10.0);
        for elapsed in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                journey.advance(elapsed),
                Err(JourneyError::InvalidArgument(_))
            ));
        }
    }

    #[test]
    fn test_advance_is_noop_unless_in_progress() {
        let mut journey = JourneyState::new("j-1", equator_route(), 10.0).unwrap();
        assert!(!journey.advance(5.0).unwrap());
        assert_eq!(journey.current_position(), coord(0.0, 0.0));

        journey.start().unwrap();
        journey.pause().unwrap();
        assert!(!journey.advance(5.0).unwrap());
        assert_eq!(journey.progress_percentage(), 0.0);
    }

    #[test]
    fn test_advance_within_first_segment() {
        let mut journey = started(10.0);
        // 50 m of a ~111.2 m segment
        assert!(!journey.advance(5.0).unwrap());

        assert_eq!(journey.current_waypoint_index(), 0);
        assert!(journey.current_position().longitude() > 0.0);
        assert!(journey.current_position().longitude() < 0.001);
        assert!((journey.distance_travelled_meters() - 50.0).abs() < 0.01);
        let expected = 50.0 / journey.route().total_distance_meters() * 100.0;
        assert!((journey.progress_percentage() - expected).abs() < 0.01);
    }

    #[test]
    fn test_advance_crosses_waypoint_boundary() {
        // 100 m/s for 5 s = 500 m, longer than the whole ~222 m route
        let mut journey = started(100.0);
        let start = journey.current_position();
        journey.advance(5.0).unwrap();

        assert!(journey.current_waypoint_index() >= 1);
        assert_ne!(journey.current_position(), start);
    }

    #[test]
    fn test_advance_crosses_one_boundary_and_interpolates() {
        let mut journey = started(10.0);
        // 150 m: past waypoint 1 (~111.2 m), ~38.8 m into segment 2
        assert!(!journey.advance(15.0).unwrap());

        assert_eq!(journey.current_waypoint_index(), 1);
        let lng = journey.current_position().longitude();
        assert!(lng > 0.001 && lng < 0.002, "longitude {lng}");
        assert!((journey.distance_travelled_meters() - 150.0).abs() < 0.01);
    }

    #[test]
    fn test_exact_time_completes_three_waypoint_route() {
        let route = equator_route();
        let speed = 7.3;
        let exact = route.total_distance_meters() / speed;
        let mut journey = JourneyState::new("j-1", route.clone(), speed).unwrap();
        journey.start().unwrap();

        assert!(journey.advance(exact).unwrap());
        assert_eq!(journey.status(), JourneyStatus::Completed);
        assert_eq!(journey.progress_percentage(), 100.0);
        assert_eq!(journey.current_position(), route.end_point());
        assert!(journey.completed_at().is_some());
        assert_eq!(journey.remaining_distance_meters(), 0.0);
    }

    #[test]
    fn test_advance_idempotent_once_completed() {
        let mut journey = started(10.0);
        assert!(journey.advance(100.0).unwrap());
        let position = journey.current_position();
        let progress = journey.progress_percentage();

        for _ in 0..3 {
            assert!(journey.advance(10.0).unwrap());
            assert_eq!(journey.current_position(), position);
            assert_eq!(journey.progress_percentage(), progress);
        }
    }

    #[test]
    fn test_zero_length_segment_is_skipped() {
        let route = Arc::new(
            Route::from_waypoints(
                "dup",
                "Duplicate Waypoint",
                "",
                vec![coord(0.0, 0.0), coord(0.0, 0.0), coord(0.0, 0.001)],
                10.0,
            )
            .unwrap(),
        );
        let mut journey = JourneyState::new("j-dup", route, 10.0).unwrap();
        journey.start().unwrap();

        assert!(!journey.advance(1.0).unwrap());
        assert_eq!(journey.current_waypoint_index(), 1);
        assert!(journey.current_position().longitude() > 0.0);
    }

    #[test]
    fn test_progress_is_clamped_to_declared_distance() {
        // Declared distance shorter than the measured path
        let route = Arc::new(
            Route::new(
                "short",
                "Understated",
                "",
                vec![coord(0.0, 0.0), coord(0.0, 0.001), coord(0.0, 0.002)],
                100.0,
                10.0,
            )
            .unwrap(),
        );
        let mut journey = JourneyState::new("j-short", route, 10.0).unwrap();
        journey.start().unwrap();
        journey.advance(15.0).unwrap();

        assert!(!journey.is_completed());
        assert_eq!(journey.progress_percentage(), 100.0);
    }

    #[test]
    fn test_snapshot_reflects_state() {
        let mut journey = started(10.0);
        journey.advance(5.0).unwrap();
        let snapshot = journey.snapshot();

        assert_eq!(snapshot.journey_id, "j-1");
        assert_eq!(snapshot.route_id, "equator");
        assert_eq!(snapshot.status, JourneyStatus::InProgress);
        assert_eq!(snapshot.waypoint_count, 3);
        assert_eq!(snapshot.position, journey.current_position());
        let expected = snapshot.remaining_distance_meters / 10.0;
        assert!((journey.estimated_seconds_remaining() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(JourneyStatus::InProgress.to_string(), "IN_PROGRESS");
        assert_eq!(
            serde_json::to_string(&JourneyStatus::NotStarted).unwrap(),
            "\"NOT_STARTED\""
        );
    }
}
