//! Use-case layer over journeys, routes and publishers.

use crate::error::{JourneyError, Result};
use crate::events::JourneySnapshot;
use crate::publisher::PositionPublisher;
use crate::repository::JourneyRepository;
use crate::routes::RouteSource;
use crate::state::JourneyState;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};
use worldview_geo::{Coordinate, Route};

/// Outcome of advancing one journey.
#[derive(Debug, Clone)]
pub struct JourneyStep {
    pub position: Coordinate,
    /// True only on the advance that reached the last waypoint
    pub completed: bool,
    pub snapshot: JourneySnapshot,
}

/// Starts, advances and stops journeys.
///
/// Every repository write (start, advance, update, stop) runs under one
/// orchestrator-wide lock so two callers cannot overwrite each other's
/// progress. Publisher failures are logged and never fail an operation.
pub struct JourneyOrchestrator {
    repository: Arc<dyn JourneyRepository>,
    routes: Arc<dyn RouteSource>,
    publisher: Arc<dyn PositionPublisher>,
    advance_lock: Mutex<()>,
}

impl JourneyOrchestrator {
    pub fn new(
        repository: Arc<dyn JourneyRepository>,
        routes: Arc<dyn RouteSource>,
        publisher: Arc<dyn PositionPublisher>,
    ) -> Self {
        Self {
            repository,
            routes,
            publisher,
            advance_lock: Mutex::new(()),
        }
    }

    pub fn routes(&self) -> &Arc<dyn RouteSource> {
        &self.routes
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.advance_lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Start a journey on a randomly chosen route.
    ///
    /// # Errors
    /// [`JourneyError::AlreadyExists`] if the id is taken,
    /// [`JourneyError::NoRoutesAvailable`] if there are no routes.
    pub fn start_new_journey(
        &self,
        journey_id: &str,
        speed_meters_per_second: f64,
    ) -> Result<JourneyState> {
        let _guard = self.lock();
        self.ensure_absent(journey_id)?;
        let route = self.routes.get_random()?;
        self.begin(journey_id, route, speed_meters_per_second)
    }

    /// Start a journey on a specific route.
    ///
    /// # Errors
    /// [`JourneyError::AlreadyExists`] if the id is taken,
    /// [`JourneyError::RouteNotFound`] for an unknown route.
    pub fn start_journey_on_route(
        &self,
        journey_id: &str,
        route_id: &str,
        speed_meters_per_second: f64,
    ) -> Result<JourneyState> {
        let _guard = self.lock();
        self.ensure_absent(journey_id)?;
        let route = self
            .routes
            .find_by_id(route_id)
            .ok_or_else(|| JourneyError::RouteNotFound(route_id.to_string()))?;
        self.begin(journey_id, route, speed_meters_per_second)
    }

    fn ensure_absent(&self, journey_id: &str) -> Result<()> {
        if self.repository.exists(journey_id)? {
            return Err(JourneyError::AlreadyExists(journey_id.to_string()));
        }
        Ok(())
    }

    fn begin(&self, journey_id: &str, route: Arc<Route>, speed: f64) -> Result<JourneyState> {
        let mut state = JourneyState::new(journey_id, route, speed)?;
        state.start()?;
        self.repository.save(state.clone())?;

        info!(
            journey_id,
            route_id = state.route().id(),
            speed_mps = speed,
            "Started journey"
        );
        if let Err(err) = self.publisher.publish_journey_started(&state) {
            warn!(journey_id, error = %err, "Failed to publish journey start");
        }
        Ok(state)
    }

    /// # Errors
    /// [`JourneyError::JourneyNotFound`] if absent.
    pub fn get_journey_state(&self, journey_id: &str) -> Result<JourneyState> {
        self.repository
            .find_by_id(journey_id)?
            .ok_or_else(|| JourneyError::JourneyNotFound(journey_id.to_string()))
    }

    /// Advance a journey by `elapsed_seconds` and return its new position.
    pub fn advance_journey(&self, journey_id: &str, elapsed_seconds: f64) -> Result<Coordinate> {
        self.step_journey(journey_id, elapsed_seconds).map(|step| step.position)
    }

    /// Advance a journey, persist it and publish the new position.
    ///
    /// A completion event is published only on the advance that completes the
    /// journey.
    ///
    /// # Errors
    /// [`JourneyError::JourneyNotFound`] if absent, or whatever
    /// [`JourneyState::advance`] or the repository return.
    pub fn step_journey(&self, journey_id: &str, elapsed_seconds: f64) -> Result<JourneyStep> {
        let _guard = self.lock();
        let mut state = self.get_journey_state(journey_id)?;
        let was_completed = state.is_completed();

        let completed = state.advance(elapsed_seconds)?;
        self.repository.save(state.clone())?;

        let position = state.current_position();
        if let Err(err) = self
            .publisher
            .publish_coordinate_update(journey_id, position, &state)
        {
            warn!(journey_id, error = %err, "Failed to publish coordinate update");
        }

        let just_completed = completed && !was_completed;
        if just_completed {
            info!(journey_id, route_id = state.route().id(), "Journey completed");
            if let Err(err) = self.publisher.publish_journey_completed(&state) {
                warn!(journey_id, error = %err, "Failed to publish journey completion");
            }
        } else {
            debug!(
                journey_id,
                waypoint = state.current_waypoint_index(),
                progress = state.progress_percentage(),
                "Advanced journey"
            );
        }

        Ok(JourneyStep {
            position,
            completed: just_completed,
            snapshot: state.snapshot(),
        })
    }

    /// # Errors
    /// [`JourneyError::JourneyNotFound`] if absent, [`JourneyError::InvalidState`]
    /// unless in progress.
    pub fn pause_journey(&self, journey_id: &str) -> Result<JourneyState> {
        self.update(journey_id, JourneyState::pause)
    }

    /// # Errors
    /// [`JourneyError::JourneyNotFound`] if absent, [`JourneyError::InvalidState`]
    /// unless paused.
    pub fn resume_journey(&self, journey_id: &str) -> Result<JourneyState> {
        self.update(journey_id, JourneyState::resume)
    }

    pub fn set_journey_speed(
        &self,
        journey_id: &str,
        speed_meters_per_second: f64,
    ) -> Result<JourneyState> {
        self.update(journey_id, |state| state.set_speed(speed_meters_per_second))
    }

    fn update(
        &self,
        journey_id: &str,
        apply: impl FnOnce(&mut JourneyState) -> Result<()>,
    ) -> Result<JourneyState> {
        let _guard = self.lock();
        let mut state = self.get_journey_state(journey_id)?;
        apply(&mut state)?;
        self.repository.save(state.clone())?;
        debug!(journey_id, status = %state.status(), "Updated journey");
        Ok(state)
    }

    /// Remove a journey. Stopping an unknown journey is not an error.
    ///
    /// Waits for an in-flight advance so it cannot write the journey back.
    pub fn stop_journey(&self, journey_id: &str) -> Result<()> {
        let _guard = self.lock();
        if self.repository.delete(journey_id)? {
            info!(journey_id, "Stopped journey");
        }
        Ok(())
    }

    pub fn journey_exists(&self, journey_id: &str) -> Result<bool> {
        self.repository.exists(journey_id)
    }

    /// Snapshots of every stored journey, ordered by id.
    pub fn list_journeys(&self) -> Result<Vec<JourneySnapshot>> {
        let mut snapshots: Vec<_> = self
            .repository
            .find_all()?
            .iter()
            .map(JourneyState::snapshot)
            .collect();
        snapshots.sort_by(|a, b| a.journey_id.cmp(&b.journey_id));
        Ok(snapshots)
    }
}
