use super::{METRIC_TICK_MS, TickReport, drive};
use crate::orchestrator::JourneyOrchestrator;
use crate::state::JourneyStatus;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;
use worldview_telemetry::Timer;

/// Prefix of generated journey ids.
pub const AUTO_JOURNEY_PREFIX: &str = "auto-";

#[derive(Debug, Default)]
struct AutoState {
    active: Option<String>,
    last_completed: Option<Instant>,
}

/// Keeps one journey running at a time.
///
/// When no journey is active and `start_delay` has passed since the last one
/// finished, a new journey starts on a random route. Any error on the active
/// journey abandons it; the next journey starts on a later tick.
pub struct AutoJourneyScheduler {
    orchestrator: Arc<JourneyOrchestrator>,
    tick_interval: Duration,
    start_delay: Duration,
    speed_meters_per_second: f64,
    state: Mutex<AutoState>,
}

impl AutoJourneyScheduler {
    pub fn new(
        orchestrator: Arc<JourneyOrchestrator>,
        tick_interval: Duration,
        start_delay: Duration,
        speed_meters_per_second: f64,
    ) -> Self {
        Self {
            orchestrator,
            tick_interval,
            start_delay,
            speed_meters_per_second,
            state: Mutex::new(AutoState::default()),
        }
    }

    /// Id of the journey currently being driven.
    pub fn active_journey(&self) -> Option<String> {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).active.clone()
    }

    pub fn tick(&self) -> TickReport {
        self.tick_at(Instant::now())
    }

    /// One tick, treating `now` as the current time for the cooldown.
    pub fn tick_at(&self, now: Instant) -> TickReport {
        let timer = Timer::start(METRIC_TICK_MS);
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let mut report = TickReport::default();

        match state.active.clone() {
            None => {
                let cooling_down = state
                    .last_completed
                    .is_some_and(|done| now.saturating_duration_since(done) < self.start_delay);
                if !cooling_down {
                    let journey_id = format!("{AUTO_JOURNEY_PREFIX}{}", Uuid::new_v4());
                    match self
                        .orchestrator
                        .start_new_journey(&journey_id, self.speed_meters_per_second)
                    {
                        Ok(started) => {
                            info!(
                                journey_id = %journey_id,
                                route_id = started.route().id(),
                                "Auto journey started"
                            );
                            state.active = Some(journey_id);
                            report.started = 1;
                        }
                        Err(err) => {
                            warn!(error = %err, "Failed to start auto journey");
                            report.failed = 1;
                        }
                    }
                }
            }
            Some(journey_id) => {
                match self
                    .orchestrator
                    .step_journey(&journey_id, self.tick_interval.as_secs_f64())
                {
                    Ok(step) => match step.snapshot.status {
                        JourneyStatus::InProgress => report.advanced = 1,
                        JourneyStatus::Completed => {
                            // Another caller may have driven it to the end
                            report.advanced = usize::from(step.completed);
                            report.completed = usize::from(step.completed);
                            self.discard(&journey_id);
                            state.active = None;
                            state.last_completed = Some(now);
                            info!(
                                journey_id = %journey_id,
                                next_in_ms = self.start_delay.as_millis() as u64,
                                "Auto journey finished"
                            );
                        }
                        // Paused from outside: stays active without moving
                        JourneyStatus::NotStarted | JourneyStatus::Paused => {}
                    },
                    Err(err) => {
                        warn!(
                            journey_id = %journey_id,
                            error = %err,
                            "Auto journey failed, abandoning it"
                        );
                        report.failed = 1;
                        self.discard(&journey_id);
                        state.active = None;
                    }
                }
            }
        }

        report.record(usize::from(state.active.is_some()), timer, self.tick_interval);
        report
    }

    fn discard(&self, journey_id: &str) {
        if let Err(err) = self.orchestrator.stop_journey(journey_id) {
            warn!(journey_id, error = %err, "Failed to clean up auto journey");
        }
    }

    /// Tick on the configured interval until `shutdown` is cancelled.
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        info!(
            start_delay_ms = self.start_delay.as_millis() as u64,
            speed_mps = self.speed_meters_per_second,
            "Auto-journey scheduler running"
        );
        drive("auto", self.tick_interval, shutdown, || self.tick()).await;
    }
}
