use super::{METRIC_TICK_MS, TickReport, drive};
use crate::error::{JourneyError, Result};
use crate::orchestrator::JourneyOrchestrator;
use crate::state::JourneyStatus;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use worldview_telemetry::Timer;

enum Outcome {
    Advanced,
    Completed,
    Idle,
    Gone,
}

/// Advances every registered journey on each tick.
///
/// Journeys are processed one after another in id order. An error on one
/// journey drops that id and the rest of the tick carries on.
pub struct MultiJourneyScheduler {
    orchestrator: Arc<JourneyOrchestrator>,
    tick_interval: Duration,
    tracked: Mutex<BTreeSet<String>>,
}

impl MultiJourneyScheduler {
    pub fn new(orchestrator: Arc<JourneyOrchestrator>, tick_interval: Duration) -> Self {
        Self {
            orchestrator,
            tick_interval,
            tracked: Mutex::new(BTreeSet::new()),
        }
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    fn tracked(&self) -> MutexGuard<'_, BTreeSet<String>> {
        self.tracked.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Start advancing a journey. Returns false if it was already tracked.
    pub fn register(&self, journey_id: impl Into<String>) -> bool {
        let journey_id = journey_id.into();
        debug!(journey_id = %journey_id, "Registered journey");
        self.tracked().insert(journey_id)
    }

    /// Stop advancing a journey. Returns whether it was tracked.
    pub fn unregister(&self, journey_id: &str) -> bool {
        self.tracked().remove(journey_id)
    }

    pub fn tracked_ids(&self) -> Vec<String> {
        self.tracked().iter().cloned().collect()
    }

    pub fn tracked_count(&self) -> usize {
        self.tracked().len()
    }

    /// Advance every tracked in-progress journey by one interval.
    pub fn tick(&self) -> TickReport {
        let timer = Timer::start(METRIC_TICK_MS);
        let elapsed = self.tick_interval.as_secs_f64();
        let mut report = TickReport::default();

        // Work on a copy so callers can register or unregister mid-tick
        for journey_id in self.tracked_ids() {
            match self.tick_one(&journey_id, elapsed) {
                Ok(Outcome::Advanced) => report.advanced += 1,
                Ok(Outcome::Completed) => {
                    report.advanced += 1;
                    report.completed += 1;
                    self.unregister(&journey_id);
                }
                Ok(Outcome::Idle) => {}
                Ok(Outcome::Gone) => {
                    report.removed += 1;
                    self.unregister(&journey_id);
                }
                Err(err) => {
                    warn!(
                        journey_id = %journey_id,
                        error = %err,
                        "Failed to advance journey, dropping it"
                    );
                    report.failed += 1;
                    self.unregister(&journey_id);
                }
            }
        }

        report.record(self.tracked_count(), timer, self.tick_interval);
        report
    }

    fn tick_one(&self, journey_id: &str, elapsed: f64) -> Result<Outcome> {
        let state = match self.orchestrator.get_journey_state(journey_id) {
            Ok(state) => state,
            Err(JourneyError::JourneyNotFound(_)) => {
                debug!(journey_id, "Tracked journey no longer exists");
                return Ok(Outcome::Gone);
            }
            Err(err) => return Err(err),
        };

        match state.status() {
            JourneyStatus::Completed => Ok(Outcome::Gone),
            JourneyStatus::NotStarted | JourneyStatus::Paused => Ok(Outcome::Idle),
            JourneyStatus::InProgress => {
                let step = self.orchestrator.step_journey(journey_id, elapsed)?;
                Ok(if step.completed {
                    Outcome::Completed
                } else {
                    Outcome::Advanced
                })
            }
        }
    }

    /// Tick on the configured interval until `shutdown` is cancelled.
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        info!(tracked = self.tracked_count(), "Multi-journey scheduler running");
        drive("multi", self.tick_interval, shutdown, || self.tick()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryJourneyRepository;
    use crate::routes::InMemoryRouteSource;
    use crate::scheduler::test_support::{
        FlakyRepository, line_route, orchestrator, orchestrator_with_repo,
    };

    fn scheduler(orchestrator: Arc<JourneyOrchestrator>, millis: u64) -> MultiJourneyScheduler {
        MultiJourneyScheduler::new(orchestrator, Duration::from_millis(millis))
    }

    #[test]
    fn test_register_unregister() {
        let sched = scheduler(orchestrator(), 500);
        assert!(sched.register("b"));
        assert!(sched.register("a"));
        assert!(!sched.register("a"));
        assert_eq!(sched.tracked_ids(), vec!["a", "b"]);

        assert!(sched.unregister("a"));
        assert!(!sched.unregister("a"));
        assert_eq!(sched.tracked_count(), 1);
    }

    #[test]
    fn test_tick_advances_and_completes() {
        let orch = orchestrator();
        orch.start_journey_on_route("j-1", "line", 100.0).unwrap();
        let sched = scheduler(Arc::clone(&orch), 500);
        sched.register("j-1");

        // 50 m per tick
        let report = sched.tick();
        assert_eq!(report.advanced, 1);
        assert_eq!(report.completed, 0);
        assert!(orch.get_journey_state("j-1").unwrap().progress_percentage() > 0.0);

        let mut completed = 0;
        for _ in 0..10 {
            completed += sched.tick().completed;
        }
        assert_eq!(completed, 1);
        assert_eq!(sched.tracked_count(), 0);
        assert!(orch.get_journey_state("j-1").unwrap().is_completed());
    }

    #[test]
    fn test_missing_and_finished_journeys_are_removed() {
        let orch = orchestrator();
        orch.start_journey_on_route("done", "line", 1_000.0).unwrap();
        orch.advance_journey("done", 10.0).unwrap();

        let sched = scheduler(orch, 500);
        sched.register("ghost");
        sched.register("done");

        let report = sched.tick();
        assert_eq!(report.removed, 2);
        assert_eq!(report.advanced, 0);
        assert_eq!(sched.tracked_count(), 0);
    }

    #[test]
    fn test_paused_journey_stays_tracked() {
        let orch = orchestrator();
        orch.start_journey_on_route("j-1", "line", 10.0).unwrap();
        orch.pause_journey("j-1").unwrap();

        let sched = scheduler(Arc::clone(&orch), 500);
        sched.register("j-1");

        assert!(sched.tick().is_idle());
        assert_eq!(sched.tracked_ids(), vec!["j-1"]);

        orch.resume_journey("j-1").unwrap();
        assert_eq!(sched.tick().advanced, 1);
    }

    #[test]
    fn test_failure_is_isolated_to_one_journey() {
        let repository = Arc::new(FlakyRepository::failing_for("a-failing"));
        let orch = Arc::new(orchestrator_with_repo(
            repository.clone(),
            InMemoryRouteSource::from_routes([line_route()]).unwrap(),
        ));
        orch.start_journey_on_route("a-failing", "line", 10.0).unwrap();
        orch.start_journey_on_route("b-ok", "line", 10.0).unwrap();
        repository.arm();

        let sched = scheduler(Arc::clone(&orch), 1_000);
        sched.register("a-failing");
        sched.register("b-ok");

        let report = sched.tick();
        assert_eq!(report.failed, 1);
        assert_eq!(report.advanced, 1);
        assert_eq!(sched.tracked_ids(), vec!["b-ok"]);

        let ok = orch.get_journey_state("b-ok").unwrap();
        assert!((ok.distance_travelled_meters() - 10.0).abs() < 1e-6);
        let failed = orch.get_journey_state("a-failing").unwrap();
        assert_eq!(failed.distance_travelled_meters(), 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_advances_on_interval() {
        let orch = Arc::new(orchestrator_with_repo(
            Arc::new(InMemoryJourneyRepository::new()),
            InMemoryRouteSource::from_routes([line_route()]).unwrap(),
        ));
        orch.start_journey_on_route("j-1", "line", 10.0).unwrap();

        let sched = Arc::new(scheduler(Arc::clone(&orch), 500));
        sched.register("j-1");

        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(Arc::clone(&sched).run(shutdown.clone()));

        // Ticks at 0.5 s, 1.0 s and 1.5 s, 5 m each
        tokio::time::sleep(Duration::from_millis(1_750)).await;
        shutdown.cancel();
        handle.await.unwrap();

        let travelled = orch.get_journey_state("j-1").unwrap().distance_travelled_meters();
        assert!((travelled - 15.0).abs() < 1e-6, "travelled {travelled}");
    }
}
