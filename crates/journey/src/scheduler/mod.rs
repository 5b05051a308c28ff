//! Periodic drivers that advance journeys.
//!
//! Both schedulers expose a synchronous `tick` that does one round of work,
//! and an async `run` that calls it on a fixed interval until the
//! cancellation token fires:
//!
//! ```ignore
//! let tick = Duration::from_millis(500);
//! let scheduler = Arc::new(MultiJourneyScheduler::new(orchestrator, tick));
//! let shutdown = CancellationToken::new();
//! tokio::spawn(Arc::clone(&scheduler).run(shutdown.clone()));
//! ```

mod auto;
mod multi;

pub use auto::AutoJourneyScheduler;
pub use multi::MultiJourneyScheduler;

use serde::Serialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, trace, warn};
use worldview_telemetry::{Timer, metrics};

// Metric names recorded by every tick
pub const METRIC_TICKS: &str = "scheduler.ticks";
pub const METRIC_TICK_MS: &str = "scheduler.tick_ms";
pub const METRIC_ADVANCED: &str = "journeys.advanced";
pub const METRIC_COMPLETED: &str = "journeys.completed";
pub const METRIC_FAILED: &str = "journeys.failed";
pub const METRIC_ACTIVE: &str = "journeys.active";

/// What one tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    /// Journeys started by the scheduler
    pub started: usize,
    /// Journeys moved forward, including those that completed
    pub advanced: usize,
    /// Journeys that reached their last waypoint
    pub completed: usize,
    /// Ids dropped because the journey was gone or already finished
    pub removed: usize,
    /// Journeys dropped after an error
    pub failed: usize,
}

impl TickReport {
    pub fn is_idle(&self) -> bool {
        *self == Self::default()
    }

    /// Record the tick's counters and stop its timer. A tick slower than
    /// `interval` delays the next one and is logged.
    pub(crate) fn record(&self, active: usize, timer: Timer, interval: Duration) -> Duration {
        let registry = metrics();
        registry.increment(METRIC_TICKS);
        registry.increment_by(METRIC_ADVANCED, self.advanced as u64);
        registry.increment_by(METRIC_COMPLETED, self.completed as u64);
        registry.increment_by(METRIC_FAILED, self.failed as u64);
        registry.gauge(METRIC_ACTIVE, active as u64);

        let took = timer.stop();
        if took > interval {
            warn!(
                took_ms = took.as_millis() as u64,
                interval_ms = interval.as_millis() as u64,
                "Tick overran its interval"
            );
        }
        took
    }
}

/// Call `tick` every `period` until `shutdown` is cancelled.
pub(crate) async fn drive(
    name: &'static str,
    period: Duration,
    shutdown: CancellationToken,
    mut tick: impl FnMut() -> TickReport,
) {
    info!(scheduler = name, interval_ms = period.as_millis() as u64, "Scheduler starting");

    let mut interval = tokio::time::interval(period);
    // Skip the first immediate tick
    interval.tick().await;

    loop {
        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                info!(scheduler = name, "Scheduler shutting down");
                break;
            }

            _ = interval.tick() => {
                let report = tick();
                if !report.is_idle() {
                    trace!(scheduler = name, ?report, "Tick finished");
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::error::{JourneyError, Result};
    use crate::orchestrator::JourneyOrchestrator;
    use crate::publisher::tests::RecordingPublisher;
    use crate::repository::{InMemoryJourneyRepository, JourneyRepository};
    use crate::routes::InMemoryRouteSource;
    use crate::state::JourneyState;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};
    use worldview_geo::{Coordinate, Route};

    /// In-memory repository whose saves fail for one id once armed.
    #[derive(Default)]
    pub(crate) struct FlakyRepository {
        inner: InMemoryJourneyRepository,
        failing_id: Mutex<String>,
        armed: AtomicBool,
    }

    impl FlakyRepository {
        pub(crate) fn failing_for(id: &str) -> Self {
            Self {
                failing_id: Mutex::new(id.to_string()),
                ..Self::default()
            }
        }

        pub(crate) fn arm(&self) {
            self.armed.store(true, Ordering::SeqCst);
        }

        /// Point the failure at `id` and arm it.
        pub(crate) fn fail_saves_for(&self, id: &str) {
            *self.failing_id.lock().unwrap() = id.to_string();
            self.arm();
        }
    }

    impl JourneyRepository for FlakyRepository {
        fn save(&self, state: JourneyState) -> Result<()> {
            let failing = *self.failing_id.lock().unwrap() == state.journey_id();
            if self.armed.load(Ordering::SeqCst) && failing {
                return Err(JourneyError::Repository("disk full".into()));
            }
            self.inner.save(state)
        }

        fn find_by_id(&self, journey_id: &str) -> Result<Option<JourneyState>> {
            self.inner.find_by_id(journey_id)
        }

        fn delete(&self, journey_id: &str) -> Result<bool> {
            self.inner.delete(journey_id)
        }

        fn exists(&self, journey_id: &str) -> Result<bool> {
            self.inner.exists(journey_id)
        }

        fn find_all(&self) -> Result<Vec<JourneyState>> {
            self.inner.find_all()
        }
    }

    /// Two ~111 m segments along the equator.
    pub(crate) fn line_route() -> Route {
        Route::from_waypoints(
            "line",
            "Line",
            "",
            vec![
                Coordinate::new(0.0, 0.0).unwrap(),
                Coordinate::new(0.0, 0.001).unwrap(),
                Coordinate::new(0.0, 0.002).unwrap(),
            ],
            10.0,
        )
        .unwrap()
    }

    pub(crate) fn orchestrator_with_repo(
        repository: Arc<dyn JourneyRepository>,
        routes: InMemoryRouteSource,
    ) -> JourneyOrchestrator {
        JourneyOrchestrator::new(
            repository,
            Arc::new(routes),
            Arc::new(RecordingPublisher::default()),
        )
    }

    pub(crate) fn orchestrator() -> Arc<JourneyOrchestrator> {
        Arc::new(orchestrator_with_repo(
            Arc::new(InMemoryJourneyRepository::new()),
            InMemoryRouteSource::from_routes([line_route()]).unwrap(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_idle_report() {
        assert!(TickReport::default().is_idle());
        assert!(!TickReport { advanced: 1, ..Default::default() }.is_idle());
    }

    #[test]
    fn test_record_stops_tick_timer() {
        let registry = metrics();
        let samples = registry.histogram_stats(METRIC_TICK_MS).count;
        let ticks = registry.counter(METRIC_TICKS);

        let timer = Timer::start(METRIC_TICK_MS);
        std::thread::sleep(Duration::from_millis(5));
        let report = TickReport { completed: 1, ..Default::default() };
        let took = report.record(0, timer, Duration::from_millis(1));

        assert!(took >= Duration::from_millis(5));
        assert!(registry.histogram_stats(METRIC_TICK_MS).count > samples);
        assert!(registry.counter(METRIC_TICKS) > ticks);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drive_ticks_until_cancelled() {
        let count = Arc::new(AtomicUsize::new(0));
        let shutdown = CancellationToken::new();

        let handle = {
            let count = Arc::clone(&count);
            tokio::spawn(drive("test", Duration::from_millis(100), shutdown.clone(), move || {
                count.fetch_add(1, Ordering::SeqCst);
                TickReport::default()
            }))
        };

        // First tick is skipped, so nothing has run yet
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);

        shutdown.cancel();
        handle.await.unwrap();

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }
}
