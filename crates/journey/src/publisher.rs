//! Delivery of position events to subscribers.
//!
//! Publishers must not block: the scheduler calls them inline on every tick.

use crate::events::PositionEvent;
use crate::state::JourneyState;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use worldview_geo::Coordinate;

/// Failure to hand an event to a sink.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PublishError {
    /// Sink rejected the event
    #[error("publisher '{publisher}' failed: {message}")]
    Failed { publisher: String, message: String },
}

/// Sink for journey position events.
pub trait PositionPublisher: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    fn publish_coordinate_update(
        &self,
        journey_id: &str,
        coordinate: Coordinate,
        state: &JourneyState,
    ) -> Result<(), PublishError>;

    fn publish_journey_started(&self, state: &JourneyState) -> Result<(), PublishError>;

    fn publish_journey_completed(&self, state: &JourneyState) -> Result<(), PublishError>;
}

/// Fans each event out to every member publisher.
///
/// A failing member is logged and skipped; the rest still receive the event.
#[derive(Default, Clone)]
pub struct CompositePublisher {
    publishers: Vec<Arc<dyn PositionPublisher>>,
}

impl CompositePublisher {
    pub fn new(publishers: Vec<Arc<dyn PositionPublisher>>) -> Self {
        Self { publishers }
    }

    pub fn with(mut self, publisher: Arc<dyn PositionPublisher>) -> Self {
        self.publishers.push(publisher);
        self
    }

    pub fn len(&self) -> usize {
        self.publishers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.publishers.is_empty()
    }

    fn each(
        &self,
        event: &str,
        journey_id: &str,
        f: impl Fn(&dyn PositionPublisher) -> Result<(), PublishError>,
    ) {
        for publisher in &self.publishers {
            if let Err(err) = f(publisher.as_ref()) {
                warn!(
                    publisher = publisher.name(),
                    event,
                    journey_id,
                    error = %err,
                    "Publisher failed"
                );
            }
        }
    }
}

impl PositionPublisher for CompositePublisher {
    fn name(&self) -> &str {
        "composite"
    }

    fn publish_coordinate_update(
        &self,
        journey_id: &str,
        coordinate: Coordinate,
        state: &JourneyState,
    ) -> Result<(), PublishError> {
        self.each("coordinate_update", journey_id, |p| {
            p.publish_coordinate_update(journey_id, coordinate, state)
        });
        Ok(())
    }

    fn publish_journey_started(&self, state: &JourneyState) -> Result<(), PublishError> {
        self.each("journey_started", state.journey_id(), |p| p.publish_journey_started(state));
        Ok(())
    }

    fn publish_journey_completed(&self, state: &JourneyState) -> Result<(), PublishError> {
        self.each("journey_completed", state.journey_id(), |p| {
            p.publish_journey_completed(state)
        });
        Ok(())
    }
}

/// Writes events to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingPublisher;

impl PositionPublisher for TracingPublisher {
    fn name(&self) -> &str {
        "tracing"
    }

    fn publish_coordinate_update(
        &self,
        journey_id: &str,
        coordinate: Coordinate,
        state: &JourneyState,
    ) -> Result<(), PublishError> {
        debug!(
            journey_id,
            latitude = coordinate.latitude(),
            longitude = coordinate.longitude(),
            waypoint = state.current_waypoint_index(),
            progress = format!("{:.1}", state.progress_percentage()),
            "Coordinate update"
        );
        Ok(())
    }

    fn publish_journey_started(&self, state: &JourneyState) -> Result<(), PublishError> {
        info!(
            journey_id = state.journey_id(),
            route_id = state.route().id(),
            speed_mps = state.speed_meters_per_second(),
            "Journey started"
        );
        Ok(())
    }

    fn publish_journey_completed(&self, state: &JourneyState) -> Result<(), PublishError> {
        info!(
            journey_id = state.journey_id(),
            route_id = state.route().id(),
            distance_m = format!("{:.0}", state.distance_travelled_meters()),
            "Journey completed"
        );
        Ok(())
    }
}

/// Sends [`PositionEvent`]s on a tokio broadcast channel.
///
/// Having no subscribers is not an error; the event is dropped.
#[derive(Debug, Clone)]
pub struct BroadcastPublisher {
    sender: broadcast::Sender<PositionEvent>,
}

impl BroadcastPublisher {
    /// `capacity` is the per-subscriber backlog before slow receivers lag.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PositionEvent> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }

    fn send(&self, event: PositionEvent) -> Result<(), PublishError> {
        if self.sender.send(event).is_err() {
            debug!("No subscribers for position event");
        }
        Ok(())
    }
}

impl PositionPublisher for BroadcastPublisher {
    fn name(&self) -> &str {
        "broadcast"
    }

    fn publish_coordinate_update(
        &self,
        journey_id: &str,
        coordinate: Coordinate,
        state: &JourneyState,
    ) -> Result<(), PublishError> {
        self.send(PositionEvent::coordinate_update(journey_id, coordinate, state))
    }

    fn publish_journey_started(&self, state: &JourneyState) -> Result<(), PublishError> {
        self.send(PositionEvent::journey_started(state))
    }

    fn publish_journey_completed(&self, state: &JourneyState) -> Result<(), PublishError> {
        self.send(PositionEvent::journey_completed(state))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use worldview_geo::Route;

    /// Records every event it receives.
    #[derive(Default)]
    pub(crate) struct RecordingPublisher {
        pub(crate) events: Mutex<Vec<String>>,
    }

    impl RecordingPublisher {
        pub(crate) fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }

        fn push(&self, event: String) {
            self.events.lock().unwrap().push(event);
        }
    }

    impl PositionPublisher for RecordingPublisher {
        fn name(&self) -> &str {
            "recording"
        }

        fn publish_coordinate_update(
            &self,
            journey_id: &str,
            _coordinate: Coordinate,
            _state: &JourneyState,
        ) -> Result<(), PublishError> {
            self.push(format!("update:{journey_id}"));
            Ok(())
        }

        fn publish_journey_started(&self, state: &JourneyState) -> Result<(), PublishError> {
            self.push(format!("started:{}", state.journey_id()));
            Ok(())
        }

        fn publish_journey_completed(&self, state: &JourneyState) -> Result<(), PublishError> {
            self.push(format!("completed:{}", state.journey_id()));
            Ok(())
        }
    }

    /// Fails every call.
    #[derive(Default)]
    pub(crate) struct FailingPublisher {
        pub(crate) calls: AtomicUsize,
    }

    impl FailingPublisher {
        fn fail(&self) -> Result<(), PublishError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(PublishError::Failed {
                publisher: "failing".into(),
                message: "broker unavailable".into(),
            })
        }
    }

    impl PositionPublisher for FailingPublisher {
        fn name(&self) -> &str {
            "failing"
        }

        fn publish_coordinate_update(
            &self,
            _: &str,
            _: Coordinate,
            _: &JourneyState,
        ) -> Result<(), PublishError> {
            self.fail()
        }

        fn publish_journey_started(&self, _: &JourneyState) -> Result<(), PublishError> {
            self.fail()
        }

        fn publish_journey_completed(&self, _: &JourneyState) -> Result<(), PublishError> {
            self.fail()
        }
    }

    fn state() -> JourneyState {
        let route = Route::from_waypoints(
            "r",
            "Route",
            "",
            vec![Coordinate::new(0.0, 0.0).unwrap(), Coordinate::new(0.0, 0.001).unwrap()],
            10.0,
        )
        .unwrap();
        JourneyState::new("j-1", Arc::new(route), 10.0).unwrap()
    }

    #[test]
    fn test_composite_continues_after_failure() {
        let failing = Arc::new(FailingPublisher::default());
        let recording = Arc::new(RecordingPublisher::default());
        let composite = CompositePublisher::default()
            .with(failing.clone())
            .with(recording.clone());
        assert_eq!(composite.len(), 2);

        let state = state();
        composite.publish_journey_started(&state).unwrap();
        composite
            .publish_coordinate_update("j-1", state.current_position(), &state)
            .unwrap();
        composite.publish_journey_completed(&state).unwrap();

        assert_eq!(failing.calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            recording.events(),
            vec!["started:j-1", "update:j-1", "completed:j-1"]
        );
    }

    #[test]
    fn test_broadcast_without_subscribers_is_ok() {
        let publisher = BroadcastPublisher::new(8);
        assert_eq!(publisher.receiver_count(), 0);
        assert!(publisher.publish_journey_started(&state()).is_ok());
    }

    #[test]
    fn test_broadcast_delivers_events() {
        let publisher = BroadcastPublisher::new(8);
        let mut rx = publisher.subscribe();
        let state = state();

        publisher.publish_journey_started(&state).unwrap();
        publisher
            .publish_coordinate_update("j-1", state.current_position(), &state)
            .unwrap();

        assert!(matches!(rx.try_recv().unwrap(), PositionEvent::JourneyStarted { .. }));
        let update = rx.try_recv().unwrap();
        assert!(matches!(update, PositionEvent::CoordinateUpdate { .. }));
        assert_eq!(update.journey_id(), "j-1");
    }

    #[test]
    fn test_tracing_publisher_never_fails() {
        let state = state();
        assert!(TracingPublisher.publish_journey_started(&state).is_ok());
        assert!(TracingPublisher.publish_journey_completed(&state).is_ok());
    }
}
