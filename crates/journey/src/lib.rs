//! Journey simulation for World-View.
//!
//! Simulated vehicles drive along [`Route`]s. Each vehicle is a
//! [`JourneyState`]; the [`JourneyOrchestrator`] starts, advances and stops
//! them against a [`JourneyRepository`], a [`RouteSource`] and a
//! [`PositionPublisher`]. A scheduler advances journeys on a fixed tick.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use worldview_journey::{
//!     InMemoryJourneyRepository, InMemoryRouteSource, JourneyOrchestrator, TracingPublisher,
//! };
//!
//! let orchestrator = JourneyOrchestrator::new(
//!     Arc::new(InMemoryJourneyRepository::new()),
//!     Arc::new(InMemoryRouteSource::demo()),
//!     Arc::new(TracingPublisher),
//! );
//!
//! orchestrator.start_journey_on_route("car-1", "stuttgart-city-loop", 13.89).unwrap();
//! let position = orchestrator.advance_journey("car-1", 10.0).unwrap();
//! assert!(position.latitude() > 48.0);
//! ```

#![warn(clippy::all)]

pub mod error;
pub mod events;
pub mod orchestrator;
pub mod publisher;
pub mod repository;
pub mod routes;
pub mod scheduler;
pub mod state;

pub use error::{JourneyError, Result};
pub use events::{JourneySnapshot, PositionEvent};
pub use orchestrator::{JourneyOrchestrator, JourneyStep};
pub use publisher::{
    BroadcastPublisher, CompositePublisher, PositionPublisher, PublishError, TracingPublisher,
};
pub use repository::{InMemoryJourneyRepository, JourneyRepository};
pub use routes::{InMemoryRouteSource, RouteDefinition, RouteSource, RoutesFile};
pub use scheduler::{AutoJourneyScheduler, MultiJourneyScheduler, TickReport};
pub use state::{ARRIVAL_TOLERANCE_METERS, JourneyState, JourneyStatus};
pub use worldview_geo::{Coordinate, Route};
