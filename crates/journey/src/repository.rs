//! Keyed storage of journey states.

use crate::error::Result;
use crate::state::JourneyState;
use std::collections::HashMap;
use std::sync::RwLock;

/// Store of journey states keyed by journey id.
///
/// Implementations must be safe to call from the scheduler task and from
/// request handlers at the same time. States go in and come out by value.
pub trait JourneyRepository: Send + Sync {
    /// Insert or replace the state stored under its journey id.
    fn save(&self, state: JourneyState) -> Result<()>;

    fn find_by_id(&self, journey_id: &str) -> Result<Option<JourneyState>>;

    /// Remove a journey. Returns whether it was present.
    fn delete(&self, journey_id: &str) -> Result<bool>;

    fn exists(&self, journey_id: &str) -> Result<bool>;

    fn find_all(&self) -> Result<Vec<JourneyState>>;
}

/// Process-local repository; contents are lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryJourneyRepository {
    journeys: RwLock<HashMap<String, JourneyState>>,
}

impl InMemoryJourneyRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored journeys.
    pub fn len(&self) -> usize {
        self.journeys.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// Poisoned locks are recovered: every write replaces a whole state, so the
// map is consistent even if a holder panicked.
impl JourneyRepository for InMemoryJourneyRepository {
    fn save(&self, state: JourneyState) -> Result<()> {
        let mut journeys = self.journeys.write().unwrap_or_else(|e| e.into_inner());
        journeys.insert(state.journey_id().to_string(), state);
        Ok(())
    }

    fn find_by_id(&self, journey_id: &str) -> Result<Option<JourneyState>> {
        let journeys = self.journeys.read().unwrap_or_else(|e| e.into_inner());
        Ok(journeys.get(journey_id).cloned())
    }

    fn delete(&self, journey_id: &str) -> Result<bool> {
        let mut journeys = self.journeys.write().unwrap_or_else(|e| e.into_inner());
        Ok(journeys.remove(journey_id).is_some())
    }

    fn exists(&self, journey_id: &str) -> Result<bool> {
        let journeys = self.journeys.read().unwrap_or_else(|e| e.into_inner());
        Ok(journeys.contains_key(journey_id))
    }

    fn find_all(&self) -> Result<Vec<JourneyState>> {
        let journeys = self.journeys.read().unwrap_or_else(|e| e.into_inner());
        Ok(journeys.values().cloned().collect())
    }
}
