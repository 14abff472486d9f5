//! Entity state store
//!
//! The StateMachine holds the current state of every entity the host knows
//! about and fires a STATE_CHANGED event on the event bus for every write.

use chrono::NaiveDateTime;
use dashmap::DashMap;
use ha_core::events::StateChangedData;
use ha_core::{EntityId, State};
use ha_event_bus::EventBus;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};

/// The state machine tracks all entity states
pub struct StateMachine {
    /// All entity states keyed by entity id
    states: DashMap<EntityId, State>,
    /// Event bus for firing state change events
    event_bus: Arc<EventBus>,
}

impl StateMachine {
    pub fn new(event_bus: Arc<EventBus>) -> Self {
        Self {
            states: DashMap::new(),
            event_bus,
        }
    }

    /// Set the state of an entity
    ///
    /// `last_changed` only moves when the value actually changes. A
    /// STATE_CHANGED event is fired for every write, including
    /// attribute-only updates.
    #[instrument(skip(self, state, attributes, now), fields(entity_id = %entity_id))]
    pub fn set(
        &self,
        entity_id: EntityId,
        state: impl Into<String>,
        attributes: HashMap<String, serde_json::Value>,
        now: NaiveDateTime,
    ) -> State {
        let old_state = self.get(&entity_id);

        let new_state = match &old_state {
            Some(existing) => existing.with_update(state, attributes, now),
            None => State::new(entity_id.clone(), state, attributes, now),
        };

        debug!(
            state = %new_state.state,
            changed = old_state.as_ref().map(|s| s.state != new_state.state).unwrap_or(true),
            "Setting entity state"
        );

        self.states.insert(entity_id.clone(), new_state.clone());

        let event_data = StateChangedData {
            entity_id,
            old_state,
            new_state: Some(new_state.clone()),
        };
        self.event_bus.fire_typed(event_data, now);

        new_state
    }

    /// Set only the state value, keeping the existing attributes
    pub fn set_value(
        &self,
        entity_id: EntityId,
        state: impl Into<String>,
        now: NaiveDateTime,
    ) -> State {
        let attributes = self
            .get(&entity_id)
            .map(|s| s.attributes)
            .unwrap_or_default();
        self.set(entity_id, state, attributes, now)
    }

    pub fn get(&self, entity_id: &EntityId) -> Option<State> {
        self.states.get(entity_id).map(|s| s.clone())
    }

    /// Get the state value, or None if the entity doesn't exist
    pub fn get_state(&self, entity_id: &EntityId) -> Option<String> {
        self.states.get(entity_id).map(|s| s.state.clone())
    }

    pub fn is_state(&self, entity_id: &EntityId, state: &str) -> bool {
        self.get_state(entity_id).as_deref() == Some(state)
    }
}

/// Thread-safe wrapper for StateMachine
pub type SharedStateMachine = Arc<StateMachine>;
