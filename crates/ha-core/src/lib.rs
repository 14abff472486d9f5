//! Core types for the app host
//!
//! This crate provides the fundamental types shared by the host crates and
//! the apps: EntityId, State, Event, ServiceCall and the light settings
//! passed to `light.turn_on`.

mod entity_id;
mod event;
pub mod light;
mod service_call;
mod state;

pub use entity_id::{EntityId, EntityIdError};
pub use event::{Event, EventData, EventType};
pub use light::{LightSettings, RgbColor};
pub use service_call::ServiceCall;
pub use state::State;

/// State value of a switched-on entity
pub const STATE_ON: &str = "on";

/// State value of a switched-off entity
pub const STATE_OFF: &str = "off";

/// State value of an entity whose device cannot be reached
pub const STATE_UNAVAILABLE: &str = "unavailable";

/// Standard event types fired by the host
pub mod events {
    use super::*;

    /// Event type for state changes
    pub const STATE_CHANGED: &str = "state_changed";

    /// Data for STATE_CHANGED events
    #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
    pub struct StateChangedData {
        pub entity_id: EntityId,
        pub old_state: Option<State>,
        pub new_state: Option<State>,
    }

    impl StateChangedData {
        /// Old state value, if the entity existed before
        pub fn old_value(&self) -> Option<&str> {
            self.old_state.as_ref().map(|s| s.state.as_str())
        }

        /// New state value, if the entity still exists
        pub fn new_value(&self) -> Option<&str> {
            self.new_state.as_ref().map(|s| s.state.as_str())
        }

        /// Whether the state value differs (attribute-only updates return false)
        pub fn value_changed(&self) -> bool {
            self.old_value() != self.new_value()
        }
    }

    impl EventData for StateChangedData {
        fn event_type() -> &'static str {
            STATE_CHANGED
        }
    }
}
