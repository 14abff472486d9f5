//! Event types for the event bus

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Trait for typed event data
pub trait EventData: Clone + Send + Sync + 'static {
    /// The event type string for this data type
    fn event_type() -> &'static str;
}

/// Event type identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventType(String);

impl EventType {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self(event_type.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EventType {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An event fired on the event bus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event<T = serde_json::Value> {
    pub event_type: EventType,
    pub data: T,
    /// Host clock reading when the event was fired
    pub time_fired: NaiveDateTime,
}

impl<T> Event<T> {
    pub fn new(event_type: impl Into<EventType>, data: T, time_fired: NaiveDateTime) -> Self {
        Self {
            event_type: event_type.into(),
            data,
            time_fired,
        }
    }
}

impl<T: EventData> Event<T> {
    /// Create a typed event from EventData
    pub fn typed(data: T, time_fired: NaiveDateTime) -> Self {
        Self::new(T::event_type(), data, time_fired)
    }
}
