//! The capability interface apps use to talk to the host
//!
//! Apps never see the host's state store, event bus or service registry
//! directly. Everything goes through [`Hass`], which the host implements per
//! app, and the host drives the app through [`App`].

use chrono::NaiveDateTime;
use ha_core::events::StateChangedData;
use ha_core::{EntityId, LightSettings, ServiceCall};
use std::time::Duration;
use thiserror::Error;

/// Result type for calls into the host
pub type HassResult<T> = Result<T, HassError>;

/// Errors returned by the host
#[derive(Debug, Clone, Error, PartialEq)]
pub enum HassError {
    #[error("service {service} failed: {reason}")]
    ServiceFailed { service: String, reason: String },

    #[error("could not read state of {entity_id}: {reason}")]
    StateUnavailable { entity_id: EntityId, reason: String },

    #[error("could not schedule timer: {0}")]
    Scheduler(String),

    #[error("invalid app configuration: {0}")]
    InvalidConfig(String),
}

/// Opaque handle to a scheduled callback
///
/// Handles are only meaningful to the host that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

impl TimerHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// A change of an entity's state value, as delivered to [`App::on_state_change`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateChange {
    pub entity_id: EntityId,
    pub old: Option<String>,
    pub new: Option<String>,
}

impl StateChange {
    pub fn new(entity_id: EntityId, old: Option<&str>, new: Option<&str>) -> Self {
        Self {
            entity_id,
            old: old.map(str::to_string),
            new: new.map(str::to_string),
        }
    }

    pub fn is_new(&self, value: &str) -> bool {
        self.new.as_deref() == Some(value)
    }
}

impl From<&StateChangedData> for StateChange {
    fn from(data: &StateChangedData) -> Self {
        Self::new(data.entity_id.clone(), data.old_value(), data.new_value())
    }
}

/// Host capabilities available to an app
///
/// `T` is the app's timer payload; the host hands it back to
/// [`App::on_timer`] when the timer fires.
pub trait Hass<T> {
    /// Deliver value changes of `entity_id` to the app
    fn listen_state(&mut self, entity_id: &EntityId) -> HassResult<()>;

    /// Current state value, `None` if the entity is unknown
    fn get_state(&self, entity_id: &EntityId) -> HassResult<Option<String>>;

    /// Fire-and-forget service call
    fn call_service(&mut self, call: ServiceCall) -> HassResult<()>;

    /// Schedule `payload` to be delivered after `delay`
    fn run_in(&mut self, delay: Duration, payload: T) -> HassResult<TimerHandle>;

    /// Cancel a timer; cancelling a fired or already cancelled timer is a no-op
    fn cancel_timer(&mut self, handle: TimerHandle);

    /// Current local time
    fn now(&self) -> NaiveDateTime;

    /// `<domain>.turn_on` for the entity's own domain
    fn turn_on(&mut self, entity_id: &EntityId, settings: &LightSettings) -> HassResult<()> {
        self.call_service(ServiceCall::new(
            entity_id.domain(),
            "turn_on",
            settings.service_data(entity_id),
        ))
    }

    /// `<domain>.turn_off` for the entity's own domain
    fn turn_off(&mut self, entity_id: &EntityId) -> HassResult<()> {
        self.call_service(ServiceCall::new(
            entity_id.domain(),
            "turn_off",
            serde_json::json!({ "entity_id": entity_id.to_string() }),
        ))
    }
}

/// An automation app hosted by the runtime
///
/// The host calls the handlers one at a time and never re-enters an app
/// while one of its handlers is running.
pub trait App {
    /// Payload of the app's scheduled callbacks
    type Timer;

    fn name(&self) -> &str;

    /// Register listeners and bring the app in line with the current states
    fn initialize(&mut self, hass: &mut dyn Hass<Self::Timer>) -> HassResult<()>;

    fn on_state_change(&mut self, hass: &mut dyn Hass<Self::Timer>, change: &StateChange);

    fn on_timer(&mut self, hass: &mut dyn Hass<Self::Timer>, timer: Self::Timer);
}
