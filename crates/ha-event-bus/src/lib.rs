//! Event bus with typed pub/sub
//!
//! Components subscribe to an event type and receive every event of that
//! type fired afterwards. Receivers are drained synchronously with
//! `try_recv`, which is how the single-threaded app runtime delivers state
//! changes between handler invocations.

use chrono::NaiveDateTime;
use dashmap::DashMap;
use ha_core::{Event, EventData, EventType};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, trace, warn};

/// Default channel capacity for event subscriptions
const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// The event bus for publishing and subscribing to events
pub struct EventBus {
    /// Map of event types to their broadcast senders
    listeners: DashMap<EventType, broadcast::Sender<Event<serde_json::Value>>>,
    capacity: usize,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            listeners: DashMap::new(),
            capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    /// Subscribe to events of a specific type
    pub fn subscribe(
        &self,
        event_type: impl Into<EventType>,
    ) -> broadcast::Receiver<Event<serde_json::Value>> {
        let event_type = event_type.into();
        trace!(event_type = %event_type, "Subscribing to event type");

        self.listeners
            .entry(event_type)
            .or_insert_with(|| {
                let (tx, _) = broadcast::channel(self.capacity);
                tx
            })
            .subscribe()
    }

    /// Subscribe to a typed event, receiving parsed data
    pub fn subscribe_typed<T: EventData + serde::de::DeserializeOwned>(
        &self,
    ) -> TypedEventReceiver<T> {
        TypedEventReceiver::new(self.subscribe(T::event_type()))
    }

    /// Fire an event to all subscribers of its type
    pub fn fire(&self, event: Event<serde_json::Value>) {
        debug!(event_type = %event.event_type, "Firing event");

        if let Some(sender) = self.listeners.get(&event.event_type) {
            // A send error only means there is no active receiver
            let _ = sender.send(event);
        }
    }

    /// Fire a typed event
    pub fn fire_typed<T: EventData + serde::Serialize>(&self, data: T, time_fired: NaiveDateTime) {
        let data = match serde_json::to_value(&data) {
            Ok(data) => data,
            Err(e) => {
                warn!(event_type = T::event_type(), error = %e, "Dropping unserializable event");
                return;
            }
        };
        self.fire(Event::new(T::event_type(), data, time_fired));
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// A receiver for typed events
pub struct TypedEventReceiver<T> {
    rx: broadcast::Receiver<Event<serde_json::Value>>,
    _phantom: std::marker::PhantomData<T>,
}

impl<T: EventData + serde::de::DeserializeOwned> TypedEventReceiver<T> {
    fn new(rx: broadcast::Receiver<Event<serde_json::Value>>) -> Self {
        Self {
            rx,
            _phantom: std::marker::PhantomData,
        }
    }

    fn parse(event: Event<serde_json::Value>) -> Option<Event<T>> {
        let data = serde_json::from_value::<T>(event.data).ok()?;
        Some(Event {
            event_type: event.event_type,
            data,
            time_fired: event.time_fired,
        })
    }

    /// Take the next already-fired event without waiting
    ///
    /// Returns `None` once the queue is empty. Events whose data does not
    /// parse are skipped, and a lagged receiver logs and keeps going.
    pub fn try_recv(&mut self) -> Option<Event<T>> {
        loop {
            match self.rx.try_recv() {
                Ok(event) => {
                    if let Some(event) = Self::parse(event) {
                        return Some(event);
                    }
                }
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    warn!("Event receiver lagged by {} events", n);
                }
                Err(_) => return None,
            }
        }
    }
}

/// Thread-safe wrapper for EventBus
pub type SharedEventBus = Arc<EventBus>;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use ha_core::events::StateChangedData;
    use ha_core::{EntityId, State};
    use serde_json::json;
    use std::collections::HashMap;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 12, 24)
            .unwrap()
            .and_hms_opt(18, 0, 0)
            .unwrap()
    }

    fn presence_change(value: &str) -> StateChangedData {
        let entity_id: EntityId = "binary_sensor.narvarodetektor_narvaro".parse().unwrap();
        StateChangedData {
            entity_id: entity_id.clone(),
            old_state: None,
            new_state: Some(State::new(entity_id, value, HashMap::new(), now())),
        }
    }

    #[tokio::test]
    async fn test_subscribe_and_fire() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe("test_event");

        bus.fire(Event::new("test_event", json!({"key": "value"}), now()));

        let received = rx.recv().await.unwrap();
        assert_eq!(received.event_type.as_str(), "test_event");
        assert_eq!(received.data["key"], "value");
    }

    #[test]
    fn test_typed_subscription() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe_typed::<StateChangedData>();

        bus.fire_typed(presence_change("on"), now());

        let received = rx.try_recv().unwrap();
        assert_eq!(
            received.data.entity_id.to_string(),
            "binary_sensor.narvarodetektor_narvaro"
        );
        assert_eq!(received.data.new_value(), Some("on"));
    }

    #[test]
    fn test_try_recv_drains_in_order() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe_typed::<StateChangedData>();

        bus.fire_typed(presence_change("on"), now());
        bus.fire_typed(presence_change("off"), now());

        assert_eq!(rx.try_recv().unwrap().data.new_value(), Some("on"));
        assert_eq!(rx.try_recv().unwrap().data.new_value(), Some("off"));
        assert!(rx.try_recv().is_none());
    }

    #[test]
    fn test_try_recv_skips_unparseable_data() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe_typed::<StateChangedData>();

        bus.fire(Event::new("state_changed", json!({"bogus": true}), now()));
        bus.fire_typed(presence_change("on"), now());

        assert_eq!(rx.try_recv().unwrap().data.new_value(), Some("on"));
        assert!(rx.try_recv().is_none());
    }

    #[test]
    fn test_no_cross_event_pollution() {
        let bus = EventBus::new();
        let mut rx_a = bus.subscribe("event_a");
        let mut rx_b = bus.subscribe("event_b");

        bus.fire(Event::new("event_a", json!({"type": "a"}), now()));

        assert_eq!(rx_a.try_recv().unwrap().data["type"], "a");
        assert!(rx_b.try_recv().is_err());
    }
}
