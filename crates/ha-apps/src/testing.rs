//! In-memory `Hass` used by the app unit tests

use chrono::{NaiveDate, NaiveDateTime};
use ha_core::{EntityId, ServiceCall};
use std::collections::{HashMap, HashSet};
use std::time::Duration;

use crate::hass::{App, Hass, HassError, HassResult, StateChange, TimerHandle};

pub fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 12, 24)
        .unwrap()
        .and_hms_opt(h, m, s)
        .unwrap()
}

pub fn id(s: &str) -> EntityId {
    s.parse().unwrap()
}

pub struct MockHass<T> {
    pub now: NaiveDateTime,
    pub states: HashMap<EntityId, String>,
    pub listened: HashSet<EntityId>,
    /// Every service call in order, with the time it was made
    pub calls: Vec<(NaiveDateTime, ServiceCall)>,
    /// Entities whose service calls fail
    pub failing: HashSet<EntityId>,
    /// Entities whose state cannot be read
    pub unreadable: HashSet<EntityId>,
    pub fail_scheduling: bool,
    pending: Vec<(NaiveDateTime, TimerHandle, T)>,
    next_handle: u64,
}

impl<T> MockHass<T> {
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            now,
            states: HashMap::new(),
            listened: HashSet::new(),
            calls: Vec::new(),
            failing: HashSet::new(),
            unreadable: HashSet::new(),
            fail_scheduling: false,
            pending: Vec::new(),
            next_handle: 0,
        }
    }

    pub fn set(&mut self, entity_id: &str, value: &str) {
        self.states.insert(id(entity_id), value.to_string());
    }

    /// Set a state and deliver the change to `app` if it listens and the value changed
    pub fn change<A: App<Timer = T>>(&mut self, app: &mut A, entity_id: &str, value: &str) {
        let entity_id = id(entity_id);
        let old = self.states.insert(entity_id.clone(), value.to_string());
        if old.as_deref() == Some(value) || !self.listened.contains(&entity_id) {
            return;
        }
        let change = StateChange::new(entity_id, old.as_deref(), Some(value));
        app.on_state_change(self, &change);
    }

    /// Move the clock forward, firing due timers in order
    pub fn advance<A: App<Timer = T>>(&mut self, app: &mut A, by: Duration) {
        let target = self.now + chrono::Duration::from_std(by).unwrap();
        loop {
            let next = self
                .pending
                .iter()
                .enumerate()
                .filter(|(_, (due, _, _))| *due <= target)
                .min_by_key(|(_, (due, handle, _))| (*due, *handle))
                .map(|(index, _)| index);
            let Some(index) = next else { break };
            let (due, _, payload) = self.pending.remove(index);
            self.now = due;
            app.on_timer(self, payload);
        }
        self.now = target;
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// `<service>` calls targeting `entity_id`, e.g. `("light.turn_on", "light.ljus")`
    pub fn calls_to(&self, service: &str, entity_id: &str) -> Vec<&ServiceCall> {
        let target = id(entity_id);
        self.calls
            .iter()
            .map(|(_, call)| call)
            .filter(|call| call.service_id() == service && call.entity_ids().contains(&target))
            .collect()
    }

    /// Service ids and targets of calls made at `time`
    pub fn calls_at(&self, time: NaiveDateTime) -> Vec<(String, Vec<EntityId>)> {
        self.calls
            .iter()
            .filter(|(t, _)| *t == time)
            .map(|(_, call)| (call.service_id(), call.entity_ids()))
            .collect()
    }
}

impl<T> Hass<T> for MockHass<T> {
    fn listen_state(&mut self, entity_id: &EntityId) -> HassResult<()> {
        self.listened.insert(entity_id.clone());
        Ok(())
    }

    fn get_state(&self, entity_id: &EntityId) -> HassResult<Option<String>> {
        if self.unreadable.contains(entity_id) {
            return Err(HassError::StateUnavailable {
                entity_id: entity_id.clone(),
                reason: "mock read failure".to_string(),
            });
        }
        Ok(self.states.get(entity_id).cloned())
    }

    fn call_service(&mut self, call: ServiceCall) -> HassResult<()> {
        let fails = call.entity_ids().iter().any(|e| self.failing.contains(e));
        let service = call.service_id();
        self.calls.push((self.now, call));
        if fails {
            return Err(HassError::ServiceFailed {
                service,
                reason: "device unreachable".to_string(),
            });
        }
        Ok(())
    }

    fn run_in(&mut self, delay: Duration, payload: T) -> HassResult<TimerHandle> {
        if self.fail_scheduling {
            return Err(HassError::Scheduler("mock scheduler down".to_string()));
        }
        let due = self.now
            + chrono::Duration::from_std(delay)
                .map_err(|e| HassError::Scheduler(e.to_string()))?;
        self.next_handle += 1;
        let handle = TimerHandle::new(self.next_handle);
        self.pending.push((due, handle, payload));
        Ok(handle)
    }

    fn cancel_timer(&mut self, handle: TimerHandle) {
        self.pending.retain(|(_, h, _)| *h != handle);
    }

    fn now(&self) -> NaiveDateTime {
        self.now
    }
}
