//! Single-threaded app runtime
//!
//! The runtime owns the host (state store, event bus, service registry,
//! virtual clock) and the hosted apps. Handlers run one at a time. State
//! changes caused by a handler are queued on the event bus and delivered
//! once it has returned, so an app is never re-entered.

use chrono::NaiveDateTime;
use ha_apps::{App, HassResult, StateChange};
use ha_core::events::StateChangedData;
use ha_core::EntityId;
use ha_event_bus::{EventBus, SharedEventBus, TypedEventReceiver};
use ha_service_registry::{ServiceRegistry, SharedServiceRegistry};
use ha_state_machine::{SharedStateMachine, StateMachine};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument};

use crate::clock::VirtualClock;
use crate::context::{AppContext, ServiceCallRecord};
use crate::error::HostError;
use crate::services;
use crate::timers::TimerQueue;

/// Shared platform pieces every app context borrows
pub struct Host {
    pub bus: SharedEventBus,
    pub states: SharedStateMachine,
    pub services: SharedServiceRegistry,
    pub clock: VirtualClock,
    pub(crate) log: Vec<ServiceCallRecord>,
}

/// Type-erased hosted app
trait AppRunner {
    fn name(&self) -> &str;
    fn initialize(&mut self, host: &mut Host) -> HassResult<()>;
    /// Deliver a change if the app listens to the entity
    fn deliver(&mut self, host: &mut Host, change: &StateChange);
    fn next_due(&self) -> Option<NaiveDateTime>;
    /// Fire the earliest timer if it is due
    fn fire_due(&mut self, host: &mut Host) -> bool;
}

struct Hosted<A: App> {
    name: String,
    app: A,
    timers: TimerQueue<A::Timer>,
    listens: HashSet<EntityId>,
}

impl<A: App> AppRunner for Hosted<A> {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&mut self, host: &mut Host) -> HassResult<()> {
        let mut ctx = AppContext {
            app: &self.name,
            host,
            timers: &mut self.timers,
            listens: &mut self.listens,
        };
        self.app.initialize(&mut ctx)
    }

    fn deliver(&mut self, host: &mut Host, change: &StateChange) {
        if !self.listens.contains(&change.entity_id) {
            return;
        }
        let mut ctx = AppContext {
            app: &self.name,
            host,
            timers: &mut self.timers,
            listens: &mut self.listens,
        };
        self.app.on_state_change(&mut ctx, change);
    }

    fn next_due(&self) -> Option<NaiveDateTime> {
        self.timers.next_due()
    }

    fn fire_due(&mut self, host: &mut Host) -> bool {
        let Some((handle, payload)) = self.timers.pop_due(host.clock.now()) else {
            return false;
        };
        debug!(app = %self.name, timer = handle.id(), "Firing timer");
        let mut ctx = AppContext {
            app: &self.name,
            host,
            timers: &mut self.timers,
            listens: &mut self.listens,
        };
        self.app.on_timer(&mut ctx, payload);
        true
    }
}

pub struct Runtime {
    host: Host,
    apps: Vec<Box<dyn AppRunner>>,
    changes: TypedEventReceiver<StateChangedData>,
}

impl Runtime {
    /// A host with the built-in services, its clock set to `start`
    pub fn new(start: NaiveDateTime) -> Self {
        let bus = Arc::new(EventBus::new());
        let changes = bus.subscribe_typed::<StateChangedData>();
        let states = Arc::new(StateMachine::new(bus.clone()));
        let services = Arc::new(ServiceRegistry::new());
        let clock = VirtualClock::at(start);
        services::register_builtin(&services, states.clone(), clock.clone());

        Self {
            host: Host {
                bus,
                states,
                services,
                clock,
                log: Vec::new(),
            },
            apps: Vec::new(),
            changes,
        }
    }

    pub fn register<A>(&mut self, app: A)
    where
        A: App + 'static,
        A::Timer: 'static,
    {
        let name = app.name().to_string();
        info!(app = %name, "Registered app");
        self.apps.push(Box::new(Hosted {
            name,
            app,
            timers: TimerQueue::new(),
            listens: HashSet::new(),
        }));
    }

    /// Register a no-op command service, `service_id` being `domain.service`
    pub fn register_command(&self, service_id: &str) -> Result<(), HostError> {
        let (domain, service) = service_id
            .split_once('.')
            .ok_or_else(|| HostError::InvalidService(service_id.to_string()))?;
        if !self.host.services.has_service(domain, service) {
            services::register_command(&self.host.services, domain, service);
        }
        Ok(())
    }

    /// Initialize every app in registration order; returns how many succeeded
    ///
    /// A failing app is logged and stays registered, it is expected to ignore
    /// events from then on.
    pub fn initialize_apps(&mut self) -> usize {
        let mut ok = 0;
        for index in 0..self.apps.len() {
            let app = &mut self.apps[index];
            match app.initialize(&mut self.host) {
                Ok(()) => {
                    info!(app = %app.name(), "Initialized app");
                    ok += 1;
                }
                Err(e) => error!(app = %app.name(), error = %e, "App failed to initialize"),
            }
            self.settle();
        }
        ok
    }

    /// Write an entity's state from outside the apps and let them react
    #[instrument(skip(self), fields(entity_id = %entity_id))]
    pub fn set_state(&mut self, entity_id: EntityId, value: &str) {
        self.host
            .states
            .set_value(entity_id, value, self.host.clock.now());
        self.settle();
    }

    /// Deliver queued events and fire timers due now, until nothing is left
    pub fn settle(&mut self) {
        let now = self.now();
        loop {
            self.pump();
            if !self.fire_next(now) {
                break;
            }
        }
    }

    /// Move time forward by `by`, firing timers in due order
    pub fn advance(&mut self, by: Duration) {
        let target = chrono::Duration::from_std(by)
            .ok()
            .and_then(|by| self.now().checked_add_signed(by));
        match target {
            Some(target) => self.advance_to(target),
            None => error!(?by, "Cannot advance clock that far"),
        }
    }

    /// Move time forward to `target`, firing timers in due order
    pub fn advance_to(&mut self, target: NaiveDateTime) {
        self.settle();
        while self.fire_next(target) {
            self.pump();
        }
        self.host.clock.set(target);
        self.settle();
    }

    /// Fire the earliest timer due at or before `limit` across all apps
    fn fire_next(&mut self, limit: NaiveDateTime) -> bool {
        let next = self
            .apps
            .iter()
            .enumerate()
            .filter_map(|(index, app)| app.next_due().map(|due| (due, index)))
            .filter(|(due, _)| *due <= limit)
            .min();
        let Some((due, index)) = next else {
            return false;
        };
        self.host.clock.set(due);
        self.apps[index].fire_due(&mut self.host)
    }

    /// Deliver queued state changes to listening apps
    fn pump(&mut self) {
        while let Some(event) = self.changes.try_recv() {
            if !event.data.value_changed() {
                continue;
            }
            let change = StateChange::from(&event.data);
            for app in &mut self.apps {
                app.deliver(&mut self.host, &change);
            }
        }
    }

    pub fn now(&self) -> NaiveDateTime {
        self.host.clock.now()
    }

    /// Earliest pending timer of any app
    pub fn next_due(&self) -> Option<NaiveDateTime> {
        self.apps.iter().filter_map(|app| app.next_due()).min()
    }

    pub fn states(&self) -> &StateMachine {
        &self.host.states
    }

    pub fn services(&self) -> &ServiceRegistry {
        &self.host.services
    }

    pub fn bus(&self) -> &EventBus {
        &self.host.bus
    }

    /// Every service call made by the apps, in order
    pub fn service_log(&self) -> &[ServiceCallRecord] {
        &self.host.log
    }

    pub fn app_count(&self) -> usize {
        self.apps.len()
    }
}
