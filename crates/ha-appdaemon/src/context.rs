//! The host side of the `Hass` capability trait

use chrono::NaiveDateTime;
use ha_apps::{Hass, HassError, HassResult, TimerHandle};
use ha_core::{EntityId, ServiceCall};
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

use crate::runtime::Host;
use crate::timers::TimerQueue;

/// One service call made by an app
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceCallRecord {
    /// Virtual time of the call
    pub time: NaiveDateTime,
    pub app: String,
    pub call: ServiceCall,
    /// Failure reason, `None` if the call succeeded
    pub error: Option<String>,
}

impl ServiceCallRecord {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

impl fmt::Display for ServiceCallRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] {}", self.time.format("%H:%M:%S"), self.app, self.call)?;
        if let Some(error) = &self.error {
            write!(f, " FAILED: {error}")?;
        }
        Ok(())
    }
}

/// What one app sees of the host while one of its handlers runs
pub struct AppContext<'a, T> {
    pub(crate) app: &'a str,
    pub(crate) host: &'a mut Host,
    pub(crate) timers: &'a mut TimerQueue<T>,
    pub(crate) listens: &'a mut HashSet<EntityId>,
}

impl<T> Hass<T> for AppContext<'_, T> {
    fn listen_state(&mut self, entity_id: &EntityId) -> HassResult<()> {
        debug!(app = self.app, entity_id = %entity_id, "Listening to state");
        self.listens.insert(entity_id.clone());
        Ok(())
    }

    fn get_state(&self, entity_id: &EntityId) -> HassResult<Option<String>> {
        Ok(self.host.states.get_state(entity_id))
    }

    fn call_service(&mut self, call: ServiceCall) -> HassResult<()> {
        let result = self.host.services.call(&call);
        let error = result.as_ref().err().map(ToString::to_string);
        if let Some(error) = &error {
            warn!(app = self.app, service = %call.service_id(), error = %error, "Service call failed");
        }
        let service = call.service_id();
        self.host.log.push(ServiceCallRecord {
            time: self.host.clock.now(),
            app: self.app.to_string(),
            call,
            error: error.clone(),
        });
        match error {
            Some(reason) => Err(HassError::ServiceFailed { service, reason }),
            None => Ok(()),
        }
    }

    fn run_in(&mut self, delay: Duration, payload: T) -> HassResult<TimerHandle> {
        let due = chrono::Duration::from_std(delay)
            .ok()
            .and_then(|delay| self.host.clock.now().checked_add_signed(delay))
            .ok_or_else(|| HassError::Scheduler(format!("delay of {delay:?} out of range")))?;
        Ok(self.timers.schedule(due, payload))
    }

    fn cancel_timer(&mut self, handle: TimerHandle) {
        self.timers.cancel(handle);
    }

    fn now(&self) -> NaiveDateTime {
        self.host.clock.now()
    }
}
