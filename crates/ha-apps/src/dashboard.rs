//! Cast a dashboard to the kitchen display while someone is present
//!
//! When the PC reports a numeric CPU load it is running and its dashboard is
//! cast; otherwise the Lovelace dashboard is cast through a script.

use ha_core::{EntityId, ServiceCall, STATE_OFF, STATE_ON};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::hass::{App, Hass, HassResult, StateChange};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DashboardCastConfig {
    pub presence_sensor: EntityId,
    pub cpu_load_sensor: EntityId,
    pub media_player: EntityId,
    /// `domain.service` casting the PC dashboard
    pub cast_dashboard: String,
    /// `domain.service` stopping any running cast
    pub stop_cast: String,
    /// `domain.service` casting the Lovelace dashboard
    pub cast_lovelace: String,
    pub delay_seconds: u64,
}

impl Default for DashboardCastConfig {
    fn default() -> Self {
        Self {
            presence_sensor: EntityId::from_static("binary_sensor.narvarodetektor_narvaro"),
            cpu_load_sensor: EntityId::from_static("sensor.pc_cpuload"),
            media_player: EntityId::from_static("media_player.nesthub0445"),
            cast_dashboard: "shell_command.cast_dashboard".to_string(),
            stop_cast: "shell_command.stop_catt".to_string(),
            cast_lovelace: "script.cast_lovelace_dashboard_to_nest_hub".to_string(),
            delay_seconds: 1,
        }
    }
}

impl DashboardCastConfig {
    /// Every `domain.service` the app calls besides `media_player.turn_off`
    pub fn commands(&self) -> [&str; 3] {
        [&self.cast_dashboard, &self.stop_cast, &self.cast_lovelace]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastTimer {
    Activate,
    Deactivate,
}

/// What is currently shown on the display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dashboard {
    Dashboard,
    Lovelace,
}

pub struct DashboardCast {
    name: String,
    config: DashboardCastConfig,
    cpu_load: Option<String>,
    current: Option<Dashboard>,
}

impl DashboardCast {
    pub fn new(name: impl Into<String>, config: DashboardCastConfig) -> Self {
        Self {
            name: name.into(),
            config,
            cpu_load: None,
            current: None,
        }
    }

    pub fn current(&self) -> Option<Dashboard> {
        self.current
    }

    fn pc_running(&self) -> bool {
        self.cpu_load
            .as_deref()
            .is_some_and(|load| load.trim().parse::<f64>().is_ok())
    }

    fn activate(&mut self, hass: &mut dyn Hass<CastTimer>) {
        if self.pc_running() {
            if self.current != Some(Dashboard::Dashboard) {
                self.step(hass, media_player_off(&self.config.media_player));
            }
            if self.run_command(hass, &self.config.cast_dashboard) {
                self.current = Some(Dashboard::Dashboard);
            }
        } else {
            if self.current != Some(Dashboard::Lovelace) {
                self.run_command(hass, &self.config.stop_cast);
            }
            if self.run_command(hass, &self.config.cast_lovelace) {
                self.current = Some(Dashboard::Lovelace);
            }
        }
        info!(app = %self.name, current = ?self.current, "Dashboard activated");
    }

    fn deactivate(&mut self, hass: &mut dyn Hass<CastTimer>) {
        self.step(hass, media_player_off(&self.config.media_player));
        self.run_command(hass, &self.config.stop_cast);
        info!(app = %self.name, "Dashboard deactivated");
    }

    fn run_command(&self, hass: &mut dyn Hass<CastTimer>, service: &str) -> bool {
        match command(service) {
            Some(call) => self.step(hass, call),
            None => {
                warn!(app = %self.name, service, "Skipping malformed service name");
                false
            }
        }
    }

    /// Run one call, logging a failure; returns whether it succeeded
    fn step(&self, hass: &mut dyn Hass<CastTimer>, call: ServiceCall) -> bool {
        let service = call.service_id();
        match hass.call_service(call) {
            Ok(()) => true,
            Err(e) => {
                warn!(app = %self.name, service = %service, error = %e, "Dashboard step failed");
                false
            }
        }
    }
}

fn command(service: &str) -> Option<ServiceCall> {
    let (domain, service) = service.split_once('.')?;
    Some(ServiceCall::simple(domain, service))
}

fn media_player_off(player: &EntityId) -> ServiceCall {
    ServiceCall::new(
        player.domain(),
        "turn_off",
        serde_json::json!({ "entity_id": player.to_string() }),
    )
}

impl App for DashboardCast {
    type Timer = CastTimer;

    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&mut self, hass: &mut dyn Hass<CastTimer>) -> HassResult<()> {
        hass.listen_state(&self.config.presence_sensor)?;
        hass.listen_state(&self.config.cpu_load_sensor)?;
        self.cpu_load = hass.get_state(&self.config.cpu_load_sensor)?;
        Ok(())
    }

    fn on_state_change(&mut self, hass: &mut dyn Hass<CastTimer>, change: &StateChange) {
        if change.entity_id == self.config.cpu_load_sensor {
            self.cpu_load = change.new.clone();
            return;
        }
        if change.entity_id != self.config.presence_sensor {
            return;
        }

        let timer = if change.is_new(STATE_ON) {
            CastTimer::Activate
        } else if change.is_new(STATE_OFF) {
            CastTimer::Deactivate
        } else {
            debug!(app = %self.name, state = ?change.new, "Ignoring presence state");
            return;
        };
        let delay = Duration::from_secs(self.config.delay_seconds);
        match hass.run_in(delay, timer) {
            Ok(_) => debug!(app = %self.name, ?timer, "Scheduled dashboard change"),
            Err(e) => warn!(app = %self.name, error = %e, "Failed to schedule dashboard change"),
        }
    }

    fn on_timer(&mut self, hass: &mut dyn Hass<CastTimer>, timer: CastTimer) {
        match timer {
            CastTimer::Activate => self.activate(hass),
            CastTimer::Deactivate => self.deactivate(hass),
        }
    }
}
