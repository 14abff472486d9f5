//! Configuration of the presence lighting app
//!
//! Every field has a default matching the installation the app was written
//! for, so an empty `apps.yaml` section is a valid config.

use ha_core::{EntityId, LightSettings, RgbColor};
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;

use crate::hass::{HassError, HassResult};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PresenceLightingConfig {
    pub presence_sensor: EntityId,
    /// Master switch; presence events are ignored unless it is "on"
    pub presence_mode: Option<EntityId>,

    pub focus_toggle: EntityId,
    pub christmas_toggle: EntityId,
    pub night_toggle: EntityId,

    pub main_light: EntityId,
    pub focus_light: EntityId,
    pub bedroom_light: EntityId,
    pub night_lights: Vec<EntityId>,

    pub phone_state_sensor: EntityId,
    pub charger_type_sensor: EntityId,
    /// State the phone sensor reports when the phone's whereabouts are unknown
    pub unknown_phone_state: String,

    pub focus_delay_seconds: u64,
    pub focus_settings: LightSettings,
    pub night_settings: LightSettings,
    pub bedroom_settings: LightSettings,

    pub christmas: ChristmasConfig,
}

impl Default for PresenceLightingConfig {
    fn default() -> Self {
        Self {
            presence_sensor: EntityId::from_static("binary_sensor.narvarodetektor_narvaro"),
            presence_mode: Some(EntityId::from_static("input_boolean.presence_mode")),
            focus_toggle: EntityId::from_static("input_boolean.desk_focus_lights"),
            christmas_toggle: EntityId::from_static("input_boolean.christmas_mode"),
            night_toggle: EntityId::from_static("input_boolean.night_mode"),
            main_light: EntityId::from_static("light.ljus"),
            focus_light: EntityId::from_static("light.taklampa_lampa_3"),
            bedroom_light: EntityId::from_static("light.vagglampa"),
            night_lights: vec![EntityId::from_static("light.zigbee_night_lights")],
            phone_state_sensor: EntityId::from_static("sensor.hampus_zfold_phone_state"),
            charger_type_sensor: EntityId::from_static("sensor.hampus_zfold_charger_type"),
            unknown_phone_state: "okänd".to_string(),
            focus_delay_seconds: 1,
            focus_settings: LightSettings::white(255, 250),
            night_settings: LightSettings::white(64, 350),
            bedroom_settings: LightSettings::color(RgbColor::BLUE, 102),
            christmas: ChristmasConfig::default(),
        }
    }
}

impl PresenceLightingConfig {
    pub fn focus_delay(&self) -> Duration {
        Duration::from_secs(self.focus_delay_seconds)
    }

    pub fn validate(&self) -> HassResult<()> {
        self.christmas.validate()
    }
}

/// The alternating red/green pattern
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChristmasConfig {
    pub lights1: Vec<EntityId>,
    pub lights2: Vec<EntityId>,
    pub brightness: u8,
    /// Seconds from the start of a cycle until the colors swap
    pub phase_seconds: u64,
    /// Seconds from the start of a cycle until the next one starts
    pub period_seconds: u64,
    /// Transition of each color change, in seconds
    pub transition: f32,
}

impl Default for ChristmasConfig {
    fn default() -> Self {
        Self {
            lights1: vec![EntityId::from_static("light.christmas1")],
            lights2: vec![EntityId::from_static("light.christmas2")],
            brightness: 150,
            phase_seconds: 5,
            period_seconds: 10,
            transition: 1.0,
        }
    }
}

impl ChristmasConfig {
    pub fn phase(&self) -> Duration {
        Duration::from_secs(self.phase_seconds)
    }

    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period_seconds)
    }

    /// Groups must not share lights and the swap must happen inside the cycle
    pub fn validate(&self) -> HassResult<()> {
        let first: HashSet<&EntityId> = self.lights1.iter().collect();
        if let Some(shared) = self.lights2.iter().find(|l| first.contains(l)) {
            return Err(HassError::InvalidConfig(format!(
                "{shared} is in both christmas light groups"
            )));
        }
        if self.phase_seconds >= self.period_seconds {
            return Err(HassError::InvalidConfig(format!(
                "christmas phase ({}s) must be shorter than the period ({}s)",
                self.phase_seconds, self.period_seconds
            )));
        }
        Ok(())
    }
}
