//! Presence-driven room lighting
//!
//! The room has a presence sensor and three mode toggles. While someone is
//! present the lights follow the highest-priority enabled mode
//! (focus, christmas, night, otherwise default). When presence ends all
//! pending callbacks are cancelled and the mode's lights are turned off.

mod bedroom;
mod config;
mod mode;
mod pattern;
mod profile;

pub use bedroom::{bedroom_light_wanted, BedroomPredicate, USB_CHARGER};
pub use config::{ChristmasConfig, PresenceLightingConfig};
pub use mode::Mode;
pub use pattern::{ChristmasPattern, PatternStep, Phase};
pub use profile::{LightProfile, TimeBand};

use chrono::{NaiveDateTime, NaiveTime, Timelike};
use ha_core::{EntityId, LightSettings, STATE_ON};
use tracing::{debug, error, info, warn};

use crate::hass::{App, Hass, HassResult, StateChange, TimerHandle};

/// Timer payloads of [`PresenceLighting`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightingTimer {
    /// Turn on the focus light after the main light has settled
    FocusLight,
    Pattern(PatternStep),
}

impl From<PatternStep> for LightingTimer {
    fn from(step: PatternStep) -> Self {
        Self::Pattern(step)
    }
}

pub struct PresenceLighting {
    name: String,
    config: PresenceLightingConfig,
    mode: Mode,
    /// Whether `mode`'s lights are currently driven
    active: bool,
    callbacks: Vec<TimerHandle>,
    christmas: ChristmasPattern,
    presence_since: Option<NaiveDateTime>,
    /// Set when initialization failed; all events are ignored
    inert: bool,
}

impl PresenceLighting {
    pub fn new(name: impl Into<String>, config: PresenceLightingConfig) -> HassResult<Self> {
        config.validate()?;
        Ok(Self {
            name: name.into(),
            config,
            mode: Mode::Default,
            active: false,
            callbacks: Vec::new(),
            christmas: ChristmasPattern::default(),
            presence_since: None,
            inert: false,
        })
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_inert(&self) -> bool {
        self.inert
    }

    pub fn christmas_running(&self) -> bool {
        self.christmas.is_running()
    }

    /// Handles of the callbacks currently scheduled by the app
    pub fn callbacks(&self) -> &[TimerHandle] {
        &self.callbacks
    }

    pub fn config(&self) -> &PresenceLightingConfig {
        &self.config
    }

    /// Mode implied by the toggles, first enabled one by priority
    pub fn select_mode(&self, hass: &dyn Hass<LightingTimer>) -> Mode {
        Mode::BY_PRIORITY
            .into_iter()
            .find(|mode| mode.toggle(&self.config).is_some_and(|t| is_on(hass, t)))
            .unwrap_or(Mode::Default)
    }

    /// Make `target` the active mode; a no-op if it already is
    pub fn switch_to(&mut self, hass: &mut dyn Hass<LightingTimer>, target: Mode) -> HassResult<()> {
        if self.active && self.mode == target {
            debug!(app = %self.name, mode = %target, "Mode already active");
            return Ok(());
        }

        self.cancel_callbacks(hass);
        if self.active {
            self.teardown(hass, Some(target));
        }

        info!(app = %self.name, from = %self.mode, to = %target, "Activating mode");
        self.mode = target;
        self.active = true;
        if let Err(e) = self.apply(hass, target) {
            self.fall_back(hass);
            return Err(e);
        }
        Ok(())
    }

    /// Cancel callbacks, turn off the current mode's lights and reset to default
    pub fn deactivate(&mut self, hass: &mut dyn Hass<LightingTimer>) {
        self.cancel_callbacks(hass);
        self.teardown(hass, None);
        info!(app = %self.name, mode = %self.mode, "Deactivated mode");
        self.mode = Mode::Default;
        self.active = false;
    }

    /// Scheduling failed part way; forget the mode so it can be activated again
    fn fall_back(&mut self, hass: &mut dyn Hass<LightingTimer>) {
        warn!(app = %self.name, mode = %self.mode, "Mode left inactive after scheduling failure");
        self.cancel_callbacks(hass);
        self.christmas.stop();
        self.mode = Mode::Default;
        self.active = false;
    }

    fn cancel_callbacks(&mut self, hass: &mut dyn Hass<LightingTimer>) {
        if !self.callbacks.is_empty() {
            debug!(app = %self.name, count = self.callbacks.len(), "Cancelling scheduled callbacks");
        }
        for handle in self.callbacks.drain(..) {
            hass.cancel_timer(handle);
        }
    }

    /// Turn off the lights the current mode drove, except those `next` also drives
    fn teardown(&mut self, hass: &mut dyn Hass<LightingTimer>, next: Option<Mode>) {
        if self.mode == Mode::Christmas {
            self.christmas.stop();
        }
        let keep = next.map(|m| m.lights(&self.config)).unwrap_or_default();
        for light in self.mode.lights(&self.config) {
            if !keep.contains(&light) {
                turn_off(hass, light);
            }
        }
    }

    fn apply(&mut self, hass: &mut dyn Hass<LightingTimer>, mode: Mode) -> HassResult<()> {
        match mode {
            Mode::Default => {
                let settings = LightProfile::at(hass.now().time()).settings();
                turn_on(hass, &self.config.main_light, &settings);
            }
            Mode::Focus => {
                let settings = LightProfile::at(hass.now().time()).settings();
                turn_on(hass, &self.config.main_light, &settings);
                let handle = hass.run_in(self.config.focus_delay(), LightingTimer::FocusLight)?;
                self.callbacks.push(handle);
            }
            Mode::Night => {
                for light in &self.config.night_lights {
                    turn_on(hass, light, &self.config.night_settings);
                }
                if self.bedroom().evaluate(hass) {
                    turn_on(hass, &self.config.bedroom_light, &self.config.bedroom_settings);
                }
            }
            Mode::Christmas => {
                let generation = self.christmas.start();
                info!(app = %self.name, generation, "Starting christmas pattern");
                let handles = self.christmas.schedule_cycle(hass, &self.config.christmas)?;
                self.callbacks.extend(handles);
            }
        }
        Ok(())
    }

    fn bedroom(&self) -> BedroomPredicate<'_> {
        BedroomPredicate {
            phone_state_sensor: &self.config.phone_state_sensor,
            charger_type_sensor: &self.config.charger_type_sensor,
            unknown_phone_state: &self.config.unknown_phone_state,
        }
    }

    fn try_initialize(&mut self, hass: &mut dyn Hass<LightingTimer>) -> HassResult<()> {
        let watched = [
            self.config.presence_sensor.clone(),
            self.config.focus_toggle.clone(),
            self.config.christmas_toggle.clone(),
            self.config.night_toggle.clone(),
            self.config.phone_state_sensor.clone(),
            self.config.charger_type_sensor.clone(),
        ];
        for entity_id in &watched {
            hass.listen_state(entity_id)?;
        }

        if self.presence_allowed(hass) && is_on(hass, &self.config.presence_sensor) {
            self.presence_since = Some(hass.now());
            let mode = self.select_mode(hass);
            self.switch_to(hass, mode)?;
        }
        Ok(())
    }

    fn presence_allowed(&self, hass: &dyn Hass<LightingTimer>) -> bool {
        match &self.config.presence_mode {
            Some(gate) => is_on(hass, gate),
            None => true,
        }
    }

    fn on_presence(&mut self, hass: &mut dyn Hass<LightingTimer>, change: &StateChange) {
        if !self.presence_allowed(hass) {
            debug!(app = %self.name, "Presence mode is off, ignoring presence change");
            return;
        }

        if change.is_new(STATE_ON) {
            let now = hass.now();
            self.presence_since = Some(now);
            info!(app = %self.name, since = %now.format("%H:%M"), "Presence detected");
            let mode = self.select_mode(hass);
            if let Err(e) = self.switch_to(hass, mode) {
                error!(app = %self.name, mode = %mode, error = %e, "Failed to activate mode");
            }
        } else {
            if self.active {
                self.deactivate(hass);
            }
            if let Some(since) = self.presence_since.take() {
                let minutes = minutes_between(since.time(), hass.now().time());
                info!(app = %self.name, minutes, "Presence ended");
            }
        }
    }

    fn on_toggle(&mut self, hass: &mut dyn Hass<LightingTimer>, mode: Mode, change: &StateChange) {
        if self.presence_since.is_none() {
            debug!(app = %self.name, toggle = %change.entity_id, "No presence, ignoring toggle");
            return;
        }

        let target = if change.is_new(STATE_ON) {
            mode
        } else if self.mode == mode {
            self.select_mode(hass)
        } else {
            return;
        };
        if let Err(e) = self.switch_to(hass, target) {
            error!(app = %self.name, mode = %target, error = %e, "Failed to switch mode");
        }
    }

    /// Phone or charger sensor changed; light the bedroom when it becomes wanted
    fn on_bedroom_sensor(&mut self, hass: &mut dyn Hass<LightingTimer>, change: &StateChange) {
        if !self.active || self.mode != Mode::Night {
            return;
        }
        let predicate = self.bedroom();
        let wanted_before = predicate.evaluate_with(hass, &change.entity_id, change.old.as_deref());
        let wanted_now = predicate.evaluate(hass);
        if wanted_now && !wanted_before {
            info!(app = %self.name, sensor = %change.entity_id, "Turning on bedroom night light");
            turn_on(hass, &self.config.bedroom_light, &self.config.bedroom_settings);
        }
    }

    fn on_pattern_step(&mut self, hass: &mut dyn Hass<LightingTimer>, step: PatternStep) {
        if !self.christmas.accepts(&step) {
            debug!(app = %self.name, generation = step.generation, "Ignoring stale pattern step");
            return;
        }

        match step.phase {
            Phase::First | Phase::Second => {
                ChristmasPattern::apply_phase(hass, &self.config.christmas, step.phase)
            }
            Phase::Continue => {
                if !is_on(hass, &self.config.christmas_toggle) {
                    info!(app = %self.name, "Christmas mode is off, stopping pattern");
                    self.christmas.stop();
                    self.callbacks.clear();
                    return;
                }
                // Every handle of the finished cycle has fired
                self.callbacks.clear();
                match self.christmas.schedule_cycle(hass, &self.config.christmas) {
                    Ok(handles) => self.callbacks.extend(handles),
                    Err(e) => {
                        error!(app = %self.name, error = %e, "Failed to continue christmas pattern");
                        self.fall_back(hass);
                    }
                }
            }
        }
    }
}

impl App for PresenceLighting {
    type Timer = LightingTimer;

    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&mut self, hass: &mut dyn Hass<LightingTimer>) -> HassResult<()> {
        let result = self.try_initialize(hass);
        if let Err(e) = &result {
            error!(app = %self.name, error = %e, "Initialization failed, app stays inert");
            self.cancel_callbacks(hass);
            self.christmas.stop();
            self.inert = true;
        }
        result
    }

    fn on_state_change(&mut self, hass: &mut dyn Hass<LightingTimer>, change: &StateChange) {
        if self.inert {
            return;
        }
        let entity_id = &change.entity_id;
        if *entity_id == self.config.presence_sensor {
            self.on_presence(hass, change);
        } else if let Some(mode) = Mode::for_toggle(entity_id, &self.config) {
            self.on_toggle(hass, mode, change);
        } else if *entity_id == self.config.phone_state_sensor
            || *entity_id == self.config.charger_type_sensor
        {
            self.on_bedroom_sensor(hass, change);
        }
    }

    fn on_timer(&mut self, hass: &mut dyn Hass<LightingTimer>, timer: LightingTimer) {
        if self.inert {
            return;
        }
        match timer {
            LightingTimer::FocusLight => {
                if self.active && self.mode == Mode::Focus {
                    turn_on(hass, &self.config.focus_light, &self.config.focus_settings);
                }
            }
            LightingTimer::Pattern(step) => self.on_pattern_step(hass, step),
        }
    }
}

/// Minutes from `start` to `end`, wrapping past midnight
pub fn minutes_between(start: NaiveTime, end: NaiveTime) -> u32 {
    let start = start.hour() * 60 + start.minute();
    let mut end = end.hour() * 60 + end.minute();
    if end < start {
        end += 24 * 60;
    }
    end - start
}

fn is_on<T>(hass: &dyn Hass<T>, entity_id: &EntityId) -> bool {
    match hass.get_state(entity_id) {
        Ok(state) => state.as_deref() == Some(STATE_ON),
        Err(e) => {
            warn!(entity_id = %entity_id, error = %e, "State read failed, treating as off");
            false
        }
    }
}

fn turn_on<T>(hass: &mut dyn Hass<T>, light: &EntityId, settings: &LightSettings) {
    if let Err(e) = hass.turn_on(light, settings) {
        warn!(entity_id = %light, error = %e, "Failed to turn on light");
    }
}

fn turn_off<T>(hass: &mut dyn Hass<T>, light: &EntityId) {
    if let Err(e) = hass.turn_off(light) {
        warn!(entity_id = %light, error = %e, "Failed to turn off light");
    }
}
