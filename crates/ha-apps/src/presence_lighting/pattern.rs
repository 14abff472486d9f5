//! Alternating two-group color pattern
//!
//! One cycle is three timers scheduled together: the first color set at 0,
//! the swapped colors at `phase`, and the continuation at `period`. The
//! continuation schedules the next cycle relative to the time it runs.
//!
//! Every timer carries the generation it was scheduled under. Stopping clears
//! `running`; starting again bumps the generation, so timers left over from an
//! earlier run are ignored even if their cancellation was missed.

use ha_core::{EntityId, LightSettings, RgbColor};
use tracing::{debug, warn};

use super::config::ChristmasConfig;
use crate::hass::{Hass, HassResult, TimerHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    First,
    Second,
    Continue,
}

/// Timer payload of one pattern step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternStep {
    pub generation: u64,
    pub phase: Phase,
}

/// Running flag plus cancellation token of the pattern
#[derive(Debug, Default)]
pub struct ChristmasPattern {
    generation: u64,
    running: bool,
}

impl ChristmasPattern {
    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Begin a new run; steps of earlier runs become stale
    pub fn start(&mut self) -> u64 {
        self.generation += 1;
        self.running = true;
        self.generation
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Whether a fired step still belongs to the current run
    pub fn accepts(&self, step: &PatternStep) -> bool {
        self.running && step.generation == self.generation
    }

    /// Schedule one cycle and return its handles
    pub fn schedule_cycle<T: From<PatternStep>>(
        &self,
        hass: &mut dyn Hass<T>,
        config: &ChristmasConfig,
    ) -> HassResult<Vec<TimerHandle>> {
        let step = |phase| PatternStep {
            generation: self.generation,
            phase,
        };
        let mut handles = Vec::with_capacity(3);
        for (delay, phase) in [
            (std::time::Duration::ZERO, Phase::First),
            (config.phase(), Phase::Second),
            (config.period(), Phase::Continue),
        ] {
            match hass.run_in(delay, step(phase).into()) {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    for handle in handles {
                        hass.cancel_timer(handle);
                    }
                    return Err(e);
                }
            }
        }
        debug!(generation = self.generation, "Scheduled christmas cycle");
        Ok(handles)
    }

    /// Set the colors of one phase; each light is best-effort
    pub fn apply_phase<T>(hass: &mut dyn Hass<T>, config: &ChristmasConfig, phase: Phase) {
        let (first, second) = match phase {
            Phase::First => (RgbColor::RED, RgbColor::GREEN),
            Phase::Second => (RgbColor::GREEN, RgbColor::RED),
            Phase::Continue => return,
        };
        set_group(hass, &config.lights1, first, config);
        set_group(hass, &config.lights2, second, config);
    }
}

fn set_group<T>(
    hass: &mut dyn Hass<T>,
    lights: &[EntityId],
    color: RgbColor,
    config: &ChristmasConfig,
) {
    let settings = LightSettings::color(color, config.brightness).with_transition(config.transition);
    for light in lights {
        if let Err(e) = hass.turn_on(light, &settings) {
            warn!(entity_id = %light, error = %e, "Failed to set christmas color");
        }
    }
}
