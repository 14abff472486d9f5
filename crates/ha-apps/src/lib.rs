//! Home automation apps
//!
//! Apps are plain state machines driven by a host through the [`App`] trait.
//! They reach the outside world only through the [`Hass`] capabilities, so
//! the same app runs against the in-process host or a test double.

pub mod dashboard;
pub mod hass;
pub mod presence_lighting;

#[cfg(test)]
mod testing;

pub use dashboard::{CastTimer, DashboardCast, DashboardCastConfig};
pub use hass::{App, Hass, HassError, HassResult, StateChange, TimerHandle};
pub use presence_lighting::{
    LightingTimer, Mode, PresenceLighting, PresenceLightingConfig,
};
