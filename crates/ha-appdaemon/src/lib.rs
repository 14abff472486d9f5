//! In-process host for home automation apps
//!
//! Provides what the apps expect from a home automation platform: an entity
//! state store, state-change events, services and timers. Time is virtual and
//! only moves when the runtime advances it, so a [`Scenario`] replays the same
//! way every time.

pub mod apps;
pub mod clock;
pub mod context;
pub mod error;
pub mod runtime;
pub mod scenario;
pub mod services;
pub mod timers;

pub use apps::register_apps;
pub use clock::VirtualClock;
pub use context::ServiceCallRecord;
pub use error::{HostError, ScenarioError};
pub use runtime::Runtime;
pub use scenario::Scenario;
