//! YAML configuration loading for the app host
//!
//! Apps are configured in an AppDaemon-style `apps.yaml`: one top-level
//! section per app instance naming the app `class`, with the remaining keys
//! passed to the app as its arguments. The loader understands:
//!
//! - `!include path` - Include another YAML file
//! - `!secret key` - Substitute from secrets.yaml
//! - `!env_var VAR` - Environment variable substitution
//!
//! # Example
//!
//! ```ignore
//! use ha_config::AppsConfig;
//!
//! let apps = AppsConfig::load("/config")?;
//! for app in apps.enabled() {
//!     println!("{} ({})", app.name, app.class);
//! }
//! ```

mod apps;
mod error;
mod loader;
mod secrets;

pub use apps::{AppConfig, AppsConfig, APPS_FILE};
pub use error::{ConfigError, ConfigResult};
pub use loader::{load_yaml, YamlLoader};
pub use secrets::Secrets;

// Re-export serde_yaml::Value for convenience
pub use serde_yaml::Value;
