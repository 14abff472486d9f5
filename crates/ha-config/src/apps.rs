//! AppDaemon-style app configuration
//!
//! ```yaml
//! presence_lighting:
//!   module: presence_lighting
//!   class: PresenceLighting
//!   light_entity: light.ljus
//! ```

use crate::error::{ConfigError, ConfigResult};
use crate::loader::load_yaml;
use serde::de::DeserializeOwned;
use serde_yaml::{Mapping, Value};
use std::path::PathBuf;
use tracing::debug;

/// Default name of the apps file inside the config directory
pub const APPS_FILE: &str = "apps.yaml";

/// One configured app instance
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Section name in apps.yaml, unique per instance
    pub name: String,
    /// App class to instantiate
    pub class: String,
    pub module: Option<String>,
    pub disabled: bool,
    /// Remaining keys of the section; `module`, `class` and `disabled` are consumed
    pub args: Mapping,
}

impl AppConfig {
    /// Deserialize the app arguments into the app's own config type
    pub fn args<T: DeserializeOwned>(&self) -> ConfigResult<T> {
        serde_yaml::from_value(Value::Mapping(self.args.clone())).map_err(|source| {
            ConfigError::InvalidAppArgs {
                app: self.name.clone(),
                source,
            }
        })
    }

    fn from_section(name: String, section: Value) -> ConfigResult<Self> {
        let Value::Mapping(mut args) = section else {
            return Err(ConfigError::InvalidValue {
                key: name,
                reason: "app section must be a mapping".to_string(),
            });
        };

        let class = match args.remove("class") {
            Some(Value::String(class)) => class,
            _ => {
                return Err(ConfigError::InvalidValue {
                    key: format!("{name}.class"),
                    reason: "app class must be a string".to_string(),
                })
            }
        };
        let module = match args.remove("module") {
            Some(Value::String(module)) => Some(module),
            _ => None,
        };
        let disabled = matches!(args.remove("disabled"), Some(Value::Bool(true)));

        Ok(Self {
            name,
            class,
            module,
            disabled,
            args,
        })
    }
}

/// All app sections of apps.yaml, in file order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppsConfig {
    pub apps: Vec<AppConfig>,
}

impl AppsConfig {
    /// Load `apps.yaml` from the config directory
    pub fn load(config_dir: impl Into<PathBuf>) -> ConfigResult<Self> {
        Self::from_value(load_yaml(config_dir, APPS_FILE)?)
    }

    /// Build from an already loaded YAML document
    pub fn from_value(value: Value) -> ConfigResult<Self> {
        let sections = match value {
            Value::Mapping(map) => map,
            Value::Null => Mapping::new(),
            _ => {
                return Err(ConfigError::InvalidValue {
                    key: APPS_FILE.to_string(),
                    reason: "top level must be a mapping of app sections".to_string(),
                })
            }
        };

        let mut apps = Vec::with_capacity(sections.len());
        for (key, section) in sections {
            let Value::String(name) = key else {
                return Err(ConfigError::InvalidValue {
                    key: format!("{:?}", key),
                    reason: "app name must be a string".to_string(),
                });
            };
            apps.push(AppConfig::from_section(name, section)?);
        }

        debug!("Loaded {} app sections", apps.len());
        Ok(Self { apps })
    }

    /// Apps not marked `disabled: true`
    pub fn enabled(&self) -> impl Iterator<Item = &AppConfig> {
        self.apps.iter().filter(|a| !a.disabled)
    }

    pub fn get(&self, name: &str) -> Option<&AppConfig> {
        self.apps.iter().find(|a| a.name == name)
    }
}
