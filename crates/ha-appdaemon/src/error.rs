use ha_apps::HassError;
use ha_config::ConfigError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while setting up the host
#[derive(Debug, Error)]
pub enum HostError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("app '{app}' could not be created: {source}")]
    App { app: String, source: HassError },

    #[error("app '{app}' has unknown class '{class}'")]
    UnknownClass { app: String, class: String },

    #[error("'{0}' is not a domain.service name")]
    InvalidService(String),

    #[error(transparent)]
    Scenario(#[from] ScenarioError),
}

/// Errors in a scenario file
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("failed to read scenario {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse scenario {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("state of {entity_id} must be a scalar")]
    InvalidState { entity_id: String },

    #[error("step at {at}s comes after a step at {previous}s")]
    StepsOutOfOrder { at: u64, previous: u64 },

    #[error("{seconds}s after the start is out of range")]
    OutOfRange { seconds: u64 },
}
