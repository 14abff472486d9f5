//! Instantiate apps from `apps.yaml` by class name

use ha_apps::{DashboardCast, DashboardCastConfig, PresenceLighting, PresenceLightingConfig};
use ha_config::{AppConfig, AppsConfig};
use tracing::{info, warn};

use crate::error::HostError;
use crate::runtime::Runtime;

pub const PRESENCE_LIGHTING: &str = "PresenceLighting";
pub const DASHBOARD_CAST: &str = "DashboardToNestHub";

/// Register every enabled app; returns how many were registered
pub fn register_apps(runtime: &mut Runtime, config: &AppsConfig) -> Result<usize, HostError> {
    let mut count = 0;
    for app in config.enabled() {
        register_app(runtime, app)?;
        count += 1;
    }
    for app in config.apps.iter().filter(|a| a.disabled) {
        warn!(app = %app.name, "Skipping disabled app");
    }
    info!(count, "Registered apps");
    Ok(count)
}

fn register_app(runtime: &mut Runtime, app: &AppConfig) -> Result<(), HostError> {
    match app.class.as_str() {
        PRESENCE_LIGHTING => {
            let config: PresenceLightingConfig = app.args()?;
            let lighting = PresenceLighting::new(&app.name, config).map_err(|source| HostError::App {
                app: app.name.clone(),
                source,
            })?;
            runtime.register(lighting);
        }
        DASHBOARD_CAST => {
            let config: DashboardCastConfig = app.args()?;
            for service in config.commands() {
                runtime.register_command(service)?;
            }
            runtime.register(DashboardCast::new(&app.name, config));
        }
        other => {
            return Err(HostError::UnknownClass {
                app: app.name.clone(),
                class: other.to_string(),
            })
        }
    }
    Ok(())
}
