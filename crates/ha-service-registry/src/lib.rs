//! Service registry
//!
//! Services are the way apps change the world: `light.turn_on`,
//! `media_player.turn_off`, `shell_command.cast_dashboard` and so on. The
//! app runtime is single-threaded, so handlers are plain synchronous
//! functions that return as soon as the call has been carried out.

use dashmap::DashMap;
use ha_core::ServiceCall;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Result type for service calls
pub type ServiceResult = Result<Option<serde_json::Value>, ServiceError>;

/// Service handler function type
pub type ServiceHandler = Arc<dyn Fn(&ServiceCall) -> ServiceResult + Send + Sync>;

/// Errors that can occur when working with services
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ServiceError {
    #[error("service not found: {domain}.{service}")]
    NotFound { domain: String, service: String },

    #[error("service call failed: {0}")]
    CallFailed(String),

    #[error("invalid service data: {0}")]
    InvalidData(String),
}

/// The service registry manages all registered services
pub struct ServiceRegistry {
    /// Services indexed by "domain.service" key
    services: DashMap<String, ServiceHandler>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self {
            services: DashMap::new(),
        }
    }

    /// Register a service, replacing any previous handler with the same name
    #[instrument(skip(self, handler))]
    pub fn register<F>(&self, domain: &str, service: &str, handler: F)
    where
        F: Fn(&ServiceCall) -> ServiceResult + Send + Sync + 'static,
    {
        debug!(domain = %domain, service = %service, "Registering service");
        let replaced = self
            .services
            .insert(format!("{}.{}", domain, service), Arc::new(handler))
            .is_some();
        if replaced {
            warn!(domain = %domain, service = %service, "Replaced existing service handler");
        }
    }

    /// Call a service
    #[instrument(skip(self, call), fields(service = %call.service_id()))]
    pub fn call(&self, call: &ServiceCall) -> ServiceResult {
        let handler = self
            .services
            .get(&call.service_id())
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| {
                warn!(domain = %call.domain, service = %call.service, "Service not found");
                ServiceError::NotFound {
                    domain: call.domain.clone(),
                    service: call.service.clone(),
                }
            })?;

        debug!(data = %call.service_data, "Calling service");
        // The map guard is released before the handler runs so handlers may
        // register or call other services.
        handler(call)
    }

    pub fn has_service(&self, domain: &str, service: &str) -> bool {
        self.services.contains_key(&format!("{}.{}", domain, service))
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Thread-safe wrapper for ServiceRegistry
pub type SharedServiceRegistry = Arc<ServiceRegistry>;
