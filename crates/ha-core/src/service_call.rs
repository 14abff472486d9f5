//! Service call type for invoking services on the host

use serde::{Deserialize, Serialize};

use crate::EntityId;

/// A call to a service such as `light.turn_on`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceCall {
    /// The domain the service belongs to (e.g., "light", "shell_command")
    pub domain: String,

    /// The service name (e.g., "turn_on", "cast_dashboard")
    pub service: String,

    /// Data passed to the service (entity_id, brightness, color, ...)
    pub service_data: serde_json::Value,
}

impl ServiceCall {
    pub fn new(
        domain: impl Into<String>,
        service: impl Into<String>,
        service_data: serde_json::Value,
    ) -> Self {
        Self {
            domain: domain.into(),
            service: service.into(),
            service_data,
        }
    }

    /// Create a service call with empty service data
    pub fn simple(domain: impl Into<String>, service: impl Into<String>) -> Self {
        Self::new(domain, service, serde_json::Value::Object(Default::default()))
    }

    /// Full service identifier (domain.service)
    pub fn service_id(&self) -> String {
        format!("{}.{}", self.domain, self.service)
    }

    /// Get a value from service_data
    pub fn get<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.service_data
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Target entity ids, accepting both a single string and an array
    ///
    /// Values that are not valid entity ids are skipped.
    pub fn entity_ids(&self) -> Vec<EntityId> {
        let raw: Vec<&str> = match self.service_data.get("entity_id") {
            Some(serde_json::Value::String(s)) => vec![s.as_str()],
            Some(serde_json::Value::Array(arr)) => {
                arr.iter().filter_map(|v| v.as_str()).collect()
            }
            _ => vec![],
        };
        raw.into_iter().filter_map(|s| s.parse().ok()).collect()
    }
}

impl std::fmt::Display for ServiceCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{} {}", self.domain, self.service, self.service_data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_service_call_creation() {
        let call = ServiceCall::new(
            "light",
            "turn_on",
            json!({"entity_id": "light.ljus", "brightness": 255}),
        );

        assert_eq!(call.service_id(), "light.turn_on");
        assert_eq!(call.get::<u8>("brightness"), Some(255));
        assert_eq!(call.get::<String>("missing"), None);
    }

    #[test]
    fn test_simple_service_call() {
        let call = ServiceCall::simple("shell_command", "stop_catt");
        assert!(call.service_data.as_object().unwrap().is_empty());
        assert!(call.entity_ids().is_empty());
    }

    #[test]
    fn test_entity_ids_single_and_multiple() {
        let single = ServiceCall::new("light", "turn_off", json!({"entity_id": "light.ljus"}));
        assert_eq!(single.entity_ids().len(), 1);
        assert_eq!(single.entity_ids()[0].to_string(), "light.ljus");

        let multiple = ServiceCall::new(
            "light",
            "turn_off",
            json!({"entity_id": ["light.christmas1", "not an id", "light.christmas2"]}),
        );
        let ids: Vec<String> = multiple.entity_ids().iter().map(|i| i.to_string()).collect();
        assert_eq!(ids, vec!["light.christmas1", "light.christmas2"]);
    }
}
