//! Entity ID type representing a domain.object_id pair

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for invalid entity IDs
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EntityIdError {
    #[error("entity_id '{0}' must contain exactly one '.' separator")]
    InvalidFormat(String),

    #[error("entity_id part cannot be empty")]
    EmptyPart,

    #[error("'{0}' must be lowercase alphanumeric with underscores and cannot start or end with '_'")]
    InvalidChars(String),
}

/// An entity ID such as `light.ljus` or `binary_sensor.narvarodetektor_narvaro`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityId {
    domain: String,
    object_id: String,
}

impl EntityId {
    pub fn new(
        domain: impl Into<String>,
        object_id: impl Into<String>,
    ) -> Result<Self, EntityIdError> {
        let domain = domain.into();
        let object_id = object_id.into();

        for part in [&domain, &object_id] {
            if part.is_empty() {
                return Err(EntityIdError::EmptyPart);
            }
            if !is_valid_part(part) {
                return Err(EntityIdError::InvalidChars(part.clone()));
            }
        }
        if domain.contains("__") {
            return Err(EntityIdError::InvalidChars(domain));
        }

        Ok(Self { domain, object_id })
    }

    /// Build an entity id from a literal known to be valid, e.g. a config default
    pub fn from_static(s: &'static str) -> Self {
        debug_assert!(s.parse::<EntityId>().is_ok(), "invalid entity id literal {s}");
        let (domain, object_id) = s.split_once('.').unwrap_or((s, ""));
        Self {
            domain: domain.to_string(),
            object_id: object_id.to_string(),
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn object_id(&self) -> &str {
        &self.object_id
    }
}

fn is_valid_part(s: &str) -> bool {
    !s.starts_with('_')
        && !s.ends_with('_')
        && s.chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

impl FromStr for EntityId {
    type Err = EntityIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('.') {
            Some((domain, object_id)) if !object_id.contains('.') => Self::new(domain, object_id),
            _ => Err(EntityIdError::InvalidFormat(s.to_string())),
        }
    }
}

impl TryFrom<String> for EntityId {
    type Error = EntityIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<EntityId> for String {
    fn from(id: EntityId) -> String {
        id.to_string()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.domain, self.object_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_entity_id() {
        let id: EntityId = "binary_sensor.narvarodetektor_narvaro".parse().unwrap();
        assert_eq!(id.domain(), "binary_sensor");
        assert_eq!(id.object_id(), "narvarodetektor_narvaro");
        assert_eq!(id.to_string(), "binary_sensor.narvarodetektor_narvaro");
    }

    #[test]
    fn test_invalid_format() {
        assert!(matches!(
            "no_separator".parse::<EntityId>(),
            Err(EntityIdError::InvalidFormat(_))
        ));
        assert!(matches!(
            "too.many.parts".parse::<EntityId>(),
            Err(EntityIdError::InvalidFormat(_))
        ));
        assert_eq!(".ljus".parse::<EntityId>(), Err(EntityIdError::EmptyPart));
    }

    #[test]
    fn test_invalid_chars() {
        assert!(matches!(
            "light.Ljus".parse::<EntityId>(),
            Err(EntityIdError::InvalidChars(_))
        ));
        assert!(matches!(
            "light._ljus".parse::<EntityId>(),
            Err(EntityIdError::InvalidChars(_))
        ));
        assert!(matches!(
            "my__light.ljus".parse::<EntityId>(),
            Err(EntityIdError::InvalidChars(_))
        ));
        assert!("light.my__room".parse::<EntityId>().is_ok());
    }

    #[test]
    fn test_serde_as_string() {
        let id: EntityId = serde_json::from_str("\"light.vagglampa\"").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"light.vagglampa\"");
        assert!(serde_json::from_str::<EntityId>("\"vagglampa\"").is_err());
    }
}
