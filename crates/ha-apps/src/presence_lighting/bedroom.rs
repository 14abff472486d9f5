//! Whether the bedroom night light should come on
//!
//! The phone reports an "unknown" state while it is away from the network or
//! switched off, and a `usb` charger type while on the bedside charger.
//! Either means someone is heading to bed.

use ha_core::EntityId;
use tracing::warn;

use crate::hass::Hass;

/// Charger type reported while on the bedside charger
pub const USB_CHARGER: &str = "usb";

pub fn bedroom_light_wanted(
    phone_state: Option<&str>,
    charger_type: Option<&str>,
    unknown_phone_state: &str,
) -> bool {
    phone_state == Some(unknown_phone_state) || charger_type == Some(USB_CHARGER)
}

/// The predicate bound to the two sensors it reads
#[derive(Debug, Clone)]
pub struct BedroomPredicate<'a> {
    pub phone_state_sensor: &'a EntityId,
    pub charger_type_sensor: &'a EntityId,
    pub unknown_phone_state: &'a str,
}

impl BedroomPredicate<'_> {
    /// Evaluate against the current sensor states; read errors count as false
    pub fn evaluate<T>(&self, hass: &dyn Hass<T>) -> bool {
        let phone = self.read(hass, self.phone_state_sensor);
        let charger = self.read(hass, self.charger_type_sensor);
        match (phone, charger) {
            (Some(phone), Some(charger)) => {
                bedroom_light_wanted(phone.as_deref(), charger.as_deref(), self.unknown_phone_state)
            }
            _ => false,
        }
    }

    /// Evaluate with one sensor overridden, e.g. with the value before a change
    pub fn evaluate_with<T>(&self, hass: &dyn Hass<T>, sensor: &EntityId, value: Option<&str>) -> bool {
        let mut phone = self.read(hass, self.phone_state_sensor);
        let mut charger = self.read(hass, self.charger_type_sensor);
        if sensor == self.phone_state_sensor {
            phone = Some(value.map(str::to_string));
        } else if sensor == self.charger_type_sensor {
            charger = Some(value.map(str::to_string));
        }
        match (phone, charger) {
            (Some(phone), Some(charger)) => {
                bedroom_light_wanted(phone.as_deref(), charger.as_deref(), self.unknown_phone_state)
            }
            _ => false,
        }
    }

    fn read<T>(&self, hass: &dyn Hass<T>, sensor: &EntityId) -> Option<Option<String>> {
        match hass.get_state(sensor) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(entity_id = %sensor, error = %e, "Sensor read failed, skipping bedroom light");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNKNOWN: &str = "okänd";

    #[test]
    fn test_predicate_table() {
        assert!(bedroom_light_wanted(Some(UNKNOWN), Some("ac"), UNKNOWN));
        assert!(bedroom_light_wanted(Some("known"), Some("usb"), UNKNOWN));
        assert!(!bedroom_light_wanted(Some("known"), Some("ac"), UNKNOWN));
    }

    #[test]
    fn test_missing_sensors_are_false() {
        assert!(!bedroom_light_wanted(None, None, UNKNOWN));
        assert!(bedroom_light_wanted(None, Some("usb"), UNKNOWN));
    }
}
