//! Light settings passed to `light.turn_on` and color helpers

use serde::{Deserialize, Serialize};

/// An sRGB color, serialized as `[r, g, b]` like the `rgb_color` service field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[u8; 3]", into = "[u8; 3]")]
pub struct RgbColor {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl RgbColor {
    pub const RED: Self = Self::new(255, 0, 0);
    pub const GREEN: Self = Self::new(0, 255, 0);
    pub const BLUE: Self = Self::new(0, 0, 255);

    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// CIE 1931 xy chromaticity for this color, see [`rgb_to_xy`]
    pub fn to_xy(self) -> Option<(f64, f64)> {
        rgb_to_xy(self.red, self.green, self.blue)
    }
}

impl From<[u8; 3]> for RgbColor {
    fn from([red, green, blue]: [u8; 3]) -> Self {
        Self { red, green, blue }
    }
}

impl From<RgbColor> for [u8; 3] {
    fn from(c: RgbColor) -> Self {
        [c.red, c.green, c.blue]
    }
}

/// Optional fields of a `light.turn_on` call
///
/// Unset fields are left out of the service data so the device keeps its
/// current value for them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LightSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brightness: Option<u8>,

    /// Color temperature in mireds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_temp: Option<u16>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rgb_color: Option<RgbColor>,

    /// Transition time in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition: Option<f32>,
}

impl LightSettings {
    /// White light at the given brightness and color temperature
    pub fn white(brightness: u8, color_temp: u16) -> Self {
        Self {
            brightness: Some(brightness),
            color_temp: Some(color_temp),
            ..Self::default()
        }
    }

    /// Colored light at the given brightness
    pub fn color(rgb_color: RgbColor, brightness: u8) -> Self {
        Self {
            brightness: Some(brightness),
            rgb_color: Some(rgb_color),
            ..Self::default()
        }
    }

    pub fn with_transition(mut self, seconds: f32) -> Self {
        self.transition = Some(seconds);
        self
    }

    /// Service data for `light.turn_on` targeting `entity_id`
    pub fn service_data(&self, entity_id: &crate::EntityId) -> serde_json::Value {
        let mut data = serde_json::to_value(self)
            .ok()
            .and_then(|v| match v {
                serde_json::Value::Object(map) => Some(map),
                _ => None,
            })
            .unwrap_or_default();
        data.insert(
            "entity_id".to_string(),
            serde_json::Value::String(entity_id.to_string()),
        );
        serde_json::Value::Object(data)
    }
}

/// Convert an RGB color to CIE 1931 xy chromaticity
///
/// Applies the sRGB gamma expansion, then the wide-gamut RGB→XYZ matrix used
/// by Hue-style bulbs. Returns `None` for black, which has no chromaticity.
pub fn rgb_to_xy(red: u8, green: u8, blue: u8) -> Option<(f64, f64)> {
    fn expand(channel: u8) -> f64 {
        let c = f64::from(channel) / 255.0;
        if c > 0.04045 {
            ((c + 0.055) / 1.055).powf(2.4)
        } else {
            c / 12.92
        }
    }

    let (r, g, b) = (expand(red), expand(green), expand(blue));

    let x = r * 0.649926 + g * 0.103455 + b * 0.197109;
    let y = r * 0.234327 + g * 0.743075 + b * 0.022598;
    let z = g * 0.053077 + b * 1.035763;

    let sum = x + y + z;
    if sum <= f64::EPSILON {
        return None;
    }
    Some((x / sum, y / sum))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_service_data_skips_unset_fields() {
        let id: crate::EntityId = "light.taklampa_lampa_3".parse().unwrap();
        let data = LightSettings::white(255, 250).service_data(&id);
        assert_eq!(
            data,
            json!({"entity_id": "light.taklampa_lampa_3", "brightness": 255, "color_temp": 250})
        );
    }

    #[test]
    fn test_rgb_color_serializes_as_triple() {
        let id: crate::EntityId = "light.christmas1".parse().unwrap();
        let data = LightSettings::color(RgbColor::RED, 150)
            .with_transition(1.0)
            .service_data(&id);
        assert_eq!(data["rgb_color"], json!([255, 0, 0]));
        assert_eq!(data["transition"], json!(1.0));

        let parsed: LightSettings =
            serde_json::from_value(json!({"rgb_color": [0, 0, 255], "brightness": 102})).unwrap();
        assert_eq!(parsed, LightSettings::color(RgbColor::BLUE, 102));
    }

    #[test]
    fn test_rgb_to_xy_primaries() {
        let (x, y) = RgbColor::RED.to_xy().unwrap();
        assert!((x - 0.735).abs() < 1e-3, "x = {x}");
        assert!((y - 0.265).abs() < 1e-3, "y = {y}");

        let (x, y) = RgbColor::GREEN.to_xy().unwrap();
        assert!((x - 0.115).abs() < 1e-3, "x = {x}");
        assert!((y - 0.826).abs() < 1e-3, "y = {y}");
    }

    #[test]
    fn test_rgb_to_xy_black_has_no_chromaticity() {
        assert_eq!(rgb_to_xy(0, 0, 0), None);
    }
}
