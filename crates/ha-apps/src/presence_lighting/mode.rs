use ha_core::EntityId;
use std::fmt;

use super::config::PresenceLightingConfig;

/// Lighting mode of the room, exactly one is current
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    #[default]
    Default,
    Focus,
    Christmas,
    Night,
}

impl Mode {
    /// Toggle-driven modes, highest priority first
    pub const BY_PRIORITY: [Mode; 3] = [Mode::Focus, Mode::Christmas, Mode::Night];

    /// The input_boolean that enables this mode, `None` for Default
    pub fn toggle(self, config: &PresenceLightingConfig) -> Option<&EntityId> {
        match self {
            Mode::Default => None,
            Mode::Focus => Some(&config.focus_toggle),
            Mode::Christmas => Some(&config.christmas_toggle),
            Mode::Night => Some(&config.night_toggle),
        }
    }

    /// Mode enabled by `toggle`, if it is one of the mode toggles
    pub fn for_toggle(toggle: &EntityId, config: &PresenceLightingConfig) -> Option<Mode> {
        Self::BY_PRIORITY
            .into_iter()
            .find(|mode| mode.toggle(config) == Some(toggle))
    }

    /// Lights this mode drives and turns off again on deactivation
    pub fn lights(self, config: &PresenceLightingConfig) -> Vec<&EntityId> {
        match self {
            Mode::Default => vec![&config.main_light],
            Mode::Focus => vec![&config.main_light, &config.focus_light],
            Mode::Night => config
                .night_lights
                .iter()
                .chain(std::iter::once(&config.bedroom_light))
                .collect(),
            Mode::Christmas => config
                .christmas
                .lights1
                .iter()
                .chain(config.christmas.lights2.iter())
                .collect(),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::Default => "default",
            Mode::Focus => "focus",
            Mode::Christmas => "christmas",
            Mode::Night => "night",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_lookup() {
        let config = PresenceLightingConfig::default();
        assert_eq!(
            Mode::for_toggle(&config.night_toggle, &config),
            Some(Mode::Night)
        );
        assert_eq!(Mode::for_toggle(&config.main_light, &config), None);
        assert_eq!(Mode::Default.toggle(&config), None);
    }

    #[test]
    fn test_focus_shares_main_light_with_default() {
        let config = PresenceLightingConfig::default();
        let focus = Mode::Focus.lights(&config);
        assert!(focus.contains(&&config.main_light));
        assert!(focus.contains(&&config.focus_light));
        assert_eq!(Mode::Christmas.lights(&config).len(), 2);
        assert_eq!(Mode::Night.lights(&config).len(), 2);
    }
}
