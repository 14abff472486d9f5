//! Time-of-day light profiles for the main light

use chrono::{NaiveTime, Timelike};
use ha_core::LightSettings;

/// Brightness and color temperature for one band of the day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightProfile {
    pub brightness: u8,
    /// Color temperature in mireds
    pub color_temp: u16,
}

impl LightProfile {
    /// Profile for the band containing `time`
    pub fn at(time: NaiveTime) -> Self {
        TimeBand::at(time).profile()
    }

    pub fn settings(&self) -> LightSettings {
        LightSettings::white(self.brightness, self.color_temp)
    }
}

/// Bands of the day, each `[start, end)` in minutes since midnight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeBand {
    /// 05:00 to 08:00
    EarlyMorning,
    /// 08:00 to 12:00
    Morning,
    /// 12:00 to 20:00
    Afternoon,
    /// 20:00 to 05:00, across midnight
    Night,
}

const EARLY_MORNING_START: u32 = 5 * 60;
const MORNING_START: u32 = 8 * 60;
const AFTERNOON_START: u32 = 12 * 60;
const EVENING_START: u32 = 20 * 60;

impl TimeBand {
    pub fn at(time: NaiveTime) -> Self {
        let minutes = time.hour() * 60 + time.minute();
        match minutes {
            m if (EARLY_MORNING_START..MORNING_START).contains(&m) => Self::EarlyMorning,
            m if (MORNING_START..AFTERNOON_START).contains(&m) => Self::Morning,
            m if (AFTERNOON_START..EVENING_START).contains(&m) => Self::Afternoon,
            _ => Self::Night,
        }
    }

    pub fn profile(self) -> LightProfile {
        let (brightness, color_temp) = match self {
            Self::EarlyMorning => (75, 250),
            Self::Morning => (125, 200),
            Self::Afternoon => (255, 153),
            Self::Night => (50, 333),
        };
        LightProfile {
            brightness,
            color_temp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_band_boundaries_are_exclusive_at_the_end() {
        assert_eq!(TimeBand::at(hm(7, 59)), TimeBand::EarlyMorning);
        assert_eq!(TimeBand::at(hm(8, 0)), TimeBand::Morning);
        assert_eq!(TimeBand::at(hm(11, 59)), TimeBand::Morning);
        assert_eq!(TimeBand::at(hm(12, 0)), TimeBand::Afternoon);
        assert_eq!(TimeBand::at(hm(19, 59)), TimeBand::Afternoon);
        assert_eq!(TimeBand::at(hm(20, 0)), TimeBand::Night);
        assert_eq!(TimeBand::at(hm(4, 59)), TimeBand::Night);
        assert_eq!(TimeBand::at(hm(5, 0)), TimeBand::EarlyMorning);
    }

    #[test]
    fn test_night_wraps_midnight() {
        assert_eq!(TimeBand::at(hm(23, 59)), TimeBand::Night);
        assert_eq!(TimeBand::at(hm(0, 0)), TimeBand::Night);
    }

    #[test]
    fn test_seconds_do_not_move_a_boundary() {
        let almost_eight = NaiveTime::from_hms_opt(7, 59, 59).unwrap();
        assert_eq!(TimeBand::at(almost_eight), TimeBand::EarlyMorning);
    }

    #[test]
    fn test_profiles() {
        assert_eq!(
            LightProfile::at(hm(6, 30)),
            LightProfile {
                brightness: 75,
                color_temp: 250
            }
        );
        assert_eq!(LightProfile::at(hm(9, 0)).brightness, 125);
        assert_eq!(LightProfile::at(hm(15, 0)).color_temp, 153);
        assert_eq!(
            LightProfile::at(hm(22, 0)).settings(),
            LightSettings::white(50, 333)
        );
    }
}
