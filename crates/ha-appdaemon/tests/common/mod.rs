//! Shared helpers for the runtime integration tests

#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use ha_appdaemon::Runtime;
use ha_core::EntityId;

pub const PRESENCE: &str = "binary_sensor.narvarodetektor_narvaro";
pub const PRESENCE_MODE: &str = "input_boolean.presence_mode";
pub const FOCUS: &str = "input_boolean.desk_focus_lights";
pub const CHRISTMAS: &str = "input_boolean.christmas_mode";
pub const NIGHT: &str = "input_boolean.night_mode";

pub fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 12, 24)
        .unwrap()
        .and_hms_opt(h, m, s)
        .unwrap()
}

pub fn id(s: &str) -> EntityId {
    s.parse().unwrap()
}

/// Runtime at 21:00:00 with presence off, the presence gate on and all toggles off
pub fn runtime() -> Runtime {
    let mut runtime = Runtime::new(at(21, 0, 0));
    runtime.set_state(id(PRESENCE_MODE), "on");
    runtime.set_state(id(PRESENCE), "off");
    for toggle in [FOCUS, CHRISTMAS, NIGHT] {
        runtime.set_state(id(toggle), "off");
    }
    runtime.set_state(id("sensor.hampus_zfold_phone_state"), "hemma");
    runtime.set_state(id("sensor.hampus_zfold_charger_type"), "ac");
    runtime
}

/// `(service, target)` of every logged call made at `time`
pub fn calls_at(runtime: &Runtime, time: NaiveDateTime) -> Vec<(String, String)> {
    runtime
        .service_log()
        .iter()
        .filter(|r| r.time == time)
        .map(|r| {
            let target = r
                .call
                .entity_ids()
                .first()
                .map(ToString::to_string)
                .unwrap_or_default();
            (r.call.service_id(), target)
        })
        .collect()
}

pub fn pair(service: &str, target: &str) -> (String, String) {
    (service.to_string(), target.to_string())
}
