//! Services provided by the host itself
//!
//! There are no real devices behind the host, so `light` and `media_player`
//! services act on the state store: turning a light on writes `on` plus the
//! requested attributes. An entity whose state is `unavailable` stands for an
//! unreachable device and makes the call fail.

use ha_core::{light::rgb_to_xy, EntityId, RgbColor, ServiceCall, STATE_OFF, STATE_ON};
use ha_service_registry::{ServiceError, ServiceRegistry};
use ha_state_machine::SharedStateMachine;
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::info;

use crate::clock::VirtualClock;

/// Service data keys stored as light attributes
const LIGHT_ATTRIBUTES: [&str; 3] = ["brightness", "color_temp", "rgb_color"];

/// Register `light.turn_on`, `light.turn_off` and `media_player.turn_off`
pub fn register_builtin(registry: &ServiceRegistry, states: SharedStateMachine, clock: VirtualClock) {
    let (s, c) = (states.clone(), clock.clone());
    registry.register("light", "turn_on", move |call| {
        for entity_id in targets(call)? {
            let previous = reachable(&s, &entity_id)?;
            let attributes = light_attributes(previous, call);
            s.set(entity_id, STATE_ON, attributes, c.now());
        }
        Ok(None)
    });

    for domain in ["light", "media_player"] {
        let (s, c) = (states.clone(), clock.clone());
        registry.register(domain, "turn_off", move |call| {
            for entity_id in targets(call)? {
                reachable(&s, &entity_id)?;
                s.set(entity_id, STATE_OFF, HashMap::new(), c.now());
            }
            Ok(None)
        });
    }
}

/// Register a service with no effect besides being logged, like a shell command
pub fn register_command(registry: &ServiceRegistry, domain: &str, service: &str) {
    let name = format!("{domain}.{service}");
    registry.register(domain, service, move |call| {
        info!(service = %name, data = %call.service_data, "Running command");
        Ok(None)
    });
}

fn targets(call: &ServiceCall) -> Result<Vec<EntityId>, ServiceError> {
    let targets = call.entity_ids();
    if targets.is_empty() {
        return Err(ServiceError::InvalidData(format!(
            "{} needs an entity_id",
            call.service_id()
        )));
    }
    Ok(targets)
}

/// Current attributes of the entity, failing if its device is unreachable
fn reachable(
    states: &SharedStateMachine,
    entity_id: &EntityId,
) -> Result<HashMap<String, Value>, ServiceError> {
    match states.get(entity_id) {
        Some(state) if state.is_unavailable() => Err(ServiceError::CallFailed(format!(
            "{entity_id}: device unreachable"
        ))),
        Some(state) => Ok(state.attributes),
        None => Ok(HashMap::new()),
    }
}

/// Merge the requested light settings into the previous attributes
///
/// A color and a color temperature exclude each other, so setting one
/// drops the other. Colors also get their `xy_color`.
fn light_attributes(mut attributes: HashMap<String, Value>, call: &ServiceCall) -> HashMap<String, Value> {
    for key in LIGHT_ATTRIBUTES {
        if let Some(value) = call.service_data.get(key) {
            attributes.insert(key.to_string(), value.clone());
        }
    }

    if call.service_data.get("color_temp").is_some() {
        attributes.remove("rgb_color");
        attributes.remove("xy_color");
    }
    if let Some(rgb) = call.get::<RgbColor>("rgb_color") {
        attributes.remove("color_temp");
        match rgb_to_xy(rgb.red, rgb.green, rgb.blue) {
            Some((x, y)) => attributes.insert("xy_color".to_string(), json!([x, y])),
            None => attributes.remove("xy_color"),
        };
    }
    attributes
}
