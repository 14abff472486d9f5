//! Scripted scenarios replayed against the runtime
//!
//! ```yaml
//! start: 2024-12-24T21:00:00
//! duration: 60
//! initial_states:
//!   input_boolean.presence_mode: "on"
//!   input_boolean.christmas_mode: "on"
//! steps:
//!   - at: 2
//!     set:
//!       binary_sensor.narvarodetektor_narvaro: "on"
//! ```
//!
//! `at` and `duration` are seconds from `start`. State values may be any
//! YAML scalar; booleans become `on`/`off`.

use chrono::{Duration, NaiveDateTime};
use ha_core::{EntityId, STATE_OFF, STATE_ON};
use serde::Deserialize;
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

use crate::error::ScenarioError;
use crate::runtime::Runtime;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    pub start: NaiveDateTime,
    /// Seconds to keep running after `start`; defaults to the last step
    #[serde(default)]
    pub duration: Option<u64>,
    #[serde(default)]
    pub initial_states: BTreeMap<EntityId, Value>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Step {
    /// Seconds after the scenario start
    pub at: u64,
    pub set: BTreeMap<EntityId, Value>,
}

impl Scenario {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ScenarioError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let scenario: Self =
            serde_yaml::from_str(&content).map_err(|source| ScenarioError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        scenario.validate()?;
        debug!(path = %path.display(), steps = scenario.steps.len(), "Loaded scenario");
        Ok(scenario)
    }

    pub fn parse(content: &str) -> Result<Self, ScenarioError> {
        let scenario: Self = serde_yaml::from_str(content).map_err(|source| ScenarioError::Parse {
            path: "<inline>".into(),
            source,
        })?;
        scenario.validate()?;
        Ok(scenario)
    }

    fn validate(&self) -> Result<(), ScenarioError> {
        for pair in self.steps.windows(2) {
            if pair[1].at < pair[0].at {
                return Err(ScenarioError::StepsOutOfOrder {
                    at: pair[1].at,
                    previous: pair[0].at,
                });
            }
        }
        for step in &self.steps {
            self.offset(step.at)?;
        }
        self.end()?;
        for (entity_id, value) in self.all_values() {
            state_string(entity_id, value)?;
        }
        Ok(())
    }

    /// Time `seconds` after the start
    fn offset(&self, seconds: u64) -> Result<NaiveDateTime, ScenarioError> {
        i64::try_from(seconds)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|offset| self.start.checked_add_signed(offset))
            .ok_or(ScenarioError::OutOfRange { seconds })
    }

    fn all_values(&self) -> impl Iterator<Item = (&EntityId, &Value)> {
        self.initial_states
            .iter()
            .chain(self.steps.iter().flat_map(|step| step.set.iter()))
    }

    /// Time the scenario ends
    pub fn end(&self) -> Result<NaiveDateTime, ScenarioError> {
        let last_step = self.steps.last().map_or(0, |s| s.at);
        self.offset(self.duration.unwrap_or(last_step).max(last_step))
    }

    /// Write the initial states; call before the apps are initialized
    pub fn seed(&self, runtime: &mut Runtime) -> Result<(), ScenarioError> {
        for (entity_id, value) in &self.initial_states {
            runtime.set_state(entity_id.clone(), &state_string(entity_id, value)?);
        }
        Ok(())
    }

    /// Replay all steps in virtual time, as fast as possible
    pub fn play(&self, runtime: &mut Runtime) -> Result<(), ScenarioError> {
        for step in &self.steps {
            runtime.advance_to(self.offset(step.at)?);
            self.apply(step, runtime)?;
        }
        let end = self.end()?;
        runtime.advance_to(end);
        info!(end = %end, "Scenario finished");
        Ok(())
    }

    /// Replay all steps paced by the wall clock
    pub async fn play_realtime(&self, runtime: &mut Runtime) -> Result<(), ScenarioError> {
        for step in &self.steps {
            wait_until(runtime, self.offset(step.at)?).await;
            self.apply(step, runtime)?;
        }
        let end = self.end()?;
        wait_until(runtime, end).await;
        info!(end = %end, "Scenario finished");
        Ok(())
    }

    fn apply(&self, step: &Step, runtime: &mut Runtime) -> Result<(), ScenarioError> {
        info!(at = step.at, changes = step.set.len(), "Applying scenario step");
        for (entity_id, value) in &step.set {
            runtime.set_state(entity_id.clone(), &state_string(entity_id, value)?);
        }
        Ok(())
    }
}

/// Sleep through pending timers up to `target`, firing each when it is due
async fn wait_until(runtime: &mut Runtime, target: NaiveDateTime) {
    while runtime.now() < target {
        let next = runtime.next_due().map_or(target, |due| due.min(target));
        let next = next.max(runtime.now());
        if let Ok(wait) = (next - runtime.now()).to_std() {
            tokio::time::sleep(wait).await;
        }
        runtime.advance_to(next);
        if next == target {
            break;
        }
    }
}

fn state_string(entity_id: &EntityId, value: &Value) -> Result<String, ScenarioError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Bool(true) => Ok(STATE_ON.to_string()),
        Value::Bool(false) => Ok(STATE_OFF.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(ScenarioError::InvalidState {
            entity_id: entity_id.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO: &str = r#"
start: 2024-12-24T21:00:00
duration: 30
initial_states:
  input_boolean.christmas_mode: true
  sensor.pc_cpuload: 12.5
steps:
  - at: 2
    set:
      binary_sensor.narvarodetektor_narvaro: "on"
  - at: 20
    set:
      binary_sensor.narvarodetektor_narvaro: "off"
"#;

    #[test]
    fn test_parse_scenario() {
        let scenario = Scenario::parse(SCENARIO).unwrap();
        assert_eq!(scenario.steps.len(), 2);
        assert_eq!(scenario.end().unwrap(), scenario.start + Duration::seconds(30));

        let christmas: EntityId = "input_boolean.christmas_mode".parse().unwrap();
        let value = &scenario.initial_states[&christmas];
        assert_eq!(state_string(&christmas, value).unwrap(), "on");
        let cpu: EntityId = "sensor.pc_cpuload".parse().unwrap();
        assert_eq!(
            state_string(&cpu, &scenario.initial_states[&cpu]).unwrap(),
            "12.5"
        );
    }

    #[test]
    fn test_end_defaults_to_last_step() {
        let scenario = Scenario::parse(
            "start: 2024-12-24T21:00:00\nsteps:\n  - at: 45\n    set: {input_boolean.night_mode: \"on\"}\n",
        )
        .unwrap();
        assert_eq!(scenario.end().unwrap(), scenario.start + Duration::seconds(45));
    }

    #[test]
    fn test_rejects_out_of_order_steps() {
        let result = Scenario::parse(
            r#"
start: 2024-12-24T21:00:00
steps:
  - at: 10
    set: {input_boolean.night_mode: "on"}
  - at: 5
    set: {input_boolean.night_mode: "off"}
"#,
        );
        assert!(matches!(
            result,
            Err(ScenarioError::StepsOutOfOrder { at: 5, previous: 10 })
        ));
    }

    #[test]
    fn test_rejects_times_out_of_range() {
        let result = Scenario::parse("start: 2024-12-24T21:00:00\nduration: 100000000000000000\n");
        assert!(matches!(
            result,
            Err(ScenarioError::OutOfRange { seconds: 100000000000000000 })
        ));

        let result = Scenario::parse(&format!(
            "start: 2024-12-24T21:00:00\nsteps:\n  - at: {}\n    set: {{light.ljus: \"on\"}}\n",
            u64::MAX
        ));
        assert!(matches!(result, Err(ScenarioError::OutOfRange { .. })));
    }

    #[test]
    fn test_rejects_non_scalar_state() {
        let result = Scenario::parse(
            "start: 2024-12-24T21:00:00\ninitial_states:\n  light.ljus: [1, 2]\n",
        );
        assert!(matches!(result, Err(ScenarioError::InvalidState { .. })));
    }

    #[test]
    fn test_rejects_bad_entity_id() {
        let result = Scenario::parse("start: 2024-12-24T21:00:00\ninitial_states:\n  Ljus: on\n");
        assert!(matches!(result, Err(ScenarioError::Parse { .. })));
    }
}
