use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::AbilityError;
use crate::robot_data::RobotData;

/// A pluggable unit of robot behaviour.
///
/// Lifecycle: `initialize` once, then `on_start` → `on_main` → `on_stop` on the
/// ability's own thread. `on_main` is expected to loop while
/// [`AbilityContext::is_running`] holds and return once it is cleared.
/// `on_stop` runs even when `on_start` or `on_main` fails.
pub trait Ability: Send {
    /// Validate `config` and prepare internal state. An error is fatal for this
    /// ability: it is not registered with the manager.
    fn initialize(&mut self, ctx: &AbilityContext, config: &AbilityConfig)
        -> Result<(), AbilityError>;

    fn on_start(&mut self, _ctx: &AbilityContext) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_main(&mut self, _ctx: &AbilityContext) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_stop(&mut self, _ctx: &AbilityContext) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbilityState {
    Uninitialized,
    Initialized,
    Running,
    Stopped,
}

impl fmt::Display for AbilityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AbilityState::Uninitialized => "uninitialized",
            AbilityState::Initialized => "initialized",
            AbilityState::Running => "running",
            AbilityState::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// What an ability instance sees of the outside world.
#[derive(Clone)]
pub struct AbilityContext {
    name: String,
    type_key: String,
    robot: Arc<RobotData>,
    running: Arc<AtomicBool>,
}

impl AbilityContext {
    pub(crate) fn new(name: &str, type_key: &str, robot: Arc<RobotData>) -> Self {
        Self {
            name: name.to_string(),
            type_key: type_key.to_string(),
            robot,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_key(&self) -> &str {
        &self.type_key
    }

    pub fn robot(&self) -> &Arc<RobotData> {
        &self.robot
    }

    /// False once a stop was requested. Abilities poll this from `on_main`.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub(crate) fn running_flag(&self) -> &Arc<AtomicBool> {
        &self.running
    }
}

impl fmt::Debug for AbilityContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbilityContext")
            .field("name", &self.name)
            .field("type_key", &self.type_key)
            .field("running", &self.is_running())
            .finish()
    }
}

/// Read-only option mapping handed to [`Ability::initialize`].
///
/// Abilities deserialize it into their own typed, defaulted struct with
/// [`AbilityConfig::parse`] rather than probing individual keys.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct AbilityConfig(serde_yaml::Mapping);

impl AbilityConfig {
    pub fn new(mapping: serde_yaml::Mapping) -> Self {
        Self(mapping)
    }

    pub fn from_yaml_str(s: &str) -> Result<Self, serde_yaml::Error> {
        let value: Option<serde_yaml::Mapping> = serde_yaml::from_str(s)?;
        Ok(Self(value.unwrap_or_default()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&serde_yaml::Value> {
        self.0.get(key)
    }

    /// Deserialize into `T`. `name` is the ability name used in the error.
    pub fn parse<T: DeserializeOwned>(&self, name: &str) -> Result<T, AbilityError> {
        serde_yaml::from_value(serde_yaml::Value::Mapping(self.0.clone())).map_err(|e| {
            AbilityError::InvalidConfig {
                name: name.to_string(),
                reason: e.to_string(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Sample {
        #[serde(default = "default_rate")]
        update_rate: f64,
        #[serde(default)]
        label: Option<String>,
    }

    fn default_rate() -> f64 {
        1.0
    }

    #[test]
    fn test_parse_applies_defaults() {
        let cfg = AbilityConfig::default();
        let sample: Sample = cfg.parse("demo").unwrap();
        assert_eq!(
            sample,
            Sample {
                update_rate: 1.0,
                label: None
            }
        );
    }

    #[test]
    fn test_parse_reads_values() {
        let cfg = AbilityConfig::from_yaml_str("update_rate: 5.0\nlabel: hi\n").unwrap();
        let sample: Sample = cfg.parse("demo").unwrap();
        assert_eq!(sample.update_rate, 5.0);
        assert_eq!(sample.label.as_deref(), Some("hi"));
        assert!(cfg.get("update_rate").is_some());
    }

    #[test]
    fn test_parse_type_mismatch_is_invalid_config() {
        let cfg = AbilityConfig::from_yaml_str("update_rate: fast\n").unwrap();
        let err = cfg.parse::<Sample>("demo").unwrap_err();
        assert!(matches!(err, AbilityError::InvalidConfig { ref name, .. } if name == "demo"));
    }

    #[test]
    fn test_empty_document_is_empty_config() {
        assert!(AbilityConfig::from_yaml_str("").unwrap().is_empty());
    }
}
