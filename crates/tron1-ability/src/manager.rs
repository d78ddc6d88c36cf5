//! AbilityManager: loads abilities by type key, starts/stops them by name.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::{Arc, Mutex, MutexGuard};

use tron1_core::robot::DiagnosticLevel;

use crate::ability::{AbilityConfig, AbilityContext, AbilityState};
use crate::error::AbilityError;
use crate::handle::AbilityHandle;
use crate::registry::AbilityRegistry;
use crate::robot_data::RobotData;
use crate::system_config::SystemConfig;

/// Snapshot of one loaded ability, as shown by `list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbilityInfo {
    pub name: String,
    pub type_key: String,
    pub state: AbilityState,
}

pub struct AbilityManager {
    registry: AbilityRegistry,
    robot: Arc<RobotData>,
    abilities: Mutex<BTreeMap<String, Arc<AbilityHandle>>>,
}

impl AbilityManager {
    pub fn new(registry: AbilityRegistry, robot: Arc<RobotData>) -> Self {
        Self {
            registry,
            robot,
            abilities: Mutex::new(BTreeMap::new()),
        }
    }

    /// Load every ability listed in `config` and start the ones flagged `autostart`.
    /// Individual failures are logged and skipped; returns how many loaded.
    pub fn load_from_config(&self, config: &SystemConfig) -> usize {
        let mut loaded = 0;
        for library in &config.libraries {
            for entry in &library.abilities {
                match self.load_ability(&entry.name, &entry.type_key, &entry.config) {
                    Ok(()) => loaded += 1,
                    Err(e) => {
                        tracing::error!(
                            library = %library.library,
                            "Failed to load ability: {} ({})",
                            entry.name,
                            e
                        );
                        continue;
                    }
                }
                if entry.autostart {
                    if let Err(e) = self.start_ability(&entry.name) {
                        tracing::error!("Failed to autostart ability {}: {}", entry.name, e);
                    }
                }
            }
        }
        loaded
    }

    /// Create `type_key` from the registry, initialize it with `config`, and
    /// register it under `name`.
    pub fn load_ability(
        &self,
        name: &str,
        type_key: &str,
        config: &AbilityConfig,
    ) -> Result<(), AbilityError> {
        let result = self.try_load(name, type_key, config);
        match &result {
            Ok(()) => {
                let msg = format!("Successfully loaded ability: {} ({})", name, type_key);
                tracing::info!("{}", msg);
                self.publish(name, "load", 0, DiagnosticLevel::Ok, &msg);
            }
            Err(e) => {
                self.publish(name, "load", -1, DiagnosticLevel::Error, &e.to_string());
            }
        }
        result
    }

    fn try_load(
        &self,
        name: &str,
        type_key: &str,
        config: &AbilityConfig,
    ) -> Result<(), AbilityError> {
        if lock(&self.abilities).contains_key(name) {
            return Err(AbilityError::DuplicateName(name.to_string()));
        }
        let ability = self
            .registry
            .create(type_key)
            .ok_or_else(|| AbilityError::UnknownType(type_key.to_string()))?;
        let ctx = AbilityContext::new(name, type_key, Arc::clone(&self.robot));
        let handle = AbilityHandle::initialize(ability, ctx, config)?;

        let mut abilities = lock(&self.abilities);
        if abilities.contains_key(name) {
            return Err(AbilityError::DuplicateName(name.to_string()));
        }
        abilities.insert(name.to_string(), Arc::new(handle));
        Ok(())
    }

    /// Returns `Ok(false)` if the ability was already running.
    pub fn start_ability(&self, name: &str) -> Result<bool, AbilityError> {
        let handle = self.find(name).inspect_err(|e| {
            self.publish(name, "start", -1, DiagnosticLevel::Error, &e.to_string());
        })?;
        handle.start()
    }

    /// Returns `Ok(false)` if the ability was not running.
    pub fn stop_ability(&self, name: &str) -> Result<bool, AbilityError> {
        let handle = self.find(name).inspect_err(|e| {
            self.publish(name, "stop", -1, DiagnosticLevel::Error, &e.to_string());
        })?;
        Ok(handle.stop())
    }

    pub fn is_ability_running(&self, name: &str) -> bool {
        self.find(name).map(|h| h.is_running()).unwrap_or(false)
    }

    /// Loaded abilities sorted by name.
    pub fn abilities(&self) -> Vec<AbilityInfo> {
        lock(&self.abilities)
            .values()
            .map(|h| AbilityInfo {
                name: h.name().to_string(),
                type_key: h.type_key().to_string(),
                state: h.state(),
            })
            .collect()
    }

    /// `\n  * <name> [state: running|stopped, type: <type>]` per ability.
    pub fn list_abilities(&self) -> String {
        let mut out = String::new();
        for info in self.abilities() {
            let state = if info.state == AbilityState::Running {
                "running"
            } else {
                "stopped"
            };
            let _ = write!(
                out,
                "\n  * {} [state: {}, type: {}]",
                info.name, state, info.type_key
            );
        }
        out
    }

    pub fn stop_all(&self) {
        let handles: Vec<_> = lock(&self.abilities).values().cloned().collect();
        for handle in handles {
            handle.stop();
        }
    }

    pub fn robot(&self) -> &Arc<RobotData> {
        &self.robot
    }

    fn find(&self, name: &str) -> Result<Arc<AbilityHandle>, AbilityError> {
        lock(&self.abilities)
            .get(name)
            .cloned()
            .ok_or_else(|| AbilityError::NotFound(name.to_string()))
    }

    fn publish(&self, name: &str, code_name: &str, code: i32, level: DiagnosticLevel, msg: &str) {
        self.robot.robot().publish_diagnostic(
            &format!("ability/{}", name),
            code_name,
            code,
            level,
            msg,
        );
    }
}

impl Drop for AbilityManager {
    fn drop(&mut self) {
        self.stop_all();
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::DUMMY_ABILITY;
    use tron1_core::robot::{RobotApi, SimRobot};

    fn manager() -> (Arc<SimRobot>, AbilityManager) {
        let sim = Arc::new(SimRobot::new(6));
        let api: Arc<dyn RobotApi> = sim.clone();
        let robot = Arc::new(RobotData::connect(api, "127.0.0.1").unwrap());
        (sim, AbilityManager::new(AbilityRegistry::with_builtins(), robot))
    }

    fn fast_config() -> AbilityConfig {
        AbilityConfig::from_yaml_str("update_rate: 50.0").unwrap()
    }

    #[test]
    fn test_load_start_stop() {
        let (sim, mgr) = manager();
        mgr.load_ability("dummy", DUMMY_ABILITY, &fast_config())
            .unwrap();
        assert!(!mgr.is_ability_running("dummy"));

        assert!(mgr.start_ability("dummy").unwrap());
        assert!(mgr.is_ability_running("dummy"));
        assert_eq!(
            mgr.list_abilities(),
            "\n  * dummy [state: running, type: dummy/ability1]"
        );

        assert!(mgr.stop_ability("dummy").unwrap());
        assert!(!mgr.is_ability_running("dummy"));
        assert!(matches!(
            mgr.start_ability("dummy"),
            Err(AbilityError::Terminated(_))
        ));

        let load = &sim.diagnostics()[0];
        assert_eq!((load.code_name.as_str(), load.code), ("load", 0));
    }

    #[test]
    fn test_unknown_type_and_duplicate_name() {
        let (sim, mgr) = manager();
        let err = mgr
            .load_ability("x", "nope/missing", &AbilityConfig::default())
            .unwrap_err();
        assert!(matches!(err, AbilityError::UnknownType(ref t) if t == "nope/missing"));
        let diag = sim.diagnostics().pop().unwrap();
        assert_eq!((diag.code, diag.level), (-1, DiagnosticLevel::Error));

        mgr.load_ability("dummy", DUMMY_ABILITY, &fast_config())
            .unwrap();
        let err = mgr
            .load_ability("dummy", DUMMY_ABILITY, &fast_config())
            .unwrap_err();
        assert!(matches!(err, AbilityError::DuplicateName(_)));
        assert_eq!(mgr.abilities().len(), 1);
    }

    #[test]
    fn test_invalid_config_is_not_registered() {
        let (_sim, mgr) = manager();
        let bad = AbilityConfig::from_yaml_str("update_rate: -2.0").unwrap();
        let err = mgr.load_ability("dummy", DUMMY_ABILITY, &bad).unwrap_err();
        assert!(matches!(err, AbilityError::InvalidConfig { .. }));
        assert!(mgr.abilities().is_empty());
    }

    #[test]
    fn test_missing_ability_errors() {
        let (_sim, mgr) = manager();
        assert!(matches!(
            mgr.start_ability("ghost"),
            Err(AbilityError::NotFound(_))
        ));
        assert!(matches!(
            mgr.stop_ability("ghost"),
            Err(AbilityError::NotFound(_))
        ));
        assert!(!mgr.is_ability_running("ghost"));
    }

    #[test]
    fn test_load_from_config_autostarts() {
        let (_sim, mgr) = manager();
        let config = SystemConfig::from_yaml_str(
            r#"
robot_type: PointFoot
libraries:
  - library: demo
    abilities:
      - name: walker
        type: dummy/ability1
        autostart: true
        config:
          update_rate: 50.0
      - name: idle
        type: dummy/ability1
        config:
          update_rate: 50.0
      - name: broken
        type: does/not-exist
"#,
            None,
        )
        .unwrap();
        assert_eq!(mgr.load_from_config(&config), 2);
        assert!(mgr.is_ability_running("walker"));
        assert!(!mgr.is_ability_running("idle"));
        mgr.stop_all();
        assert!(!mgr.is_ability_running("walker"));
    }
}
