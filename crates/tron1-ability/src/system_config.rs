//! YAML system config for the ability host.
//!
//! ```yaml
//! robot_ip: 127.0.0.1        # ROBOT_IP env var takes precedence
//! robot_type: PointFoot      # PointFoot | Wheellegged
//! remote_cli_port: 8888
//! libraries:
//!   - library: demo
//!     abilities:
//!       - name: dummy
//!         type: dummy/ability1
//!         autostart: true
//!         config:
//!           update_rate: 1.0
//! ```

use serde::Deserialize;
use std::path::Path;

use tron1_core::config::env_keys::launch;
use tron1_core::config::env_optional;
use tron1_core::robot::{RobotModel, DEFAULT_ROBOT_IP};

use crate::ability::AbilityConfig;
use crate::error::AbilityError;

pub const DEFAULT_REMOTE_CLI_PORT: u16 = 8888;

#[derive(Debug, Clone, Deserialize)]
pub struct SystemConfig {
    #[serde(default = "default_robot_ip")]
    pub robot_ip: String,
    pub robot_type: RobotModel,
    #[serde(default = "default_remote_cli_port")]
    pub remote_cli_port: u16,
    #[serde(default)]
    pub libraries: Vec<LibraryConfig>,
}

/// A named group of abilities. Abilities are compiled in, so `library` is only a label.
#[derive(Debug, Clone, Deserialize)]
pub struct LibraryConfig {
    #[serde(default)]
    pub library: String,
    #[serde(default)]
    pub abilities: Vec<AbilityEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AbilityEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub type_key: String,
    #[serde(default)]
    pub autostart: bool,
    #[serde(default)]
    pub config: AbilityConfig,
}

fn default_robot_ip() -> String {
    DEFAULT_ROBOT_IP.to_string()
}

fn default_remote_cli_port() -> u16 {
    DEFAULT_REMOTE_CLI_PORT
}

impl SystemConfig {
    /// Read `path`; `ROBOT_IP` from the environment overrides `robot_ip`.
    pub fn load(path: &Path) -> Result<Self, AbilityError> {
        let content = std::fs::read_to_string(path).map_err(|source| AbilityError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&content, env_optional(launch::ROBOT_IP, &[])).map_err(|source| {
            AbilityError::ConfigParse {
                path: path.to_path_buf(),
                source,
            }
        })
    }

    pub fn from_yaml_str(
        content: &str,
        robot_ip_override: Option<String>,
    ) -> Result<Self, serde_yaml::Error> {
        let mut config: SystemConfig = serde_yaml::from_str(content)?;
        if let Some(ip) = robot_ip_override {
            config.robot_ip = ip;
        }
        Ok(config)
    }

    pub fn ability_count(&self) -> usize {
        self.libraries.iter().map(|l| l.abilities.len()).sum()
    }
}
