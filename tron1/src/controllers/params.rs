//! Controller parameters: `<model_dir>/<rl_type>/<robot_type>/params.yaml`.
//!
//! Every field is optional in the file; missing fields keep the family default.
//!
//! ```yaml
//! control_rate: 500.0        # Hz
//! stand_duration: 2.0        # seconds
//! stiffness: [45, 45, 45, 45, 45, 45]
//! damping: [3, 3, 3, 3, 3, 3]
//! default_joint_angle: [0.0, 0.5, -1.0, 0.0, 0.5, -1.0]
//! wheel_damping: 0.8         # wheel-foot only
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tron1_core::{Rate, RobotFamily};

use super::{pointfoot, solefoot, wheelfoot, ControllerParams};

pub const PARAMS_FILE: &str = "params.yaml";

#[derive(Debug, Error)]
pub enum RobotConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid controller parameters in {}: {reason}", path.display())]
    Invalid { path: PathBuf, reason: String },
}

/// Resolved gains and stance for one robot.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerConfig {
    pub control_rate: f64,
    pub stand_duration: f64,
    pub stiffness: Vec<f32>,
    pub damping: Vec<f32>,
    pub default_joint_angle: Vec<f32>,
    /// Velocity gain on wheel joints once standing.
    pub wheel_damping: f32,
}

/// Unknown keys (policy paths, observation scales) are ignored.
#[derive(Debug, Default, Deserialize)]
struct ParamsFile {
    control_rate: Option<f64>,
    stand_duration: Option<f64>,
    stiffness: Option<Vec<f32>>,
    damping: Option<Vec<f32>>,
    default_joint_angle: Option<Vec<f32>>,
    wheel_damping: Option<f32>,
}

impl ControllerConfig {
    pub fn family_defaults(family: RobotFamily) -> Self {
        match family {
            RobotFamily::PointFoot => pointfoot::default_config(),
            RobotFamily::WheelFoot => wheelfoot::default_config(),
            RobotFamily::SoleFoot => solefoot::default_config(),
        }
    }

    /// `<model_dir>/<rl_type>/<robot_type>/params.yaml`
    pub fn params_path(params: &ControllerParams) -> PathBuf {
        params
            .model_dir
            .join(params.rl_type.as_str())
            .join(&params.robot_type)
            .join(PARAMS_FILE)
    }

    /// Load the params file for `params`, falling back to family defaults when
    /// the file does not exist.
    pub fn load(params: &ControllerParams, family: RobotFamily) -> Result<Self, RobotConfigError> {
        let path = Self::params_path(params);
        if !path.exists() {
            tracing::warn!(
                path = %path.display(),
                "Controller params not found, using {} defaults",
                family
            );
            return Ok(Self::family_defaults(family));
        }
        Self::from_file(&path, family)
    }

    pub fn from_file(path: &Path, family: RobotFamily) -> Result<Self, RobotConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| RobotConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file: ParamsFile =
            serde_yaml::from_str(&content).map_err(|source| RobotConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        let config = Self::family_defaults(family).merged(file);
        config
            .validate(family)
            .map_err(|reason| RobotConfigError::Invalid {
                path: path.to_path_buf(),
                reason,
            })?;
        tracing::info!(path = %path.display(), "Loaded controller params");
        Ok(config)
    }

    fn merged(mut self, file: ParamsFile) -> Self {
        if let Some(v) = file.control_rate {
            self.control_rate = v;
        }
        if let Some(v) = file.stand_duration {
            self.stand_duration = v;
        }
        if let Some(v) = file.stiffness {
            self.stiffness = v;
        }
        if let Some(v) = file.damping {
            self.damping = v;
        }
        if let Some(v) = file.default_joint_angle {
            self.default_joint_angle = v;
        }
        if let Some(v) = file.wheel_damping {
            self.wheel_damping = v;
        }
        self
    }

    pub fn validate(&self, family: RobotFamily) -> Result<(), String> {
        if !Rate::is_valid_frequency(self.control_rate) {
            return Err(format!(
                "control_rate must be between {} and {} Hz, got {}",
                Rate::MIN_FREQUENCY,
                Rate::MAX_FREQUENCY,
                self.control_rate
            ));
        }
        if !self.stand_duration.is_finite() || self.stand_duration < 0.0 {
            return Err(format!(
                "stand_duration must be >= 0, got {}",
                self.stand_duration
            ));
        }
        let joints = family.joint_count();
        for (field, values) in [
            ("stiffness", &self.stiffness),
            ("damping", &self.damping),
            ("default_joint_angle", &self.default_joint_angle),
        ] {
            if values.len() != joints {
                return Err(format!(
                    "{} needs {} values for a {} robot, got {}",
                    field,
                    joints,
                    family,
                    values.len()
                ));
            }
        }
        let valid_gain = |g: &f32| g.is_finite() && *g >= 0.0;
        if !self.stiffness.iter().chain(&self.damping).all(valid_gain) {
            return Err("stiffness and damping must be finite and >= 0".to_string());
        }
        if !valid_gain(&self.wheel_damping) {
            return Err(format!(
                "wheel_damping must be finite and >= 0, got {}",
                self.wheel_damping
            ));
        }
        if !self.default_joint_angle.iter().all(|q| q.is_finite()) {
            return Err("default_joint_angle must be finite".to_string());
        }
        Ok(())
    }
}
