//! Launch validation and controller dispatch for the `tron1` binary.
//!
//! Order: environment → robot family → robot init → controller. Everything that
//! can be checked without touching the robot is checked first.

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use thiserror::Error;
use tron1_core::config::LaunchEnv;
use tron1_core::robot::{UnknownRlBackend, UnknownRobotType, DEFAULT_ROBOT_IP};
use tron1_core::{RlBackend, RobotApi, RobotFamily};

use crate::controllers::{create_controller, ControllerError, ControllerParams};

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("Please set the ROBOT_TYPE using 'export ROBOT_TYPE=<robot_type>'.")]
    MissingRobotType,

    #[error("Please set the RL_TYPE using 'export RL_TYPE=isaacgym/isaaclab'.")]
    MissingRlType,

    #[error(transparent)]
    UnsupportedRlType(#[from] UnknownRlBackend),

    /// Resolved before robot init and fatal (exit 1), not a printed warning after
    /// init that lets the process end normally.
    #[error(transparent)]
    UnknownRobotType(#[from] UnknownRobotType),

    #[error("Failed to connect to robot at: {0}")]
    RobotInit(String),

    #[error(transparent)]
    Controller(#[from] ControllerError),
}

impl LaunchError {
    /// Robot init failure keeps the historical success code; everything else is 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            LaunchError::RobotInit(_) => 0,
            _ => 1,
        }
    }
}

/// Everything the dispatcher needs, validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSettings {
    pub robot_type: String,
    pub family: RobotFamily,
    pub rl_backend: RlBackend,
    pub robot_ip: String,
    pub model_dir: PathBuf,
}

impl LaunchSettings {
    pub fn resolve(
        env: &LaunchEnv,
        robot_ip: Option<String>,
        model_dir: PathBuf,
    ) -> Result<Self, LaunchError> {
        let robot_type = env.robot_type.clone().ok_or(LaunchError::MissingRobotType)?;
        let rl_type = env.rl_type.as_deref().ok_or(LaunchError::MissingRlType)?;
        let rl_backend: RlBackend = rl_type.parse()?;
        let family = RobotFamily::from_robot_type(&robot_type)?;
        Ok(Self {
            robot_type,
            family,
            rl_backend,
            robot_ip: robot_ip.unwrap_or_else(|| DEFAULT_ROBOT_IP.to_string()),
            model_dir,
        })
    }

    /// The local address means the simulator, which stands up without the joystick.
    pub fn start_controller(&self) -> bool {
        self.robot_ip == DEFAULT_ROBOT_IP
    }

    pub fn controller_params(&self) -> ControllerParams {
        ControllerParams {
            model_dir: self.model_dir.clone(),
            robot_type: self.robot_type.clone(),
            rl_type: self.rl_backend,
            start_controller: self.start_controller(),
        }
    }
}

/// Init the robot, then build and run the family controller until `shutdown`.
pub fn launch(
    settings: &LaunchSettings,
    robot: Arc<dyn RobotApi>,
    shutdown: &AtomicBool,
) -> Result<(), LaunchError> {
    if !robot.init(&settings.robot_ip) {
        return Err(LaunchError::RobotInit(settings.robot_ip.clone()));
    }
    tracing::info!(
        robot_type = %settings.robot_type,
        rl_type = %settings.rl_backend,
        robot_ip = %settings.robot_ip,
        "Starting {} controller",
        settings.family
    );
    let mut controller =
        create_controller(settings.family, &settings.controller_params(), robot)?;
    controller.run(shutdown)?;
    Ok(())
}
