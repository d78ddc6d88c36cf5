//! Per-morphology controllers.
//!
//! Each family gets its own controller type; all of them drive the shared
//! [`stance::StanceLoop`]. [`create_controller`] is the single place a
//! [`RobotFamily`] is mapped to an implementation.

pub mod params;
pub mod pointfoot;
pub mod solefoot;
pub mod stance;
pub mod wheelfoot;

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use thiserror::Error;
use tron1_core::{RlBackend, RobotApi, RobotFamily};

pub use params::{ControllerConfig, RobotConfigError};
pub use pointfoot::PointfootController;
pub use solefoot::SolefootController;
pub use stance::Phase;
pub use wheelfoot::WheelfootController;

/// Construction inputs shared by every controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerParams {
    pub model_dir: PathBuf,
    pub robot_type: String,
    pub rl_type: RlBackend,
    /// Stand up without waiting for the joystick (simulation).
    pub start_controller: bool,
}

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Config(#[from] RobotConfigError),

    #[error("{family} robot needs {expected} motors, robot reports {actual}")]
    MotorMismatch {
        family: RobotFamily,
        expected: usize,
        actual: usize,
    },
}

pub trait Controller {
    fn family(&self) -> RobotFamily;

    /// Blocks until `shutdown` is set.
    fn run(&mut self, shutdown: &AtomicBool) -> Result<(), ControllerError>;
}

pub fn create_controller(
    family: RobotFamily,
    params: &ControllerParams,
    robot: Arc<dyn RobotApi>,
) -> Result<Box<dyn Controller>, ControllerError> {
    let controller: Box<dyn Controller> = match family {
        RobotFamily::PointFoot => Box::new(PointfootController::new(params, robot)?),
        RobotFamily::WheelFoot => Box::new(WheelfootController::new(params, robot)?),
        RobotFamily::SoleFoot => Box::new(SolefootController::new(params, robot)?),
    };
    Ok(controller)
}
