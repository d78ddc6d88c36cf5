//! Wheel-foot (WF) controller: a velocity-controlled wheel at the end of each leg.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use tron1_core::{RobotApi, RobotFamily};

use super::params::ControllerConfig;
use super::stance::StanceLoop;
use super::{Controller, ControllerError, ControllerParams};

pub(super) fn default_config() -> ControllerConfig {
    ControllerConfig {
        control_rate: 500.0,
        stand_duration: 2.0,
        stiffness: vec![42.0, 42.0, 42.0, 0.0, 42.0, 42.0, 42.0, 0.0],
        damping: vec![2.5, 2.5, 2.5, 0.8, 2.5, 2.5, 2.5, 0.8],
        // abad, hip, knee, wheel per leg
        default_joint_angle: vec![0.0, 0.6, -1.2, 0.0, 0.0, 0.6, -1.2, 0.0],
        wheel_damping: 0.8,
    }
}

pub struct WheelfootController {
    stance: StanceLoop,
}

impl WheelfootController {
    pub fn new(params: &ControllerParams, robot: Arc<dyn RobotApi>) -> Result<Self, ControllerError> {
        let config = ControllerConfig::load(params, RobotFamily::WheelFoot)?;
        let stance = StanceLoop::new(RobotFamily::WheelFoot, config, robot, params.start_controller)?;
        Ok(Self { stance })
    }
}

impl Controller for WheelfootController {
    fn family(&self) -> RobotFamily {
        RobotFamily::WheelFoot
    }

    fn run(&mut self, shutdown: &AtomicBool) -> Result<(), ControllerError> {
        self.stance.run(shutdown)
    }
}
