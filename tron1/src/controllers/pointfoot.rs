//! Point-foot (PF) controller: three joints per leg, no ankle.

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
        stiffness: vec![45.0; 6],
        damping: vec![3.0; 6],
        // abad, hip, knee per leg
        default_joint_angle: vec![0.0, 0.5, -1.0, 0.0, 0.5, -1.0],
        wheel_damping: 0.0,
    }
}

pub struct PointfootController {
    stance: StanceLoop,
}

impl PointfootController {
    pub fn new(params: &ControllerParams, robot: Arc<dyn RobotApi>) -> Result<Self, ControllerError> {
        let config = ControllerConfig::load(params, RobotFamily::PointFoot)?;
        let stance = StanceLoop::new(RobotFamily::PointFoot, config, robot, params.start_controller)?;
        Ok(Self { stance })
    }
}

impl Controller for PointfootController {
    fn family(&self) -> RobotFamily {
        RobotFamily::PointFoot
    }

    fn run(&mut self, shutdown: &AtomicBool) -> Result<(), ControllerError> {
        self.stance.run(shutdown)
    }
}
