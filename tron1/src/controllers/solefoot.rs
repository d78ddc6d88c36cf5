//! Sole-foot (SF) controller: an ankle joint per leg holds the sole flat.

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
        stiffness: vec![45.0, 45.0, 45.0, 20.0, 45.0, 45.0, 45.0, 20.0],
        damping: vec![3.0, 3.0, 3.0, 1.5, 3.0, 3.0, 3.0, 1.5],
        // abad, hip, knee, ankle per leg; ankle offsets hip + knee
        default_joint_angle: vec![0.0, 0.5, -1.0, 0.5, 0.0, 0.5, -1.0, 0.5],
        wheel_damping: 0.0,
    }
}

pub struct SolefootController {
    stance: StanceLoop,
}

impl SolefootController {
    pub fn new(params: &ControllerParams, robot: Arc<dyn RobotApi>) -> Result<Self, ControllerError> {
        let config = ControllerConfig::load(params, RobotFamily::SoleFoot)?;
        let stance = StanceLoop::new(RobotFamily::SoleFoot, config, robot, params.start_controller)?;
        Ok(Self { stance })
    }
}

impl Controller for SolefootController {
    fn family(&self) -> RobotFamily {
        RobotFamily::SoleFoot
    }

    fn run(&mut self, shutdown: &AtomicBool) -> Result<(), ControllerError> {
        self.stance.run(shutdown)
    }
}
