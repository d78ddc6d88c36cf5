use std::sync::{Arc, Mutex, MutexGuard};

use tron1_core::robot::{ImuData, RobotApi, RobotState};

use crate::error::AbilityError;

/// Robot handle shared by every ability, with the latest IMU sample and robot
/// state cached from the SDK subscriptions.
pub struct RobotData {
    robot: Arc<dyn RobotApi>,
    imu: Arc<Mutex<ImuData>>,
    state: Arc<Mutex<RobotState>>,
}

impl RobotData {
    /// Initialize `robot` at `robot_ip` and subscribe to IMU and state updates.
    pub fn connect(robot: Arc<dyn RobotApi>, robot_ip: &str) -> Result<Self, AbilityError> {
        if !robot.init(robot_ip) {
            return Err(AbilityError::RobotInit(robot_ip.to_string()));
        }

        let imu = Arc::new(Mutex::new(ImuData::default()));
        let state = Arc::new(Mutex::new(RobotState::default()));

        let imu_slot = Arc::clone(&imu);
        robot.subscribe_imu_data(Box::new(move |msg: Arc<ImuData>| {
            *lock(&imu_slot) = (*msg).clone();
        }));
        let state_slot = Arc::clone(&state);
        robot.subscribe_robot_state(Box::new(move |msg: Arc<RobotState>| {
            *lock(&state_slot) = (*msg).clone();
        }));

        Ok(Self { robot, imu, state })
    }

    pub fn imu_data(&self) -> ImuData {
        lock(&self.imu).clone()
    }

    pub fn robot_state(&self) -> RobotState {
        lock(&self.state).clone()
    }

    pub fn robot(&self) -> &Arc<dyn RobotApi> {
        &self.robot
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}
