//! Robot SDK abstraction.
//!
//! The vendor SDK is a process-wide singleton with callback subscriptions and a
//! publish call for joint commands. [`RobotApi`] captures that surface so the
//! launcher, controllers and abilities never depend on a concrete transport.
//! [`SimRobot`] is the in-process implementation used for simulation and tests.

mod kind;
mod sim;

pub use kind::{RlBackend, RobotFamily, RobotModel, UnknownRlBackend, UnknownRobotType};
pub use sim::SimRobot;

use std::sync::Arc;

/// Default address of the robot; also the address of the local simulator.
pub const DEFAULT_ROBOT_IP: &str = "127.0.0.1";

/// Subscription callback. Messages are shared, never copied per subscriber.
pub type Callback<T> = Box<dyn Fn(Arc<T>) + Send + Sync>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImuData {
    /// Nanoseconds since the epoch.
    pub stamp: u64,
    pub acc: [f32; 3],
    pub gyro: [f32; 3],
    /// w, x, y, z
    pub quat: [f32; 4],
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RobotState {
    pub stamp: u64,
    pub tau: Vec<f32>,
    pub q: Vec<f32>,
    pub dq: Vec<f32>,
}

impl RobotState {
    pub fn zeros(motor_number: usize) -> Self {
        Self {
            stamp: 0,
            tau: vec![0.0; motor_number],
            q: vec![0.0; motor_number],
            dq: vec![0.0; motor_number],
        }
    }
}

/// Per-joint PD command: `tau_out = kp * (q - q_meas) + kd * (dq - dq_meas) + tau`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RobotCmd {
    pub stamp: u64,
    pub mode: Vec<u8>,
    pub q: Vec<f32>,
    pub dq: Vec<f32>,
    pub tau: Vec<f32>,
    pub kp: Vec<f32>,
    pub kd: Vec<f32>,
}

impl RobotCmd {
    pub fn zeros(motor_number: usize) -> Self {
        Self {
            stamp: 0,
            mode: vec![0; motor_number],
            q: vec![0.0; motor_number],
            dq: vec![0.0; motor_number],
            tau: vec![0.0; motor_number],
            kp: vec![0.0; motor_number],
            kd: vec![0.0; motor_number],
        }
    }

    /// True when every per-joint vector has `motor_number` entries.
    pub fn is_sized_for(&self, motor_number: usize) -> bool {
        self.mode.len() == motor_number
            && self.q.len() == motor_number
            && self.dq.len() == motor_number
            && self.tau.len() == motor_number
            && self.kp.len() == motor_number
            && self.kd.len() == motor_number
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SensorJoy {
    pub stamp: u64,
    pub axes: Vec<f32>,
    pub buttons: Vec<i32>,
}

impl SensorJoy {
    pub fn pressed(&self, index: usize) -> bool {
        self.buttons.get(index).copied().unwrap_or(0) == 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticLevel {
    Ok = 0,
    Warn = 1,
    Error = 2,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticValue {
    pub stamp: u64,
    pub name: String,
    pub code_name: String,
    pub code: i32,
    pub level: DiagnosticLevel,
    pub message: String,
}

/// Surface of the robot SDK used by this workspace.
///
/// Implementations are shared across threads (controller loop, ability threads,
/// SDK callback threads), so every method takes `&self`.
pub trait RobotApi: Send + Sync {
    /// Connect to the robot (or simulator) at `robot_ip`. Returns false on failure.
    fn init(&self, robot_ip: &str) -> bool;

    fn motor_number(&self) -> u32;

    fn subscribe_imu_data(&self, cb: Callback<ImuData>);

    fn subscribe_robot_state(&self, cb: Callback<RobotState>);

    fn subscribe_sensor_joy(&self, cb: Callback<SensorJoy>);

    fn subscribe_diagnostic_value(&self, cb: Callback<DiagnosticValue>);

    /// Returns false if the command was rejected (not initialized, wrong size).
    fn publish_robot_cmd(&self, cmd: &RobotCmd) -> bool;

    fn publish_diagnostic(
        &self,
        name: &str,
        code_name: &str,
        code: i32,
        level: DiagnosticLevel,
        message: &str,
    );
}

/// Nanoseconds since the Unix epoch, saturating at zero for clocks before 1970.
pub fn now_stamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default()
}
