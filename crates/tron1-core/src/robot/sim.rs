//! In-process simulated robot.
//!
//! Joints track commanded positions with a first-order lag; every accepted command
//! produces one robot state and one IMU sample for the subscribers. Joystick input
//! can be injected with [`SimRobot::inject_joy`].

use std::collections::VecDeque;
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use super::{
    now_stamp, Callback, DiagnosticLevel, DiagnosticValue, ImuData, RobotApi, RobotCmd,
    RobotState, SensorJoy,
};

/// Fraction of the position error closed per command for position-controlled joints.
const TRACKING_GAIN: f32 = 0.2;

/// Published diagnostics kept for inspection; older entries are dropped first.
pub const DIAGNOSTIC_HISTORY: usize = 256;

type Shared<T> = Arc<dyn Fn(Arc<T>) + Send + Sync>;

#[derive(Default)]
struct Subscribers {
    imu: Vec<Shared<ImuData>>,
    state: Vec<Shared<RobotState>>,
    joy: Vec<Shared<SensorJoy>>,
    diagnostic: Vec<Shared<DiagnosticValue>>,
}

pub struct SimRobot {
    motor_number: u32,
    initialized: AtomicBool,
    state: Mutex<RobotState>,
    last_cmd: Mutex<Option<RobotCmd>>,
    diagnostics: Mutex<VecDeque<DiagnosticValue>>,
    subscribers: Mutex<Subscribers>,
}

impl SimRobot {
    pub fn new(motor_number: u32) -> Self {
        Self {
            motor_number,
            initialized: AtomicBool::new(false),
            state: Mutex::new(RobotState::zeros(motor_number as usize)),
            last_cmd: Mutex::new(None),
            diagnostics: Mutex::new(VecDeque::with_capacity(DIAGNOSTIC_HISTORY)),
            subscribers: Mutex::new(Subscribers::default()),
        }
    }

    /// Start from the given joint positions instead of all zeros.
    pub fn with_initial_q(self, q: Vec<f32>) -> Self {
        {
            let mut state = lock(&self.state);
            if q.len() == state.q.len() {
                state.q = q;
            }
        }
        self
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> RobotState {
        lock(&self.state).clone()
    }

    pub fn last_command(&self) -> Option<RobotCmd> {
        lock(&self.last_cmd).clone()
    }

    /// The last [`DIAGNOSTIC_HISTORY`] published diagnostics, oldest first.
    pub fn diagnostics(&self) -> Vec<DiagnosticValue> {
        lock(&self.diagnostics).iter().cloned().collect()
    }

    /// Deliver a joystick message to `subscribe_sensor_joy` callbacks.
    pub fn inject_joy(&self, joy: SensorJoy) {
        let callbacks = lock(&self.subscribers).joy.clone();
        let msg = Arc::new(joy);
        for cb in callbacks {
            cb(Arc::clone(&msg));
        }
    }

    fn publish_state(&self, state: RobotState) {
        let (state_cbs, imu_cbs) = {
            let subs = lock(&self.subscribers);
            (subs.state.clone(), subs.imu.clone())
        };
        let stamp = state.stamp;
        let state = Arc::new(state);
        for cb in state_cbs {
            cb(Arc::clone(&state));
        }
        let imu = Arc::new(ImuData {
            stamp,
            acc: [0.0, 0.0, 9.81],
            gyro: [0.0; 3],
            quat: [1.0, 0.0, 0.0, 0.0],
        });
        for cb in imu_cbs {
            cb(Arc::clone(&imu));
        }
    }
}

impl RobotApi for SimRobot {
    fn init(&self, robot_ip: &str) -> bool {
        if robot_ip.parse::<IpAddr>().is_err() {
            tracing::error!(robot_ip, "Invalid robot address");
            return false;
        }
        self.initialized.store(true, Ordering::SeqCst);
        tracing::info!(robot_ip, motors = self.motor_number, "Simulated robot initialized");
        true
    }

    fn motor_number(&self) -> u32 {
        self.motor_number
    }

    fn subscribe_imu_data(&self, cb: Callback<ImuData>) {
        lock(&self.subscribers).imu.push(Arc::from(cb));
    }

    /// The current state is delivered right away once initialized, then once per command.
    fn subscribe_robot_state(&self, cb: Callback<RobotState>) {
        let cb: Shared<RobotState> = Arc::from(cb);
        lock(&self.subscribers).state.push(Arc::clone(&cb));
        if self.is_initialized() {
            let mut snapshot = self.state();
            snapshot.stamp = now_stamp();
            cb(Arc::new(snapshot));
        }
    }

    fn subscribe_sensor_joy(&self, cb: Callback<SensorJoy>) {
        lock(&self.subscribers).joy.push(Arc::from(cb));
    }

    fn subscribe_diagnostic_value(&self, cb: Callback<DiagnosticValue>) {
        lock(&self.subscribers).diagnostic.push(Arc::from(cb));
    }

    fn publish_robot_cmd(&self, cmd: &RobotCmd) -> bool {
        if !self.is_initialized() || !cmd.is_sized_for(self.motor_number as usize) {
            return false;
        }
        let next = {
            let mut state = lock(&self.state);
            for i in 0..state.q.len() {
                let q_err = cmd.q[i] - state.q[i];
                let dq_err = cmd.dq[i] - state.dq[i];
                state.tau[i] = cmd.kp[i] * q_err + cmd.kd[i] * dq_err + cmd.tau[i];
                if cmd.kp[i] > 0.0 {
                    state.q[i] += TRACKING_GAIN * q_err;
                }
                state.dq[i] = cmd.dq[i];
            }
            state.stamp = now_stamp();
            state.clone()
        };
        *lock(&self.last_cmd) = Some(cmd.clone());
        self.publish_state(next);
        true
    }

    fn publish_diagnostic(
        &self,
        name: &str,
        code_name: &str,
        code: i32,
        level: DiagnosticLevel,
        message: &str,
    ) {
        let value = DiagnosticValue {
            stamp: now_stamp(),
            name: name.to_string(),
            code_name: code_name.to_string(),
            code,
            level,
            message: message.to_string(),
        };
        {
            let mut history = lock(&self.diagnostics);
            if history.len() == DIAGNOSTIC_HISTORY {
                history.pop_front();
            }
            history.push_back(value.clone());
        }
        let callbacks = lock(&self.subscribers).diagnostic.clone();
        let value = Arc::new(value);
        for cb in callbacks {
            cb(Arc::clone(&value));
        }
    }
}

/// Poisoned locks only mean a subscriber panicked; the data is still usable.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}
