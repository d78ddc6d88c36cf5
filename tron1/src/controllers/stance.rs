//! Stand-and-hold loop shared by every family controller.
//!
//! Damping (kp = 0) → StandUp (linear blend from the measured pose to
//! `default_joint_angle` over `stand_duration`) → Hold. Wheel joints are never
//! position-controlled: they get a zero velocity target with `wheel_damping`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use tron1_core::robot::{now_stamp, RobotApi, RobotCmd, RobotState, SensorJoy};
use tron1_core::{Rate, RobotFamily};

use super::params::ControllerConfig;
use super::ControllerError;

/// Joystick button indices (Xbox layout as reported by the SDK).
pub mod buttons {
    pub const X: usize = 2;
    pub const Y: usize = 3;
    pub const L1: usize = 4;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Damping,
    StandUp,
    Hold,
}

pub struct StanceLoop {
    family: RobotFamily,
    config: ControllerConfig,
    robot: Arc<dyn RobotApi>,
    start_controller: bool,
    latest_state: Arc<Mutex<Option<Arc<RobotState>>>>,
    latest_joy: Arc<Mutex<Option<Arc<SensorJoy>>>>,
    phase: Phase,
    stand_from: Vec<f32>,
    stand_started: Option<Instant>,
    auto_started: bool,
}

impl StanceLoop {
    /// Subscribes to robot state and joystick; fails if the robot's motor count
    /// does not match the family layout.
    pub fn new(
        family: RobotFamily,
        config: ControllerConfig,
        robot: Arc<dyn RobotApi>,
        start_controller: bool,
    ) -> Result<Self, ControllerError> {
        let actual = robot.motor_number() as usize;
        if actual != family.joint_count() {
            return Err(ControllerError::MotorMismatch {
                family,
                expected: family.joint_count(),
                actual,
            });
        }

        let latest_state: Arc<Mutex<Option<Arc<RobotState>>>> = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&latest_state);
        robot.subscribe_robot_state(Box::new(move |state: Arc<RobotState>| {
            *lock(&slot) = Some(state);
        }));

        let latest_joy: Arc<Mutex<Option<Arc<SensorJoy>>>> = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&latest_joy);
        robot.subscribe_sensor_joy(Box::new(move |joy: Arc<SensorJoy>| {
            *lock(&slot) = Some(joy);
        }));

        Ok(Self {
            family,
            config,
            robot,
            start_controller,
            latest_state,
            latest_joy,
            phase: Phase::Damping,
            stand_from: Vec::new(),
            stand_started: None,
            auto_started: false,
        })
    }

    pub fn family(&self) -> RobotFamily {
        self.family
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Run at `control_rate` until `shutdown` is set.
    pub fn run(&mut self, shutdown: &AtomicBool) -> Result<(), ControllerError> {
        tracing::info!(
            family = %self.family,
            rate = self.config.control_rate,
            simulation = self.start_controller,
            "Controller running"
        );
        if !self.start_controller {
            tracing::info!("Waiting for L1 + Y on the joystick to stand up");
        }

        let mut rate = Rate::new(self.config.control_rate);
        let mut rejected: u64 = 0;
        while !shutdown.load(Ordering::SeqCst) {
            let cmd = self.step(Instant::now());
            if !self.robot.publish_robot_cmd(&cmd) {
                rejected += 1;
                if rejected == 1 {
                    tracing::warn!("Robot rejected joint command");
                }
            }
            rate.sleep();
        }

        self.on_shutdown();
        if rejected > 0 {
            tracing::warn!(rejected, "Joint commands rejected during run");
        }
        tracing::info!(family = %self.family, phase = ?self.phase, "Controller stopped");
        Ok(())
    }

    /// One control tick: update the phase from inputs, then build the command.
    fn step(&mut self, now: Instant) -> RobotCmd {
        let state = lock(&self.latest_state).clone();
        let joy = lock(&self.latest_joy).take();

        if let (Some(joy), Some(state)) = (joy.as_deref(), state.as_deref()) {
            if joy.pressed(buttons::L1) && joy.pressed(buttons::Y) && self.phase == Phase::Damping {
                self.begin_stand(state, now);
            } else if joy.pressed(buttons::L1) && joy.pressed(buttons::X) && self.phase != Phase::Damping {
                tracing::info!("L1 + X pressed, switching to damping");
                self.phase = Phase::Damping;
            }
        }

        if self.start_controller && !self.auto_started && self.phase == Phase::Damping {
            if let Some(state) = state.as_deref() {
                self.auto_started = true;
                self.begin_stand(state, now);
            }
        }

        if self.phase == Phase::StandUp {
            let elapsed = self
                .stand_started
                .map(|t| now.duration_since(t).as_secs_f64())
                .unwrap_or(0.0);
            if elapsed >= self.config.stand_duration {
                tracing::info!("Stand-up complete, holding default stance");
                self.phase = Phase::Hold;
            }
        }

        self.command(now)
    }

    fn begin_stand(&mut self, state: &RobotState, now: Instant) {
        tracing::info!(family = %self.family, duration = self.config.stand_duration, "Standing up");
        self.stand_from = state.q.clone();
        self.stand_started = Some(now);
        self.phase = Phase::StandUp;
    }

    fn command(&self, now: Instant) -> RobotCmd {
        let joints = self.family.joint_count();
        let mut cmd = RobotCmd::zeros(joints);
        cmd.stamp = now_stamp();

        match self.phase {
            Phase::Damping => {
                cmd.kd.copy_from_slice(&self.config.damping);
            }
            Phase::StandUp | Phase::Hold => {
                let alpha = match (self.phase, self.stand_started) {
                    (Phase::StandUp, Some(t)) if self.config.stand_duration > 0.0 => {
                        (now.duration_since(t).as_secs_f64() / self.config.stand_duration).min(1.0)
                            as f32
                    }
                    _ => 1.0,
                };
                for i in 0..joints {
                    let target = self.config.default_joint_angle[i];
                    let from = self.stand_from.get(i).copied().unwrap_or(target);
                    cmd.q[i] = from + alpha * (target - from);
                    cmd.kp[i] = self.config.stiffness[i];
                    cmd.kd[i] = self.config.damping[i];
                }
                for &w in self.family.wheel_joints() {
                    cmd.q[w] = 0.0;
                    cmd.dq[w] = 0.0;
                    cmd.kp[w] = 0.0;
                    cmd.kd[w] = self.config.wheel_damping;
                }
            }
        }
        cmd
    }

    /// Leave the robot in damping on the way out.
    fn on_shutdown(&mut self) {
        self.phase = Phase::Damping;
        let cmd = self.command(Instant::now());
        if !self.robot.publish_robot_cmd(&cmd) {
            tracing::warn!("Failed to publish damping command on shutdown");
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;
    use tron1_core::robot::SimRobot;

    fn fast_config(family: RobotFamily) -> ControllerConfig {
        ControllerConfig {
            control_rate: 500.0,
            stand_duration: 0.1,
            ..ControllerConfig::family_defaults(family)
        }
    }

    fn sim(family: RobotFamily) -> Arc<SimRobot> {
        let sim = Arc::new(SimRobot::new(family.joint_count() as u32));
        assert!(sim.init("127.0.0.1"));
        sim
    }

    fn run_for(stance: &mut StanceLoop, millis: u64) {
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&shutdown);
        let timer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(millis));
            flag.store(true, Ordering::SeqCst);
        });
        stance.run(&shutdown).unwrap();
        timer.join().unwrap();
    }

    fn joy(pressed: &[usize]) -> SensorJoy {
        let mut buttons = vec![0; 12];
        for &b in pressed {
            buttons[b] = 1;
        }
        SensorJoy {
            stamp: 0,
            axes: vec![0.0; 8],
            buttons,
        }
    }

    fn assert_near(actual: &[f32], expected: &[f32], skip: &[usize]) {
        for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
            if skip.contains(&i) {
                continue;
            }
            assert!((a - e).abs() < 1e-2, "joint {}: {} vs {}", i, a, e);
        }
    }

    #[test]
    fn test_motor_mismatch_rejected() {
        let robot: Arc<dyn RobotApi> = Arc::new(SimRobot::new(6));
        let err = StanceLoop::new(
            RobotFamily::WheelFoot,
            fast_config(RobotFamily::WheelFoot),
            robot,
            true,
        )
        .err()
        .unwrap();
        assert!(matches!(
            err,
            ControllerError::MotorMismatch { expected: 8, actual: 6, .. }
        ));
    }

    #[test]
    fn test_simulation_stands_up_and_holds() {
        let sim = sim(RobotFamily::PointFoot);
        let config = fast_config(RobotFamily::PointFoot);
        let target = config.default_joint_angle.clone();
        let mut stance =
            StanceLoop::new(RobotFamily::PointFoot, config, sim.clone(), true).unwrap();

        run_for(&mut stance, 500);

        assert_near(&sim.state().q, &target, &[]);
        // Shutdown leaves the robot damped.
        assert_eq!(stance.phase(), Phase::Damping);
        assert!(sim.last_command().unwrap().kp.iter().all(|kp| *kp == 0.0));
    }

    #[test]
    fn test_wheels_are_velocity_controlled() {
        let family = RobotFamily::WheelFoot;
        let sim = sim(family);
        let config = fast_config(family);
        let mut stance = StanceLoop::new(family, config.clone(), sim.clone(), true).unwrap();

        let cmd = stance.step(Instant::now());
        assert_eq!(stance.phase(), Phase::StandUp);
        for &w in family.wheel_joints() {
            assert_eq!(cmd.kp[w], 0.0);
            assert_eq!(cmd.dq[w], 0.0);
            assert_eq!(cmd.kd[w], config.wheel_damping);
        }
        assert_eq!(cmd.kp[0], config.stiffness[0]);
    }

    #[test]
    fn test_hardware_waits_for_joystick() {
        let family = RobotFamily::SoleFoot;
        let sim = sim(family);
        let config = fast_config(family);
        let target = config.default_joint_angle.clone();
        let mut stance = StanceLoop::new(family, config, sim.clone(), false).unwrap();

        let t0 = Instant::now();
        let cmd = stance.step(t0);
        assert_eq!(stance.phase(), Phase::Damping);
        assert!(cmd.kp.iter().all(|kp| *kp == 0.0));
        sim.publish_robot_cmd(&cmd);

        // L1 alone does nothing.
        sim.inject_joy(joy(&[buttons::L1]));
        stance.step(t0);
        assert_eq!(stance.phase(), Phase::Damping);

        sim.inject_joy(joy(&[buttons::L1, buttons::Y]));
        stance.step(t0);
        assert_eq!(stance.phase(), Phase::StandUp);

        let cmd = stance.step(t0 + Duration::from_millis(200));
        assert_eq!(stance.phase(), Phase::Hold);
        assert_near(&cmd.q, &target, &[]);

        sim.inject_joy(joy(&[buttons::L1, buttons::X]));
        let cmd = stance.step(t0 + Duration::from_millis(250));
        assert_eq!(stance.phase(), Phase::Damping);
        assert!(cmd.kp.iter().all(|kp| *kp == 0.0));
    }

    #[test]
    fn test_stand_up_interpolates_from_measured_pose() {
        let family = RobotFamily::PointFoot;
        let start = vec![0.2_f32; 6];
        let sim = Arc::new(SimRobot::new(6).with_initial_q(start.clone()));
        assert!(sim.init("127.0.0.1"));
        let config = fast_config(family);
        let target = config.default_joint_angle.clone();
        let mut stance = StanceLoop::new(family, config, sim, true).unwrap();

        let t0 = Instant::now();
        let first = stance.step(t0);
        assert_near(&first.q, &start, &[]);

        let halfway = stance.step(t0 + Duration::from_millis(50));
        let expected: Vec<f32> = start
            .iter()
            .zip(&target)
            .map(|(s, t)| s + 0.5 * (t - s))
            .collect();
        assert_near(&halfway.q, &expected, &[]);
    }
}
