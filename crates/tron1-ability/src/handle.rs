//! One initialized ability and the thread that runs its lifecycle.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use tron1_core::robot::DiagnosticLevel;

use crate::ability::{Ability, AbilityConfig, AbilityContext, AbilityState};
use crate::error::AbilityError;

struct Inner {
    /// Present until the first `start`; then owned by the lifecycle thread.
    ability: Option<Box<dyn Ability>>,
    thread: Option<JoinHandle<()>>,
}

pub struct AbilityHandle {
    ctx: AbilityContext,
    inner: Mutex<Inner>,
    state: Arc<Mutex<AbilityState>>,
}

impl AbilityHandle {
    /// Run `initialize` and wrap the ability. An initialization error is returned
    /// unchanged and the instance is dropped.
    pub fn initialize(
        mut ability: Box<dyn Ability>,
        ctx: AbilityContext,
        config: &AbilityConfig,
    ) -> Result<Self, AbilityError> {
        ability.initialize(&ctx, config)?;
        Ok(Self {
            ctx,
            inner: Mutex::new(Inner {
                ability: Some(ability),
                thread: None,
            }),
            state: Arc::new(Mutex::new(AbilityState::Initialized)),
        })
    }

    pub fn name(&self) -> &str {
        self.ctx.name()
    }

    pub fn type_key(&self) -> &str {
        self.ctx.type_key()
    }

    pub fn state(&self) -> AbilityState {
        *lock(&self.state)
    }

    pub fn is_running(&self) -> bool {
        self.state() == AbilityState::Running
    }

    /// Spawn the lifecycle thread. Returns `Ok(false)` if already running.
    /// A stopped ability cannot be started again.
    pub fn start(&self) -> Result<bool, AbilityError> {
        let mut inner = lock(&self.inner);
        match self.state() {
            AbilityState::Running => {
                tracing::info!(ability = self.name(), "Ability already active");
                return Ok(false);
            }
            AbilityState::Stopped | AbilityState::Uninitialized => {
                return Err(AbilityError::Terminated(self.name().to_string()));
            }
            AbilityState::Initialized => {}
        }
        let Some(ability) = inner.ability.take() else {
            return Err(AbilityError::Terminated(self.name().to_string()));
        };

        self.ctx.running_flag().store(true, Ordering::SeqCst);
        *lock(&self.state) = AbilityState::Running;

        let ctx = self.ctx.clone();
        let state = Arc::clone(&self.state);
        let spawned = thread::Builder::new()
            .name(format!("ability-{}", self.name()))
            .spawn(move || run_lifecycle(ability, ctx, state));
        match spawned {
            Ok(handle) => {
                inner.thread = Some(handle);
                tracing::info!(ability = self.name(), "Ability started");
                Ok(true)
            }
            Err(source) => {
                self.ctx.running_flag().store(false, Ordering::SeqCst);
                *lock(&self.state) = AbilityState::Stopped;
                Err(AbilityError::Spawn {
                    name: self.name().to_string(),
                    source,
                })
            }
        }
    }

    /// Clear the running flag and wait for the lifecycle thread to finish.
    /// Returns false if the ability was not running.
    pub fn stop(&self) -> bool {
        let mut inner = lock(&self.inner);
        if self.state() != AbilityState::Running {
            // Reap a thread whose on_main returned by itself.
            if let Some(handle) = inner.thread.take() {
                let _ = handle.join();
            }
            tracing::debug!(ability = self.name(), "Ability not active");
            return false;
        }

        self.ctx.running_flag().store(false, Ordering::SeqCst);
        if let Some(handle) = inner.thread.take() {
            if handle.join().is_err() {
                tracing::error!(ability = self.name(), "Ability thread panicked");
            }
        }
        *lock(&self.state) = AbilityState::Stopped;
        tracing::info!(ability = self.name(), "Ability stopped");
        true
    }
}

impl Drop for AbilityHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_lifecycle(
    mut ability: Box<dyn Ability>,
    ctx: AbilityContext,
    state: Arc<Mutex<AbilityState>>,
) {
    let diag_name = format!("ability/{}", ctx.name());
    let robot = Arc::clone(ctx.robot().robot());
    robot.publish_diagnostic(&diag_name, "start", 0, DiagnosticLevel::Ok, "");

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| -> anyhow::Result<()> {
        ability.on_start(&ctx)?;
        ability.on_main(&ctx)
    }));
    match outcome {
        Ok(Ok(())) => {
            robot.publish_diagnostic(&diag_name, "stop", 0, DiagnosticLevel::Ok, "");
        }
        Ok(Err(e)) => {
            let msg = format!("Ability failed: {:#}", e);
            tracing::error!(ability = ctx.name(), "{}", msg);
            robot.publish_diagnostic(&diag_name, "start", -1, DiagnosticLevel::Error, &msg);
        }
        Err(payload) => {
            let msg = format!("Ability failed: {}", panic_message(payload.as_ref()));
            tracing::error!(ability = ctx.name(), "{}", msg);
            robot.publish_diagnostic(&diag_name, "start", -1, DiagnosticLevel::Error, &msg);
        }
    }

    if panic::catch_unwind(AssertUnwindSafe(|| ability.on_stop(&ctx))).is_err() {
        tracing::error!(ability = ctx.name(), "on_stop panicked");
    }
    ctx.running_flag().store(false, Ordering::SeqCst);
    *lock(&state) = AbilityState::Stopped;
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown exception".to_string()
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::robot_data::RobotData;
    use std::sync::atomic::AtomicUsize;
    use std::time::{Duration, Instant};
    use tron1_core::robot::{RobotApi, SimRobot};
    use tron1_core::Rate;

    #[derive(Default)]
    struct Recorder {
        started: Arc<AtomicUsize>,
        ticks: Arc<AtomicUsize>,
        stopped: Arc<AtomicUsize>,
        fail_main: bool,
        panic_main: bool,
    }

    impl Ability for Recorder {
        fn initialize(
            &mut self,
            _ctx: &AbilityContext,
            _config: &AbilityConfig,
        ) -> Result<(), AbilityError> {
            Ok(())
        }

        fn on_start(&mut self, _ctx: &AbilityContext) -> anyhow::Result<()> {
            self.started.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn on_main(&mut self, ctx: &AbilityContext) -> anyhow::Result<()> {
            if self.fail_main {
                anyhow::bail!("sensor offline");
            }
            if self.panic_main {
                panic!("boom");
            }
            let mut rate = Rate::new(200.0);
            while ctx.is_running() {
                self.ticks.fetch_add(1, Ordering::SeqCst);
                rate.sleep();
            }
            Ok(())
        }

        fn on_stop(&mut self, _ctx: &AbilityContext) {
            self.stopped.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn setup() -> (Arc<SimRobot>, AbilityContext) {
        let sim = Arc::new(SimRobot::new(6));
        let api: Arc<dyn RobotApi> = sim.clone();
        let robot = Arc::new(RobotData::connect(api, "127.0.0.1").unwrap());
        (sim, AbilityContext::new("recorder", "test/recorder", robot))
    }

    fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn test_full_lifecycle() {
        let (sim, ctx) = setup();
        let recorder = Recorder::default();
        let (started, ticks, stopped) = (
            Arc::clone(&recorder.started),
            Arc::clone(&recorder.ticks),
            Arc::clone(&recorder.stopped),
        );
        let handle = AbilityHandle::initialize(Box::new(recorder), ctx, &AbilityConfig::default())
            .unwrap();
        assert_eq!(handle.state(), AbilityState::Initialized);

        assert!(handle.start().unwrap());
        assert!(handle.is_running());
        assert!(wait_until(|| ticks.load(Ordering::SeqCst) >= 3));
        // Second start while running is a no-op.
        assert!(!handle.start().unwrap());

        assert!(handle.stop());
        assert_eq!(handle.state(), AbilityState::Stopped);
        assert_eq!(started.load(Ordering::SeqCst), 1);
        assert_eq!(stopped.load(Ordering::SeqCst), 1);

        let codes: Vec<_> = sim
            .diagnostics()
            .into_iter()
            .map(|d| (d.name, d.code_name, d.code))
            .collect();
        assert_eq!(
            codes,
            vec![
                ("ability/recorder".to_string(), "start".to_string(), 0),
                ("ability/recorder".to_string(), "stop".to_string(), 0),
            ]
        );
    }

    #[test]
    fn test_stopped_is_terminal() {
        let (_sim, ctx) = setup();
        let handle =
            AbilityHandle::initialize(Box::new(Recorder::default()), ctx, &AbilityConfig::default())
                .unwrap();
        handle.start().unwrap();
        handle.stop();
        let err = handle.start().unwrap_err();
        assert!(matches!(err, AbilityError::Terminated(ref n) if n == "recorder"));
        // Stopping again reports "not running".
        assert!(!handle.stop());
    }

    #[test]
    fn test_stop_before_start_is_noop() {
        let (_sim, ctx) = setup();
        let handle =
            AbilityHandle::initialize(Box::new(Recorder::default()), ctx, &AbilityConfig::default())
                .unwrap();
        assert!(!handle.stop());
        assert_eq!(handle.state(), AbilityState::Initialized);
    }

    #[test]
    fn test_on_stop_runs_after_main_error() {
        let (sim, ctx) = setup();
        let recorder = Recorder {
            fail_main: true,
            ..Default::default()
        };
        let stopped = Arc::clone(&recorder.stopped);
        let handle =
            AbilityHandle::initialize(Box::new(recorder), ctx, &AbilityConfig::default()).unwrap();
        handle.start().unwrap();
        assert!(wait_until(|| handle.state() == AbilityState::Stopped));
        assert_eq!(stopped.load(Ordering::SeqCst), 1);

        let last = sim.diagnostics().pop().unwrap();
        assert_eq!(last.code, -1);
        assert_eq!(last.level, DiagnosticLevel::Error);
        assert!(last.message.contains("sensor offline"));
        assert!(!handle.stop());
    }

    #[test]
    fn test_on_stop_runs_after_main_panic() {
        let (sim, ctx) = setup();
        let recorder = Recorder {
            panic_main: true,
            ..Default::default()
        };
        let stopped = Arc::clone(&recorder.stopped);
        let handle =
            AbilityHandle::initialize(Box::new(recorder), ctx, &AbilityConfig::default()).unwrap();
        handle.start().unwrap();
        assert!(wait_until(|| handle.state() == AbilityState::Stopped));
        assert_eq!(stopped.load(Ordering::SeqCst), 1);
        assert!(sim.diagnostics().pop().unwrap().message.contains("boom"));
    }

    #[test]
    fn test_initialize_error_propagates() {
        struct Refuses;
        impl Ability for Refuses {
            fn initialize(
                &mut self,
                ctx: &AbilityContext,
                _config: &AbilityConfig,
            ) -> Result<(), AbilityError> {
                Err(AbilityError::InitFailed {
                    name: ctx.name().to_string(),
                    reason: "calibration missing".to_string(),
                })
            }
        }
        let (_sim, ctx) = setup();
        let err = AbilityHandle::initialize(Box::new(Refuses), ctx, &AbilityConfig::default())
            .err()
            .unwrap();
        assert!(err.to_string().contains("calibration missing"));
    }
}
