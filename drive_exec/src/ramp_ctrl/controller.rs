//! Thread-safe ramp controller handle and its enable/disable lifecycle

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, RwLock,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use log::{debug, info, warn};
use util::time::period_from_hz;

use crate::actuator::ActuatorSink;

use super::{
    worker::{self, WorkerExit},
    ControllerMode, LimitConfig, RampCtrlError, RampState,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Jerk-limited ramp controller for a tank drive.
///
/// While enabled a worker thread ticks the ramp at a fixed rate and writes the
/// shaped command to the sink. While stopped the controller writes nothing, and
/// raw commands may be sent through [`RampController::pass_through`] instead.
///
/// Disabling keeps the ramp state, so re-enabling continues from the last
/// shaped velocity and acceleration rather than from rest.
pub struct RampController {
    shared: Arc<Shared>,

    /// Serialises enable, disable and pass through writes.
    lifecycle: Mutex<Lifecycle>,
}

/// Data shared between the controller handle and its worker.
pub(super) struct Shared {
    pub state: Mutex<RampState>,
    pub limits: RwLock<LimitConfig>,
    pub sink: Arc<dyn ActuatorSink>,
    pub period: Duration,

    /// Mirrors the lifecycle mode so it can be read without the lifecycle
    /// lock, for example from inside the sink.
    pub ramping: AtomicBool,
}

struct Lifecycle {
    mode: ControllerMode,
    worker: Option<Worker>,
}

struct Worker {
    run: Arc<AtomicBool>,
    exit: Arc<WorkerExit>,
    jh: JoinHandle<()>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl RampController {
    /// Create a new stopped controller with default limits, ticking at
    /// `tick_rate_hz` once enabled.
    pub fn new(sink: Arc<dyn ActuatorSink>, tick_rate_hz: f64) -> Result<Self, RampCtrlError> {
        let period = period_from_hz(tick_rate_hz).ok_or_else(|| {
            RampCtrlError::InvalidConfig(format!(
                "tick_rate_hz must be positive and finite, got {}",
                tick_rate_hz
            ))
        })?;

        Ok(Self {
            shared: Arc::new(Shared {
                state: Mutex::new(RampState::default()),
                limits: RwLock::new(LimitConfig::default()),
                sink,
                period,
                ramping: AtomicBool::new(false),
            }),
            lifecycle: Mutex::new(Lifecycle {
                mode: ControllerMode::Stopped,
                worker: None,
            }),
        })
    }

    /// Set the target velocity of both sides, taking effect on the next tick.
    pub fn set_target(&self, left: f64, right: f64) -> Result<(), RampCtrlError> {
        self.shared.state.lock()?.set_target(left, right);
        Ok(())
    }

    /// Replace the limits. Invalid limits are rejected and the previous limits
    /// stay in effect.
    pub fn set_limits(&self, max_accel: f64, max_jerk: f64) -> Result<(), RampCtrlError> {
        let limits = match LimitConfig::new(max_accel, max_jerk) {
            Ok(l) => l,
            Err(e) => {
                warn!("Rejected ramp limits: {}", e);
                return Err(e)
            }
        };

        self.apply_limits(limits)
    }

    /// Replace the limits with an existing configuration.
    pub fn apply_limits(&self, limits: LimitConfig) -> Result<(), RampCtrlError> {
        limits.validate()?;

        *self.shared.limits.write()? = limits;
        info!(
            "Ramp limits set: max_accel = {}, max_jerk = {}",
            limits.max_accel, limits.max_jerk
        );

        Ok(())
    }

    /// Get the limits currently in effect.
    pub fn limits(&self) -> Result<LimitConfig, RampCtrlError> {
        Ok(*self.shared.limits.read()?)
    }

    /// Start ramping. Does nothing if already ramping.
    pub fn enable(&self) -> Result<(), RampCtrlError> {
        let mut lifecycle = loop {
            let mut lifecycle = self.lifecycle.lock()?;

            if lifecycle.mode == ControllerMode::Ramping {
                debug!("Ramp enable requested while already ramping, ignoring");
                return Ok(())
            }

            // A worker which is still stopping, or was left over by a disable
            // issued from the worker itself, must be gone before a new one
            // starts.
            match lifecycle.worker.take() {
                None => break lifecycle,
                Some(old) if old.is_current() || old.exit.has_exited() => {
                    Self::reap(old)?;
                    break lifecycle
                }
                Some(old) => {
                    let exit = old.exit.clone();
                    lifecycle.worker = Some(old);
                    drop(lifecycle);
                    exit.wait()?;
                }
            }
        };

        let run = Arc::new(AtomicBool::new(true));
        let exit = Arc::new(WorkerExit::default());
        let shared = self.shared.clone();
        let worker_run = run.clone();
        let worker_exit = exit.clone();

        let jh = thread::Builder::new()
            .name("ramp_ctrl::worker".into())
            .spawn(move || worker::worker_thread(shared, worker_run, worker_exit))
            .map_err(RampCtrlError::WorkerSpawn)?;

        lifecycle.worker = Some(Worker { run, exit, jh });
        lifecycle.mode = ControllerMode::Ramping;
        self.shared.ramping.store(true, Ordering::Release);

        info!("Ramping enabled");

        Ok(())
    }

    /// Stop ramping. Does nothing if already stopped.
    ///
    /// Once this returns the controller makes no further writes to the sink,
    /// even if another caller started the disable. The one exception is a
    /// disable issued from inside the sink by the worker itself, in which case
    /// the tick in progress finishes normally.
    pub fn disable(&self) -> Result<(), RampCtrlError> {
        let mut lifecycle = self.lifecycle.lock()?;

        let was_ramping = lifecycle.mode == ControllerMode::Ramping;
        lifecycle.mode = ControllerMode::Stopped;
        self.shared.ramping.store(false, Ordering::Release);

        let exit = match lifecycle.worker.as_ref() {
            Some(worker) => {
                worker.run.store(false, Ordering::Release);
                worker.jh.thread().unpark();

                // Can't wait for ourselves, the next enable reaps this worker
                if worker.is_current() {
                    None
                }
                else {
                    Some(worker.exit.clone())
                }
            }
            None => None,
        };

        // The worker may be inside a sink which calls back into the
        // controller, so it is never waited on with the lifecycle held.
        drop(lifecycle);

        if let Some(exit) = exit {
            exit.wait()?;

            let mut lifecycle = self.lifecycle.lock()?;
            let exited = lifecycle
                .worker
                .as_ref()
                .map_or(false, |w| w.exit.has_exited());

            if exited {
                if let Some(worker) = lifecycle.worker.take() {
                    Self::reap(worker)?;
                }
            }
        }

        if was_ramping {
            info!("Ramping disabled");
        }
        else {
            debug!("Ramp disable requested while already stopped, ignoring");
        }

        Ok(())
    }

    /// Returns true if the controller is ramping.
    pub fn is_running(&self) -> bool {
        self.shared.ramping.load(Ordering::Acquire)
    }

    /// Get the current mode of the controller.
    pub fn mode(&self) -> ControllerMode {
        if self.is_running() {
            ControllerMode::Ramping
        }
        else {
            ControllerMode::Stopped
        }
    }

    /// Get the last shaped command pair.
    pub fn current_command(&self) -> Result<(f64, f64), RampCtrlError> {
        Ok(self.shared.state.lock()?.command())
    }

    /// Get a copy of the full ramp state.
    pub fn state(&self) -> Result<RampState, RampCtrlError> {
        Ok(*self.shared.state.lock()?)
    }

    /// Write a raw command straight to the sink, only if the controller is
    /// stopped.
    ///
    /// Returns true if the command was written. Holding the lifecycle lock for
    /// the write means ramping cannot start part way through it, so the sink
    /// must not call back into the controller from this write.
    pub fn pass_through(&self, left: f64, right: f64) -> Result<bool, RampCtrlError> {
        let lifecycle = self.lifecycle.lock()?;

        if lifecycle.mode == ControllerMode::Stopped {
            self.shared.sink.apply(left, right);
            Ok(true)
        }
        else {
            Ok(false)
        }
    }

    /// Run a single tick immediately, outside of the worker.
    ///
    /// Only allowed while stopped, so that the worker's rate is never doubled.
    /// As with [`RampController::pass_through`] the sink must not call back
    /// into the controller from this write.
    pub fn step(&self) -> Result<(f64, f64), RampCtrlError> {
        let lifecycle = self.lifecycle.lock()?;

        if lifecycle.mode == ControllerMode::Ramping {
            return Err(RampCtrlError::StepWhileRamping)
        }

        Ok(worker::tick(&self.shared))
    }

    /// Join a stopped worker, unless it is the calling thread.
    fn reap(worker: Worker) -> Result<(), RampCtrlError> {
        if worker.is_current() {
            return Ok(())
        }

        worker.jh.join().map_err(|_| RampCtrlError::WorkerPanicked)
    }
}

impl Worker {
    fn is_current(&self) -> bool {
        self.jh.thread().id() == thread::current().id()
    }
}

impl Drop for RampController {
    fn drop(&mut self) {
        if let Err(e) = self.disable() {
            warn!("Could not stop the ramp worker cleanly: {}", e);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::time::Instant;

    /// Sink which records every command it is given.
    #[derive(Default)]
    struct RecordingSink {
        cmds: Mutex<Vec<(f64, f64)>>,
    }

    impl RecordingSink {
        fn count(&self) -> usize {
            self.cmds.lock().unwrap().len()
        }

        fn get(&self, i: usize) -> (f64, f64) {
            self.cmds.lock().unwrap()[i]
        }

        /// Wait until at least `n` commands have been recorded.
        fn wait_for(&self, n: usize) {
            let start = Instant::now();
            while self.count() < n {
                assert!(start.elapsed() < Duration::from_secs(5), "Timed out waiting for ticks");
                thread::sleep(Duration::from_millis(1));
            }
        }
    }

    impl ActuatorSink for RecordingSink {
        fn apply(&self, left: f64, right: f64) {
            self.cmds.lock().unwrap().push((left, right));
        }
    }

    fn controller(rate_hz: f64) -> (RampController, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        let ctrl = RampController::new(sink.clone(), rate_hz).unwrap();
        (ctrl, sink)
    }

    #[test]
    fn test_new_controller() {
        let (ctrl, sink) = controller(200.0);

        assert!(!ctrl.is_running());
        assert_eq!(ctrl.mode(), ControllerMode::Stopped);
        assert_eq!(ctrl.current_command().unwrap(), (0.0, 0.0));
        assert_eq!(ctrl.limits().unwrap(), LimitConfig::default());
        assert_eq!(sink.count(), 0);

        assert!(matches!(
            RampController::new(sink, 0.0),
            Err(RampCtrlError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_invalid_limits_keep_previous() {
        let (ctrl, _sink) = controller(200.0);

        ctrl.set_limits(0.01, 0.001).unwrap();
        assert!(ctrl.set_limits(0.0, 0.001).is_err());
        assert!(ctrl.set_limits(0.01, -1.0).is_err());
        assert!(ctrl.apply_limits(LimitConfig { max_accel: 0.01, max_jerk: 0.0 }).is_err());

        assert_eq!(ctrl.limits().unwrap(), LimitConfig::new(0.01, 0.001).unwrap());
    }

    #[test]
    fn test_stopped_controller_writes_nothing() {
        let (ctrl, sink) = controller(200.0);

        ctrl.set_target(1.0, 1.0).unwrap();
        thread::sleep(Duration::from_millis(20));

        assert_eq!(sink.count(), 0);
        assert_eq!(ctrl.current_command().unwrap(), (0.0, 0.0));
    }

    #[test]
    fn test_pass_through_only_when_stopped() {
        let (ctrl, sink) = controller(200.0);

        assert!(ctrl.pass_through(0.3, -0.3).unwrap());
        assert_eq!(sink.get(0), (0.3, -0.3));

        ctrl.enable().unwrap();
        assert!(!ctrl.pass_through(0.9, 0.9).unwrap());

        ctrl.disable().unwrap();
        assert!(ctrl.pass_through(0.1, 0.1).unwrap());

        let last = sink.count() - 1;
        assert_eq!(sink.get(last), (0.1, 0.1));
        assert!(!sink.cmds.lock().unwrap().contains(&(0.9, 0.9)));
    }

    #[test]
    fn test_step() {
        let (ctrl, sink) = controller(200.0);
        ctrl.set_limits(0.005, 0.0005).unwrap();
        ctrl.set_target(1.0, -1.0).unwrap();

        assert_eq!(ctrl.step().unwrap(), (0.0005, -0.0005));
        assert_eq!(sink.get(0), (0.0005, -0.0005));

        ctrl.enable().unwrap();
        assert!(matches!(ctrl.step(), Err(RampCtrlError::StepWhileRamping)));
        ctrl.disable().unwrap();
    }

    #[test]
    fn test_enable_is_idempotent() {
        let (ctrl, sink) = controller(100.0);
        ctrl.set_target(0.5, 0.5).unwrap();

        ctrl.enable().unwrap();
        ctrl.enable().unwrap();
        assert!(ctrl.is_running());

        let start = Instant::now();
        thread::sleep(Duration::from_millis(200));
        ctrl.disable().unwrap();
        let elapsed = start.elapsed();

        // A second worker would double the tick count
        let max_ticks = (elapsed.as_secs_f64() * 100.0).ceil() as usize + 2;
        let ticks = sink.count();
        assert!(ticks > 0);
        assert!(ticks <= max_ticks, "{} ticks in {:?}", ticks, elapsed);
    }

    #[test]
    fn test_disable_stops_writes() {
        let (ctrl, sink) = controller(200.0);
        ctrl.set_target(1.0, 1.0).unwrap();

        ctrl.enable().unwrap();
        sink.wait_for(3);
        ctrl.disable().unwrap();
        ctrl.disable().unwrap();
        assert!(!ctrl.is_running());

        let count = sink.count();
        thread::sleep(Duration::from_millis(50));
        assert_eq!(sink.count(), count);
    }

    #[test]
    fn test_reenable_resumes_from_last_state() {
        let (ctrl, sink) = controller(200.0);
        ctrl.set_target(1.0, -1.0).unwrap();

        ctrl.enable().unwrap();
        sink.wait_for(5);
        ctrl.disable().unwrap();

        let paused = ctrl.state().unwrap();
        let emitted = sink.count();
        assert!(paused.left.velocity > 0.0 && paused.left.velocity < 1.0);
        assert_eq!(sink.get(emitted - 1), paused.command());

        // Nothing moves while stopped
        thread::sleep(Duration::from_millis(50));
        assert_eq!(ctrl.state().unwrap(), paused);

        ctrl.enable().unwrap();
        sink.wait_for(emitted + 1);
        ctrl.disable().unwrap();

        // The first tick after re-enabling continues the paused ramp
        let mut expected = paused;
        let expected_cmd = expected.tick(&ctrl.limits().unwrap());
        assert_eq!(sink.get(emitted), expected_cmd);
    }

    #[test]
    fn test_drop_stops_worker() {
        let sink = Arc::new(RecordingSink::default());
        {
            let ctrl = RampController::new(sink.clone(), 200.0).unwrap();
            ctrl.set_target(1.0, 1.0).unwrap();
            ctrl.enable().unwrap();
            sink.wait_for(2);
        }

        let count = sink.count();
        thread::sleep(Duration::from_millis(50));
        assert_eq!(sink.count(), count);
    }

    /// Sink which disables its own controller on the third command, after
    /// waiting for `delay`.
    struct SelfStoppingSink {
        ctrl: Mutex<Option<Arc<RampController>>>,
        count: Mutex<usize>,
        delay: Duration,
        disabling: AtomicBool,
    }

    impl SelfStoppingSink {
        fn new(delay: Duration) -> Self {
            Self {
                ctrl: Mutex::new(None),
                count: Mutex::new(0),
                delay,
                disabling: AtomicBool::new(false),
            }
        }

        fn count(&self) -> usize {
            *self.count.lock().unwrap()
        }
    }

    impl ActuatorSink for SelfStoppingSink {
        fn apply(&self, _left: f64, _right: f64) {
            let count = {
                let mut count = self.count.lock().unwrap();
                *count += 1;
                *count
            };

            if count == 3 {
                self.disabling.store(true, Ordering::Release);
                thread::sleep(self.delay);

                let ctrl = self.ctrl.lock().unwrap().clone();
                if let Some(ctrl) = ctrl {
                    ctrl.disable().unwrap();
                }
            }
        }
    }

    fn self_stopping(delay: Duration) -> (Arc<RampController>, Arc<SelfStoppingSink>) {
        let sink = Arc::new(SelfStoppingSink::new(delay));
        let ctrl = Arc::new(RampController::new(sink.clone(), 200.0).unwrap());
        *sink.ctrl.lock().unwrap() = Some(ctrl.clone());
        (ctrl, sink)
    }

    #[test]
    fn test_disable_from_sink() {
        let (ctrl, sink) = self_stopping(Duration::from_millis(0));

        ctrl.enable().unwrap();

        let start = Instant::now();
        while ctrl.is_running() {
            assert!(start.elapsed() < Duration::from_secs(5));
            thread::sleep(Duration::from_millis(1));
        }

        thread::sleep(Duration::from_millis(50));
        assert_eq!(sink.count(), 3);

        // Re-enabling reaps the old worker and starts a new one
        ctrl.enable().unwrap();
        assert!(ctrl.is_running());
        ctrl.disable().unwrap();

        // Break the reference cycle
        sink.ctrl.lock().unwrap().take();
    }

    #[test]
    fn test_disable_races_disable_from_sink() {
        let (ctrl, sink) = self_stopping(Duration::from_millis(50));

        ctrl.enable().unwrap();

        let start = Instant::now();
        while !sink.disabling.load(Ordering::Acquire) {
            assert!(start.elapsed() < Duration::from_secs(5), "Timed out waiting for ticks");
            thread::sleep(Duration::from_millis(1));
        }

        // Disable from another thread while the sink is about to disable too
        let (tx, rx) = std::sync::mpsc::channel();
        let other = ctrl.clone();
        thread::spawn(move || {
            tx.send(other.disable().is_ok()).ok();
        });

        let ok = rx
            .recv_timeout(Duration::from_secs(3))
            .expect("disable did not return while the sink was disabling");
        assert!(ok);
        assert!(!ctrl.is_running());

        // The external disable waited for the worker, so nothing more is written
        assert_eq!(sink.count(), 3);
        thread::sleep(Duration::from_millis(50));
        assert_eq!(sink.count(), 3);

        // A worker which stopped under a racing disable can still be restarted
        ctrl.enable().unwrap();
        assert!(ctrl.is_running());
        ctrl.disable().unwrap();

        sink.ctrl.lock().unwrap().take();
    }
}
