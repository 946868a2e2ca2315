//! Periodic worker thread which ticks the ramp while the controller is enabled.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Condvar, Mutex,
    },
    thread,
    time::Instant,
};

use log::{debug, warn};
use util::raise_error;

use super::{controller::Shared, RampCtrlError};

// -----------------------------------------------------------------------------------------------
// DATA STRUCTURES
// -----------------------------------------------------------------------------------------------

/// Set once a worker has stopped touching the sink and the ramp state.
#[derive(Default)]
pub(super) struct WorkerExit {
    exited: Mutex<bool>,
    cond: Condvar,
}

/// Signals the exit when dropped, so a panicking worker is still waited on.
struct ExitGuard(Arc<WorkerExit>);

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl WorkerExit {
    /// Returns true if the worker has exited.
    pub fn has_exited(&self) -> bool {
        match self.exited.lock() {
            Ok(e) => *e,
            Err(p) => *p.into_inner(),
        }
    }

    /// Block until the worker has exited.
    pub fn wait(&self) -> Result<(), RampCtrlError> {
        let mut exited = self.exited.lock()?;
        while !*exited {
            exited = self.cond.wait(exited)?;
        }
        Ok(())
    }

    fn signal(&self) {
        let mut exited = match self.exited.lock() {
            Ok(e) => e,
            Err(p) => p.into_inner(),
        };
        *exited = true;
        self.cond.notify_all();
    }
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
        self.0.signal();
    }
}

// -----------------------------------------------------------------------------------------------
// FUNCTIONS
// -----------------------------------------------------------------------------------------------

/// Tick the ramp at the shared period until `run` is cleared.
///
/// `run` is owned by a single enable/disable cycle, so a worker left behind by
/// an earlier cycle can never be restarted by a later `enable`. `exit` is
/// signalled on the way out, including on panic.
pub(super) fn worker_thread(shared: Arc<Shared>, run: Arc<AtomicBool>, exit: Arc<WorkerExit>) {
    let _exit = ExitGuard(exit);

    debug!("Ramp worker started with period {:?}", shared.period);

    let mut next_tick = Instant::now();

    while run.load(Ordering::Acquire) {
        tick(&shared);

        // Sleep until the next tick is due, disable unparks us early
        next_tick += shared.period;
        let now = Instant::now();

        if next_tick < now {
            warn!(
                "Ramp tick overran by {:.06} s",
                (now - next_tick).as_secs_f64()
            );
            next_tick = now;
            continue;
        }

        while run.load(Ordering::Acquire) {
            match next_tick.checked_duration_since(Instant::now()) {
                Some(d) if d.as_nanos() > 0 => thread::park_timeout(d),
                _ => break,
            }
        }
    }

    debug!("Ramp worker stopped");
}

/// Run one tick, taking a single consistent copy of the limits.
pub(super) fn tick(shared: &Shared) -> (f64, f64) {
    let limits = match shared.limits.read() {
        Ok(l) => *l,
        Err(_) => raise_error!("Ramp limits lock is poisoned, cannot command the drive safely"),
    };

    let cmd = match shared.state.lock() {
        Ok(mut s) => s.tick(&limits),
        Err(_) => raise_error!("Ramp state lock is poisoned, cannot command the drive safely"),
    };

    shared.sink.apply(cmd.0, cmd.1);

    cmd
}
