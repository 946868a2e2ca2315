//! # Ramp control module
//!
//! Ramp control smooths the velocity demands sent to the two sides of the
//! drive. Each side's target velocity is approached under a limit on
//! acceleration (change of velocity per tick) and jerk (change of acceleration
//! per tick), with the shaped command sent to an [`ActuatorSink`] once per tick
//! by a background worker while the controller is enabled.
//!
//! The controller is open loop, it shapes the target and has no knowledge of
//! the velocity the drive actually achieves.
//!
//! [`ActuatorSink`]: crate::actuator::ActuatorSink

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod axis;
mod controller;
mod limits;
mod state;
mod worker;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::PoisonError;

use serde::Serialize;

// Internal
pub use axis::*;
pub use controller::*;
pub use limits::*;
pub use state::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Whether the controller is actively shaping the drive output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ControllerMode {
    /// No ticks run and the controller writes nothing to the sink.
    Stopped,
    /// The worker is ticking and writing the shaped command to the sink.
    Ramping,
}

/// Possible errors that can occur during RampCtrl operation.
#[derive(Debug, thiserror::Error)]
pub enum RampCtrlError {
    #[error("Invalid ramp configuration: {0}")]
    InvalidConfig(String),

    #[error("Ramp controller sync primitive is poisoned")]
    SyncPoisoned,

    #[error("Could not spawn the ramp worker thread: {0}")]
    WorkerSpawn(std::io::Error),

    #[error("The ramp worker thread panicked")]
    WorkerPanicked,

    #[error("Cannot step the ramp manually while the worker is running")]
    StepWhileRamping,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl<T> From<PoisonError<T>> for RampCtrlError {
    fn from(_: PoisonError<T>) -> Self {
        Self::SyncPoisoned
    }
}
