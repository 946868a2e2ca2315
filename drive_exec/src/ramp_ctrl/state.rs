//! Two-sided ramp state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::trace;
use serde::Serialize;

use super::{AxisState, LimitConfig};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Ramp state of both sides of a tank drive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RampState {
    pub left: AxisState,
    pub right: AxisState,
}

/// A flat snapshot of the ramp state, suitable for archiving.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RampSnapshot {
    pub left_target: f64,
    pub left_velocity: f64,
    pub left_accel: f64,
    pub right_target: f64,
    pub right_velocity: f64,
    pub right_accel: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl RampState {
    /// Set the target velocity of both sides.
    ///
    /// Has no effect on the output until the next tick.
    pub fn set_target(&mut self, left: f64, right: f64) {
        self.left.target = left;
        self.right.target = right;
    }

    /// Get the current target pair.
    pub fn target(&self) -> (f64, f64) {
        (self.left.target, self.right.target)
    }

    /// Get the current shaped command pair.
    pub fn command(&self) -> (f64, f64) {
        (self.left.velocity, self.right.velocity)
    }

    /// Returns true if both sides have settled on their targets.
    pub fn is_settled(&self) -> bool {
        self.left.is_settled() && self.right.is_settled()
    }

    /// Advance both sides by one tick, returning the new command pair.
    pub fn tick(&mut self, limits: &LimitConfig) -> (f64, f64) {
        let cmd = (self.left.advance(limits), self.right.advance(limits));

        trace!(
            "Ramp tick: cmd ({:.5}, {:.5}), accel ({:.5}, {:.5})",
            cmd.0, cmd.1, self.left.acceleration, self.right.acceleration
        );

        cmd
    }

    /// Flatten the state into a snapshot.
    pub fn snapshot(&self) -> RampSnapshot {
        RampSnapshot {
            left_target: self.left.target,
            left_velocity: self.left.velocity,
            left_accel: self.left.acceleration,
            right_target: self.right.target,
            right_velocity: self.right.velocity,
            right_accel: self.right.acceleration,
        }
    }
}
