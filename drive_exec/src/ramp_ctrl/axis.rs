//! Single axis velocity ramp
//!
//! Each side of the drive is ramped independently by an [`AxisState`]. On
//! every tick the axis picks the largest acceleration, out of "accelerate",
//! "hold" and "decelerate", from which it could still come to rest on the
//! target without passing it. This gives a trapezoidal acceleration profile
//! (jerk up, hold at the acceleration limit, jerk down) which is replanned from
//! the current velocity and acceleration every tick, so a changing target never
//! causes a jump in the output.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;
use util::maths::clamp;

use super::LimitConfig;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Ramp state of a single drive axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AxisState {
    /// Velocity the axis is ramping towards.
    pub target: f64,

    /// Current shaped output velocity.
    pub velocity: f64,

    /// Change of velocity applied on the last tick.
    pub acceleration: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl AxisState {
    /// Create a new axis at rest with a zero target.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the axis has settled on its target.
    pub fn is_settled(&self) -> bool {
        self.velocity == self.target && self.acceleration == 0.0
    }

    /// Advance the axis by one tick, returning the new velocity.
    pub fn advance(&mut self, limits: &LimitConfig) -> f64 {
        let error = self.target - self.velocity;

        // Close enough to land on the target in one step, which also covers
        // the already-settled case.
        if error.abs() < limits.max_jerk {
            self.land();
            return self.velocity;
        }

        let dir = error.signum();
        let remaining = error.abs();

        // Acceleration in the direction of the target
        let toward = self.acceleration * dir;

        let next = if toward <= 0.0 {
            // Moving away from the target (or not moving), turn towards it as
            // fast as jerk allows.
            clamp(&(toward + limits.max_jerk), &-limits.max_accel, &limits.max_accel)
        }
        else {
            let accel = (toward + limits.max_jerk).min(limits.max_accel);
            let hold = toward.min(limits.max_accel);
            let decel = (toward - limits.max_jerk).max(0.0).min(limits.max_accel);

            // Take the first option that still leaves room to stop, if none
            // do decelerate as hard as possible.
            [accel, hold]
                .iter()
                .copied()
                .find(|&a| stopping_distance(a, limits.max_jerk) <= remaining - a)
                .unwrap_or(decel)
        };

        if next >= remaining {
            // This step would reach or pass the target
            self.land();
        }
        else {
            self.acceleration = next * dir;
            self.velocity += self.acceleration;
        }

        debug_assert!(
            self.acceleration.abs() <= limits.max_accel,
            "Acceleration {} exceeds limit {}",
            self.acceleration, limits.max_accel
        );

        self.velocity
    }

    /// Snap onto the target and clear the acceleration.
    fn land(&mut self) {
        self.velocity = self.target;
        self.acceleration = 0.0;
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Distance travelled (in velocity) while ramping an acceleration of `accel`
/// down to zero at `max_jerk` per tick, with each reduced acceleration applied
/// for one tick.
///
/// For `accel = n * max_jerk` this is `max_jerk * n * (n - 1) / 2`.
pub(crate) fn stopping_distance(accel: f64, max_jerk: f64) -> f64 {
    if accel <= 0.0 {
        return 0.0
    }

    // Number of further ticks with a positive acceleration
    let steps = (accel / max_jerk).floor();

    (steps * accel - max_jerk * steps * (steps + 1.0) / 2.0).max(0.0)
}
