//! Acceleration and jerk limits for the ramp controller

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use super::RampCtrlError;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Nominal rate of the control loop.
///
/// Units: hertz
pub const DEFAULT_TICK_RATE_HZ: f64 = 200.0;

/// Default maximum acceleration, expressed per second and divided by the tick
/// rate to get the per-tick limit.
///
/// Units: velocity/second
pub const DEFAULT_MAX_ACCEL_PER_S: f64 = 1.0;

/// Default maximum jerk, expressed per second in the same way as
/// [`DEFAULT_MAX_ACCEL_PER_S`].
pub const DEFAULT_MAX_JERK_PER_S: f64 = 0.1;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Limits applied to each axis of the ramp controller.
///
/// Both limits are expressed per control tick, so they only have meaning
/// together with the rate the controller is ticked at. Use
/// [`LimitConfig::from_rates`] to build them from per-second values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LimitConfig {
    /// Maximum change in velocity per tick.
    ///
    /// Units: velocity/tick
    pub max_accel: f64,

    /// Maximum change in acceleration per tick.
    ///
    /// Units: velocity/tick/tick
    pub max_jerk: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LimitConfig {
    /// Create a new limit configuration, rejecting non-positive or non-finite
    /// limits.
    ///
    /// A jerk larger than the acceleration limit is accepted, in which case
    /// acceleration reaches its limit in a single tick.
    pub fn new(max_accel: f64, max_jerk: f64) -> Result<Self, RampCtrlError> {
        if !(max_accel.is_finite() && max_accel > 0.0) {
            return Err(RampCtrlError::InvalidConfig(format!(
                "max_accel must be positive and finite, got {}", max_accel
            )))
        }
        if !(max_jerk.is_finite() && max_jerk > 0.0) {
            return Err(RampCtrlError::InvalidConfig(format!(
                "max_jerk must be positive and finite, got {}", max_jerk
            )))
        }

        Ok(Self { max_accel, max_jerk })
    }

    /// Build a limit configuration from per-second limits and the rate the
    /// controller will be ticked at.
    pub fn from_rates(
        accel_per_s: f64,
        jerk_per_s: f64,
        tick_rate_hz: f64
    ) -> Result<Self, RampCtrlError> {
        if !(tick_rate_hz.is_finite() && tick_rate_hz > 0.0) {
            return Err(RampCtrlError::InvalidConfig(format!(
                "tick_rate_hz must be positive and finite, got {}", tick_rate_hz
            )))
        }

        Self::new(accel_per_s / tick_rate_hz, jerk_per_s / tick_rate_hz)
    }

    /// Check that the limits are still valid, used when limits arrive through
    /// deserialisation rather than [`LimitConfig::new`].
    pub fn validate(&self) -> Result<(), RampCtrlError> {
        Self::new(self.max_accel, self.max_jerk).map(|_| ())
    }
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            max_accel: DEFAULT_MAX_ACCEL_PER_S / DEFAULT_TICK_RATE_HZ,
            max_jerk: DEFAULT_MAX_JERK_PER_S / DEFAULT_TICK_RATE_HZ,
        }
    }
}
