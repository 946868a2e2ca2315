//! # Actuator output
//!
//! The boundary between the drive software and the motor controllers. Velocity
//! commands are written as normalised values between -1 and +1 per side.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::Mutex;

use log::trace;
use util::maths::clamp;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Accepts velocity command pairs for the two sides of the drive.
///
/// Writes are last-write-wins, so applying the same command twice has the same
/// effect as applying it once.
pub trait ActuatorSink: Send + Sync {
    /// Apply a velocity command to the left and right sides.
    fn apply(&self, left: f64, right: f64);
}

/// A single motor controller output.
pub trait MotorOutput: Send {
    /// Set the normalised output of the motor.
    fn set(&mut self, value: f64);

    /// Get the last normalised output written to the motor.
    fn get(&self) -> f64;
}

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

/// The four motors of a tank drive.
struct Motors<M> {
    left_front: M,
    left_rear: M,
    right_front: M,
    right_rear: M,
}

/// A tank drive made of two motors per side.
///
/// All four motors are written under a single lock so that two writers can
/// never interleave their individual motor writes.
pub struct TankDrive<M: MotorOutput> {
    motors: Mutex<Motors<M>>,
}

/// In-memory motor output, clamping values into the normalised range like a
/// real motor controller does.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimMotor {
    value: f64,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl<M: MotorOutput> TankDrive<M> {
    pub fn new(left_front: M, left_rear: M, right_front: M, right_rear: M) -> Self {
        Self {
            motors: Mutex::new(Motors {
                left_front,
                left_rear,
                right_front,
                right_rear,
            }),
        }
    }

    /// Stop all motors.
    pub fn stop(&self) {
        self.apply(0.0, 0.0);
    }

    /// Get the output of the front motor on each side.
    pub fn get_tank_drive(&self) -> (f64, f64) {
        let motors = self.lock_motors();
        (motors.left_front.get(), motors.right_front.get())
    }

    fn lock_motors(&self) -> std::sync::MutexGuard<'_, Motors<M>> {
        // A panic while holding this lock can only come from a motor driver,
        // the last written outputs are still the best knowledge we have.
        match self.motors.lock() {
            Ok(m) => m,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl TankDrive<SimMotor> {
    /// Create a tank drive backed by simulated motors.
    pub fn simulated() -> Self {
        Self::new(
            SimMotor::default(),
            SimMotor::default(),
            SimMotor::default(),
            SimMotor::default(),
        )
    }
}

impl<M: MotorOutput> ActuatorSink for TankDrive<M> {
    fn apply(&self, left: f64, right: f64) {
        let mut motors = self.lock_motors();

        motors.left_front.set(left);
        motors.left_rear.set(left);
        motors.right_front.set(right);
        motors.right_rear.set(right);

        trace!("Tank drive set to ({:.5}, {:.5})", left, right);
    }
}

impl MotorOutput for SimMotor {
    fn set(&mut self, value: f64) {
        self.value = clamp(&value, &-1.0, &1.0);
    }

    fn get(&self) -> f64 {
        self.value
    }
}
