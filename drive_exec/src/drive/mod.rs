//! # Drive module
//!
//! The drive ties joystick input, the ramp controller and the tank drive
//! motors together.
//!
//! Joystick input is converted into a left/right target pair. While ramping is
//! enabled the ramp controller shapes the target before it reaches the motors,
//! otherwise the target is written straight to the motors.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod cmd;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::Arc;

use log::{debug, info, trace};
use util::maths::signed_square;

use crate::{
    actuator::{MotorOutput, TankDrive},
    ramp_ctrl::{LimitConfig, RampController, RampCtrlError},
};

pub use cmd::*;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The drive subsystem.
pub struct Drive<M: MotorOutput + 'static> {
    motors: Arc<TankDrive<M>>,
    ramp: RampController,
    user_control_enabled: bool,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Convert joystick axes into a (left, right) target pair.
///
/// The triggers give the forward speed and the stick's X axis gives the turn,
/// squared to soften small inputs.
pub fn arcade_targets(axes: &JoystickAxes) -> (f64, f64) {
    let forward = axes.0[FORWARD_AXIS] - axes.0[REVERSE_AXIS];
    let turn = signed_square(axes.0[TURN_AXIS]);

    (forward + turn, -forward + turn)
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<M: MotorOutput + 'static> Drive<M> {
    /// Create a new drive with ramping disabled and user control enabled.
    pub fn new(motors: TankDrive<M>, tick_rate_hz: f64) -> Result<Self, RampCtrlError> {
        let motors = Arc::new(motors);
        let ramp = RampController::new(motors.clone(), tick_rate_hz)?;

        Ok(Self {
            motors,
            ramp,
            user_control_enabled: true,
        })
    }

    /// Execute a drive command.
    pub fn exec(&mut self, cmd: &DriveCmd) -> Result<(), RampCtrlError> {
        info!("Executing drive command: {}", cmd.name());
        debug!("    {:?}", cmd);

        match *cmd {
            DriveCmd::Joystick(ref axes) => self.arcade_drive(axes),
            DriveCmd::Tank { left, right } => self.set_target(left, right),
            DriveCmd::EnableRamping => self.enable_ramping(true),
            DriveCmd::DisableRamping => self.enable_ramping(false),
            DriveCmd::UserControl(enabled) => self.set_user_control_enabled(enabled),
            DriveCmd::SetLimits { max_accel, max_jerk } => self.ramp.set_limits(max_accel, max_jerk),
            DriveCmd::Stop => self.stop(),
        }
    }

    /// Drive from joystick input. Ignored while user control is disabled.
    pub fn arcade_drive(&mut self, axes: &JoystickAxes) -> Result<(), RampCtrlError> {
        if !self.user_control_enabled {
            trace!("User control disabled, ignoring joystick input");
            return Ok(())
        }

        let (left, right) = arcade_targets(axes);
        self.set_target(left, right)
    }

    /// Set the target of both sides.
    ///
    /// When not ramping the target is also written to the motors directly.
    pub fn set_target(&mut self, left: f64, right: f64) -> Result<(), RampCtrlError> {
        self.ramp.set_target(left, right)?;
        self.ramp.pass_through(left, right)?;

        Ok(())
    }

    /// Enable or disable user control. Disabling user control also disables
    /// ramping.
    pub fn set_user_control_enabled(&mut self, enabled: bool) -> Result<(), RampCtrlError> {
        if !enabled {
            self.ramp.disable()?;
        }
        self.user_control_enabled = enabled;

        info!("User control {}", if enabled { "enabled" } else { "disabled" });

        Ok(())
    }

    /// Enable or disable ramping of the drive output.
    pub fn enable_ramping(&mut self, enable: bool) -> Result<(), RampCtrlError> {
        if enable {
            self.ramp.enable()
        }
        else {
            self.ramp.disable()
        }
    }

    /// Replace the ramp limits.
    pub fn set_limits(&mut self, limits: LimitConfig) -> Result<(), RampCtrlError> {
        self.ramp.apply_limits(limits)
    }

    /// Stop the drive.
    ///
    /// Both targets are zeroed. When not ramping the motors are stopped at once,
    /// otherwise the ramp brings them down to rest.
    pub fn stop(&mut self) -> Result<(), RampCtrlError> {
        self.set_target(0.0, 0.0)
    }

    /// Stop ramping and cut the motors immediately.
    pub fn halt(&mut self) -> Result<(), RampCtrlError> {
        self.ramp.disable()?;
        self.ramp.set_target(0.0, 0.0)?;
        self.motors.stop();

        Ok(())
    }

    /// Returns true if the drive output is being ramped.
    pub fn is_ramping(&self) -> bool {
        self.ramp.is_running()
    }

    /// Returns true if joystick input is accepted.
    pub fn is_user_control_enabled(&self) -> bool {
        self.user_control_enabled
    }

    /// Get the output of the front motor on each side.
    pub fn get_tank_drive(&self) -> (f64, f64) {
        self.motors.get_tank_drive()
    }

    /// Access the ramp controller.
    pub fn ramp(&self) -> &RampController {
        &self.ramp
    }
}
