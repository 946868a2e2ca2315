//! Commands accepted by the drive

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of axes reported by the joystick.
pub const NUM_JOYSTICK_AXES: usize = 6;

/// Axis used for turning (left stick X).
pub const TURN_AXIS: usize = 0;

/// Axis used for driving forwards (right trigger).
pub const FORWARD_AXIS: usize = 4;

/// Axis used for driving backwards (left trigger).
pub const REVERSE_AXIS: usize = 5;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Raw joystick axis values, each between -1 and +1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct JoystickAxes(pub [f64; NUM_JOYSTICK_AXES]);

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A command to the drive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DriveCmd {
    /// New joystick input, converted into targets arcade style.
    Joystick(JoystickAxes),

    /// Set the target of each side directly.
    Tank { left: f64, right: f64 },

    /// Start ramping the drive output.
    EnableRamping,

    /// Stop ramping the drive output, raw targets are written directly.
    DisableRamping,

    /// Enable or disable user (joystick) control.
    UserControl(bool),

    /// Replace the ramp limits.
    ///
    /// Units: per tick
    SetLimits { max_accel: f64, max_jerk: f64 },

    /// Stop the motors and zero the targets.
    Stop,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl DriveCmd {
    /// Short name of the command, used when reporting which command is running.
    pub fn name(&self) -> &'static str {
        match self {
            DriveCmd::Joystick(_) => "Joystick",
            DriveCmd::Tank { .. } => "Tank",
            DriveCmd::EnableRamping => "EnableRamping",
            DriveCmd::DisableRamping => "DisableRamping",
            DriveCmd::UserControl(_) => "UserControl",
            DriveCmd::SetLimits { .. } => "SetLimits",
            DriveCmd::Stop => "Stop",
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_cmds() {
        let cmd: DriveCmd = serde_json::from_str(
            r#"{"Joystick": [0.5, 0.0, 0.0, 0.0, 1.0, 0.0]}"#
        ).unwrap();
        assert_eq!(cmd, DriveCmd::Joystick(JoystickAxes([0.5, 0.0, 0.0, 0.0, 1.0, 0.0])));

        let cmd: DriveCmd = serde_json::from_str(r#"{"Tank": {"left": 0.2, "right": -0.2}}"#).unwrap();
        assert_eq!(cmd, DriveCmd::Tank { left: 0.2, right: -0.2 });

        let cmd: DriveCmd = serde_json::from_str(r#""EnableRamping""#).unwrap();
        assert_eq!(cmd.name(), "EnableRamping");

        let cmd: DriveCmd = serde_json::from_str(r#"{"UserControl": false}"#).unwrap();
        assert_eq!(cmd, DriveCmd::UserControl(false));

        // Joysticks always report every axis
        assert!(serde_json::from_str::<DriveCmd>(r#"{"Joystick": [0.5]}"#).is_err());
    }
}
