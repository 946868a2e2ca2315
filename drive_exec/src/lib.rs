//! # Drive library.
//!
//! This library allows the drive executable (and tests) to access items defined inside the drive
//! crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Actuator output - the motors commanded by the drive
pub mod actuator;

/// Drive module - converts joystick input into targets and routes them to the motors
pub mod drive;

/// Limit source - provides and hot reloads the ramp limits from a parameter file
pub mod limit_source;

/// Drive monitor - archives the drive state each cycle
pub mod monitor;

/// Ramp control module - jerk limited smoothing of the drive velocity commands
pub mod ramp_ctrl;
