//! # Drive monitor
//!
//! Records the state of the drive once per main loop cycle into the session
//! archive, mirroring what would be shown on a driver dashboard.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;
use util::{
    archive::{Archived, Archiver},
    session::Session,
};

use crate::{actuator::MotorOutput, drive::Drive, ramp_ctrl::RampCtrlError};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// One archived sample of the drive state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DriveRecord {
    pub time_s: f64,
    pub ramping: bool,
    pub left_target: f64,
    pub right_target: f64,
    pub left_velocity: f64,
    pub right_velocity: f64,
    pub left_accel: f64,
    pub right_accel: f64,
    pub left_output: f64,
    pub right_output: f64,
}

/// Archives drive records to `drive/drive_state.csv` in the session.
pub struct DriveMonitor {
    arch: Archiver,
    record: Option<DriveRecord>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl DriveRecord {
    /// Sample the drive.
    pub fn sample<M: MotorOutput + 'static>(
        time_s: f64,
        drive: &Drive<M>
    ) -> Result<Self, RampCtrlError> {
        let snap = drive.ramp().state()?.snapshot();
        let (left_output, right_output) = drive.get_tank_drive();

        Ok(Self {
            time_s,
            ramping: drive.is_ramping(),
            left_target: snap.left_target,
            right_target: snap.right_target,
            left_velocity: snap.left_velocity,
            right_velocity: snap.right_velocity,
            left_accel: snap.left_accel,
            right_accel: snap.right_accel,
            left_output,
            right_output,
        })
    }
}

impl DriveMonitor {
    pub fn new(session: &Session) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            arch: Archiver::from_path(session, "drive/drive_state.csv")?,
            record: None,
        })
    }

    /// Take a new sample of the drive, to be written on the next `write`.
    pub fn update<M: MotorOutput + 'static>(
        &mut self,
        time_s: f64,
        drive: &Drive<M>
    ) -> Result<(), RampCtrlError> {
        self.record = Some(DriveRecord::sample(time_s, drive)?);
        Ok(())
    }

    /// The most recent sample.
    pub fn last_record(&self) -> Option<&DriveRecord> {
        self.record.as_ref()
    }
}

impl Archived for DriveMonitor {
    fn write(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(record) = self.record.take() {
            self.arch.serialise(record)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::actuator::TankDrive;

    #[test]
    fn test_monitor_archives_samples() {
        let dir = tempfile::tempdir().unwrap();
        let session = Session {
            session_root: dir.path().to_path_buf(),
            arch_root: dir.path().join("arch"),
            log_file_path: dir.path().join("drive_exec.log"),
        };

        let mut drive = Drive::new(TankDrive::simulated(), 200.0).unwrap();
        let mut monitor = DriveMonitor::new(&session).unwrap();

        drive.set_target(0.5, -0.5).unwrap();
        monitor.update(0.1, &drive).unwrap();

        let record = *monitor.last_record().unwrap();
        assert!(!record.ramping);
        assert_eq!(record.left_target, 0.5);
        assert_eq!(record.left_output, 0.5);
        assert_eq!(record.right_output, -0.5);
        assert_eq!(record.left_velocity, 0.0);

        monitor.write().unwrap();
        // Nothing new to write
        monitor.write().unwrap();

        let contents = std::fs::read_to_string(
            dir.path().join("arch/drive/drive_state.csv")
        ).unwrap();
        let lines: Vec<&str> = contents.lines().collect();

        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("time_s,ramping,left_target"));
        assert!(lines[1].starts_with("0.1,false,0.5,-0.5"));
    }
}
