//! # Limit source
//!
//! Provides the ramp limits from a parameter file, and reloads them whenever
//! the file changes so that the ramp can be tuned while the drive is running.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::{
    path::{Path, PathBuf},
    time::SystemTime,
};

use log::{info, warn};
use serde::Deserialize;
use util::params::{self, LoadError};

use crate::ramp_ctrl::{LimitConfig, RampCtrlError};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for ramp control.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct RampParams {
    /// Rate at which the ramp is ticked.
    ///
    /// Units: hertz
    pub tick_rate_hz: f64,

    /// Maximum acceleration.
    ///
    /// Units: velocity/second
    pub max_accel_per_s: f64,

    /// Maximum jerk, expressed per second in the same way as acceleration.
    pub max_jerk_per_s: f64,
}

/// Watches a ramp parameter file for new limits.
#[derive(Debug)]
pub struct LimitSource {
    path: PathBuf,
    tick_rate_hz: f64,
    last_modified: Option<SystemTime>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum LimitSourceError {
    #[error("Couldn't load ramp parameters: {0}")]
    ParamLoadError(LoadError),

    #[error("Couldn't read the ramp parameter file metadata: {0}")]
    MetadataError(std::io::Error),

    #[error("Ramp parameters are invalid: {0}")]
    InvalidParams(RampCtrlError),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl RampParams {
    /// Get the per-tick limits described by these parameters.
    pub fn limits(&self) -> Result<LimitConfig, RampCtrlError> {
        LimitConfig::from_rates(self.max_accel_per_s, self.max_jerk_per_s, self.tick_rate_hz)
    }
}

impl LimitSource {
    /// Load the parameter file at `path` and start watching it.
    ///
    /// The tick rate is fixed by this first load, later changes to it are
    /// ignored as the ramp worker's period can't change while it's running.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<(Self, RampParams), LimitSourceError> {
        let path = path.as_ref().to_path_buf();
        let last_modified = Some(modified(&path)?);
        let params: RampParams = params::load_from_path(&path)?;

        // Check the limits are usable before handing out the params
        params.limits()?;

        Ok((
            Self {
                path,
                tick_rate_hz: params.tick_rate_hz,
                last_modified,
            },
            params,
        ))
    }

    /// Check the file for changes, returning the new limits if it changed.
    ///
    /// If the changed file is invalid an error is returned and the file is not
    /// read again until it next changes.
    pub fn poll(&mut self) -> Result<Option<LimitConfig>, LimitSourceError> {
        let modified = modified(&self.path)?;

        if self.last_modified == Some(modified) {
            return Ok(None)
        }
        self.last_modified = Some(modified);

        let params: RampParams = params::load_from_path(&self.path)?;

        if params.tick_rate_hz != self.tick_rate_hz {
            warn!(
                "Ramp tick rate cannot be changed while running, keeping {} Hz (file has {} Hz)",
                self.tick_rate_hz, params.tick_rate_hz
            );
        }

        let limits = LimitConfig::from_rates(
            params.max_accel_per_s,
            params.max_jerk_per_s,
            self.tick_rate_hz,
        )?;

        info!("Ramp limits reloaded from {:?}", self.path);

        Ok(Some(limits))
    }

    /// The tick rate the limits are converted with.
    pub fn tick_rate_hz(&self) -> f64 {
        self.tick_rate_hz
    }
}

fn modified(path: &Path) -> Result<SystemTime, LimitSourceError> {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(LimitSourceError::MetadataError)
}

impl From<LoadError> for LimitSourceError {
    fn from(e: LoadError) -> Self {
        Self::ParamLoadError(e)
    }
}

impl From<RampCtrlError> for LimitSourceError {
    fn from(e: RampCtrlError) -> Self {
        Self::InvalidParams(e)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::{fs, time::Duration};

    fn write_params(path: &Path, accel: f64, jerk: f64, modified: SystemTime) {
        fs::write(
            path,
            format!(
                "tick_rate_hz = 200.0\nmax_accel_per_s = {:?}\nmax_jerk_per_s = {:?}\n",
                accel, jerk
            ),
        )
        .unwrap();

        // Set the time explicitly as filesystem timestamps can be coarse
        let file = fs::OpenOptions::new().write(true).open(path).unwrap();
        file.set_modified(modified).unwrap();
    }

    #[test]
    fn test_load_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ramp_ctrl.toml");
        let t0 = SystemTime::now() - Duration::from_secs(60);

        write_params(&path, 1.0, 0.1, t0);

        let (mut source, params) = LimitSource::new(&path).unwrap();
        assert_eq!(params.tick_rate_hz, 200.0);
        assert_eq!(params.limits().unwrap(), LimitConfig::default());
        assert_eq!(source.tick_rate_hz(), 200.0);

        // Unchanged file gives nothing new
        assert!(source.poll().unwrap().is_none());

        write_params(&path, 2.0, 0.2, t0 + Duration::from_secs(10));
        assert_eq!(
            source.poll().unwrap(),
            Some(LimitConfig::new(0.01, 0.001).unwrap())
        );
        assert!(source.poll().unwrap().is_none());

        // Invalid limits are reported once
        write_params(&path, -2.0, 0.2, t0 + Duration::from_secs(20));
        assert!(matches!(source.poll(), Err(LimitSourceError::InvalidParams(_))));
        assert!(source.poll().unwrap().is_none());
    }

    #[test]
    fn test_invalid_initial_params() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ramp_ctrl.toml");

        write_params(&path, 1.0, 0.0, SystemTime::now());
        assert!(matches!(
            LimitSource::new(&path),
            Err(LimitSourceError::InvalidParams(_))
        ));

        assert!(matches!(
            LimitSource::new(dir.path().join("missing.toml")),
            Err(LimitSourceError::MetadataError(_))
        ));
    }
}
