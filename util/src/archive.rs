//! Struct archiving functionality
//!
//! To add archiving functionality to a struct implement the `Archived` trait.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use std::path::Path;
use std::fs::{File, OpenOptions};
use csv::WriterBuilder;
pub use csv::Writer;

// Internal imports
use crate::session::Session;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An object used to write CSV archive files.
#[derive(Default)]
pub struct Archiver {
    writer: Option<Writer<File>>
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A trait which enables a struct to be archived as a timestamped csv.
///
/// To implement this trait, the struct shall have an `Archiver` member which
/// shall be setup in the struct's `init` or `new` functions. Records must be
/// flat (no nested structs) as the csv writer cannot flatten them.
pub trait Archived {
    /// Write the archives for this struct
    fn write(&mut self) -> Result<(), Box<dyn std::error::Error>>;
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Archiver {
    /// Create a new archiver from a paricular path relative to the session's
    /// archive root.
    pub fn from_path<P: AsRef<Path>>(
        session: &Session, path: P
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let mut session_path = session.arch_root.clone();
        session_path.push(path);

        // Create any missing parent directories
        if let Some(parent) = session_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        
        // Create the file if it does not exist
        std::fs::File::create(session_path.clone())?;

        // Open the file in append mode
        let file = match OpenOptions::new()
            .append(true).open(session_path)
        {
            Ok(f) => f,
            Err(e) => return Err(Box::new(e))
        };

        let w = WriterBuilder::new()
            .has_headers(true)
            .from_writer(file);

        Ok(Self {
            writer: Some(w)
        })
    }

    /// Serialise a record into the archive.
    pub fn serialise<T: serde::Serialize>(
        &mut self, record: T
    ) -> Result<(), Box<dyn std::error::Error>> {
        match self.writer {
            Some(ref mut w) => {
                w.serialize(record)?;
                w.flush()?
            },
            None => return Err("Archiver has not been initialised".into())
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Sample {
        time_s: f64,
        left: f64,
        right: f64,
    }

    #[test]
    fn test_archive_records() {
        let dir = tempfile::tempdir().unwrap();
        let session = Session {
            session_root: dir.path().to_path_buf(),
            arch_root: dir.path().join("arch"),
            log_file_path: dir.path().join("test.log"),
        };

        let mut arch = Archiver::from_path(&session, "drive/cmd.csv").unwrap();
        arch.serialise(Sample { time_s: 0.0, left: 0.5, right: -0.5 }).unwrap();
        arch.serialise(Sample { time_s: 0.02, left: 0.25, right: 0.0 }).unwrap();

        let contents = std::fs::read_to_string(
            dir.path().join("arch").join("drive").join("cmd.csv")
        ).unwrap();

        assert_eq!(
            contents,
            "time_s,left,right\n0.0,0.5,-0.5\n0.02,0.25,0.0\n"
        );
    }

    #[test]
    fn test_uninitialised_archiver() {
        let mut arch = Archiver::default();

        assert!(arch.serialise(Sample { time_s: 0.0, left: 0.0, right: 0.0 }).is_err());
    }
}
