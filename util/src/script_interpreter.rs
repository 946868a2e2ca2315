//! # Script interpreter module
//!
//! This module provides an interpreter for timed command scripts, allowing
//! commands to be executed at fixed times after the start of a session.
//!
//! A script is a sequence of entries of the form `<time_s>: <json>;`, where
//! the JSON payload deserialises into the command type of the interpreter.
//! Anything outside an entry (such as `#` comments) is ignored.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::fs;
use regex::RegexBuilder;
use serde::de::DeserializeOwned;
use thiserror::Error;

// Internal
use crate::session::get_elapsed_seconds;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A command which is scripted to occur at a specific time.
struct Command<C> {
    /// The time the command is supposed to execute at
    exec_time_s: f64,

    /// The command to run
    cmd: C
}

/// A script interpreter.
///
/// After initialising with the path to the script to run use
/// `.get_pending_cmds` to acquire a list of commands that need executing.
pub struct ScriptInterpreter<C> {
    _script_path: PathBuf,
    cmds: VecDeque<Command<C>>
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Could not find the script at {0}")]
    ScriptNotFound(String),

    #[error("Could not load the script: {0}")]
    ScriptLoadError(std::io::Error),

    #[error("The script is empty (or is so bad it can't be read)")]
    ScriptEmpty,

    #[error(
        "Script contains an invalid timestamp: {0}. \
        Should be a float (like 1.0)")]
    InvalidTimestamp(String),

    #[error("Script contains an invalid command at {0} s: {1}")]
    InvalidCmd(f64, serde_json::Error),

    #[error("Script timestamps must not decrease, found {1} s after {0} s")]
    OutOfOrder(f64, f64)
}

#[derive(Debug, PartialEq)]
pub enum PendingCmds<C> {
    None,
    Some(Vec<C>),
    EndOfScript
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<C> ScriptInterpreter<C>
where
    C: DeserializeOwned
{

    /// Create a new interpreter from the given script path.
    pub fn new<P: AsRef<Path>>(script_path: P) -> Result<Self, ScriptError> {

        // Get the path in a buffer
        let path = PathBuf::from(script_path.as_ref());
        
        // Check that the script file exists.
        if !path.exists() {
            return Err(
                ScriptError::ScriptNotFound(path.display().to_string()));
        }

        // Load the script into a string
        let script = match fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) => return Err(ScriptError::ScriptLoadError(e))
        };

        let cmds = Self::parse(&script)?;

        Ok(ScriptInterpreter {
            _script_path: path,
            cmds
        })
    }

    /// Parse the contents of a script into a queue of timed commands.
    fn parse(script: &str) -> Result<VecDeque<Command<C>>, ScriptError> {

        // Empty queue of commands
        let mut cmd_queue: VecDeque<Command<C>> = VecDeque::new();

        // Go through the script executing __the magic regex__.
        let re = RegexBuilder::
            new(r"^\s*(\d+(\.\d+)?)\s*:\s*([^;]*);")
            .multi_line(true)
            .build()
            .expect("Script regex is invalid");

        for cap in re.captures_iter(script) {
            // Both groups are mandatory in the pattern so always present
            let (time_str, payload) = match (cap.get(1), cap.get(3)) {
                (Some(t), Some(p)) => (t.as_str(), p.as_str()),
                _ => continue
            };

            // Parse the exec time
            let exec_time_s: f64 = match time_str.parse() {
                Ok(t) => t,
                Err(e) => return Err(
                    ScriptError::InvalidTimestamp(format!("{}", e)))
            };

            if let Some(last) = cmd_queue.back() {
                if exec_time_s < last.exec_time_s {
                    return Err(ScriptError::OutOfOrder(last.exec_time_s, exec_time_s))
                }
            }

            // Parse the command from the payload. The scripts contain JSON only.
            let cmd = match serde_json::from_str(payload) {
                Ok(c) => c,
                Err(e) => return Err(ScriptError::InvalidCmd(
                    exec_time_s, e
                ))
            };

            // Build command from the match
            cmd_queue.push_back(Command {
                exec_time_s,
                cmd
            });
        }

        if cmd_queue.is_empty() {
            return Err(ScriptError::ScriptEmpty)
        }

        Ok(cmd_queue)
    }

    /// Return a vector of pending commands, based on the current session time.
    pub fn get_pending_cmds(&mut self) -> PendingCmds<C> {
        self.get_pending_cmds_at(get_elapsed_seconds())
    }

    /// Return a vector of commands whose execution time is before
    /// `current_time_s`.
    pub fn get_pending_cmds_at(&mut self, current_time_s: f64) -> PendingCmds<C> {

        // If the queue is empty the script is over and we return the end of
        // script variant
        if self.cmds.is_empty() {
            return PendingCmds::EndOfScript
        }

        let mut cmd_vec: Vec<C> = vec![];

        // Pop items from the queue while the head's exec time is lower than
        // the current time
        while let Some(c) = self.cmds.front() {
            if c.exec_time_s >= current_time_s {
                break;
            }
            if let Some(c) = self.cmds.pop_front() {
                cmd_vec.push(c.cmd);
            }
        }

        // If the vector is longer than 0 return Some, otherwise None
        if !cmd_vec.is_empty() {
            PendingCmds::Some(cmd_vec)
        }
        else {
            PendingCmds::None
        }
    }

    /// Get the number of commands in the script
    pub fn get_num_cmds(&self) -> usize {
        self.cmds.len()
    }

    /// Get the length of the script in seconds
    pub fn get_duration(&self) -> f64 {
        match self.cmds.back() {
            Some(c) => c.exec_time_s,
            None => 0f64
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde::Deserialize;
    use std::io::Write;

    #[derive(Deserialize, Debug, PartialEq)]
    enum TestCmd {
        Go(f64),
        Halt
    }

    fn write_script(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", contents).unwrap();
        file
    }

    #[test]
    fn test_pending_cmds() {
        let file = write_script(
            "# Drive forward then halt\n\
             0.0: {\"Go\": 0.5};\n\
             0.5: {\"Go\": 1.0};\n\
             2.0: \"Halt\";\n"
        );

        let mut si: ScriptInterpreter<TestCmd> = ScriptInterpreter::new(file.path()).unwrap();

        assert_eq!(si.get_num_cmds(), 3);
        assert_eq!(si.get_duration(), 2.0);

        assert_eq!(si.get_pending_cmds_at(0.0), PendingCmds::None);
        assert_eq!(
            si.get_pending_cmds_at(1.0),
            PendingCmds::Some(vec![TestCmd::Go(0.5), TestCmd::Go(1.0)])
        );
        assert_eq!(si.get_pending_cmds_at(1.5), PendingCmds::None);
        assert_eq!(si.get_pending_cmds_at(2.5), PendingCmds::Some(vec![TestCmd::Halt]));
        assert_eq!(si.get_pending_cmds_at(3.0), PendingCmds::EndOfScript);
    }

    #[test]
    fn test_script_errors() {
        let empty = write_script("# nothing here\n");
        assert!(matches!(
            ScriptInterpreter::<TestCmd>::new(empty.path()),
            Err(ScriptError::ScriptEmpty)
        ));

        let bad_cmd = write_script("1.0: {\"Fly\": 2.0};\n");
        assert!(matches!(
            ScriptInterpreter::<TestCmd>::new(bad_cmd.path()),
            Err(ScriptError::InvalidCmd(t, _)) if t == 1.0
        ));

        let out_of_order = write_script("2.0: \"Halt\";\n1.0: \"Halt\";\n");
        assert!(matches!(
            ScriptInterpreter::<TestCmd>::new(out_of_order.path()),
            Err(ScriptError::OutOfOrder(_, _))
        ));

        assert!(matches!(
            ScriptInterpreter::<TestCmd>::new("/definitely/not/a/script.drv"),
            Err(ScriptError::ScriptNotFound(_))
        ));
    }
}
