//! Drive executable entry point.
//! 
//! # Architecture
//! 
//! The executable runs a drive script against a simulated tank drive:
//! 
//!     - Initialise the session, logging and parameters
//!     - Main loop:
//!         - Execute any script commands which are due
//!         - Reload the ramp limits if the parameter file changed
//!         - Archive the drive state
//! 
//! The ramp itself runs on its own worker thread at the rate given in the
//! ramp parameters, independently of the main loop.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, warn};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};
use color_eyre::{Report, eyre::WrapErr};
use structopt::StructOpt;

// Internal
use drive_lib::{
    actuator::TankDrive,
    drive::{Drive, DriveCmd},
    limit_source::LimitSource,
    monitor::DriveMonitor,
};
use util::{
    archive::Archived,
    logger::{logger_init, LevelFilter},
    params,
    script_interpreter::{PendingCmds, ScriptInterpreter},
    session::{get_elapsed_seconds, Session},
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Target period of one cycle.
const CYCLE_PERIOD_S: f64 = 0.02;

/// Number of cycles per second
const CYCLE_FREQUENCY_HZ: f64 = 1.0 / CYCLE_PERIOD_S;

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
#[structopt(name = "drive_exec", about = "Run a drive script through the ramp controller")]
struct Opts {
    /// Ramp parameter file, relative to the params directory
    #[structopt(short, long, default_value = "ramp_ctrl.toml")]
    params: String,

    /// Log every ramp tick
    #[structopt(short, long)]
    verbose: bool,

    /// Drive script to run
    #[structopt(parse(from_os_str))]
    script: PathBuf,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {

    color_eyre::install()?;

    let opts = Opts::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new(
        "drive_exec", 
        "sessions"
    ).wrap_err("Failed to create the session")?;

    // Initialise logger
    let tick_level = if opts.verbose { LevelFilter::Trace } else { LevelFilter::Info };
    logger_init(LevelFilter::Debug, tick_level, &session)
        .wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Drive Executable\n");
    info!("Session directory: {:?}\n", session.session_root);
    debug!("CLI options: {:?}", opts);

    // ---- LOAD PARAMETERS ----

    let params_path = params::param_path(&opts.params)
        .wrap_err("Could not find the ramp params")?;
    let (mut limit_source, ramp_params) = LimitSource::new(&params_path)
        .wrap_err("Could not load the ramp params")?;

    info!("Ramp parameters loaded: {:?}", ramp_params);

    // ---- LOAD SCRIPT ----

    info!("Loading script from {:?}", opts.script);

    let mut script: ScriptInterpreter<DriveCmd> = ScriptInterpreter::new(&opts.script)
        .wrap_err("Failed to load script")?;

    info!(
        "Loaded script lasts {:.02} s and contains {} commands\n",
        script.get_duration(),
        script.get_num_cmds()
    );

    // ---- INITIALISE DRIVE ----

    let mut drive = Drive::new(TankDrive::simulated(), ramp_params.tick_rate_hz)
        .wrap_err("Failed to initialise the drive")?;
    drive.set_limits(ramp_params.limits()?)
        .wrap_err("Failed to apply the ramp limits")?;

    let mut monitor = DriveMonitor::new(&session)
        .map_err(|e| color_eyre::eyre::eyre!("Failed to initialise the drive monitor: {}", e))?;

    info!("Drive initialised");

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    let mut num_cycles: u64 = 0;

    loop {

        // Get cycle start time
        let cycle_start_instant = Instant::now();

        // ---- SCRIPT ----

        match script.get_pending_cmds() {
            PendingCmds::None => (),
            PendingCmds::Some(cmds) => {
                for cmd in cmds.iter() {
                    if let Err(e) = drive.exec(cmd) {
                        warn!("Drive command {} failed: {}", cmd.name(), e);
                    }
                }
            },
            PendingCmds::EndOfScript => {
                info!("End of script reached");
                break
            }
        }

        // ---- LIMIT RELOAD ----

        if num_cycles % (CYCLE_FREQUENCY_HZ as u64) == 0 {
            match limit_source.poll() {
                Ok(Some(limits)) => drive.set_limits(limits)
                    .wrap_err("Failed to apply reloaded ramp limits")?,
                Ok(None) => (),
                Err(e) => warn!("Couldn't reload ramp limits, keeping previous: {}", e)
            }
        }

        // ---- WRITE ARCHIVES ----

        monitor.update(get_elapsed_seconds(), &drive)
            .wrap_err("Failed to sample the drive")?;
        if let Err(e) = monitor.write() {
            warn!("Couldn't archive the drive state: {}", e);
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        // Get sleep duration
        match Duration::from_secs_f64(CYCLE_PERIOD_S)
            .checked_sub(cycle_dur)
        {
            Some(d) => thread::sleep(d),
            None => warn!(
                "Cycle overran by {:.06} s", 
                cycle_dur.as_secs_f64() - CYCLE_PERIOD_S
            )
        }

        num_cycles += 1;
    }

    // ---- SHUTDOWN ----

    drive.halt().wrap_err("Failed to halt the drive")?;

    info!("End of execution");

    Ok(())
}
