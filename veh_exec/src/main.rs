//! Main simulation executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise all modules
//!     - Main loop (one iteration per simulation tick):
//!         - Policy processing, forming the agent's intent
//!         - Lane snapshot acquisition
//!         - Lane control processing
//!         - Vehicle model propagation
//!
//! The loop is driven in simulation time, one tick per iteration with no
//! wall clock pacing, so an episode runs as fast as the machine allows.
//!
//! # Modules
//!
//! All modules (e.g. `lane_ctrl`) shall meet the following requirements:
//!     1. Provide a public struct implementing the `util::module::State` trait.

// ---------------------------------------------------------------------------
// USE MODULES FROM LIBRARY
// ---------------------------------------------------------------------------

use veh_lib::{episode::Episode, lane_ctrl::LaneCtrl, scenario::Scenario, veh_model};

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{debug, info, trace, warn};
use std::env;

// Internal
use util::{
    archive::Archived,
    logger::{logger_init, LevelFilter},
    module::State,
    session::Session,
};

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("veh_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Trace, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Lane Following Simulation Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD SCENARIO ----

    // Collect all arguments
    let args: Vec<String> = env::args().collect();

    debug!("CLI arguments: {:?}", args);

    // A single argument giving the scenario to run is required
    if args.len() != 2 {
        return Err(eyre!(
            "Expected exactly one argument (the scenario file), found {}",
            args.len() - 1
        ));
    }

    info!("Loading scenario from \"{}\"", &args[1]);

    let scenario = Scenario::load(&args[1]).wrap_err("Failed to load the scenario")?;

    info!(
        "Scenario \"{}\": {} lane(s), {} ticks of {} s max\n",
        scenario.name, scenario.num_lanes, scenario.max_ticks, scenario.tick_s
    );

    // ---- LOAD PARAMETERS ----

    let model_params: veh_model::Params =
        util::params::load("veh_model.toml").wrap_err("Could not load vehicle model params")?;

    info!("Exec parameters loaded");

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let mut lane_ctrl = LaneCtrl::default();
    lane_ctrl
        .init("lane_ctrl.toml", &session)
        .wrap_err("Failed to initialise LaneCtrl")?;
    info!("LaneCtrl init complete");

    info!("Module initialisation complete\n");

    // ---- INITIALISE EPISODE ----

    let mut episode = Episode::new(scenario, model_params, lane_ctrl);

    // ---- MAIN LOOP ----

    info!("Beginning main loop\n");

    while !episode.is_finished() {
        episode.step().wrap_err("Episode step failed")?;

        // Archive this tick's module data
        match episode.ds.lane_ctrl.write() {
            Ok(_) => (),
            Err(e) => warn!("Could not write LaneCtrl archives: {}", e),
        };

        let report = &episode.ds.lane_ctrl_status_rpt;
        trace!(
            "[{:8.1}] lane: {:?}, lat: {:+.3} m, head: {:+.3} rad, speed: {:.2} m/s",
            episode.ds.sim_time_s,
            report.selected_lane,
            report.lat_err_m,
            report.head_err_rad,
            episode.veh_state().speed_ms
        );

        // Periodic progress marker at 10 s intervals of simulated time
        if episode.ds.num_ticks % 100 == 0 {
            info!(
                "Tick {}: pos ({:.1}, {:.1}) m, lane {:?}, {:.2} m/s",
                episode.ds.num_ticks,
                episode.veh_state().pos_m.x,
                episode.veh_state().pos_m.y,
                report.selected_lane,
                episode.veh_state().speed_ms
            );
        }
    }

    // ---- SHUTDOWN ----

    let summary = episode.summary();
    session.save("episode_summary.json", &summary);

    info!(
        "Episode \"{}\" complete: {} ticks, end of route: {}, final lane: {:?}",
        summary.name, summary.num_ticks, summary.end_of_route, summary.final_lane
    );

    Ok(())
}
