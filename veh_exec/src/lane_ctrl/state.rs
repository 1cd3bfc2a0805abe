//! Implementations for the LaneCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{info, trace, warn};
use serde::Serialize;

// Internal
use super::{select, LaneControllers, LaneCtrlError, Params, SelectionState};
use crate::lane_ctrl::track_error;
use sim_if::{
    agent::Intent,
    lane::{LaneId, WaypointPath},
    veh::{ControlCommand, VehicleState},
};
use util::{
    archive::{Archived, Archiver},
    module::State,
    params,
    session::Session,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Lane control module state
#[derive(Default)]
pub struct LaneCtrl {
    pub(crate) params: Params,

    /// Committed lane and hysteresis bookkeeping, persists between ticks
    pub(crate) selection: SelectionState,

    pub(crate) report: StatusReport,
    arch_report: Archiver,

    pub(crate) output: Option<ControlCommand>,
    arch_output: Archiver,

    /// Controller objects used to calculate the actuation command
    controllers: LaneControllers,
}

/// Input data to Lane Control.
#[derive(Default)]
pub struct InputData {
    /// Candidate lane centreline snapshots for this tick.
    pub paths: Vec<WaypointPath>,

    /// The vehicle state at the start of the tick.
    pub veh: VehicleState,

    /// The agent's demand for this tick.
    pub intent: Intent,

    /// Duration of this tick in seconds.
    pub dt_s: f64,
}

/// Status report for LaneCtrl processing.
#[derive(Clone, Copy, Default, Serialize, Debug)]
pub struct StatusReport {
    /// Signed lateral offset from the committed lane, positive left
    pub lat_err_m: f64,

    /// Signed heading error to the committed lane's local tangent
    pub head_err_rad: f64,

    /// Estimated signed curvature of the lane at the vehicle's station
    pub curv_m: f64,

    /// Lookahead distance used by the steering law on this tick
    pub lookahead_dist_m: f64,

    /// Arc length remaining to the end of the committed path
    pub remaining_m: f64,

    /// The lane committed to on this tick
    pub selected_lane: Option<LaneId>,

    /// The capped speed the speed controller was driven towards
    pub target_speed_ms: f64,

    /// True if the committed lane changed this tick
    pub lane_switched: bool,

    /// True if no candidate passed the heading gate this tick
    pub no_viable_lane: bool,

    /// True if the hold command was emitted instead of a tracking command
    pub held: bool,

    /// True if the steering demand hit the steering limit
    pub steer_saturated: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for LaneCtrl {
    type InitData = &'static str;
    type InitError = params::LoadError;

    type InputData = InputData;
    type OutputData = ControlCommand;
    type StatusReport = StatusReport;
    type ProcError = LaneCtrlError;

    /// Initialise the LaneCtrl module.
    ///
    /// Expected init data is the path to the parameter file
    fn init(&mut self, init_data: Self::InitData, session: &Session)
        -> Result<(), Self::InitError>
    {
        // Load the parameters
        self.params = match params::load(init_data) {
            Ok(p) => p,
            Err(e) => return Err(e),
        };

        // Initialise the controllers from the loaded gains
        self.controllers = LaneControllers::new(&self.params);

        // Create the arch folder for lane_ctrl
        let mut arch_path = session.arch_root.clone();
        arch_path.push("lane_ctrl");
        std::fs::create_dir_all(arch_path).unwrap();

        // Initialise the archivers
        self.arch_report = Archiver::from_path(
            session, "lane_ctrl/status_report.csv"
        ).unwrap();
        self.arch_output = Archiver::from_path(
            session, "lane_ctrl/output.csv"
        ).unwrap();

        Ok(())
    }

    /// Perform cyclic processing of Lane Control.
    ///
    /// Processing involves:
    ///  1. Selecting the lane to follow from the candidate paths
    ///  2. Estimating the path relative tracking errors
    ///  3. Calculating the actuation command from those errors
    ///
    /// If no candidate passes the heading gate the previously committed lane
    /// is reused if it is still in the candidate set, otherwise the hold
    /// command is emitted.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        // The tick duration drives the integrators, a zero, negative or NaN
        // value cannot be processed
        if input_data.dt_s <= 0.0 || input_data.dt_s.is_nan() {
            return Err(LaneCtrlError::InvalidTickDuration(input_data.dt_s));
        }

        // Clear the status report
        self.report = StatusReport::default();

        // ---- LANE SELECTION ----

        let (path, new_selection) = match select(
            &input_data.paths,
            &input_data.veh,
            &input_data.intent,
            &self.selection,
            &self.params,
        ) {
            Ok(s) => s,
            Err(LaneCtrlError::NoViableLane) => {
                self.report.no_viable_lane = true;

                // Fall back on the previously committed lane if a snapshot
                // of it is still on offer
                let prior_path = self.selection.lane.and_then(|id| {
                    input_data.paths.iter().find(|p| p.lane_id() == id)
                });

                match prior_path {
                    Some(p) => {
                        warn!(
                            "No candidate lane passes the heading gate, \
                            continuing on lane {}",
                            p.lane_id()
                        );
                        (p, self.selection.clone())
                    }
                    None => {
                        // Nothing to follow, bring the vehicle to a stop
                        warn!("No viable lane and no prior lane, holding");
                        self.report.held = true;
                        self.controllers.reset();

                        let cmd = ControlCommand::hold();
                        self.output = Some(cmd);
                        return Ok((cmd, self.report));
                    }
                }
            }
            Err(e) => return Err(e),
        };

        // A switch of committed lane invalidates the accumulated controller
        // state, which belongs to the old lane's geometry
        if let (Some(old), Some(new)) = (self.selection.lane, new_selection.lane) {
            if old != new {
                self.report.lane_switched = true;
                self.controllers.reset();
                info!("Committed lane switched from {} to {}", old, new);
            }
        }

        self.selection = new_selection;
        self.report.selected_lane = self.selection.lane;

        // ---- ERROR ESTIMATION ----

        let track = track_error::project(&input_data.veh, path, &self.params);

        self.report.lat_err_m = track.lat_err_m;
        self.report.head_err_rad = track.head_err_rad;
        self.report.curv_m = track.curv_m;
        self.report.lookahead_dist_m = track.lookahead_dist_m;
        self.report.remaining_m = track.remaining_m;

        // ---- COMMAND GENERATION ----

        let cmd = self.controllers.get_control_cmd(
            &track,
            &input_data.veh,
            &input_data.intent,
            input_data.dt_s,
            &mut self.report,
            &self.params,
        );

        trace!(
            "LaneCtrl output:\n    throttle: {:.3}, brake: {:.3}, steer: {:.4} rad",
            cmd.throttle(),
            cmd.brake(),
            cmd.steer_rad()
        );

        self.output = Some(cmd);

        Ok((cmd, self.report))
    }
}

impl Archived for LaneCtrl {
    fn write(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        // Write each one individually
        self.arch_report.serialise(self.report)?;
        self.arch_output.serialise(self.output)?;

        Ok(())
    }
}

impl LaneCtrl {
    /// Build a module with the given parameters and no archiving.
    ///
    /// Used where no session exists, for instance in tests and benchmarks.
    /// Executables should prefer `init`.
    pub fn with_params(params: Params) -> Self {
        Self {
            controllers: LaneControllers::new(&params),
            params,
            ..Default::default()
        }
    }

    /// The current lane selection state.
    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
