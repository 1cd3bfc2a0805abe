//! # Data Store

use crate::lane_ctrl;
use sim_if::{
    agent::{Intent, Observation},
    veh::{ControlCommand, VehicleState},
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Global data store for the executable.
#[derive(Default)]
pub struct DataStore {
    // Tick management
    /// Number of ticks already executed
    pub num_ticks: u64,

    /// Simulation elapsed time
    pub sim_time_s: f64,

    // Vehicle
    /// The vehicle state at the start of the current tick
    pub veh: VehicleState,

    // Agent
    /// The observation handed to the policy this tick
    pub observation: Option<Observation>,

    /// The intent the policy answered with
    pub intent: Intent,

    // LaneCtrl
    pub lane_ctrl: lane_ctrl::LaneCtrl,
    pub lane_ctrl_input: lane_ctrl::InputData,
    pub lane_ctrl_output: Option<ControlCommand>,
    pub lane_ctrl_status_rpt: lane_ctrl::StatusReport,

    // Episode flags
    /// True once the vehicle has come to rest at the end of the route
    pub end_of_route: bool,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl DataStore {
    /// Perform actions required at the start of a tick.
    ///
    /// Clears those items that are only valid within a single tick.
    pub fn cycle_start(&mut self) {
        self.observation = None;
        self.lane_ctrl_input = lane_ctrl::InputData::default();
        self.lane_ctrl_output = None;
        self.lane_ctrl_status_rpt = lane_ctrl::StatusReport::default();
    }
}
