//! # Agent interface
//!
//! Types exchanged with the agent collaborator. The agent reads an
//! [`Observation`] each tick and answers with an [`Intent`], the high level
//! demand the lane controller turns into actuation.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// Internal
use crate::lane::LaneId;
use crate::veh::VehicleState;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// High level demand supplied by the agent each tick.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Intent {
    /// The speed the agent wants to cruise at
    pub target_speed_ms: f64,

    /// Requested lane change for this tick
    pub lane_change: LaneChange,
}

/// What the agent gets to see at the start of each tick.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Observation {
    /// Simulation time at the start of the tick
    pub time_s: f64,

    /// Snapshot of the vehicle's kinematic state
    pub veh: VehicleState,

    /// The lane the controller is currently committed to, if any
    pub lane_id: Option<LaneId>,

    /// Speed limit of the committed lane at the vehicle's position, if known
    pub speed_limit_ms: Option<f64>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Lane change directions an agent may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LaneChange {
    /// Keep following the current lane
    Stay,

    /// Move one lane to the left
    Left,

    /// Move one lane to the right
    Right,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Intent {
    /// An intent which simply cruises at the given speed in the current lane.
    pub fn cruise(target_speed_ms: f64) -> Self {
        Self {
            target_speed_ms,
            lane_change: LaneChange::Stay,
        }
    }
}

impl Default for Intent {
    fn default() -> Self {
        Intent::cruise(0.0)
    }
}

impl Default for LaneChange {
    fn default() -> Self {
        LaneChange::Stay
    }
}
