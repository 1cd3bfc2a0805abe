//! # Lane control module
//!
//! Lane control is responsible for keeping the vehicle in its lane. Each
//! tick the module is handed a fresh snapshot of candidate lane geometries
//! (one waypoint path per reachable lane), the vehicle's kinematic state and
//! the agent's intent, and answers with a single actuation command.
//!
//! Processing happens in three stages. First the selector decides which of
//! the candidate paths the vehicle is committed to, holding a small amount
//! of state across ticks so the choice doesn't chatter near lane boundaries.
//! Then the selected path and the vehicle pose are reduced to path-relative
//! errors: signed lateral offset, heading error, local curvature and a speed
//! scaled lookahead point. Finally the controllers blend a pure pursuit term
//! aimed at the lookahead point with a proportional-derivative correction on
//! the errors to produce a steering demand, and a speed controller turns the
//! target speed into throttle or brake. All outputs are saturated, never
//! rejected, so once a lane is selected the command stage cannot fail.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod controllers;
pub mod params;
pub mod select;
pub mod state;
pub mod track_error;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use controllers::*;
pub use params::Params;
pub use select::*;
pub use state::*;
pub use track_error::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during lane control processing.
#[derive(Debug, thiserror::Error)]
pub enum LaneCtrlError {
    /// No candidate path passed the heading gate. Raised by the selector,
    /// the caller is expected to fall back to the previously selected lane
    /// rather than stopping.
    #[error("No candidate path passes the heading gate")]
    NoViableLane,

    /// The tick duration handed to `proc` was zero or negative.
    #[error("Tick duration must be positive (got {0} s)")]
    InvalidTickDuration(f64),
}
