//! # Vehicle state and actuation
//!
//! The vehicle collaborator owns the true [`VehicleState`] and hands the
//! controller a read-only snapshot each tick. The controller answers with a
//! single [`ControlCommand`], the only way it can influence the vehicle.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Snapshot of the vehicle's kinematic state at the start of a tick.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VehicleState {
    /// Position of the vehicle's rear axle centre in the world frame
    pub pos_m: Point2<f64>,

    /// Heading of the vehicle in radians to the +ve x axis
    pub heading_rad: f64,

    /// Scalar forward speed of the vehicle
    pub speed_ms: f64,

    /// Current steering angle of the front wheels, positive to the left
    pub steer_rad: f64,
}

/// Actuation demands for one tick.
///
/// Throttle and brake are normalised to `[0, 1]` and mutually exclusive, a
/// non-zero brake forces the throttle to zero. The fields are private so
/// that a command can only be built through [`ControlCommand::new`], which
/// saturates rather than rejects out of range demands.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ControlCommand {
    throttle: f64,
    brake: f64,
    steer_rad: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for VehicleState {
    fn default() -> Self {
        Self {
            pos_m: Point2::new(0.0, 0.0),
            heading_rad: 0.0,
            speed_ms: 0.0,
            steer_rad: 0.0,
        }
    }
}

impl ControlCommand {
    /// Build a new command, saturating throttle and brake into `[0, 1]` and
    /// enforcing their mutual exclusion.
    ///
    /// The steering angle is passed through unchanged, the control law
    /// saturates it against the vehicle's steering limit before building the
    /// command.
    pub fn new(throttle: f64, brake: f64, steer_rad: f64) -> Self {
        let brake = brake.max(0.0).min(1.0);
        let throttle = if brake > 0.0 {
            0.0
        } else {
            throttle.max(0.0).min(1.0)
        };

        Self {
            throttle,
            brake,
            steer_rad,
        }
    }

    /// The hold command: no throttle, full brake, wheels straight.
    ///
    /// Emitted when the controller cannot determine a lane to follow.
    pub fn hold() -> Self {
        Self {
            throttle: 0.0,
            brake: 1.0,
            steer_rad: 0.0,
        }
    }

    /// Normalised throttle demand in `[0, 1]`.
    pub fn throttle(&self) -> f64 {
        self.throttle
    }

    /// Normalised brake demand in `[0, 1]`.
    pub fn brake(&self) -> f64 {
        self.brake
    }

    /// Demanded steering angle in radians, positive turning left.
    pub fn steer_rad(&self) -> f64 {
        self.steer_rad
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
