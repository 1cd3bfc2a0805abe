//! # Lane controllers module
//!
//! This module provides the PID controllers used for lane control and the
//! control laws turning tracking errors into a steering angle and a
//! throttle or brake demand.
//!
//! The steering demand blends two terms. A pure pursuit term aims the
//! vehicle at the lookahead point through the bicycle model relation, which
//! on its own tracks smooth curvature well at speed. A PD correction on
//! the lateral and heading errors is added on top to remove the residual
//! cross-track drift pure pursuit under-corrects at low speed; its
//! authority fades as speed grows. The speed demand runs the target speed
//! through a chain of caps (lane limit, curvature comfort, end of route,
//! steering derate) and a PID on the speed error, braking only beyond a
//! small deadband so throttle and brake don't hunt at equilibrium.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Serialize;

// Internal
use sim_if::{
    agent::Intent,
    veh::{ControlCommand, VehicleState},
};
use util::maths::{lin_map, wrap_to_pi};

use super::{Params, StatusReport, TrackError};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Below this range to the lookahead point the pure pursuit term is
/// meaningless and is dropped, leaving the PD correction in charge.
const MIN_LOOKAHEAD_RANGE_M: f64 = 1e-3;

/// Curvatures below this magnitude are treated as straight for the comfort
/// speed cap.
const MIN_CURV_M: f64 = 1e-6;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A PID controller.
///
/// The tick duration is passed in explicitly so the controller advances in
/// simulation time rather than wall clock time.
#[derive(Debug, Serialize, Clone, Default)]
pub struct PidController {
    /// Proportional gain
    k_p: f64,

    /// Integral gain
    k_i: f64,

    /// Derivative gain
    k_d: f64,

    /// Previous error
    prev_error: Option<f64>,

    /// The integral accumulation
    integral: f64,
}

/// The lane controllers
#[derive(Debug, Serialize, Clone, Default)]
pub struct LaneControllers {
    /// Lateral error controller
    lat_ctrl: PidController,

    /// Heading error controller
    head_ctrl: PidController,

    /// Speed error controller
    speed_ctrl: PidController,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PidController {
    /// Create a new controller with the given gains.
    pub fn new(k_p: f64, k_i: f64, k_d: f64) -> Self {
        Self {
            k_p,
            k_i,
            k_d,
            integral: 0.0,
            prev_error: None,
        }
    }

    /// Get the value of the controller for the given error and tick
    /// duration.
    pub fn update(&mut self, error: f64, dt_s: f64) -> f64 {
        self.integral += error * dt_s;

        // No derivative on the first sample, a spike there would kick the
        // actuator for no reason
        let deriv = match self.prev_error {
            Some(e) => (error - e) / dt_s,
            None => 0.0,
        };

        self.prev_error = Some(error);

        self.k_p * error + self.k_i * self.integral + self.k_d * deriv
    }

    /// Clear the accumulated state, keeping the gains.
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.prev_error = None;
    }
}

impl LaneControllers {
    /// Create a new instance of the controllers from the parameters
    pub fn new(params: &Params) -> Self {
        Self {
            lat_ctrl: PidController::new(params.lat_k_p, params.lat_k_i, params.lat_k_d),
            head_ctrl: PidController::new(params.head_k_p, params.head_k_i, params.head_k_d),
            speed_ctrl: PidController::new(
                params.speed_k_p,
                params.speed_k_i,
                params.speed_k_d,
            ),
        }
    }

    /// Get the actuation command for the current tracking errors and
    /// vehicle state.
    ///
    /// All outputs are saturated rather than rejected, so this function
    /// cannot fail, only degrade.
    pub fn get_control_cmd(
        &mut self,
        track: &TrackError,
        veh: &VehicleState,
        intent: &Intent,
        dt_s: f64,
        report: &mut StatusReport,
        params: &Params,
    ) -> ControlCommand {
        let steer_rad = self.calc_steer_dem(track, veh, dt_s, report, params);
        let (throttle, brake) =
            self.calc_speed_dem(track, veh, intent, steer_rad, dt_s, report, params);

        ControlCommand::new(throttle, brake, steer_rad)
    }

    /// Clear all accumulated controller state.
    ///
    /// Called when the selection switches lane, the old lane's integrals
    /// and derivative history don't apply to the new geometry.
    pub fn reset(&mut self) {
        self.lat_ctrl.reset();
        self.head_ctrl.reset();
        self.speed_ctrl.reset();
    }

    /// Calculate the steering demand in radians, positive left.
    fn calc_steer_dem(
        &mut self,
        track: &TrackError,
        veh: &VehicleState,
        dt_s: f64,
        report: &mut StatusReport,
        params: &Params,
    ) -> f64 {
        // Pure pursuit term aimed at the lookahead point. The actual range
        // to the point is used rather than the nominal lookahead distance,
        // which keeps the relation exact when the point is clamped at the
        // end of the route.
        let to_la = track.lookahead_pos_m - veh.pos_m;
        let range_m = to_la.norm();
        let pp_rad = if range_m > MIN_LOOKAHEAD_RANGE_M {
            let alpha = wrap_to_pi(to_la.y.atan2(to_la.x) - veh.heading_rad);
            (2.0 * params.wheelbase_m * alpha.sin() / range_m).atan()
        } else {
            0.0
        };

        // PD correction, fed setpoint minus measurement so positive gains
        // steer back towards the path
        let pd_rad = self.lat_ctrl.update(-track.lat_err_m, dt_s)
            + self.head_ctrl.update(-track.head_err_rad, dt_s);

        // Correction authority fades with speed, handing over to pure
        // pursuit
        let atten = 1.0 / (1.0 + veh.speed_ms.max(0.0) / params.pd_atten_speed_ms);

        let raw_rad = pp_rad + atten * pd_rad;
        if raw_rad.abs() > params.max_steer_rad {
            report.steer_saturated = true;
        }

        raw_rad.clamp(-params.max_steer_rad, params.max_steer_rad)
    }

    /// Calculate the throttle and brake demands.
    fn calc_speed_dem(
        &mut self,
        track: &TrackError,
        veh: &VehicleState,
        intent: &Intent,
        steer_rad: f64,
        dt_s: f64,
        report: &mut StatusReport,
        params: &Params,
    ) -> (f64, f64) {
        // Start from the agent's demand and apply each cap in turn
        let mut target_ms = intent.target_speed_ms.max(0.0);

        if params.respect_speed_limit {
            target_ms = target_ms.min(track.speed_limit_ms);
        }

        // Comfort cap in curves
        if track.curv_m.abs() > MIN_CURV_M {
            target_ms = target_ms.min((params.max_lat_acc_mss / track.curv_m.abs()).sqrt());
        }

        // Plan the stop at the end of the route
        target_ms = target_ms.min((2.0 * params.end_decel_mss * track.remaining_m).sqrt());

        // Derate in sharp turns to avoid understeer
        if steer_rad.abs() > params.steer_derate_onset_rad {
            let factor = lin_map(
                (params.steer_derate_onset_rad, params.max_steer_rad),
                (1.0, params.steer_derate_min_factor),
                steer_rad.abs(),
            )
            .max(params.steer_derate_min_factor);
            target_ms *= factor;
        }

        report.target_speed_ms = target_ms;

        let err_ms = target_ms - veh.speed_ms;
        let accel_dem = self.speed_ctrl.update(err_ms, dt_s);

        // The brake engages only beyond the deadband, inside it a negative
        // demand simply coasts
        if err_ms < -params.brake_deadband_ms {
            (0.0, (-accel_dem).clamp(0.0, 1.0))
        } else {
            (accel_dem.clamp(0.0, 1.0), 0.0)
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
