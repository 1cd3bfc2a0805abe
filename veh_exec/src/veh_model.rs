//! # Vehicle model module
//!
//! A kinematic bicycle model of the vehicle, stepped once per simulation
//! tick. The model owns the true [`VehicleState`]; the controller only ever
//! sees snapshots of it and influences it through a [`ControlCommand`].
//!
//! Actuation is deliberately imperfect: the steering actuator slews at a
//! finite rate towards the demanded angle and a rolling resistance term
//! bleeds speed whenever the vehicle is moving, so the controllers are
//! exercised against lag and disturbance rather than an ideal plant.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector2;
use serde::Deserialize;

// Internal
use sim_if::veh::{ControlCommand, VehicleState};
use util::maths::wrap_to_pi;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the vehicle model.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {
    /// Distance between the front and rear axles.
    ///
    /// Units: meters
    pub wheelbase_m: f64,

    /// Maximum steering angle of the front wheels.
    ///
    /// Units: radians
    pub max_steer_rad: f64,

    /// Maximum rate at which the steering actuator can move.
    ///
    /// Units: radians/second
    pub max_steer_rate_rads: f64,

    /// Acceleration produced at full throttle.
    ///
    /// Units: meters/second/second
    pub max_accel_mss: f64,

    /// Deceleration produced at full brake.
    ///
    /// Units: meters/second/second
    pub max_brake_mss: f64,

    /// Rolling resistance deceleration, applied whenever moving.
    ///
    /// Units: meters/second/second
    pub coast_decel_mss: f64,

    /// Speed the vehicle cannot exceed regardless of demand.
    ///
    /// Units: meters/second
    pub max_speed_ms: f64,
}

/// The vehicle model state
pub struct VehModel {
    params: Params,

    /// The true state of the vehicle
    state: VehicleState,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            wheelbase_m: 2.8,
            max_steer_rad: 0.61,
            max_steer_rate_rads: 0.7,
            max_accel_mss: 2.5,
            max_brake_mss: 6.0,
            coast_decel_mss: 0.3,
            max_speed_ms: 30.0,
        }
    }
}

impl VehModel {
    /// Create a new model starting from the given state.
    pub fn new(params: Params, initial: VehicleState) -> Self {
        Self {
            params,
            state: initial,
        }
    }

    /// The current true state of the vehicle.
    pub fn state(&self) -> &VehicleState {
        &self.state
    }

    /// Advance the model by one tick under the given command.
    ///
    /// Returns the state at the end of the tick.
    pub fn step(&mut self, cmd: &ControlCommand, dt_s: f64) -> VehicleState {
        // The actuator slews towards the clamped demand at a finite rate
        let steer_dem_rad = cmd
            .steer_rad()
            .clamp(-self.params.max_steer_rad, self.params.max_steer_rad);
        let max_delta_rad = self.params.max_steer_rate_rads * dt_s;
        self.state.steer_rad += (steer_dem_rad - self.state.steer_rad)
            .clamp(-max_delta_rad, max_delta_rad);

        // Longitudinal acceleration from the pedals plus rolling resistance
        let mut accel_mss = cmd.throttle() * self.params.max_accel_mss
            - cmd.brake() * self.params.max_brake_mss;
        if self.state.speed_ms > 0.0 {
            accel_mss -= self.params.coast_decel_mss;
        }

        // The model cannot reverse, braking past zero just stops
        self.state.speed_ms = (self.state.speed_ms + accel_mss * dt_s)
            .clamp(0.0, self.params.max_speed_ms);

        // Kinematic bicycle update about the rear axle, using the post
        // update speed
        let dir = Vector2::new(
            self.state.heading_rad.cos(),
            self.state.heading_rad.sin(),
        );
        self.state.pos_m += dir * self.state.speed_ms * dt_s;
        self.state.heading_rad = wrap_to_pi(
            self.state.heading_rad
                + self.state.speed_ms / self.params.wheelbase_m
                    * self.state.steer_rad.tan()
                    * dt_s,
        );

        self.state
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
