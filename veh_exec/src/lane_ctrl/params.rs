//! Lane control parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for lane control
#[derive(Deserialize, Debug, Clone)]
pub struct Params {
    // ---- LANE SELECTION ----
    /// Candidates whose closest-waypoint heading differs from the vehicle
    /// heading by more than this angle are rejected, preventing lock on to
    /// crossing or oncoming lanes.
    pub heading_gate_rad: f64,

    /// Maximum distance to the closest waypoint of a lane for the selector
    /// to keep preferring it over the globally closest candidate. Must be
    /// larger than the lane width for adjacent lane changes to commit.
    pub reacquire_dist_m: f64,

    /// A rival lane must be closer than the committed lane by at least this
    /// margin before it counts towards a switch.
    pub hysteresis_margin_m: f64,

    /// Number of consecutive ticks a rival must hold its margin before the
    /// switch is committed.
    pub hysteresis_window_ticks: u32,

    // ---- LOOKAHEAD ----
    /// Lookahead distance per unit of speed
    pub lookahead_time_s: f64,

    /// Lower limit on the lookahead distance, keeps the steering precise at
    /// low speed.
    pub min_lookahead_m: f64,

    /// Upper limit on the lookahead distance, keeps the steering stable at
    /// high speed.
    pub max_lookahead_m: f64,

    // ---- STEERING ----
    /// Wheelbase assumed by the pure pursuit steering relation
    pub wheelbase_m: f64,

    /// Steering demands are saturated to this magnitude
    pub max_steer_rad: f64,

    /// Lateral error controller proportional gain
    pub lat_k_p: f64,

    /// Lateral error controller integral gain
    pub lat_k_i: f64,

    /// Lateral error controller derivative gain
    pub lat_k_d: f64,

    /// Heading error controller proportional gain
    pub head_k_p: f64,

    /// Heading error controller integral gain
    pub head_k_i: f64,

    /// Heading error controller derivative gain
    pub head_k_d: f64,

    /// Speed at which the authority of the PD correction has fallen to one
    /// half. The correction has full authority at standstill and fades out
    /// as speed grows, handing over to the pure pursuit term.
    pub pd_atten_speed_ms: f64,

    // ---- SPEED CONTROL ----
    /// Speed controller proportional gain
    pub speed_k_p: f64,

    /// Speed controller integral gain
    pub speed_k_i: f64,

    /// Speed controller derivative gain
    pub speed_k_d: f64,

    /// The brake is only applied once the vehicle is faster than the target
    /// by this deadband, avoiding throttle/brake hunting at equilibrium.
    pub brake_deadband_ms: f64,

    /// If true the target speed is capped to the lane's speed limit
    pub respect_speed_limit: bool,

    /// Maximum comfortable lateral acceleration, caps the target speed in
    /// curves.
    pub max_lat_acc_mss: f64,

    /// Deceleration used to plan the stop at the end of the route
    pub end_decel_mss: f64,

    /// Steering magnitude above which the target speed starts to derate
    pub steer_derate_onset_rad: f64,

    /// Target speed factor applied at full steering lock
    pub steer_derate_min_factor: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            heading_gate_rad: 1.0472,
            reacquire_dist_m: 5.0,
            hysteresis_margin_m: 0.3,
            hysteresis_window_ticks: 3,
            lookahead_time_s: 1.0,
            min_lookahead_m: 2.0,
            max_lookahead_m: 20.0,
            wheelbase_m: 2.8,
            max_steer_rad: 0.61,
            lat_k_p: 0.3,
            lat_k_i: 0.0,
            lat_k_d: 0.05,
            head_k_p: 0.8,
            head_k_i: 0.0,
            head_k_d: 0.0,
            pd_atten_speed_ms: 5.0,
            speed_k_p: 0.5,
            speed_k_i: 0.0,
            speed_k_d: 0.0,
            brake_deadband_ms: 0.3,
            respect_speed_limit: true,
            max_lat_acc_mss: 3.0,
            end_decel_mss: 2.0,
            steer_derate_onset_rad: 0.3,
            steer_derate_min_factor: 0.5,
        }
    }
}
