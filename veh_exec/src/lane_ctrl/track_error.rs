//! # Path-relative error estimation
//!
//! Projects the vehicle pose onto the selected path, producing the signed
//! lateral and heading errors, an estimate of the local curvature and the
//! lookahead point the pure pursuit steering term aims at.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Point2;
use serde::Serialize;

// Internal
use sim_if::{lane::WaypointPath, veh::VehicleState};
use util::maths::wrap_to_pi;

use super::Params;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Segments with a chord shorter than this are considered degenerate and
/// skipped in the closest-segment search.
const MIN_SEGMENT_LEN_M: f64 = 1e-9;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Path-relative errors of the vehicle with respect to the selected path.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TrackError {
    /// Signed perpendicular distance to the line through the closest
    /// segment, positive when the vehicle is to the left of the direction
    /// of travel.
    pub lat_err_m: f64,

    /// Vehicle heading minus the segment tangent heading, wrapped into
    /// (-pi, pi].
    pub head_err_rad: f64,

    /// Local path curvature in 1/m, positive for a left turn
    pub curv_m: f64,

    /// Position of the lookahead point on the path
    pub lookahead_pos_m: Point2<f64>,

    /// The lookahead distance used, after speed scaling and clamping
    pub lookahead_dist_m: f64,

    /// Arc-length of the vehicle's projection onto the path
    pub closest_arc_m: f64,

    /// Arc-length remaining between the projection and the end of the path
    pub remaining_m: f64,

    /// Speed limit of the lane at the projection point
    pub speed_limit_ms: f64,
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Project the vehicle onto the path and compute the tracking errors.
///
/// The closest segment is found by linear search over the waypoint pairs,
/// skipping degenerate (zero length) segments. If the lookahead distance
/// runs past the end of the path the lookahead point is clamped to the
/// final waypoint, so near the end of the route the vehicle aims at the
/// terminal point instead of extrapolating.
pub fn project(veh: &VehicleState, path: &WaypointPath, params: &Params) -> TrackError {
    let points = path.points();

    let lookahead_dist_m = (params.lookahead_time_s * veh.speed_ms)
        .max(params.min_lookahead_m)
        .min(params.max_lookahead_m);

    // Closest non-degenerate segment, identified by the index of its first
    // waypoint and the projection parameter along its chord.
    let mut closest: Option<(usize, f64, f64)> = None;
    for i in 0..points.len().saturating_sub(1) {
        let a = &points[i];
        let b = &points[i + 1];
        let chord = b.pos_m - a.pos_m;
        let len = chord.norm();
        if len < MIN_SEGMENT_LEN_M {
            continue;
        }

        let t = ((veh.pos_m - a.pos_m).dot(&chord) / (len * len))
            .max(0.0)
            .min(1.0);
        let foot = a.pos_m + chord * t;
        let dist = (veh.pos_m - foot).norm();

        match closest {
            Some((_, _, best_dist)) if dist >= best_dist => (),
            _ => closest = Some((i, t, dist)),
        }
    }

    let (lat_err_m, head_err_rad, curv_m, closest_arc_m, speed_limit_ms, seg_idx) = match closest
    {
        Some((i, t, _)) => {
            let a = &points[i];
            let b = &points[i + 1];
            let chord = b.pos_m - a.pos_m;
            let len = chord.norm();
            let dir = chord / len;
            let rel = veh.pos_m - a.pos_m;

            // Cross product against the unit tangent gives the signed
            // perpendicular distance, positive to the left
            let lat_err_m = dir.x * rel.y - dir.y * rel.x;

            let tangent_rad = chord.y.atan2(chord.x);
            let head_err_rad = wrap_to_pi(veh.heading_rad - tangent_rad);

            let curv_m =
                wrap_to_pi(b.heading_rad - a.heading_rad) / (b.arc_len_m - a.arc_len_m);

            let closest_arc_m = a.arc_len_m + t * (b.arc_len_m - a.arc_len_m);

            let speed_limit_ms = if t < 0.5 {
                a.speed_limit_ms
            } else {
                b.speed_limit_ms
            };

            (lat_err_m, head_err_rad, curv_m, closest_arc_m, speed_limit_ms, i)
        }
        // Single waypoint path, or every segment degenerate. Fall back to
        // the closest waypoint's own pose as the local tangent.
        None => {
            let i = closest_waypoint_idx(path, &veh.pos_m);
            let wp = &points[i];
            let dir = nalgebra::Vector2::new(wp.heading_rad.cos(), wp.heading_rad.sin());
            let rel = veh.pos_m - wp.pos_m;

            let lat_err_m = dir.x * rel.y - dir.y * rel.x;
            let head_err_rad = wrap_to_pi(veh.heading_rad - wp.heading_rad);

            (lat_err_m, head_err_rad, 0.0, wp.arc_len_m, wp.speed_limit_ms, i)
        }
    };

    // The lookahead point is the waypoint nearest to the target arc-length,
    // clamped to the final waypoint when the path runs out
    let target_arc_m = closest_arc_m + lookahead_dist_m;
    let mut la_idx = points.len() - 1;
    for j in seg_idx..points.len() {
        if points[j].arc_len_m >= target_arc_m {
            la_idx = j;
            if j > seg_idx
                && target_arc_m - points[j - 1].arc_len_m < points[j].arc_len_m - target_arc_m
            {
                la_idx = j - 1;
            }
            break;
        }
    }

    let remaining_m = (path.last().arc_len_m - closest_arc_m).max(0.0);

    TrackError {
        lat_err_m,
        head_err_rad,
        curv_m,
        lookahead_pos_m: points[la_idx].pos_m,
        lookahead_dist_m,
        closest_arc_m,
        remaining_m,
        speed_limit_ms,
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Index of the waypoint closest to the given position.
fn closest_waypoint_idx(path: &WaypointPath, pos_m: &Point2<f64>) -> usize {
    let points = path.points();

    let mut idx = 0;
    let mut dist = (*pos_m - points[0].pos_m).norm();
    for (i, wp) in points.iter().enumerate().skip(1) {
        let d = (*pos_m - wp.pos_m).norm();
        if d < dist {
            idx = i;
            dist = d;
        }
    }

    idx
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
