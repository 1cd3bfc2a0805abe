//! # Lane selector
//!
//! Decides each tick which of the candidate waypoint paths the vehicle is
//! committed to. Candidates whose geometry points the wrong way are gated
//! out, the previously committed lane is preferred while it remains close,
//! and a rival lane only takes over once it has been meaningfully closer for
//! a number of consecutive ticks. Explicit lane change intents bypass the
//! hysteresis and commit to the adjacent lane at once.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::debug;
use nalgebra::Vector2;
use ordered_float::NotNan;
use serde::Serialize;

// Internal
use sim_if::{
    agent::{Intent, LaneChange},
    lane::{LaneId, WaypointPath},
    veh::VehicleState,
};
use util::maths::wrap_to_pi;

use super::{LaneCtrlError, Params};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Selection state carried across ticks.
///
/// This is the only lane control state which survives the tick boundary. It
/// is owned by one controller instance per vehicle and never shared.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SelectionState {
    /// The lane currently committed to, `None` before the first selection
    pub lane: Option<LaneId>,

    /// The rival lane currently accumulating ticks towards a switch
    pub rival: Option<LaneId>,

    /// Number of consecutive ticks the rival has held its margin
    pub rival_ticks: u32,

    /// Set while an intent driven switch is still converging. Suppresses
    /// rivalry until the vehicle first comes within the new lane's half
    /// width, so the hysteresis cannot bounce the selection straight back.
    pub pending_entry: bool,
}

/// Figures of merit for one gated candidate path.
struct Candidate {
    /// Index of the path within the snapshot
    idx: usize,

    /// The lane the path describes
    lane_id: LaneId,

    /// Euclidean distance to the closest waypoint
    dist_m: NotNan<f64>,

    /// Perpendicular offset from the lane direction at the closest waypoint
    perp_m: NotNan<f64>,

    /// Absolute heading difference to the closest waypoint
    head_diff_rad: NotNan<f64>,

    /// Lane half width at the closest waypoint
    half_width_m: f64,
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Select the path to follow from the given candidate snapshot.
///
/// Returns the selected path together with the updated selection state the
/// caller must carry into the next tick. Fails with
/// [`LaneCtrlError::NoViableLane`] if no candidate passes the heading gate,
/// in which case the caller should fall back to the previously selected
/// lane rather than stopping.
pub fn select<'p>(
    paths: &'p [WaypointPath],
    veh: &VehicleState,
    intent: &Intent,
    prior: &SelectionState,
    params: &Params,
) -> Result<(&'p WaypointPath, SelectionState), LaneCtrlError> {
    let candidates = gate_candidates(paths, veh, params);

    if candidates.is_empty() {
        return Err(LaneCtrlError::NoViableLane);
    }

    // The globally closest surviving candidate. Ties are broken by smaller
    // perpendicular offset, then smaller heading difference, then lane id,
    // so the choice is deterministic.
    //
    // Safe to unwrap as we've just checked candidates is non-empty.
    let best = candidates
        .iter()
        .min_by_key(|c| (c.dist_m, c.perp_m, c.head_diff_rad, c.lane_id))
        .unwrap();

    let find = |lane: LaneId| candidates.iter().find(|c| c.lane_id == lane);

    // An explicit lane change commits at once when the requested neighbour
    // of the committed lane survives the gate within tolerance. If it
    // doesn't, fall through to the stay behaviour below.
    if intent.lane_change != LaneChange::Stay {
        let base = prior.lane.unwrap_or(best.lane_id);
        let target = match intent.lane_change {
            LaneChange::Left => Some(base.left()),
            LaneChange::Right => base.right(),
            LaneChange::Stay => None,
        };

        if let Some(cand) = target.and_then(find) {
            if cand.dist_m.into_inner() <= params.reacquire_dist_m {
                debug!(
                    "Lane change {:?} commits lane {} (from lane {})",
                    intent.lane_change, cand.lane_id, base
                );

                return Ok((
                    &paths[cand.idx],
                    SelectionState {
                        lane: Some(cand.lane_id),
                        rival: None,
                        rival_ticks: 0,
                        pending_entry: true,
                    },
                ));
            }
        }
    }

    // Stay with the committed lane while it remains within tolerance. A
    // rival which is closer by at least the margin has to hold that margin
    // for the whole hysteresis window before it takes over.
    if let Some(lane) = prior.lane {
        if let Some(committed) = find(lane) {
            if committed.dist_m.into_inner() <= params.reacquire_dist_m {
                let mut pending_entry = prior.pending_entry;
                if pending_entry && committed.dist_m.into_inner() <= committed.half_width_m {
                    pending_entry = false;
                }

                let rival_margin_held = best.lane_id != lane
                    && committed.dist_m.into_inner() - best.dist_m.into_inner()
                        >= params.hysteresis_margin_m;

                if rival_margin_held && !pending_entry {
                    let rival_ticks = if prior.rival == Some(best.lane_id) {
                        prior.rival_ticks + 1
                    } else {
                        1
                    };

                    if rival_ticks >= params.hysteresis_window_ticks {
                        debug!(
                            "Hysteresis window complete, switching lane {} -> {}",
                            lane, best.lane_id
                        );

                        return Ok((
                            &paths[best.idx],
                            SelectionState {
                                lane: Some(best.lane_id),
                                rival: None,
                                rival_ticks: 0,
                                pending_entry: false,
                            },
                        ));
                    }

                    return Ok((
                        &paths[committed.idx],
                        SelectionState {
                            lane: Some(lane),
                            rival: Some(best.lane_id),
                            rival_ticks,
                            pending_entry,
                        },
                    ));
                }

                return Ok((
                    &paths[committed.idx],
                    SelectionState {
                        lane: Some(lane),
                        rival: None,
                        rival_ticks: 0,
                        pending_entry,
                    },
                ));
            }
        }
    }

    // No usable commitment, take the closest candidate.
    Ok((
        &paths[best.idx],
        SelectionState {
            lane: Some(best.lane_id),
            rival: None,
            rival_ticks: 0,
            pending_entry: false,
        },
    ))
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Compute the figures of merit for each path, rejecting those whose
/// closest-waypoint heading differs from the vehicle heading by more than
/// the gating angle. Candidates with non-finite geometry are dropped too.
fn gate_candidates(
    paths: &[WaypointPath],
    veh: &VehicleState,
    params: &Params,
) -> Vec<Candidate> {
    let mut candidates = Vec::with_capacity(paths.len());

    for (idx, path) in paths.iter().enumerate() {
        let points = path.points();

        // Closest waypoint by Euclidean distance. Paths are non-empty by
        // construction so starting from the first point is fine.
        let mut wp_idx = 0;
        let mut dist = (veh.pos_m - points[0].pos_m).norm();
        for (i, wp) in points.iter().enumerate().skip(1) {
            let d = (veh.pos_m - wp.pos_m).norm();
            if d < dist {
                wp_idx = i;
                dist = d;
            }
        }
        let wp = &points[wp_idx];

        let head_diff = wrap_to_pi(veh.heading_rad - wp.heading_rad).abs();
        if head_diff > params.heading_gate_rad {
            continue;
        }

        // Perpendicular offset from the lane direction at the closest
        // waypoint
        let dir = Vector2::new(wp.heading_rad.cos(), wp.heading_rad.sin());
        let rel = veh.pos_m - wp.pos_m;
        let perp = (dir.x * rel.y - dir.y * rel.x).abs();

        let (dist_m, perp_m, head_diff_rad) = match (
            NotNan::new(dist),
            NotNan::new(perp),
            NotNan::new(head_diff),
        ) {
            (Ok(d), Ok(p), Ok(h)) => (d, p, h),
            _ => continue,
        };

        candidates.push(Candidate {
            idx,
            lane_id: path.lane_id(),
            dist_m,
            perp_m,
            head_diff_rad,
            half_width_m: wp.half_width_m,
        });
    }

    candidates
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use nalgebra::Point2;
    use sim_if::lane::Waypoint;

    /// Build a 40 m straight path starting at the given point.
    fn path_along(lane: u32, start: Point2<f64>, heading_rad: f64) -> WaypointPath {
        let dir = Vector2::new(heading_rad.cos(), heading_rad.sin());
        let points = (0..40)
            .map(|i| Waypoint {
                pos_m: start + dir * (i as f64),
                heading_rad,
                lane_id: LaneId(lane),
                half_width_m: 1.75,
                speed_limit_ms: 10.0,
                arc_len_m: i as f64,
            })
            .collect();
        WaypointPath::new(points).unwrap()
    }

    fn veh_at(x_m: f64, y_m: f64, heading_rad: f64) -> VehicleState {
        VehicleState {
            pos_m: Point2::new(x_m, y_m),
            heading_rad,
            speed_ms: 8.0,
            steer_rad: 0.0,
        }
    }

    /// Two parallel lanes along +x, lane 1 to the left of lane 0.
    fn two_lanes() -> Vec<WaypointPath> {
        vec![
            path_along(0, Point2::new(0.0, 0.0), 0.0),
            path_along(1, Point2::new(0.0, 3.5), 0.0),
        ]
    }

    #[test]
    fn test_idempotence() {
        let params = Params::default();
        let paths = two_lanes();
        let veh = veh_at(10.0, 2.2, 0.0);
        let prior = SelectionState {
            lane: Some(LaneId(0)),
            rival: Some(LaneId(1)),
            rival_ticks: 1,
            pending_entry: false,
        };

        let (sel_a, state_a) =
            select(&paths, &veh, &Intent::cruise(8.0), &prior, &params).unwrap();
        let (sel_b, state_b) =
            select(&paths, &veh, &Intent::cruise(8.0), &prior, &params).unwrap();

        assert_eq!(sel_a.lane_id(), sel_b.lane_id());
        assert_eq!(state_a, state_b);
    }

    #[test]
    fn test_heading_gate() {
        let params = Params::default();

        // A lane crossing the vehicle's direction of travel must be
        // rejected even though it is close by
        let crossing = vec![path_along(0, Point2::new(12.0, -5.0), std::f64::consts::FRAC_PI_2)];
        let result = select(
            &crossing,
            &veh_at(10.0, 0.0, 0.0),
            &Intent::cruise(8.0),
            &SelectionState::default(),
            &params,
        );
        assert!(matches!(result, Err(LaneCtrlError::NoViableLane)));

        // An oncoming lane likewise
        let oncoming = vec![path_along(0, Point2::new(40.0, 0.0), std::f64::consts::PI)];
        let result = select(
            &oncoming,
            &veh_at(10.0, 0.0, 0.0),
            &Intent::cruise(8.0),
            &SelectionState::default(),
            &params,
        );
        assert!(matches!(result, Err(LaneCtrlError::NoViableLane)));
    }

    #[test]
    fn test_initial_commit_and_stickiness() {
        let params = Params::default();
        let paths = two_lanes();

        // No prior commitment, closest lane wins
        let (sel, state) = select(
            &paths,
            &veh_at(10.0, 1.0, 0.0),
            &Intent::cruise(8.0),
            &SelectionState::default(),
            &params,
        )
        .unwrap();
        assert_eq!(sel.lane_id(), LaneId(0));
        assert_eq!(state.lane, Some(LaneId(0)));

        // Drifted past the midpoint but not by the margin, no rivalry
        let (sel, state) = select(
            &paths,
            &veh_at(10.0, 1.8, 0.0),
            &Intent::cruise(8.0),
            &state,
            &params,
        )
        .unwrap();
        assert_eq!(sel.lane_id(), LaneId(0));
        assert_eq!(state.rival, None);
    }

    #[test]
    fn test_hysteresis_window() {
        let params = Params::default();
        let paths = two_lanes();
        let intent = Intent::cruise(8.0);

        // Lane 1 is closer by 0.9 m, more than the 0.3 m margin
        let veh = veh_at(10.0, 2.2, 0.0);

        let mut state = SelectionState {
            lane: Some(LaneId(0)),
            rival: None,
            rival_ticks: 0,
            pending_entry: false,
        };

        // First two ticks of the window stay committed to lane 0
        for expected_ticks in 1..3 {
            let (sel, new_state) = select(&paths, &veh, &intent, &state, &params).unwrap();
            assert_eq!(sel.lane_id(), LaneId(0));
            assert_eq!(new_state.rival, Some(LaneId(1)));
            assert_eq!(new_state.rival_ticks, expected_ticks);
            state = new_state;
        }

        // The third consecutive tick completes the window and switches
        let (sel, state) = select(&paths, &veh, &intent, &state, &params).unwrap();
        assert_eq!(sel.lane_id(), LaneId(1));
        assert_eq!(state.lane, Some(LaneId(1)));
        assert_eq!(state.rival, None);
    }

    #[test]
    fn test_sub_margin_rival_never_switches() {
        let params = Params::default();
        let paths = two_lanes();
        let intent = Intent::cruise(8.0);

        // Lane 1 is closer, but only by 0.1 m
        let veh = veh_at(10.0, 1.8, 0.0);

        let mut state = SelectionState {
            lane: Some(LaneId(0)),
            ..Default::default()
        };

        for _ in 0..(params.hysteresis_window_ticks + 3) {
            let (sel, new_state) = select(&paths, &veh, &intent, &state, &params).unwrap();
            assert_eq!(sel.lane_id(), LaneId(0));
            assert_eq!(new_state.rival, None);
            state = new_state;
        }
    }

    #[test]
    fn test_lane_change_intent() {
        let params = Params::default();
        let paths = two_lanes();
        let prior = SelectionState {
            lane: Some(LaneId(0)),
            ..Default::default()
        };

        let change_left = Intent {
            target_speed_ms: 8.0,
            lane_change: LaneChange::Left,
        };

        // A left change from lane 0 commits lane 1 at once
        let (sel, state) = select(
            &paths,
            &veh_at(10.0, 0.0, 0.0),
            &change_left,
            &prior,
            &params,
        )
        .unwrap();
        assert_eq!(sel.lane_id(), LaneId(1));
        assert!(state.pending_entry);

        // A right change from the rightmost lane has nowhere to go and
        // stays put
        let change_right = Intent {
            target_speed_ms: 8.0,
            lane_change: LaneChange::Right,
        };
        let (sel, state) = select(
            &paths,
            &veh_at(10.0, 0.0, 0.0),
            &change_right,
            &prior,
            &params,
        )
        .unwrap();
        assert_eq!(sel.lane_id(), LaneId(0));
        assert!(!state.pending_entry);
    }

    #[test]
    fn test_no_bounce_after_lane_change() {
        let params = Params::default();
        let paths = two_lanes();
        let intent = Intent::cruise(8.0);

        // Freshly committed to lane 1 by intent, vehicle still physically
        // in lane 0
        let mut state = SelectionState {
            lane: Some(LaneId(1)),
            rival: None,
            rival_ticks: 0,
            pending_entry: true,
        };

        // Lane 0 is much closer for many ticks while the vehicle crosses,
        // but rivalry is suppressed until the new lane is entered
        for _ in 0..(params.hysteresis_window_ticks + 5) {
            let (sel, new_state) = select(
                &paths,
                &veh_at(10.0, 0.3, 0.0),
                &intent,
                &state,
                &params,
            )
            .unwrap();
            assert_eq!(sel.lane_id(), LaneId(1));
            assert!(new_state.pending_entry);
            state = new_state;
        }

        // Once inside the new lane's half width the flag clears
        let (sel, state) = select(
            &paths,
            &veh_at(10.0, 2.0, 0.0),
            &intent,
            &state,
            &params,
        )
        .unwrap();
        assert_eq!(sel.lane_id(), LaneId(1));
        assert!(!state.pending_entry);
    }

    #[test]
    fn test_reacquire_after_prior_lane_gone() {
        let params = Params::default();

        // Only lane 1 remains in the snapshot
        let paths = vec![path_along(1, Point2::new(0.0, 3.5), 0.0)];
        let prior = SelectionState {
            lane: Some(LaneId(0)),
            ..Default::default()
        };

        let (sel, state) = select(
            &paths,
            &veh_at(10.0, 3.0, 0.0),
            &Intent::cruise(8.0),
            &prior,
            &params,
        )
        .unwrap();
        assert_eq!(sel.lane_id(), LaneId(1));
        assert_eq!(state.lane, Some(LaneId(1)));
        assert_eq!(state.rival, None);
    }
}
