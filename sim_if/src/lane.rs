//! # Lane geometry
//!
//! This module defines the waypoint paths which describe candidate lane
//! geometries. The map collaborator delivers a fresh snapshot of paths (one
//! per reachable lane) every tick, and the whole snapshot is discarded at
//! the end of the tick.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Identifier of a lane within the road.
///
/// Lane indices increase to the left of the direction of travel, so lane 0
/// is the rightmost lane of the road.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct LaneId(pub u32);

/// A single sampled point of lane geometry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Waypoint {
    /// Position of the waypoint in the world frame
    pub pos_m: Point2<f64>,

    /// Heading of the lane tangent at this waypoint, in radians to the +ve
    /// x axis
    pub heading_rad: f64,

    /// The lane this waypoint belongs to
    pub lane_id: LaneId,

    /// Half the width of the lane at this waypoint
    pub half_width_m: f64,

    /// Speed limit of the lane at this waypoint
    pub speed_limit_ms: f64,

    /// Cumulative arc-length from the start of the path
    pub arc_len_m: f64,
}

/// An ordered sequence of waypoints describing one lane's geometry over a
/// bounded lookahead horizon.
///
/// The waypoints are validated on construction and cannot be modified
/// afterwards, so a `WaypointPath` is always non-empty with strictly
/// increasing arc-length.
#[derive(Debug, Clone, Serialize)]
pub struct WaypointPath {
    points: Vec<Waypoint>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors which make a path snapshot unusable.
#[derive(Debug, thiserror::Error)]
pub enum PathError {
    #[error("Attempted to create a path with no waypoints")]
    Empty,

    #[error("Arc-length is not strictly increasing at waypoint {0}")]
    NonMonotonicArc(usize),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LaneId {
    /// Get the identifier of the lane to the left of this one.
    pub fn left(&self) -> LaneId {
        LaneId(self.0 + 1)
    }

    /// Get the identifier of the lane to the right of this one, or `None` if
    /// this is already the rightmost lane.
    pub fn right(&self) -> Option<LaneId> {
        self.0.checked_sub(1).map(LaneId)
    }

    /// True if the other lane is directly adjacent to this one.
    pub fn is_adjacent(&self, other: LaneId) -> bool {
        let diff = if self.0 > other.0 {
            self.0 - other.0
        } else {
            other.0 - self.0
        };
        diff == 1
    }
}

impl std::fmt::Display for LaneId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl WaypointPath {
    /// Create a new path from the given waypoints.
    ///
    /// Fails if the sequence is empty or if the cumulative arc-length is not
    /// strictly increasing.
    pub fn new(points: Vec<Waypoint>) -> Result<Self, PathError> {
        Self::check(&points)?;
        Ok(Self { points })
    }

    /// The waypoints making up this path.
    pub fn points(&self) -> &[Waypoint] {
        &self.points
    }

    /// The lane this path describes.
    ///
    /// Taken from the first waypoint, which always exists.
    pub fn lane_id(&self) -> LaneId {
        self.points[0].lane_id
    }

    /// The final waypoint of the path.
    pub fn last(&self) -> &Waypoint {
        // Safe since construction rejects empty paths
        self.points.last().unwrap()
    }

    /// The arc-length covered by this path in meters.
    pub fn length_m(&self) -> f64 {
        self.last().arc_len_m - self.points[0].arc_len_m
    }

    /// Verify the path invariants on a waypoint sequence.
    fn check(points: &[Waypoint]) -> Result<(), PathError> {
        if points.is_empty() {
            return Err(PathError::Empty);
        }

        for i in 1..points.len() {
            if points[i].arc_len_m <= points[i - 1].arc_len_m {
                return Err(PathError::NonMonotonicArc(i));
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn waypoint(x: f64, arc_len_m: f64) -> Waypoint {
        Waypoint {
            pos_m: Point2::new(x, 0.0),
            heading_rad: 0.0,
            lane_id: LaneId(0),
            half_width_m: 1.75,
            speed_limit_ms: 10.0,
            arc_len_m,
        }
    }

    #[test]
    fn test_valid_path() {
        let path = WaypointPath::new(vec![
            waypoint(0.0, 0.0),
            waypoint(1.0, 1.0),
            waypoint(2.0, 2.0),
        ])
        .unwrap();

        assert_eq!(path.points().len(), 3);
        assert_eq!(path.lane_id(), LaneId(0));
        assert!((path.length_m() - 2.0).abs() < 1e-9);

        // A single waypoint is still a valid path
        assert!(WaypointPath::new(vec![waypoint(0.0, 0.0)]).is_ok());
    }

    #[test]
    fn test_invalid_paths_rejected() {
        assert!(matches!(
            WaypointPath::new(Vec::new()),
            Err(PathError::Empty)
        ));

        let result = WaypointPath::new(vec![
            waypoint(0.0, 0.0),
            waypoint(1.0, 1.0),
            waypoint(2.0, 1.0),
        ]);
        assert!(matches!(result, Err(PathError::NonMonotonicArc(2))));
    }

    #[test]
    fn test_lane_adjacency() {
        let lane = LaneId(1);

        assert_eq!(lane.left(), LaneId(2));
        assert_eq!(lane.right(), Some(LaneId(0)));
        assert_eq!(LaneId(0).right(), None);

        assert!(lane.is_adjacent(LaneId(0)));
        assert!(lane.is_adjacent(LaneId(2)));
        assert!(!lane.is_adjacent(LaneId(1)));
        assert!(!lane.is_adjacent(LaneId(3)));
    }
}
