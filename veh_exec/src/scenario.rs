//! # Scenario module
//!
//! A scenario file describes a complete simulation run: the road layout,
//! the vehicle's starting state, the agent policy and the tick settings.
//! Scenarios are TOML documents loaded at startup.
//!
//! The road itself is sampled once into per-lane waypoint lists. Each tick
//! the episode asks for a windowed snapshot of every lane around the
//! vehicle, which is what the lane controller sees. Snapshot arc lengths
//! are rebased to zero so the controller never learns where on the road it
//! is in absolute terms.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Point2;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

// Internal
use crate::policy::PolicySpec;
use sim_if::{
    lane::{LaneId, PathError, Waypoint, WaypointPath},
    veh::VehicleState,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A complete description of a simulation run.
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    /// Human readable name, used in logs and the summary.
    pub name: String,

    /// Number of parallel lanes. Lane 0 is the rightmost, indices increase
    /// to the left.
    pub num_lanes: u32,

    /// Width of each lane.
    ///
    /// Units: meters
    pub lane_width_m: f64,

    /// Speed limit applied to every lane.
    ///
    /// Units: meters/second
    pub speed_limit_ms: f64,

    /// Duration of one simulation tick.
    ///
    /// Units: seconds
    pub tick_s: f64,

    /// Tick count after which the episode stops regardless of progress.
    pub max_ticks: u64,

    /// How far behind the vehicle each lane snapshot reaches.
    ///
    /// Units: meters
    pub snapshot_behind_m: f64,

    /// How far ahead of the vehicle each lane snapshot reaches.
    ///
    /// Units: meters
    pub snapshot_horizon_m: f64,

    /// The road centreline shape.
    pub road: RoadSpec,

    /// The vehicle's starting state.
    pub veh: VehInit,

    /// The agent policy driving the episode.
    pub policy: PolicySpec,
}

/// Starting state of the vehicle.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct VehInit {
    pub x_m: f64,
    pub y_m: f64,
    pub heading_rad: f64,
    pub speed_ms: f64,
}

/// The sampled road, one waypoint list per lane.
pub struct Road {
    lanes: Vec<Vec<Waypoint>>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Shape of the road centreline, as written in scenario files.
///
/// Lane 0 follows the described shape, further lanes are offset to its
/// left.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoadSpec {
    /// A straight road along the +x axis starting at the origin.
    Straight { length_m: f64, spacing_m: f64 },

    /// A constant radius left hand bend, starting at the origin heading
    /// along +x. The rightmost lane has the given radius, lanes to the
    /// left sit on tighter circles about the same centre.
    Arc {
        radius_m: f64,
        arc_rad: f64,
        spacing_m: f64,
    },
}

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("Could not find the scenario at {0}")]
    NotFound(String),

    #[error("Could not load the scenario: {0}")]
    LoadError(std::io::Error),

    #[error("Could not parse the scenario: {0}")]
    ParseError(toml::de::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Scenario {
    /// Load a scenario from the given TOML file.
    pub fn load<P: AsRef<Path>>(scenario_path: P) -> Result<Self, ScenarioError> {
        let path = PathBuf::from(scenario_path.as_ref());

        if !path.exists() {
            return Err(ScenarioError::NotFound(
                path.to_str().unwrap().to_string(),
            ));
        }

        let scenario_str = match fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) => return Err(ScenarioError::LoadError(e)),
        };

        match toml::from_str(&scenario_str) {
            Ok(s) => Ok(s),
            Err(e) => Err(ScenarioError::ParseError(e)),
        }
    }

    /// The vehicle state the episode starts from.
    pub fn initial_state(&self) -> VehicleState {
        VehicleState {
            pos_m: Point2::new(self.veh.x_m, self.veh.y_m),
            heading_rad: self.veh.heading_rad,
            speed_ms: self.veh.speed_ms,
            steer_rad: 0.0,
        }
    }
}

impl Road {
    /// Sample the scenario's road into per-lane waypoint lists.
    pub fn build(scenario: &Scenario) -> Self {
        let half_width_m = scenario.lane_width_m / 2.0;

        let lanes = (0..scenario.num_lanes)
            .map(|lane| {
                let offset_m = lane as f64 * scenario.lane_width_m;

                match scenario.road {
                    RoadSpec::Straight {
                        length_m,
                        spacing_m,
                    } => {
                        let num = (length_m / spacing_m).floor() as usize + 1;
                        (0..num)
                            .map(|i| {
                                let arc_m = i as f64 * spacing_m;
                                Waypoint {
                                    pos_m: Point2::new(arc_m, offset_m),
                                    heading_rad: 0.0,
                                    lane_id: LaneId(lane),
                                    half_width_m,
                                    speed_limit_ms: scenario.speed_limit_ms,
                                    arc_len_m: arc_m,
                                }
                            })
                            .collect()
                    }
                    RoadSpec::Arc {
                        radius_m,
                        arc_rad,
                        spacing_m,
                    } => {
                        // Left hand bend about (0, radius). Lanes to the
                        // left sit closer to the centre.
                        let lane_radius_m = radius_m - offset_m;
                        let num =
                            (lane_radius_m * arc_rad / spacing_m).floor() as usize + 1;
                        (0..num)
                            .map(|i| {
                                let arc_m = i as f64 * spacing_m;
                                let theta_rad = arc_m / lane_radius_m;
                                Waypoint {
                                    pos_m: Point2::new(
                                        lane_radius_m * theta_rad.sin(),
                                        radius_m - lane_radius_m * theta_rad.cos(),
                                    ),
                                    heading_rad: theta_rad,
                                    lane_id: LaneId(lane),
                                    half_width_m,
                                    speed_limit_ms: scenario.speed_limit_ms,
                                    arc_len_m: arc_m,
                                }
                            })
                            .collect()
                    }
                }
            })
            .collect();

        Self { lanes }
    }

    /// Snapshot every lane in a window around the given position.
    ///
    /// Each snapshot runs from `behind_m` behind the sample closest to the
    /// position to `horizon_m` ahead of it, with arc lengths rebased to
    /// start at zero. Beyond the end of the road the window simply shrinks.
    pub fn paths_near(
        &self,
        pos_m: &Point2<f64>,
        behind_m: f64,
        horizon_m: f64,
    ) -> Result<Vec<WaypointPath>, PathError> {
        self.lanes
            .iter()
            .map(|lane| {
                // Closest sample on this lane
                let mut closest = 0;
                let mut best_sq_m = f64::INFINITY;
                for (i, wp) in lane.iter().enumerate() {
                    let dist_sq_m = (*pos_m - wp.pos_m).norm_squared();
                    if dist_sq_m < best_sq_m {
                        best_sq_m = dist_sq_m;
                        closest = i;
                    }
                }
                let closest_arc_m = lane[closest].arc_len_m;

                // Arc lengths are monotonic so this keeps one contiguous run
                let mut points: Vec<Waypoint> = lane
                    .iter()
                    .filter(|wp| {
                        wp.arc_len_m >= closest_arc_m - behind_m
                            && wp.arc_len_m <= closest_arc_m + horizon_m
                    })
                    .copied()
                    .collect();

                let base_m = points.first().map(|wp| wp.arc_len_m).unwrap_or(0.0);
                for wp in &mut points {
                    wp.arc_len_m -= base_m;
                }

                WaypointPath::new(points)
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    const SCENARIO_TOML: &str = r#"
        name = "straight_cruise"
        num_lanes = 2
        lane_width_m = 3.5
        speed_limit_ms = 10.0
        tick_s = 0.1
        max_ticks = 300
        snapshot_behind_m = 10.0
        snapshot_horizon_m = 50.0

        [road.straight]
        length_m = 100.0
        spacing_m = 1.0

        [veh]
        x_m = 0.0
        y_m = 0.5
        heading_rad = 0.0
        speed_ms = 5.0

        [policy.cruise]
        target_speed_ms = 8.0
    "#;

    fn scenario() -> Scenario {
        toml::from_str(SCENARIO_TOML).unwrap()
    }

    #[test]
    fn test_scenario_from_toml() {
        let scenario = scenario();

        assert_eq!(scenario.num_lanes, 2);
        assert!(matches!(
            scenario.road,
            RoadSpec::Straight { length_m, .. } if length_m == 100.0
        ));
        assert!(matches!(scenario.policy, PolicySpec::Cruise { .. }));

        let initial = scenario.initial_state();
        assert_eq!(initial.pos_m.y, 0.5);
        assert_eq!(initial.steer_rad, 0.0);
    }

    #[test]
    fn test_straight_road_geometry() {
        let road = Road::build(&scenario());

        assert_eq!(road.lanes.len(), 2);
        assert_eq!(road.lanes[0].len(), 101);

        // Lane 1 runs parallel one lane width to the left
        for (a, b) in road.lanes[0].iter().zip(&road.lanes[1]) {
            assert_eq!(a.pos_m.y, 0.0);
            assert_eq!(b.pos_m.y, 3.5);
            assert_eq!(a.pos_m.x, b.pos_m.x);
            assert_eq!(a.arc_len_m, a.pos_m.x);
        }

        assert_eq!(road.lanes[0][0].lane_id, LaneId(0));
        assert_eq!(road.lanes[1][0].lane_id, LaneId(1));
    }

    #[test]
    fn test_arc_road_stays_on_circle() {
        let mut scenario = scenario();
        scenario.road = RoadSpec::Arc {
            radius_m: 50.0,
            arc_rad: 1.5,
            spacing_m: 1.0,
        };
        let road = Road::build(&scenario);

        let centre = Point2::new(0.0, 50.0);
        for wp in &road.lanes[0] {
            assert!(((wp.pos_m - centre).norm() - 50.0).abs() < 1e-9);
            assert!((wp.heading_rad - wp.arc_len_m / 50.0).abs() < 1e-9);
        }

        // The inner lane sits on a tighter circle about the same centre
        for wp in &road.lanes[1] {
            assert!(((wp.pos_m - centre).norm() - 46.5).abs() < 1e-9);
        }
    }

    #[test]
    fn test_paths_near_windows_and_rebases() {
        let road = Road::build(&scenario());

        let paths = road
            .paths_near(&Point2::new(50.0, 0.2), 10.0, 30.0)
            .unwrap();
        assert_eq!(paths.len(), 2);

        let points = paths[0].points();
        assert_eq!(points.first().unwrap().pos_m.x, 40.0);
        assert_eq!(points.last().unwrap().pos_m.x, 80.0);

        // Rebased to zero at the window start
        assert_eq!(points.first().unwrap().arc_len_m, 0.0);
        assert_eq!(points.last().unwrap().arc_len_m, 40.0);
    }

    #[test]
    fn test_paths_near_beyond_road_end() {
        let road = Road::build(&scenario());

        // Past the end of the road the window shrinks to what is left
        let paths = road
            .paths_near(&Point2::new(150.0, 0.0), 10.0, 30.0)
            .unwrap();

        let points = paths[0].points();
        assert_eq!(points.first().unwrap().pos_m.x, 90.0);
        assert_eq!(points.last().unwrap().pos_m.x, 100.0);
        assert_eq!(points.last().unwrap().arc_len_m, 10.0);
    }
}
