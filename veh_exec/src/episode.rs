//! # Episode module
//!
//! An episode is one closed loop simulation run: a road, a vehicle model,
//! an agent policy and the lane control module, stepped together on a fixed
//! tick until the route ends or the tick budget runs out.
//!
//! Each tick runs the same sequence:
//!  1. Snapshot the vehicle state and let the policy form its intent
//!  2. Snapshot the lanes around the vehicle
//!  3. Process lane control to get an actuation command
//!  4. Step the vehicle model under that command
//!
//! The controller only ever sees the tick's snapshots, never the road or
//! the model directly.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::info;
use serde::Serialize;
use thiserror::Error;

// Internal
use crate::{
    data_store::DataStore,
    lane_ctrl::{self, LaneCtrlError},
    policy::{self, Policy},
    scenario::{Road, Scenario},
    veh_model::{self, VehModel},
};
use sim_if::{
    agent::Observation,
    lane::{LaneId, PathError},
    veh::VehicleState,
};
use util::module::State;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Remaining arc length below which the route counts as finished.
const END_REMAINING_M: f64 = 0.5;

/// Speed below which the vehicle counts as stopped.
const END_SPEED_MS: f64 = 0.1;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// One closed loop simulation run.
pub struct Episode {
    scenario: Scenario,
    road: Road,
    model: VehModel,
    policy: Box<dyn Policy>,

    /// All module and tick data for the run
    pub ds: DataStore,
}

/// Summary of a finished episode, saved into the session.
#[derive(Debug, Serialize)]
pub struct EpisodeSummary {
    pub name: String,
    pub num_ticks: u64,
    pub sim_time_s: f64,
    pub end_of_route: bool,
    pub final_lane: Option<LaneId>,
    pub final_speed_ms: f64,
    pub final_lat_err_m: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum EpisodeError {
    #[error("Road snapshot produced an invalid path: {0}")]
    InvalidPath(#[from] PathError),

    #[error("Lane control failed: {0}")]
    LaneCtrl(#[from] LaneCtrlError),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Episode {
    /// Build an episode from a scenario and an initialised lane control
    /// module.
    pub fn new(
        scenario: Scenario,
        model_params: veh_model::Params,
        lane_ctrl: lane_ctrl::LaneCtrl,
    ) -> Self {
        let road = Road::build(&scenario);
        let model = VehModel::new(model_params, scenario.initial_state());
        let policy = policy::from_spec(&scenario.policy);

        let mut ds = DataStore::default();
        ds.lane_ctrl = lane_ctrl;
        ds.veh = *model.state();

        Self {
            scenario,
            road,
            model,
            policy,
            ds,
        }
    }

    /// The vehicle's true state at the current tick boundary.
    pub fn veh_state(&self) -> &VehicleState {
        self.model.state()
    }

    /// True once the episode has nothing left to do.
    pub fn is_finished(&self) -> bool {
        self.ds.end_of_route || self.ds.num_ticks >= self.scenario.max_ticks
    }

    /// Advance the simulation by one tick.
    pub fn step(&mut self) -> Result<(), EpisodeError> {
        self.ds.cycle_start();
        self.ds.veh = *self.model.state();

        // The policy acts on this tick's observation
        let committed = self.ds.lane_ctrl.selection().lane;
        let obs = Observation {
            time_s: self.ds.sim_time_s,
            veh: self.ds.veh,
            lane_id: committed,
            speed_limit_ms: committed.map(|_| self.scenario.speed_limit_ms),
        };
        self.ds.intent = self.policy.act(&obs);
        self.ds.observation = Some(obs);

        // Lane snapshots around the vehicle
        self.ds.lane_ctrl_input = lane_ctrl::InputData {
            paths: self.road.paths_near(
                &self.ds.veh.pos_m,
                self.scenario.snapshot_behind_m,
                self.scenario.snapshot_horizon_m,
            )?,
            veh: self.ds.veh,
            intent: self.ds.intent,
            dt_s: self.scenario.tick_s,
        };

        // Lane control
        let (cmd, report) = self.ds.lane_ctrl.proc(&self.ds.lane_ctrl_input)?;
        self.ds.lane_ctrl_output = Some(cmd);
        self.ds.lane_ctrl_status_rpt = report;

        // Step the plant under the command
        self.model.step(&cmd, self.scenario.tick_s);

        // The route is done once the vehicle has come to rest at its end
        if !report.held
            && report.remaining_m < END_REMAINING_M
            && self.model.state().speed_ms < END_SPEED_MS
        {
            self.ds.end_of_route = true;
        }

        self.ds.num_ticks += 1;
        self.ds.sim_time_s += self.scenario.tick_s;

        Ok(())
    }

    /// Run the episode to completion.
    pub fn run(&mut self) -> Result<EpisodeSummary, EpisodeError> {
        info!("Starting episode \"{}\"", self.scenario.name);

        while !self.is_finished() {
            self.step()?;
        }

        let summary = self.summary();
        info!(
            "Episode \"{}\" finished after {} ticks ({:.1} s simulated)",
            summary.name, summary.num_ticks, summary.sim_time_s
        );

        Ok(summary)
    }

    /// Summarise the episode's current state.
    pub fn summary(&self) -> EpisodeSummary {
        EpisodeSummary {
            name: self.scenario.name.clone(),
            num_ticks: self.ds.num_ticks,
            sim_time_s: self.ds.sim_time_s,
            end_of_route: self.ds.end_of_route,
            final_lane: self.ds.lane_ctrl.selection().lane,
            final_speed_ms: self.model.state().speed_ms,
            final_lat_err_m: self.ds.lane_ctrl_status_rpt.lat_err_m,
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        lane_ctrl::LaneCtrl,
        policy::PolicySpec,
        scenario::{RoadSpec, VehInit},
    };
    use sim_if::agent::LaneChange;

    fn scenario(road: RoadSpec, veh: VehInit, policy: PolicySpec) -> Scenario {
        Scenario {
            name: "test".to_string(),
            num_lanes: 1,
            lane_width_m: 3.5,
            speed_limit_ms: 12.0,
            tick_s: 0.1,
            max_ticks: 300,
            snapshot_behind_m: 10.0,
            snapshot_horizon_m: 50.0,
            road,
            veh,
            policy,
        }
    }

    fn episode(scenario: Scenario) -> Episode {
        Episode::new(
            scenario,
            veh_model::Params::default(),
            LaneCtrl::with_params(lane_ctrl::Params::default()),
        )
    }

    #[test]
    fn test_converges_onto_straight_lane() {
        let mut episode = episode(scenario(
            RoadSpec::Straight {
                length_m: 300.0,
                spacing_m: 1.0,
            },
            VehInit {
                x_m: 0.0,
                y_m: 1.0,
                heading_rad: 0.0,
                speed_ms: 8.0,
            },
            PolicySpec::Cruise {
                target_speed_ms: 8.0,
            },
        ));

        // Offset to the left of the lane: the very first command must
        // steer right
        episode.step().unwrap();
        assert!(episode.ds.lane_ctrl_output.unwrap().steer_rad() < 0.0);

        for _ in 1..50 {
            episode.step().unwrap();
        }

        // Converged onto the centreline, wheels straight, still cruising
        let report = episode.ds.lane_ctrl_status_rpt;
        assert!(report.lat_err_m.abs() < 0.1);
        assert!(episode.ds.lane_ctrl_output.unwrap().steer_rad().abs() < 0.02);
        assert_eq!(report.selected_lane, Some(LaneId(0)));
        assert!(episode.veh_state().speed_ms > 7.0);
        assert!(!report.held);
    }

    #[test]
    fn test_steady_state_steering_on_circle() {
        let mut episode = episode(scenario(
            RoadSpec::Arc {
                radius_m: 50.0,
                arc_rad: 3.0,
                spacing_m: 1.0,
            },
            VehInit {
                x_m: 0.0,
                y_m: 0.0,
                heading_rad: 0.0,
                speed_ms: 10.0,
            },
            PolicySpec::Cruise {
                target_speed_ms: 10.0,
            },
        ));

        let mut steer_sum_rad = 0.0;
        for tick in 0..100 {
            episode.step().unwrap();
            if tick >= 60 {
                steer_sum_rad += episode.ds.lane_ctrl_output.unwrap().steer_rad();
            }
        }

        // On a constant radius the settled steering angle is the bicycle
        // model's atan(wheelbase / radius)
        let mean_steer_rad = steer_sum_rad / 40.0;
        let expected_rad = (2.8f64 / 50.0).atan();
        assert!(
            (mean_steer_rad - expected_rad).abs() < 0.05 * expected_rad,
            "mean steer {} expected {}",
            mean_steer_rad,
            expected_rad
        );

        assert!(episode.ds.lane_ctrl_status_rpt.lat_err_m.abs() < 0.2);
    }

    #[test]
    fn test_lane_change_completes_without_bouncing() {
        let mut scenario = scenario(
            RoadSpec::Straight {
                length_m: 300.0,
                spacing_m: 1.0,
            },
            VehInit {
                x_m: 0.0,
                y_m: 0.0,
                heading_rad: 0.0,
                speed_ms: 8.0,
            },
            PolicySpec::LaneChangeAt {
                target_speed_ms: 8.0,
                at_time_s: 2.0,
                direction: LaneChange::Left,
            },
        );
        scenario.num_lanes = 3;

        let mut episode = episode(scenario);

        let mut switches = 0;
        for _ in 0..150 {
            episode.step().unwrap();
            if episode.ds.lane_ctrl_status_rpt.lane_switched {
                switches += 1;
            }
        }

        // Exactly one switch, settled in the middle lane
        assert_eq!(switches, 1);
        assert_eq!(episode.ds.lane_ctrl.selection().lane, Some(LaneId(1)));
        assert!((episode.veh_state().pos_m.y - 3.5).abs() < 0.3);
        assert!(episode.ds.lane_ctrl_status_rpt.lat_err_m.abs() < 0.3);
    }

    #[test]
    fn test_stops_at_end_of_route() {
        let mut episode = episode(scenario(
            RoadSpec::Straight {
                length_m: 60.0,
                spacing_m: 1.0,
            },
            VehInit {
                x_m: 0.0,
                y_m: 0.0,
                heading_rad: 0.0,
                speed_ms: 8.0,
            },
            PolicySpec::Cruise {
                target_speed_ms: 8.0,
            },
        ));

        let summary = episode.run().unwrap();

        // Stopped at the end of the road, not timed out
        assert!(summary.end_of_route);
        assert!(summary.num_ticks < 300);
        assert!(summary.final_speed_ms < END_SPEED_MS);
        assert!(episode.veh_state().pos_m.x < 61.0);
    }
}
