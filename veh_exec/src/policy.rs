//! # Agent policy module
//!
//! Policies stand in for the agent collaborator. Each tick the episode
//! hands the active policy an [`Observation`] and gets back the [`Intent`]
//! the lane controller is to execute. Policies are deliberately simple,
//! they exist to drive the controller through interesting situations, not
//! to be clever themselves.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// Internal
use sim_if::agent::{Intent, LaneChange, Observation};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Speed demanded by the limit follower before any lane is committed and a
/// limit is known.
const CREEP_SPEED_MS: f64 = 2.0;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// An agent policy.
pub trait Policy {
    /// The intent for the tick described by the observation.
    fn act(&mut self, obs: &Observation) -> Intent;
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Serialisable description of a policy, as written in scenario files.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicySpec {
    /// Hold a constant speed demand in the current lane.
    Cruise { target_speed_ms: f64 },

    /// Cruise, requesting a single lane change at a fixed time.
    LaneChangeAt {
        target_speed_ms: f64,
        at_time_s: f64,
        direction: LaneChange,
    },

    /// Demand a margin below the committed lane's speed limit.
    LimitFollower { margin_ms: f64 },

    /// Play back a time ordered list of demands.
    Script { entries: Vec<ScriptEntry> },
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// One timed demand in a scripted policy.
///
/// Fields left out of the scenario file keep their previous value, except
/// the lane change which is a single tick pulse.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ScriptEntry {
    /// Simulation time at which this entry fires.
    pub at_time_s: f64,

    /// New target speed, if any.
    #[serde(default)]
    pub target_speed_ms: Option<f64>,

    /// Lane change to request, if any.
    #[serde(default)]
    pub lane_change: Option<LaneChange>,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Instantiate the policy described by a spec.
pub fn from_spec(spec: &PolicySpec) -> Box<dyn Policy> {
    match spec {
        PolicySpec::Cruise { target_speed_ms } => Box::new(Cruise {
            target_speed_ms: *target_speed_ms,
        }),
        PolicySpec::LaneChangeAt {
            target_speed_ms,
            at_time_s,
            direction,
        } => Box::new(LaneChangeAt {
            target_speed_ms: *target_speed_ms,
            at_time_s: *at_time_s,
            direction: *direction,
            sent: false,
        }),
        PolicySpec::LimitFollower { margin_ms } => Box::new(LimitFollower {
            margin_ms: *margin_ms,
        }),
        PolicySpec::Script { entries } => {
            // Play back in time order whatever order the file lists them in
            let mut entries = entries.clone();
            entries.sort_by(|a, b| {
                a.at_time_s
                    .partial_cmp(&b.at_time_s)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

            Box::new(Script {
                entries,
                next: 0,
                target_speed_ms: 0.0,
            })
        }
    }
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

struct Cruise {
    target_speed_ms: f64,
}

impl Policy for Cruise {
    fn act(&mut self, _obs: &Observation) -> Intent {
        Intent::cruise(self.target_speed_ms)
    }
}

struct LaneChangeAt {
    target_speed_ms: f64,
    at_time_s: f64,
    direction: LaneChange,

    /// Whether the change request has been emitted yet. The request is a
    /// single tick pulse, the controller owns the manoeuvre from there.
    sent: bool,
}

impl Policy for LaneChangeAt {
    fn act(&mut self, obs: &Observation) -> Intent {
        let mut intent = Intent::cruise(self.target_speed_ms);

        if !self.sent && obs.time_s >= self.at_time_s {
            intent.lane_change = self.direction;
            self.sent = true;
        }

        intent
    }
}

struct LimitFollower {
    margin_ms: f64,
}

impl Policy for LimitFollower {
    fn act(&mut self, obs: &Observation) -> Intent {
        // Until a lane is committed there is no limit to follow, so creep
        let target_ms = obs
            .speed_limit_ms
            .map(|limit| (limit - self.margin_ms).max(0.0))
            .unwrap_or(CREEP_SPEED_MS);

        Intent::cruise(target_ms)
    }
}

struct Script {
    /// Entries sorted by firing time
    entries: Vec<ScriptEntry>,

    /// Index of the next entry yet to fire
    next: usize,

    /// Target speed carried between entries, zero before the first one
    target_speed_ms: f64,
}

impl Policy for Script {
    fn act(&mut self, obs: &Observation) -> Intent {
        let mut lane_change = LaneChange::Stay;

        // Fire everything whose time has come. If several entries land on
        // the same tick the later one wins.
        while let Some(entry) = self.entries.get(self.next) {
            if entry.at_time_s > obs.time_s {
                break;
            }

            if let Some(speed_ms) = entry.target_speed_ms {
                self.target_speed_ms = speed_ms;
            }
            if let Some(change) = entry.lane_change {
                lane_change = change;
            }

            self.next += 1;
        }

        Intent {
            target_speed_ms: self.target_speed_ms,
            lane_change,
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use nalgebra::Point2;
    use sim_if::{lane::LaneId, veh::VehicleState};

    fn obs(time_s: f64, speed_limit_ms: Option<f64>) -> Observation {
        Observation {
            time_s,
            veh: VehicleState {
                pos_m: Point2::new(0.0, 0.0),
                heading_rad: 0.0,
                speed_ms: 5.0,
                steer_rad: 0.0,
            },
            lane_id: speed_limit_ms.map(|_| LaneId(0)),
            speed_limit_ms,
        }
    }

    #[test]
    fn test_cruise_is_constant() {
        let mut policy = from_spec(&PolicySpec::Cruise {
            target_speed_ms: 8.0,
        });

        for t in 0..5 {
            let intent = policy.act(&obs(t as f64, Some(10.0)));
            assert_eq!(intent.target_speed_ms, 8.0);
            assert_eq!(intent.lane_change, LaneChange::Stay);
        }
    }

    #[test]
    fn test_lane_change_is_a_single_pulse() {
        let mut policy = from_spec(&PolicySpec::LaneChangeAt {
            target_speed_ms: 8.0,
            at_time_s: 2.0,
            direction: LaneChange::Left,
        });

        let mut pulses = 0;
        for t in 0..50 {
            let intent = policy.act(&obs(t as f64 * 0.1, Some(10.0)));
            if intent.lane_change != LaneChange::Stay {
                // The pulse lands on the first tick at or after the
                // requested time
                assert_eq!(intent.lane_change, LaneChange::Left);
                assert_eq!(t, 20);
                pulses += 1;
            }
        }

        assert_eq!(pulses, 1);
    }

    #[test]
    fn test_limit_follower_tracks_margin() {
        let mut policy = from_spec(&PolicySpec::LimitFollower { margin_ms: 2.0 });

        let intent = policy.act(&obs(0.0, Some(10.0)));
        assert_eq!(intent.target_speed_ms, 8.0);

        // No committed lane yet: creep rather than stop dead
        let intent = policy.act(&obs(0.0, None));
        assert_eq!(intent.target_speed_ms, CREEP_SPEED_MS);

        // The margin cannot demand a reverse speed
        let mut policy = from_spec(&PolicySpec::LimitFollower { margin_ms: 20.0 });
        let intent = policy.act(&obs(0.0, Some(10.0)));
        assert_eq!(intent.target_speed_ms, 0.0);
    }

    #[test]
    fn test_script_plays_back_in_order() {
        // Listed out of order on purpose
        let mut policy = from_spec(&PolicySpec::Script {
            entries: vec![
                ScriptEntry {
                    at_time_s: 4.0,
                    target_speed_ms: Some(5.0),
                    lane_change: None,
                },
                ScriptEntry {
                    at_time_s: 0.0,
                    target_speed_ms: Some(8.0),
                    lane_change: None,
                },
                ScriptEntry {
                    at_time_s: 2.0,
                    target_speed_ms: None,
                    lane_change: Some(LaneChange::Left),
                },
            ],
        });

        let mut pulses = 0;
        for t in 0..60 {
            let time_s = t as f64 * 0.1;
            let intent = policy.act(&obs(time_s, Some(10.0)));

            if intent.lane_change != LaneChange::Stay {
                assert_eq!(t, 20);
                pulses += 1;
            }

            // The speed demand steps at each entry and holds in between
            if time_s < 4.0 {
                assert_eq!(intent.target_speed_ms, 8.0);
            } else {
                assert_eq!(intent.target_speed_ms, 5.0);
            }
        }

        assert_eq!(pulses, 1);
    }

    #[test]
    fn test_spec_from_toml() {
        let spec: PolicySpec = toml::from_str(
            "[lane_change_at]\n\
            target_speed_ms = 8.0\n\
            at_time_s = 2.0\n\
            direction = \"Left\"",
        )
        .unwrap();

        assert!(matches!(spec, PolicySpec::LaneChangeAt { .. }));

        let spec: PolicySpec = toml::from_str(
            "[script]\n\
            entries = [\n\
                { at_time_s = 0.0, target_speed_ms = 8.0 },\n\
                { at_time_s = 5.0, lane_change = \"Left\" },\n\
            ]",
        )
        .unwrap();

        assert!(matches!(spec, PolicySpec::Script { ref entries } if entries.len() == 2));
    }
}
