//! # Vehicle library.
//!
//! This library allows other crates in the workspace (and the benchmarks) to
//! access items defined inside the vehicle crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Global data store - aggregates all per-tick data of the executable
pub mod data_store;

/// Episode driver - owns the tick boundary between controller and physics
pub mod episode;

/// Lane control module - converts agent intents and lane geometry into actuation commands
pub mod lane_ctrl;

/// Agent policies - produce intents from observations
pub mod policy;

/// Scenario definitions - road geometry and initial conditions for an episode
pub mod scenario;

/// Vehicle model - kinematic bicycle standing in for the physics collaborator
pub mod veh_model;
