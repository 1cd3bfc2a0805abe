//! # Simulation interface crate.
//!
//! Provides the common data structures exchanged between the vehicle
//! executable and the surrounding simulation.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Agent-level types: intents, observations and policies acting on them
pub mod agent;

/// Lane geometry snapshots delivered by the map collaborator
pub mod lane;

/// Vehicle state and actuation command definitions
pub mod veh;
