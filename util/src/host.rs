//! Host environment utility functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::env;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Environment variable pointing at the software root (the directory holding
/// `params/` and `scenarios/`).
pub const ROOT_ENV_VAR: &str = "LANESIM_ROOT";

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Get the software root directory.
///
/// Taken from the `LANESIM_ROOT` environment variable if set, otherwise the
/// current working directory is used so that executables can be run directly
/// from a checkout.
pub fn get_sw_root() -> std::io::Result<PathBuf> {
    match env::var(ROOT_ENV_VAR) {
        Ok(p) => Ok(PathBuf::from(p)),
        Err(_) => env::current_dir(),
    }
}
