//! Logging setup
//!
//! Initialises the fern logger for an executable. Log records are written
//! both to stdout (with coloured level tags) and to the session's log file,
//! stamped with the elapsed session time.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use colored::*;
pub use log::LevelFilter;
use thiserror::Error;

// Internal imports
use crate::session::{self, Session};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors which can occur during logger initialisation.
#[derive(Error, Debug)]
pub enum LoggerInitError {
    #[error("Cannot open the log file: {0}")]
    LogFileError(std::io::Error),

    #[error("Cannot initialise the logger: {0}")]
    FernInitError(log::SetLoggerError),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Initialise the logger for this execution.
///
/// Stdout records are coloured by level, file records are plain. Both carry
/// the time in seconds since the session epoch so that log lines can be
/// correlated with archived telemetry.
pub fn logger_init(min_level: LevelFilter, session: &Session) -> Result<(), LoggerInitError> {
    let log_file = fern::log_file(&session.log_file_path).map_err(LoggerInitError::LogFileError)?;

    fern::Dispatch::new()
        .level(min_level)
        .chain(
            fern::Dispatch::new()
                .format(|out, message, record| {
                    out.finish(format_args!(
                        "[{:10.4} {}] {}",
                        session::get_elapsed_seconds(),
                        level_to_str(record.level()),
                        message
                    ))
                })
                .chain(std::io::stdout()),
        )
        .chain(
            fern::Dispatch::new()
                .format(|out, message, record| {
                    out.finish(format_args!(
                        "[{:10.4} {}] {}",
                        session::get_elapsed_seconds(),
                        record.level(),
                        message
                    ))
                })
                .chain(log_file),
        )
        .apply()
        .map_err(LoggerInitError::FernInitError)?;

    Ok(())
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Convert a log level into a coloured string for stdout output.
fn level_to_str(level: log::Level) -> String {
    match level {
        log::Level::Error => "ERR".red().to_string(),
        log::Level::Warn => "WRN".yellow().to_string(),
        log::Level::Info => "INF".to_string(),
        log::Level::Debug => "DBG".dimmed().to_string(),
        log::Level::Trace => "TRC".dimmed().to_string(),
    }
}
