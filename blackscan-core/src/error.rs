//! Error types for the blackscan core library.
//!
//! Per-file failures (a tool that cannot be started, or that exits nonzero)
//! are represented here but are always caught at the queue boundary and
//! converted into a `FileOutcome` status; they never escape a batch run.

use std::process::ExitStatus;

use thiserror::Error;

/// Custom error types for blackscan.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("required external tool not found: {0}")]
    DependencyNotFound(String),

    #[error("failed to start {0}: {1}")]
    CommandStart(String, #[source] std::io::Error),

    #[error("error waiting for {0}: {1}")]
    CommandWait(String, #[source] std::io::Error),

    #[error("{0} failed with {1}: {2}")]
    CommandFailed(String, ExitStatus, String),

    #[error("no video files found")]
    NoFilesFound,

    #[error("invalid path: {0}")]
    PathError(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Result type for blackscan operations.
pub type CoreResult<T> = std::result::Result<T, CoreError>;

/// Builds a `CommandStart` error for a tool that could not be launched.
pub fn command_start_error(cmd: impl Into<String>, err: std::io::Error) -> CoreError {
    CoreError::CommandStart(cmd.into(), err)
}

/// Builds a `CommandWait` error for a tool whose exit status could not be read.
pub fn command_wait_error(cmd: impl Into<String>, err: std::io::Error) -> CoreError {
    CoreError::CommandWait(cmd.into(), err)
}

/// Builds a `CommandFailed` error for a tool that launched but exited nonzero.
pub fn command_failed_error(
    cmd: impl Into<String>,
    status: ExitStatus,
    detail: impl Into<String>,
) -> CoreError {
    CoreError::CommandFailed(cmd.into(), status, detail.into())
}
