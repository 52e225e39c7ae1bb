//! Error types for the Beta admin agent

use thiserror::Error;

use crate::runner::CommandFailure;

/// Top-level error type for startup and server faults
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Server error: {0}")]
    ServerError(String),
}

/// Failure of an asynchronously executing procedure.
///
/// Never propagates past the procedure boundary: the job task captures it
/// into the owning job's terminal `error` field.
#[derive(Error, Debug)]
pub enum ProcedureError {
    #[error(transparent)]
    Command(#[from] CommandFailure),

    #[error("{0}")]
    Precondition(String),
}
