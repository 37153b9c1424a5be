//! Error types for job operations

use thiserror::Error;

/// Errors that can occur while starting or tracking jobs
#[derive(Error, Debug)]
pub enum JobError {
    /// The job request cannot be started
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// No task with the given id
    #[error("Task not found: {0}")]
    NotFound(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
