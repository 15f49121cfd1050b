//! Error types for the pipeline.
//!
//! Steady-state ingestion never fails; these errors cover construction,
//! configuration and lifecycle misuse only.

use thiserror::Error;

/// Pipeline error type.
#[derive(Debug, Error)]
pub enum GrabError {
    /// The capture source failed to start.
    #[error("Capture error: {0}")]
    Capture(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration.
    #[error("Config error: {0}")]
    Config(String),

    /// Operation not allowed in the current lifecycle state.
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, GrabError>;
