//! Error types for the device simulator.

use thiserror::Error;

/// Errors that can occur while configuring or running the simulator.
#[derive(Debug, Error)]
pub enum SimError {
    /// A probability is outside `[0, 1]` (or NaN).
    #[error("{name} must be within [0, 1], got {value}")]
    InvalidProbability {
        /// Config field name.
        name: &'static str,
        /// Offending value.
        value: f64,
    },

    /// A non-probability setting is invalid.
    #[error("invalid simulator config: {0}")]
    InvalidConfig(String),

    /// An event could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Writing to the output failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for simulator operations.
pub type Result<T> = std::result::Result<T, SimError>;
