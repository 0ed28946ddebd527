//! Error types for trail reports.

use thiserror::Error;
use warden_audit::ReadError;

/// Errors that can occur while building a report.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The trail could not be read.
    #[error("failed to read audit trail: {0}")]
    Read(#[from] ReadError),

    /// Output could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for report operations.
pub type Result<T> = std::result::Result<T, ReportError>;
