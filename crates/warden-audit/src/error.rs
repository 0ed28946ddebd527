//! Error types for the auditor.
//!
//! [`EventError`] is recovered locally (the line is skipped),
//! [`WriteError`] is fatal for the run, and [`AuditError`] is what the
//! driver hands back to its caller.

use thiserror::Error;

/// A raw input line that could not be turned into an [`Event`](crate::Event).
///
/// Malformed events are diagnosed and skipped; they never reach the trail.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EventError {
    /// The line is not valid JSON or does not match the event schema.
    #[error("invalid event record: {0}")]
    Invalid(String),

    /// A required field was absent.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// The endpoint URL uses a scheme that maps to no known transport.
    #[error("unrecognized endpoint scheme: {0}")]
    UnknownEndpoint(String),

    /// The line is not valid UTF-8.
    #[error("event line is not valid UTF-8 (valid up to byte {valid_up_to})")]
    InvalidUtf8 {
        /// Length of the valid prefix.
        valid_up_to: usize,
    },

    /// The line exceeds the configured maximum length.
    #[error("event line exceeds {max} bytes")]
    LineTooLong {
        /// Configured maximum.
        max: usize,
    },
}

/// Failure to persist or reopen the audit trail.
#[derive(Debug, Error)]
pub enum WriteError {
    /// An I/O error occurred while writing or syncing.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A record could not be serialized.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An existing trail failed validation on open.
    #[error("corrupt audit trail at line {line}: {reason}")]
    CorruptTrail {
        /// 1-based line number of the first invalid line.
        line: usize,
        /// What was wrong with it.
        reason: String,
    },

    /// The store refused the write (used by in-memory fault injection).
    #[error("audit trail rejected write: {0}")]
    Rejected(String),
}

/// Failure to read back an audit trail.
#[derive(Debug, Error)]
pub enum ReadError {
    /// An I/O error occurred while reading.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A complete line is not a valid record.
    #[error("invalid record at line {line}: {reason}")]
    Corrupt {
        /// 1-based line number.
        line: usize,
        /// What was wrong with it.
        reason: String,
    },
}

impl From<ReadError> for WriteError {
    fn from(err: ReadError) -> Self {
        match err {
            ReadError::Io(e) => Self::Io(e),
            ReadError::Corrupt { line, reason } => Self::CorruptTrail { line, reason },
        }
    }
}

/// Invalid auditor configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file '{path}': {source}")]
    Read {
        /// Path that was read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML.
    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be rendered as TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A value is out of range.
    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Errors surfaced by the auditor driver.
#[derive(Debug, Error)]
pub enum AuditError {
    /// The trail could not be written; the run was drained and stopped.
    #[error("audit trail write failed: {0}")]
    Write(#[from] WriteError),

    /// The auditor was asked to run after reaching its terminal state.
    #[error("auditor already stopped")]
    AlreadyStopped,

    /// Configuration problem.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The diagnostics side file could not be opened.
    #[error("failed to open diagnostics file '{path}': {source}")]
    Diagnostics {
        /// Configured diagnostics path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for auditor operations.
pub type Result<T> = std::result::Result<T, AuditError>;
