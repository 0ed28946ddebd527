//! CLI error types.

use std::fmt;

use warden_audit::{AuditError, ConfigError};
use warden_report::ReportError;
use warden_sim::SimError;

/// CLI-specific errors.
#[derive(Debug)]
pub enum CliError {
    /// Invalid configuration.
    Config(String),
    /// The auditor failed.
    Audit(AuditError),
    /// A report could not be produced.
    Report(ReportError),
    /// The simulator failed.
    Simulator(SimError),
    /// Command execution failed.
    Command(String),
    /// Output formatting error.
    Format(String),
    /// The trail did not verify.
    VerificationFailed(usize),
    /// IO error.
    Io(std::io::Error),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {msg}"),
            Self::Audit(e) => write!(f, "audit failed: {e}"),
            Self::Report(e) => write!(f, "report failed: {e}"),
            Self::Simulator(e) => write!(f, "simulator failed: {e}"),
            Self::Command(msg) => write!(f, "command error: {msg}"),
            Self::Format(msg) => write!(f, "format error: {msg}"),
            Self::VerificationFailed(n) => {
                write!(f, "audit trail failed verification with {n} finding(s)")
            }
            Self::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Audit(e) => Some(e),
            Self::Report(e) => Some(e),
            Self::Simulator(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<AuditError> for CliError {
    fn from(err: AuditError) -> Self {
        match err {
            AuditError::Config(e) => Self::Config(e.to_string()),
            other => Self::Audit(other),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<ReportError> for CliError {
    fn from(err: ReportError) -> Self {
        Self::Report(err)
    }
}

impl From<SimError> for CliError {
    fn from(err: SimError) -> Self {
        Self::Simulator(err)
    }
}
