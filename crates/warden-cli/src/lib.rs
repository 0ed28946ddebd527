//! # warden-cli
//!
//! Warden command-line interface.
//!
//! Provides commands for:
//! - Auditing a device-state event stream into an append-only trail
//! - Simulating an untrusted device
//! - Running both together as a demo
//! - Summarizing, graphing, and verifying a trail
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  JSON lines   ┌──────────────┐  append  ┌─────────────────┐
//! │ event source │──────────────►│   auditor    │─────────►│ audit_log.jsonl │
//! └──────────────┘ (stdin/mpsc)  └──────────────┘          └─────────────────┘
//!                                       │ diagnostics
//!                                       ▼
//!                                 tracing / JSONL
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod commands;
pub mod error;
pub mod output;

pub use cli::{Cli, Commands, Format, GraphFormat, ReportCommands};
pub use error::CliError;
pub use output::OutputFormat;
