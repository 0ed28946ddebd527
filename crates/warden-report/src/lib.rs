//! # warden-report
//!
//! Read-only views over a warden audit trail: counts, a filtered event
//! listing, a provenance graph, and an integrity check that replays the
//! classifier.
//!
//! ```rust,no_run
//! use warden_report::TrailReport;
//!
//! let report = TrailReport::load("audit_log.jsonl")?;
//! let summary = report.summary();
//! println!("{} events, {} flagged", summary.total, summary.flagged());
//! std::fs::write("provenance.dot", report.graph().to_dot())?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod events;
pub mod graph;
pub mod report;
pub mod summary;
pub mod verify;

pub use error::{ReportError, Result};
pub use events::{EventFilter, EventListing, network_label};
pub use graph::{Edge, Node, NodeKind, ProvenanceGraph};
pub use report::TrailReport;
pub use summary::{DeviceSummary, Summary, UNKNOWN_DEVICE};
pub use verify::{Finding, Verification, verify};
