//! # warden-audit
//!
//! Trusted auditor for untrusted device-state event streams.
//!
//! A device reports its own state. The auditor compares each report with the
//! ground truth carried alongside it and with the previous event, and writes
//! one immutable record per event to an append-only JSON-lines trail.
//!
//! ## Features
//!
//! - [`Event`]: one self-reported observation, parsed from a JSON line
//! - [`classify`]: pure policy: spoofing, masking, TLS violation
//! - [`AuditTrail`]: append-only store, with [`FileAuditTrail`] and
//!   [`MemoryAuditTrail`] backends
//! - [`DiagnosticSink`]: where malformed input and sequence anomalies go
//! - [`Auditor`]: the `Starting → Running → Draining → Stopped` driver
//!
//! ## Example
//!
//! ```rust
//! use warden_audit::{classify, AlertFlag, AuditState, DeviceState, Event, Transport};
//!
//! let first = Event::new(1, DeviceState::Off, DeviceState::Off, Transport::Secure);
//! let (alerts, state) = classify(&first, &AuditState::unknown());
//! assert!(alerts.is_empty());
//!
//! // The camera turns on but keeps reporting "off".
//! let second = Event::new(2, DeviceState::On, DeviceState::Off, Transport::Secure);
//! let (alerts, _) = classify(&second, &state);
//! assert!(alerts.contains(AlertFlag::Spoofing));
//! assert!(alerts.contains(AlertFlag::Masking));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod alert;
pub mod config;
pub mod diagnostics;
pub mod driver;
pub mod error;
pub mod event;
pub mod history;
pub mod policy;
pub mod trail;

// Re-export main types
pub use alert::{AlertFlag, AlertSet};
pub use config::{
    AuditorConfig, DEFAULT_CHANNEL_CAPACITY, DEFAULT_MAX_LINE_BYTES, DEFAULT_TRAIL_PATH,
};
pub use diagnostics::{
    BoxedDiagnosticSink, CollectingDiagnosticSink, Diagnostic, DiagnosticSink,
    JsonlDiagnosticSink, NoopDiagnosticSink, TracingDiagnosticSink,
};
pub use driver::{
    Auditor, AuditorState, LineOutcome, RunStats, RunSummary, ShutdownRx, ShutdownTx,
    StopReason, shutdown_channel, spawn_line_reader,
};
pub use error::{AuditError, ConfigError, EventError, ReadError, Result, WriteError};
pub use event::{DeviceState, Event, Transport};
pub use history::{AnomalyKind, AuditState, SequenceAnomaly, SequenceTracker};
pub use policy::{classify, is_masking, is_spoofing, is_tls_violation};
pub use trail::{
    AuditRecord, AuditTrail, BoxedAuditTrail, ClassifiedEvent, FileAuditTrail, MemoryAuditTrail,
    read_trail,
};
