//! Diagnostics emitted alongside the trail.
//!
//! Malformed input and sequence anomalies are integrity signals about the
//! source, not findings about the device. They never enter the trail; they
//! go to a [`DiagnosticSink`] instead.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::error::EventError;
use crate::history::{AnomalyKind, SequenceAnomaly};

/// A diagnostic about the input stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A line was skipped because it is not a well-formed event.
    MalformedEvent {
        /// 1-based input line number.
        line_number: u64,
        /// Why the line was rejected.
        reason: String,
    },
    /// An event arrived with an irregular sequence number. It was still
    /// classified and recorded at `audit_index`.
    SequenceAnomaly {
        /// Trail position of the accompanying record.
        audit_index: u64,
        /// Sequence number of the event.
        sequence: u64,
        /// High-water mark before the event.
        previous: u64,
        /// Irregularity kind.
        anomaly: AnomalyKind,
    },
}

impl Diagnostic {
    /// Builds a malformed-event diagnostic.
    #[must_use]
    pub fn malformed(line_number: u64, error: &EventError) -> Self {
        Self::MalformedEvent {
            line_number,
            reason: error.to_string(),
        }
    }

    /// Builds a sequence-anomaly diagnostic for the record at `audit_index`.
    #[must_use]
    pub const fn anomaly(audit_index: u64, anomaly: SequenceAnomaly) -> Self {
        Self::SequenceAnomaly {
            audit_index,
            sequence: anomaly.sequence,
            previous: anomaly.previous,
            anomaly: anomaly.anomaly,
        }
    }

    /// Returns the diagnostic kind as a string.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::MalformedEvent { .. } => "malformed_event",
            Self::SequenceAnomaly { .. } => "sequence_anomaly",
        }
    }
}

/// Destination for diagnostics.
///
/// Sinks must not fail the run: a diagnostic that cannot be delivered is
/// logged and dropped.
pub trait DiagnosticSink: Send {
    /// Emits one diagnostic.
    fn emit(&mut self, diagnostic: &Diagnostic);
}

/// Sink that reports through `tracing` at `warn` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnosticSink;

impl TracingDiagnosticSink {
    /// Creates a new tracing sink.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl DiagnosticSink for TracingDiagnosticSink {
    fn emit(&mut self, diagnostic: &Diagnostic) {
        match diagnostic {
            Diagnostic::MalformedEvent {
                line_number,
                reason,
            } => {
                tracing::warn!(
                    target: "warden::diagnostics",
                    kind = diagnostic.kind(),
                    line_number,
                    %reason,
                    "skipped malformed event"
                );
            }
            Diagnostic::SequenceAnomaly {
                audit_index,
                sequence,
                previous,
                anomaly,
            } => {
                tracing::warn!(
                    target: "warden::diagnostics",
                    kind = diagnostic.kind(),
                    audit_index,
                    sequence,
                    previous,
                    anomaly = anomaly.as_str(),
                    "sequence anomaly"
                );
            }
        }
    }
}

/// Sink that appends diagnostics as JSON lines to a side file, and also
/// forwards them to `tracing`.
#[derive(Debug)]
pub struct JsonlDiagnosticSink {
    file: File,
    tracing: TracingDiagnosticSink,
}

impl JsonlDiagnosticSink {
    /// Opens (or creates) the diagnostics file at `path` for appending,
    /// creating missing parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or the file cannot be created.
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file,
            tracing: TracingDiagnosticSink::new(),
        })
    }
}

impl DiagnosticSink for JsonlDiagnosticSink {
    fn emit(&mut self, diagnostic: &Diagnostic) {
        self.tracing.emit(diagnostic);

        let written = serde_json::to_vec(diagnostic)
            .map_err(std::io::Error::from)
            .and_then(|mut line| {
                line.push(b'\n');
                self.file.write_all(&line)
            });
        if let Err(e) = written {
            tracing::error!(error = %e, "failed to write diagnostic");
        }
    }
}

/// A sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDiagnosticSink;

impl DiagnosticSink for NoopDiagnosticSink {
    fn emit(&mut self, _diagnostic: &Diagnostic) {}
}

/// Sink that keeps diagnostics in memory.
#[derive(Debug, Clone, Default)]
pub struct CollectingDiagnosticSink {
    diagnostics: Vec<Diagnostic>,
}

impl CollectingDiagnosticSink {
    /// Creates an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Diagnostics received so far.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

impl DiagnosticSink for CollectingDiagnosticSink {
    fn emit(&mut self, diagnostic: &Diagnostic) {
        self.diagnostics.push(diagnostic.clone());
    }
}

/// A boxed sink for dynamic dispatch.
pub type BoxedDiagnosticSink = Box<dyn DiagnosticSink>;

impl DiagnosticSink for BoxedDiagnosticSink {
    fn emit(&mut self, diagnostic: &Diagnostic) {
        (**self).emit(diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gap() -> SequenceAnomaly {
        SequenceAnomaly {
            anomaly: AnomalyKind::Gap,
            sequence: 9,
            previous: 3,
        }
    }

    #[test]
    fn malformed_serializes_with_kind_tag() {
        let diag = Diagnostic::malformed(4, &EventError::MissingField("sequence"));
        let json = serde_json::to_value(&diag).expect("serialize");
        assert_eq!(json["kind"], "malformed_event");
        assert_eq!(json["line_number"], 4);
        assert_eq!(json["reason"], "missing required field: sequence");
    }

    #[test]
    fn anomaly_serializes_with_index() {
        let diag = Diagnostic::anomaly(12, gap());
        let json = serde_json::to_value(&diag).expect("serialize");
        assert_eq!(json["kind"], "sequence_anomaly");
        assert_eq!(json["audit_index"], 12);
        assert_eq!(json["anomaly"], "gap");
        assert_eq!(diag.kind(), "sequence_anomaly");
    }

    #[test]
    fn tracing_sink_does_not_panic() {
        let mut sink = TracingDiagnosticSink::new();
        sink.emit(&Diagnostic::anomaly(0, gap()));
        sink.emit(&Diagnostic::malformed(1, &EventError::Invalid("x".into())));
    }

    #[test]
    fn jsonl_sink_appends_lines() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("diag.jsonl");
        {
            let mut sink = JsonlDiagnosticSink::open(&path).expect("open");
            sink.emit(&Diagnostic::anomaly(0, gap()));
            sink.emit(&Diagnostic::malformed(2, &EventError::Invalid("x".into())));
        }
        let content = std::fs::read_to_string(&path).expect("read");
        let kinds: Vec<String> = content
            .lines()
            .map(|l| {
                let v: serde_json::Value = serde_json::from_str(l).expect("json");
                v["kind"].as_str().unwrap_or_default().to_string()
            })
            .collect();
        assert_eq!(kinds, vec!["sequence_anomaly", "malformed_event"]);
    }

    #[test]
    fn jsonl_sink_creates_parent_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("logs/nested/diag.jsonl");
        let mut sink = JsonlDiagnosticSink::open(&path).expect("open");
        sink.emit(&Diagnostic::anomaly(0, gap()));
        assert_eq!(std::fs::read_to_string(&path).expect("read").lines().count(), 1);
    }

    #[test]
    fn collecting_sink_keeps_order() {
        let mut sink = CollectingDiagnosticSink::new();
        sink.emit(&Diagnostic::anomaly(1, gap()));
        sink.emit(&Diagnostic::anomaly(2, gap()));
        assert_eq!(sink.diagnostics().len(), 2);
        assert!(matches!(
            sink.diagnostics()[1],
            Diagnostic::SequenceAnomaly { audit_index: 2, .. }
        ));
    }

    #[test]
    fn boxed_sink_forwards() {
        let mut boxed: BoxedDiagnosticSink = Box::new(NoopDiagnosticSink);
        boxed.emit(&Diagnostic::anomaly(0, gap()));
    }
}
