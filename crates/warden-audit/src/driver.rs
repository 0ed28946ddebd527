//! Auditor driver.
//!
//! The [`Auditor`] owns the history and the trail and moves through
//! `Starting → Running → Draining → Stopped`. Events arrive one at a time
//! over a bounded channel of raw lines; each is parsed, checked for sequence
//! integrity, classified, and appended before the next is taken.

use std::fmt;

use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::alert::AlertFlag;
use crate::config::{AuditorConfig, DEFAULT_MAX_LINE_BYTES};
use crate::diagnostics::{
    BoxedDiagnosticSink, Diagnostic, DiagnosticSink, JsonlDiagnosticSink, TracingDiagnosticSink,
};
use crate::error::{AuditError, EventError, Result};
use crate::event::Event;
use crate::history::{AuditState, SequenceTracker};
use crate::policy::classify;
use crate::trail::{AuditRecord, AuditTrail, ClassifiedEvent, FileAuditTrail};

/// Shutdown signal receiver.
pub type ShutdownRx = broadcast::Receiver<()>;

/// Shutdown signal sender.
pub type ShutdownTx = broadcast::Sender<()>;

/// Creates a shutdown channel.
#[must_use]
pub fn shutdown_channel() -> (ShutdownTx, ShutdownRx) {
    broadcast::channel(1)
}

/// Auditor lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditorState {
    /// Opening the trail and initializing history.
    Starting,
    /// Accepting events.
    Running,
    /// No longer accepting events; finishing in-flight work.
    Draining,
    /// Terminal. The trail is closed.
    Stopped,
}

impl fmt::Display for AuditorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The source closed its end of the channel.
    StreamClosed,
    /// An external stop signal arrived.
    ShutdownRequested,
    /// The trail refused a write.
    WriteFailed,
}

/// What happened to one raw input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    /// Empty or whitespace-only; ignored.
    Blank,
    /// Structurally invalid; diagnosed and skipped.
    Malformed(EventError),
    /// Classified and appended.
    Recorded(AuditRecord),
}

/// Counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    /// Records appended to the trail during this run.
    pub records: u64,
    /// Records without alerts.
    pub ok: u64,
    /// Records flagged as spoofing.
    pub spoofing: u64,
    /// Records flagged as masking.
    pub masking: u64,
    /// Records flagged as TLS violations.
    pub tls_violation: u64,
    /// Lines skipped as malformed.
    pub malformed: u64,
    /// Sequence anomalies diagnosed.
    pub sequence_anomalies: u64,
}

impl RunStats {
    fn count(&mut self, record: &AuditRecord) {
        self.records += 1;
        if record.is_ok() {
            self.ok += 1;
        }
        for flag in record.alerts.iter() {
            match flag {
                AlertFlag::Spoofing => self.spoofing += 1,
                AlertFlag::Masking => self.masking += 1,
                AlertFlag::TlsViolation => self.tls_violation += 1,
            }
        }
    }
}

/// Summary returned when a run ends without a fatal error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Identifier of this run (also on every log line of the run).
    pub run_id: Uuid,
    /// Why the run ended.
    pub stop_reason: StopReason,
    /// Run counters.
    #[serde(flatten)]
    pub stats: RunStats,
}

/// The trusted auditor.
pub struct Auditor<T = FileAuditTrail, D = BoxedDiagnosticSink> {
    run_id: Uuid,
    state: AuditorState,
    trail: T,
    diagnostics: D,
    history: AuditState,
    sequences: SequenceTracker,
    line_number: u64,
    max_line_bytes: usize,
    stats: RunStats,
}

impl<T: fmt::Debug, D> fmt::Debug for Auditor<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Auditor")
            .field("run_id", &self.run_id)
            .field("state", &self.state)
            .field("trail", &self.trail)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl Auditor {
    /// Opens the configured trail and diagnostics sink and starts an
    /// auditor on them.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid or the trail or the
    /// diagnostics file cannot be opened.
    pub fn open(config: &AuditorConfig) -> Result<Self> {
        config.validate()?;
        let trail = FileAuditTrail::open(&config.trail_path)?;
        let diagnostics: BoxedDiagnosticSink = match &config.diagnostics_path {
            Some(path) => Box::new(JsonlDiagnosticSink::open(path).map_err(|source| {
                AuditError::Diagnostics {
                    path: path.display().to_string(),
                    source,
                }
            })?),
            None => Box::new(TracingDiagnosticSink::new()),
        };
        Ok(Self::new(trail, diagnostics).with_max_line_bytes(config.max_line_bytes))
    }
}

impl<T: AuditTrail, D: DiagnosticSink> Auditor<T, D> {
    /// Creates an auditor over an already-open trail.
    pub fn new(trail: T, diagnostics: D) -> Self {
        let run_id = Uuid::new_v4();
        let mut auditor = Self {
            run_id,
            state: AuditorState::Starting,
            trail,
            diagnostics,
            history: AuditState::unknown(),
            sequences: SequenceTracker::new(),
            line_number: 0,
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
            stats: RunStats::default(),
        };
        info!(
            %run_id,
            next_index = auditor.trail.next_index(),
            "auditor starting"
        );
        auditor.state = AuditorState::Running;
        auditor
    }

    /// Sets the maximum accepted line length.
    #[must_use]
    pub const fn with_max_line_bytes(mut self, max: usize) -> Self {
        self.max_line_bytes = max;
        self
    }

    /// Identifier of this run.
    #[must_use]
    pub const fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> AuditorState {
        self.state
    }

    /// Counters so far.
    #[must_use]
    pub const fn stats(&self) -> &RunStats {
        &self.stats
    }

    /// The underlying trail.
    #[must_use]
    pub const fn trail(&self) -> &T {
        &self.trail
    }

    /// The diagnostics sink.
    #[must_use]
    pub const fn diagnostics(&self) -> &D {
        &self.diagnostics
    }

    /// Processes one input line.
    ///
    /// Blank lines are ignored and malformed ones are diagnosed and skipped.
    /// A well-formed event is classified and appended; a sequence anomaly is
    /// diagnosed against the index of the record it accompanies.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Write`] if the trail rejects the record (the
    /// auditor moves to `Draining`), or [`AuditError::AlreadyStopped`] if
    /// the auditor is not running.
    pub fn process_line(&mut self, line: &str) -> Result<LineOutcome> {
        self.process_bytes(line.as_bytes())
    }

    /// Processes one raw input line as read from the source.
    ///
    /// Bytes that are not valid UTF-8 make the line malformed; they are
    /// never repaired.
    ///
    /// # Errors
    ///
    /// Same as [`Auditor::process_line`].
    pub fn process_bytes(&mut self, raw: &[u8]) -> Result<LineOutcome> {
        if self.state != AuditorState::Running {
            return Err(AuditError::AlreadyStopped);
        }
        self.line_number += 1;

        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(LineOutcome::Blank);
        }

        let parsed = if raw.len() > self.max_line_bytes {
            Err(EventError::LineTooLong {
                max: self.max_line_bytes,
            })
        } else {
            std::str::from_utf8(raw)
                .map_err(|e| EventError::InvalidUtf8 {
                    valid_up_to: e.valid_up_to(),
                })
                .and_then(Event::parse)
        };
        let event = match parsed {
            Ok(event) => event,
            Err(e) => {
                self.stats.malformed += 1;
                self.diagnostics
                    .emit(&Diagnostic::malformed(self.line_number, &e));
                return Ok(LineOutcome::Malformed(e));
            }
        };

        let anomaly = self.sequences.observe(event.sequence);
        let (alerts, next) = classify(&event, &self.history);
        self.history = next;

        let record = match self.trail.append(ClassifiedEvent::new(event, alerts).with_run_id(self.run_id)) {
            Ok(record) => record,
            Err(e) => {
                error!(run_id = %self.run_id, error = %e, "failed to append audit record");
                self.state = AuditorState::Draining;
                return Err(AuditError::Write(e));
            }
        };

        if let Some(anomaly) = anomaly {
            self.stats.sequence_anomalies += 1;
            self.diagnostics
                .emit(&Diagnostic::anomaly(record.audit_index, anomaly));
        }
        self.stats.count(&record);

        if record.is_ok() {
            debug!(
                audit_index = record.audit_index,
                sequence = record.sequence,
                physical = %record.physical_state,
                reported = %record.reported_state,
                transport = %record.transport,
                "OK"
            );
        } else {
            warn!(
                audit_index = record.audit_index,
                sequence = record.sequence,
                physical = %record.physical_state,
                reported = %record.reported_state,
                transport = %record.transport,
                alerts = %record.alerts,
                "policy violation"
            );
        }

        Ok(LineOutcome::Recorded(record))
    }

    /// Consumes events until the stream closes, a stop signal arrives, or a
    /// write fails, then drains and stops.
    ///
    /// Once a stop has been requested no further event is taken from the
    /// channel; the receiver is closed so the source sees it.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Write`] if the run ended because the trail
    /// failed, or [`AuditError::AlreadyStopped`] if called after a previous
    /// run finished.
    pub async fn run<L>(
        &mut self,
        mut events: mpsc::Receiver<L>,
        mut shutdown: ShutdownRx,
    ) -> Result<RunSummary>
    where
        L: AsRef<[u8]>,
    {
        if self.state != AuditorState::Running {
            return Err(AuditError::AlreadyStopped);
        }

        let span = info_span!("auditor", run_id = %self.run_id);
        async move {
            info!("auditor running");
            let mut shutdown_live = true;
            let (reason, fatal) = loop {
                tokio::select! {
                    biased;

                    signal = shutdown.recv(), if shutdown_live => {
                        if matches!(signal, Err(broadcast::error::RecvError::Closed)) {
                            // Every sender is gone; nobody can ask us to stop.
                            shutdown_live = false;
                        } else {
                            info!("stop requested");
                            break (StopReason::ShutdownRequested, None);
                        }
                    }

                    line = events.recv() => {
                        let Some(line) = line else {
                            info!("event stream closed");
                            break (StopReason::StreamClosed, None);
                        };
                        if let Err(e) = self.process_bytes(line.as_ref()) {
                            break (StopReason::WriteFailed, Some(e));
                        }
                    }
                }
            };

            events.close();
            let summary = self.drain(reason);
            match fatal {
                Some(e) => Err(e),
                None => summary,
            }
        }
        .instrument(span)
        .await
    }

    /// Moves through `Draining` to `Stopped`, closing the trail.
    fn drain(&mut self, reason: StopReason) -> Result<RunSummary> {
        self.state = AuditorState::Draining;
        info!(?reason, "draining");

        // Processing is strictly one event at a time, so every classified
        // record has already been appended; only the trail is left to close.
        let closed = self.trail.close();
        self.state = AuditorState::Stopped;

        info!(
            records = self.stats.records,
            malformed = self.stats.malformed,
            sequence_anomalies = self.stats.sequence_anomalies,
            spoofing = self.stats.spoofing,
            masking = self.stats.masking,
            tls_violation = self.stats.tls_violation,
            "auditor stopped"
        );

        closed?;
        Ok(RunSummary {
            run_id: self.run_id,
            stop_reason: reason,
            stats: self.stats.clone(),
        })
    }
}

/// Forwards lines from `reader` into a bounded channel, one line per
/// message, until EOF or until the receiver is dropped. Lines are passed on
/// as raw bytes without the line terminator.
///
/// Lines are capped at `max_line_bytes + 1` bytes: anything longer is cut
/// and the remainder discarded, so the auditor still sees (and rejects) an
/// oversize line without the reader buffering it whole.
pub fn spawn_line_reader<R>(
    reader: R,
    capacity: usize,
    max_line_bytes: usize,
) -> (mpsc::Receiver<Vec<u8>>, JoinHandle<std::io::Result<u64>>)
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let handle = tokio::spawn(async move {
        let mut reader = reader;
        let mut forwarded = 0u64;
        let cap = (max_line_bytes as u64).saturating_add(1);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            let n = (&mut reader).take(cap).read_until(b'\n', &mut buf).await?;
            if n == 0 {
                break;
            }
            if buf.last() != Some(&b'\n') && n as u64 == cap {
                discard_rest_of_line(&mut reader).await?;
            }
            while matches!(buf.last(), Some(b'\n' | b'\r')) {
                buf.pop();
            }
            if tx.send(std::mem::take(&mut buf)).await.is_err() {
                debug!("auditor stopped accepting events");
                break;
            }
            forwarded += 1;
        }
        Ok(forwarded)
    });
    (rx, handle)
}

async fn discard_rest_of_line<R: AsyncBufRead + Unpin>(reader: &mut R) -> std::io::Result<()> {
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(());
        }
        if let Some(pos) = available.iter().position(|b| *b == b'\n') {
            reader.consume(pos + 1);
            return Ok(());
        }
        let len = available.len();
        reader.consume(len);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::CollectingDiagnosticSink;
    use crate::event::{DeviceState, Transport};
    use crate::history::AnomalyKind;
    use crate::trail::{MemoryAuditTrail, read_trail};

    type TestAuditor = Auditor<MemoryAuditTrail, CollectingDiagnosticSink>;

    fn auditor() -> TestAuditor {
        Auditor::new(MemoryAuditTrail::new(), CollectingDiagnosticSink::new())
    }

    fn line(seq: u64, physical: &str, reported: &str, transport: &str) -> String {
        format!(
            r#"{{"sequence":{seq},"physical_state":"{physical}","reported_state":"{reported}","transport":"{transport}","timestamp":"2025-06-01T12:00:00Z"}}"#
        )
    }

    fn recorded(outcome: LineOutcome) -> AuditRecord {
        match outcome {
            LineOutcome::Recorded(record) => record,
            other => unreachable!("expected a record, got {other:?}"),
        }
    }

    #[test]
    fn new_auditor_is_running() {
        let auditor = auditor();
        assert_eq!(auditor.state(), AuditorState::Running);
        assert_eq!(auditor.history, AuditState::unknown());
    }

    #[test]
    fn masking_detected_across_lines() {
        let mut auditor = auditor();
        let first = recorded(auditor.process_line(&line(1, "off", "off", "secure")).expect("ok"));
        let second = recorded(auditor.process_line(&line(2, "on", "off", "secure")).expect("ok"));
        assert!(first.is_ok());
        assert!(second.alerts.contains(AlertFlag::Masking));
        assert_eq!(second.audit_index, 1);
    }

    #[test]
    fn blank_lines_are_ignored() {
        let mut auditor = auditor();
        assert_eq!(auditor.process_line("   ").expect("ok"), LineOutcome::Blank);
        assert!(auditor.trail().records().is_empty());
    }

    #[test]
    fn malformed_line_is_diagnosed_not_recorded() {
        let mut auditor = auditor();
        auditor.process_line(&line(1, "on", "on", "secure")).expect("ok");
        let outcome = auditor.process_line("{\"sequence\": 2}").expect("ok");
        assert!(matches!(
            outcome,
            LineOutcome::Malformed(EventError::MissingField("physical_state"))
        ));
        auditor.process_line(&line(2, "on", "on", "secure")).expect("ok");

        assert_eq!(auditor.trail().records().len(), 2);
        assert_eq!(auditor.stats().malformed, 1);
        assert!(matches!(
            auditor.diagnostics().diagnostics(),
            [Diagnostic::MalformedEvent { line_number: 2, .. }]
        ));
    }

    #[test]
    fn malformed_line_does_not_touch_history() {
        let mut auditor = auditor();
        auditor.process_line(&line(1, "off", "off", "secure")).expect("ok");
        auditor.process_line("garbage").expect("ok");
        let record = recorded(auditor.process_line(&line(2, "on", "off", "secure")).expect("ok"));
        assert!(record.alerts.contains(AlertFlag::Masking));
    }

    #[test]
    fn oversize_line_is_malformed() {
        let mut auditor = auditor().with_max_line_bytes(16);
        let outcome = auditor.process_line(&line(1, "on", "on", "secure")).expect("ok");
        assert_eq!(
            outcome,
            LineOutcome::Malformed(EventError::LineTooLong { max: 16 })
        );
    }

    #[test]
    fn sequence_anomaly_is_diagnosed_and_still_recorded() {
        let mut auditor = auditor();
        auditor.process_line(&line(1, "on", "on", "secure")).expect("ok");
        let record = recorded(auditor.process_line(&line(5, "on", "on", "secure")).expect("ok"));
        assert_eq!(record.sequence, 5);
        assert_eq!(record.audit_index, 1);

        assert_eq!(auditor.stats().sequence_anomalies, 1);
        assert!(matches!(
            auditor.diagnostics().diagnostics(),
            [Diagnostic::SequenceAnomaly {
                audit_index: 1,
                sequence: 5,
                previous: 1,
                anomaly: AnomalyKind::Gap,
            }]
        ));
    }

    #[test]
    fn duplicate_sequence_is_recorded_twice() {
        let mut auditor = auditor();
        auditor.process_line(&line(3, "on", "on", "secure")).expect("ok");
        auditor.process_line(&line(3, "on", "on", "secure")).expect("ok");
        assert_eq!(auditor.trail().records().len(), 2);
        assert!(matches!(
            auditor.diagnostics().diagnostics(),
            [Diagnostic::SequenceAnomaly {
                anomaly: AnomalyKind::Duplicate,
                ..
            }]
        ));
    }

    #[test]
    fn write_failure_moves_to_draining() {
        let mut auditor = Auditor::new(
            MemoryAuditTrail::failing_after(1),
            CollectingDiagnosticSink::new(),
        );
        auditor.process_line(&line(1, "on", "on", "secure")).expect("ok");
        let err = auditor
            .process_line(&line(2, "on", "on", "secure"))
            .expect_err("write fails");
        assert!(matches!(err, AuditError::Write(_)));
        assert_eq!(auditor.state(), AuditorState::Draining);

        let err = auditor
            .process_line(&line(3, "on", "on", "secure"))
            .expect_err("not running");
        assert!(matches!(err, AuditError::AlreadyStopped));
    }

    #[tokio::test]
    async fn drain_after_stream_close_persists_every_event() {
        let mut auditor = auditor();
        let (tx, rx) = mpsc::channel(4);
        let (_shutdown_tx, shutdown_rx) = shutdown_channel();

        let producer = tokio::spawn(async move {
            for seq in 1..=10 {
                let physical = if seq % 3 == 0 { "on" } else { "off" };
                tx.send(line(seq, physical, "off", "secure"))
                    .await
                    .expect("send");
            }
        });

        let summary = auditor.run(rx, shutdown_rx).await.expect("run");
        producer.await.expect("producer");

        assert_eq!(summary.stop_reason, StopReason::StreamClosed);
        assert_eq!(summary.stats.records, 10);
        assert_eq!(auditor.state(), AuditorState::Stopped);
        assert!(auditor.trail().is_closed());

        let indices: Vec<u64> = auditor
            .trail()
            .records()
            .iter()
            .map(|r| r.audit_index)
            .collect();
        assert_eq!(indices, (0..10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn shutdown_signal_stops_acceptance() {
        let mut auditor = auditor();
        let (tx, rx) = mpsc::channel(8);
        let (shutdown_tx, shutdown_rx) = shutdown_channel();

        tx.send(line(1, "on", "on", "secure")).await.expect("send");
        shutdown_tx.send(()).expect("signal");
        tx.send(line(2, "on", "on", "secure")).await.expect("send");

        let summary = auditor.run(rx, shutdown_rx).await.expect("run");
        assert_eq!(summary.stop_reason, StopReason::ShutdownRequested);
        assert_eq!(auditor.state(), AuditorState::Stopped);
        // The biased select sees the stop before any queued event.
        assert!(auditor.trail().records().is_empty());
        // The channel was closed for the producer.
        assert!(tx.send(line(3, "on", "on", "secure")).await.is_err());
    }

    #[tokio::test]
    async fn dropped_shutdown_sender_is_not_a_stop() {
        let mut auditor = auditor();
        let (tx, rx) = mpsc::channel(4);
        let (shutdown_tx, shutdown_rx) = shutdown_channel();
        drop(shutdown_tx);

        tx.send(line(1, "on", "on", "secure")).await.expect("send");
        drop(tx);

        let summary = auditor.run(rx, shutdown_rx).await.expect("run");
        assert_eq!(summary.stop_reason, StopReason::StreamClosed);
        assert_eq!(summary.stats.records, 1);
    }

    #[tokio::test]
    async fn write_failure_ends_run_with_error() {
        let mut auditor = Auditor::new(
            MemoryAuditTrail::failing_after(2),
            CollectingDiagnosticSink::new(),
        );
        let (tx, rx) = mpsc::channel(8);
        let (_shutdown_tx, shutdown_rx) = shutdown_channel();
        for seq in 1..=5 {
            tx.send(line(seq, "on", "on", "secure")).await.expect("send");
        }
        drop(tx);

        let err = auditor.run(rx, shutdown_rx).await.expect_err("fatal");
        assert!(matches!(err, AuditError::Write(_)));
        assert_eq!(auditor.state(), AuditorState::Stopped);
        assert_eq!(auditor.trail().records().len(), 2);
    }

    #[tokio::test]
    async fn second_run_is_rejected() {
        let mut auditor = auditor();
        let (tx, rx) = mpsc::channel::<String>(1);
        drop(tx);
        let (_stx, srx) = shutdown_channel();
        auditor.run(rx, srx).await.expect("first run");

        let (_tx, rx) = mpsc::channel::<String>(1);
        let (_stx, srx) = shutdown_channel();
        assert!(matches!(
            auditor.run(rx, srx).await,
            Err(AuditError::AlreadyStopped)
        ));
    }

    #[tokio::test]
    async fn line_reader_splits_and_trims() {
        let input: &[u8] = b"first\r\nsecond\n\nlast-without-newline";
        let (mut rx, handle) = spawn_line_reader(input, 2, 1024);
        let mut lines = Vec::new();
        while let Some(line) = rx.recv().await {
            lines.push(String::from_utf8(line).expect("utf-8"));
        }
        assert_eq!(lines, vec!["first", "second", "", "last-without-newline"]);
        assert_eq!(handle.await.expect("join").expect("io"), 4);
    }

    #[tokio::test]
    async fn line_reader_cuts_oversize_lines() {
        let mut input = vec![b'x'; 100];
        input.extend_from_slice(b"\nshort\n");
        let (mut rx, handle) = spawn_line_reader(std::io::Cursor::new(input), 2, 10);
        let first = rx.recv().await.expect("first");
        assert_eq!(first.len(), 11);
        assert_eq!(rx.recv().await.as_deref(), Some(b"short".as_slice()));
        assert!(rx.recv().await.is_none());
        handle.await.expect("join").expect("io");
    }

    #[tokio::test]
    async fn file_backed_run_end_to_end() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = AuditorConfig::new(dir.path().join("audit.jsonl"))
            .with_diagnostics_path(dir.path().join("diag.jsonl"));
        let mut auditor = Auditor::open(&config).expect("open");

        let input = [
            line(1, "off", "off", "secure"),
            "not json".to_string(),
            line(2, "on", "off", "insecure"),
            line(4, "on", "on", "secure"),
        ]
        .join("\n");
        let (rx, reader) = spawn_line_reader(std::io::Cursor::new(input.into_bytes()), 4, 1024);
        let (_stx, srx) = shutdown_channel();

        let summary = auditor.run(rx, srx).await.expect("run");
        reader.await.expect("join").expect("io");

        assert_eq!(summary.stats.records, 3);
        assert_eq!(summary.stats.malformed, 1);
        assert_eq!(summary.stats.sequence_anomalies, 1);

        let records = read_trail(&config.trail_path).expect("read");
        assert_eq!(records.len(), 3);
        let all: Vec<_> = records[1].alerts.iter().collect();
        assert_eq!(
            all,
            vec![AlertFlag::Spoofing, AlertFlag::Masking, AlertFlag::TlsViolation]
        );

        let diag = std::fs::read_to_string(dir.path().join("diag.jsonl")).expect("diag");
        assert_eq!(diag.lines().count(), 2);
    }

    #[test]
    fn invalid_utf8_is_malformed_not_repaired() {
        let mut auditor = auditor();
        let mut raw = br#"{"sequence":1,"physical_state":"on","reported_state":"on","transport":"secure","timestamp":"2025-06-01T12:00:00Z","device":"cam"#.to_vec();
        raw.push(0xFF);
        raw.extend_from_slice(br#""}"#);

        let outcome = auditor.process_bytes(&raw).expect("ok");
        assert!(matches!(
            outcome,
            LineOutcome::Malformed(EventError::InvalidUtf8 { .. })
        ));
        assert!(auditor.trail().records().is_empty());
        assert_eq!(auditor.stats().malformed, 1);
        assert!(matches!(
            auditor.diagnostics().diagnostics(),
            [Diagnostic::MalformedEvent { line_number: 1, .. }]
        ));
    }

    #[tokio::test]
    async fn invalid_utf8_from_reader_is_skipped() {
        let mut input = line(1, "on", "on", "secure").into_bytes();
        input.extend_from_slice(b"\n{\"device\":\"cam\xFF\"}\n");
        input.extend_from_slice(line(2, "on", "on", "secure").as_bytes());
        let (rx, reader) = spawn_line_reader(std::io::Cursor::new(input), 4, 1024);
        let (_stx, srx) = shutdown_channel();

        let mut auditor = auditor();
        let summary = auditor.run(rx, srx).await.expect("run");
        reader.await.expect("join").expect("io");

        assert_eq!(summary.stats.records, 2);
        assert_eq!(summary.stats.malformed, 1);
        assert!(
            auditor
                .trail()
                .records()
                .iter()
                .all(|r| r.device.is_none())
        );
    }

    #[test]
    fn records_carry_run_id() {
        let mut auditor = auditor();
        let record = recorded(auditor.process_line(&line(1, "on", "on", "secure")).expect("ok"));
        assert_eq!(record.run_id, Some(auditor.run_id()));
    }

    #[test]
    fn stats_count_each_flag() {
        let mut stats = RunStats::default();
        let event = Event::new(1, DeviceState::On, DeviceState::Off, Transport::Insecure);
        let alerts = [AlertFlag::Spoofing, AlertFlag::TlsViolation].into_iter().collect();
        stats.count(&AuditRecord::new(0, ClassifiedEvent::new(event, alerts)));
        assert_eq!(stats.records, 1);
        assert_eq!(stats.ok, 0);
        assert_eq!(stats.spoofing, 1);
        assert_eq!(stats.tls_violation, 1);
        assert_eq!(stats.masking, 0);
    }
}
