//! Append-only audit trail.
//!
//! This module provides:
//! - [`AuditRecord`]: one persisted, immutable finding
//! - [`AuditTrail`]: the append-only store contract
//! - [`FileAuditTrail`]: JSON-lines file backend, synced per record
//! - [`MemoryAuditTrail`]: in-memory backend with fault injection
//! - [`read_trail`]: finite-prefix reader for consumers

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::alert::AlertSet;
use crate::error::{ReadError, WriteError};
use crate::event::{DeviceState, Event, Transport};

/// An event after classification, waiting for its trail position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedEvent {
    /// The source event.
    pub event: Event,
    /// Flags raised by the classifier.
    pub alerts: AlertSet,
    /// Auditor wall-clock time at classification.
    pub audited_at: DateTime<Utc>,
    /// Auditor run that classified the event.
    pub run_id: Option<Uuid>,
}

impl ClassifiedEvent {
    /// Wraps a classified event stamped with the current time.
    #[must_use]
    pub fn new(event: Event, alerts: AlertSet) -> Self {
        Self {
            event,
            alerts,
            audited_at: Utc::now(),
            run_id: None,
        }
    }

    /// Tags the event with the run that classified it.
    #[must_use]
    pub const fn with_run_id(mut self, run_id: Uuid) -> Self {
        self.run_id = Some(run_id);
        self
    }
}

/// One line of the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Position in the trail; strictly increasing and gap-free.
    pub audit_index: u64,
    /// Source sequence number.
    pub sequence: u64,
    /// Ground-truth state.
    pub physical_state: DeviceState,
    /// Claimed state.
    pub reported_state: DeviceState,
    /// Channel security.
    pub transport: Transport,
    /// Emission time from the source.
    pub timestamp: DateTime<Utc>,
    /// Raised flags, empty for OK events.
    pub alerts: AlertSet,
    /// When the auditor classified the event.
    pub audited_at: DateTime<Utc>,
    /// Auditor run that wrote the record. History restarts with each run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<Uuid>,
    /// Device identifier, if supplied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    /// Endpoint URL, if supplied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl AuditRecord {
    /// Builds the record for `classified` at trail position `audit_index`.
    #[must_use]
    pub fn new(audit_index: u64, classified: ClassifiedEvent) -> Self {
        let ClassifiedEvent {
            event,
            alerts,
            audited_at,
            run_id,
        } = classified;
        Self {
            audit_index,
            sequence: event.sequence,
            physical_state: event.physical_state,
            reported_state: event.reported_state,
            transport: event.transport,
            timestamp: event.timestamp,
            alerts,
            audited_at,
            run_id,
            device: event.device,
            endpoint: event.endpoint,
        }
    }

    /// Reconstructs the source event this record was built from.
    #[must_use]
    pub fn to_event(&self) -> Event {
        Event {
            sequence: self.sequence,
            physical_state: self.physical_state,
            reported_state: self.reported_state,
            transport: self.transport,
            timestamp: self.timestamp,
            device: self.device.clone(),
            endpoint: self.endpoint.clone(),
        }
    }

    /// Whether the record carries no alerts.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.alerts.is_empty()
    }
}

/// Append-only store for audit records.
///
/// The contract has no update or delete. Implementations assign
/// `audit_index` in call order and only consume an index when the append
/// succeeds.
pub trait AuditTrail: Send {
    /// Durably persists one record and returns it with its index.
    fn append(&mut self, classified: ClassifiedEvent) -> Result<AuditRecord, WriteError>;

    /// Index the next successful append will receive.
    fn next_index(&self) -> u64;

    /// Flushes and releases the underlying store. Appends after `close`
    /// fail.
    fn close(&mut self) -> Result<(), WriteError> {
        Ok(())
    }
}

/// A boxed trail for dynamic dispatch.
pub type BoxedAuditTrail = Box<dyn AuditTrail>;

impl AuditTrail for BoxedAuditTrail {
    fn append(&mut self, classified: ClassifiedEvent) -> Result<AuditRecord, WriteError> {
        (**self).append(classified)
    }

    fn next_index(&self) -> u64 {
        (**self).next_index()
    }

    fn close(&mut self) -> Result<(), WriteError> {
        (**self).close()
    }
}

/// Outcome of scanning a trail file.
struct ScanEnd {
    /// Number of complete records read.
    records: usize,
    /// Whether the file ended in a partial line.
    torn_tail: bool,
}

/// Walks complete lines of a trail, handing each parsed record to `visit`.
fn scan<R, F>(mut reader: R, mut visit: F) -> Result<ScanEnd, ReadError>
where
    R: BufRead,
    F: FnMut(usize, AuditRecord) -> Result<(), ReadError>,
{
    let mut buf = Vec::new();
    let mut records = 0usize;
    loop {
        buf.clear();
        let n = reader.read_until(b'\n', &mut buf)?;
        if n == 0 {
            return Ok(ScanEnd {
                records,
                torn_tail: false,
            });
        }
        let line_no = records + 1;
        if buf.last() != Some(&b'\n') {
            return Ok(ScanEnd {
                records,
                torn_tail: true,
            });
        }
        let record: AuditRecord =
            serde_json::from_slice(&buf).map_err(|e| ReadError::Corrupt {
                line: line_no,
                reason: e.to_string(),
            })?;
        visit(line_no, record)?;
        records += 1;
    }
}

/// Reads every complete record of the trail at `path`, in file order.
///
/// A trailing partial line (a record still being written, or a torn write)
/// is ignored, so this can be pointed at a live trail.
///
/// # Errors
///
/// Returns an error if the file cannot be read or a complete line is not a
/// valid record.
pub fn read_trail(path: impl AsRef<Path>) -> Result<Vec<AuditRecord>, ReadError> {
    let file = File::open(path.as_ref())?;
    let mut records = Vec::new();
    scan(BufReader::new(file), |_, record| {
        records.push(record);
        Ok(())
    })?;
    Ok(records)
}

/// Audit trail backed by a JSON-lines file.
///
/// Every append writes one full line with a single `write_all` and calls
/// `sync_data` before returning.
#[derive(Debug)]
pub struct FileAuditTrail {
    path: PathBuf,
    file: Option<File>,
    next_index: u64,
    poisoned: bool,
}

impl FileAuditTrail {
    /// Opens or creates the trail at `path`.
    ///
    /// An existing file is validated first: every line must be a record and
    /// indices must run `0..n` without gaps. Appending then continues at `n`.
    ///
    /// # Errors
    ///
    /// Returns [`WriteError::CorruptTrail`] if the existing content is
    /// invalid or ends in a partial record, or an I/O error if the file
    /// cannot be opened.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, WriteError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&path)?;

        let end = scan(BufReader::new(&file), |line, record| {
            let expected = (line - 1) as u64;
            if record.audit_index == expected {
                Ok(())
            } else {
                Err(ReadError::Corrupt {
                    line,
                    reason: format!(
                        "audit_index {} where {expected} was expected",
                        record.audit_index
                    ),
                })
            }
        })?;

        if end.torn_tail {
            return Err(WriteError::CorruptTrail {
                line: end.records + 1,
                reason: "incomplete final record".to_string(),
            });
        }

        let next_index = end.records as u64;
        if next_index > 0 {
            info!(path = %path.display(), next_index, "resuming existing audit trail");
        } else {
            debug!(path = %path.display(), "opened empty audit trail");
        }

        Ok(Self {
            path,
            file: Some(file),
            next_index,
            poisoned: false,
        })
    }

    /// Path of the trail file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Cuts the file back to `len` bytes, dropping a partial line left by a
    /// failed append. Only bytes this trail wrote past `len` are removed.
    fn discard_from(&mut self, len: u64) {
        let Some(file) = self.file.as_mut() else {
            return;
        };
        match file.set_len(len).and_then(|()| file.sync_data()) {
            Ok(()) => debug!(path = %self.path.display(), len, "rolled back partial record"),
            Err(e) => warn!(
                path = %self.path.display(),
                error = %e,
                "failed to roll back partial record; trail needs repair"
            ),
        }
    }
}

impl AuditTrail for FileAuditTrail {
    fn append(&mut self, classified: ClassifiedEvent) -> Result<AuditRecord, WriteError> {
        if self.poisoned {
            return Err(WriteError::Rejected(
                "trail is unusable after an earlier write failure".to_string(),
            ));
        }
        let Some(file) = self.file.as_mut() else {
            return Err(WriteError::Rejected("trail is closed".to_string()));
        };

        let record = AuditRecord::new(self.next_index, classified);
        let mut line = serde_json::to_vec(&record)?;
        line.push(b'\n');

        let start = file.metadata()?.len();
        let written = file.write_all(&line).and_then(|()| file.sync_data());
        if let Err(e) = written {
            self.poisoned = true;
            self.discard_from(start);
            return Err(WriteError::Io(e));
        }

        self.next_index += 1;
        Ok(record)
    }

    fn next_index(&self) -> u64 {
        self.next_index
    }

    fn close(&mut self) -> Result<(), WriteError> {
        if let Some(file) = self.file.take() {
            file.sync_all()?;
            debug!(path = %self.path.display(), records = self.next_index, "closed audit trail");
        }
        Ok(())
    }
}

/// In-memory trail for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MemoryAuditTrail {
    records: Vec<AuditRecord>,
    fail_after: Option<usize>,
    closed: bool,
}

impl MemoryAuditTrail {
    /// Creates an empty trail.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a trail that rejects every append after the first `n`.
    #[must_use]
    pub fn failing_after(n: usize) -> Self {
        Self {
            fail_after: Some(n),
            ..Self::default()
        }
    }

    /// Records appended so far.
    #[must_use]
    pub fn records(&self) -> &[AuditRecord] {
        &self.records
    }

    /// Whether [`AuditTrail::close`] has been called.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }
}

impl AuditTrail for MemoryAuditTrail {
    fn append(&mut self, classified: ClassifiedEvent) -> Result<AuditRecord, WriteError> {
        if self.closed {
            return Err(WriteError::Rejected("trail is closed".to_string()));
        }
        if self.fail_after.is_some_and(|n| self.records.len() >= n) {
            return Err(WriteError::Rejected("storage full".to_string()));
        }
        let record = AuditRecord::new(self.next_index(), classified);
        self.records.push(record.clone());
        Ok(record)
    }

    fn next_index(&self) -> u64 {
        self.records.len() as u64
    }

    fn close(&mut self) -> Result<(), WriteError> {
        self.closed = true;
        Ok(())
    }
}
