//! A loaded trail and the views over it.

use std::path::{Path, PathBuf};

use tracing::debug;
use warden_audit::{AuditRecord, read_trail};

use crate::error::Result;
use crate::events::{EventFilter, EventListing};
use crate::graph::ProvenanceGraph;
use crate::summary::Summary;
use crate::verify::{Verification, verify};

/// Snapshot of a trail's complete records.
#[derive(Debug, Clone)]
pub struct TrailReport {
    path: Option<PathBuf>,
    records: Vec<AuditRecord>,
}

impl TrailReport {
    /// Reads every complete record of the trail at `path`.
    ///
    /// A partial final line is left out, so a live trail can be reported on.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or holds a corrupt line.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let records = read_trail(path)?;
        debug!(path = %path.display(), records = records.len(), "loaded audit trail");
        Ok(Self {
            path: Some(path.to_path_buf()),
            records,
        })
    }

    /// Wraps records already in memory.
    #[must_use]
    pub const fn from_records(records: Vec<AuditRecord>) -> Self {
        Self {
            path: None,
            records,
        }
    }

    /// Source file, if loaded from disk.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// The records, in file order.
    #[must_use]
    pub fn records(&self) -> &[AuditRecord] {
        &self.records
    }

    /// Aggregate counts.
    #[must_use]
    pub fn summary(&self) -> Summary {
        Summary::from_records(&self.records)
    }

    /// Records passing `filter`.
    #[must_use]
    pub fn events(&self, filter: EventFilter) -> EventListing {
        EventListing::select(&self.records, filter)
    }

    /// Provenance graph.
    #[must_use]
    pub fn graph(&self) -> ProvenanceGraph {
        ProvenanceGraph::from_records(&self.records)
    }

    /// Integrity check.
    #[must_use]
    pub fn verify(&self) -> Verification {
        verify(&self.records)
    }
}
