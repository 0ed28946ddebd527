//! Per-event listing with alert filters.

use serde::Serialize;
use warden_audit::{AlertFlag, AuditRecord};

/// Which records an [`EventListing`] keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventFilter {
    /// Every record.
    #[default]
    All,
    /// Records without alerts.
    Ok,
    /// Records carrying this flag (possibly among others).
    Flag(AlertFlag),
}

impl EventFilter {
    /// Whether `record` passes the filter.
    #[must_use]
    pub fn matches(self, record: &AuditRecord) -> bool {
        match self {
            Self::All => true,
            Self::Ok => record.is_ok(),
            Self::Flag(flag) => record.alerts.contains(flag),
        }
    }
}

/// Records selected from a trail, in trail order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct EventListing {
    /// The selected records.
    pub records: Vec<AuditRecord>,
}

impl EventListing {
    /// Keeps the records of `records` that pass `filter`.
    #[must_use]
    pub fn select(records: &[AuditRecord], filter: EventFilter) -> Self {
        Self {
            records: records
                .iter()
                .filter(|r| filter.matches(r))
                .cloned()
                .collect(),
        }
    }

    /// Number of selected records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing was selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Where the event was sent: the endpoint if recorded, else the transport.
#[must_use]
pub fn network_label(record: &AuditRecord) -> &str {
    record
        .endpoint
        .as_deref()
        .unwrap_or_else(|| record.transport.as_str())
}
