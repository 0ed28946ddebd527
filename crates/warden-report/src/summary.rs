//! Alert counts over a trail.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use warden_audit::{AlertFlag, AuditRecord};

/// Device key used for records that carry no device identifier.
pub const UNKNOWN_DEVICE: &str = "unknown";

/// Per-device counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceSummary {
    /// Records for this device.
    pub total: u64,
    /// Records with at least one alert.
    pub flagged: u64,
}

/// Aggregate counts for a trail.
///
/// A record with several flags counts once toward each of them, so the
/// flag counts can add up to more than `total - ok`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Number of records.
    pub total: u64,
    /// Records without alerts.
    pub ok: u64,
    /// Records flagged as spoofing.
    pub spoofing: u64,
    /// Records flagged as masking.
    pub masking: u64,
    /// Records flagged as TLS violations.
    pub tls_violation: u64,
    /// Earliest source timestamp.
    pub first_timestamp: Option<DateTime<Utc>>,
    /// Latest source timestamp.
    pub last_timestamp: Option<DateTime<Utc>>,
    /// Counts keyed by device identifier.
    pub devices: BTreeMap<String, DeviceSummary>,
}

impl Summary {
    /// Summarizes `records`.
    #[must_use]
    pub fn from_records(records: &[AuditRecord]) -> Self {
        let mut summary = Self::default();
        for record in records {
            summary.add(record);
        }
        summary
    }

    fn add(&mut self, record: &AuditRecord) {
        self.total += 1;
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

        self.first_timestamp = Some(
            self.first_timestamp
                .map_or(record.timestamp, |t| t.min(record.timestamp)),
        );
        self.last_timestamp = Some(
            self.last_timestamp
                .map_or(record.timestamp, |t| t.max(record.timestamp)),
        );

        let device = record.device.as_deref().unwrap_or(UNKNOWN_DEVICE);
        let entry = self.devices.entry(device.to_string()).or_default();
        entry.total += 1;
        if !record.is_ok() {
            entry.flagged += 1;
        }
    }

    /// Count for one flag.
    #[must_use]
    pub const fn count(&self, flag: AlertFlag) -> u64 {
        match flag {
            AlertFlag::Spoofing => self.spoofing,
            AlertFlag::Masking => self.masking,
            AlertFlag::TlsViolation => self.tls_violation,
        }
    }

    /// Records carrying at least one alert.
    #[must_use]
    pub const fn flagged(&self) -> u64 {
        self.total - self.ok
    }
}
