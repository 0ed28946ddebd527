//! Trail integrity check.
//!
//! The classifier is deterministic, so a trail can be checked without
//! trusting whoever wrote it: replay the policy over the stored events in
//! index order and compare each result with the stored alerts. History
//! restarts wherever the recorded `run_id` changes, as it did in the
//! auditor.

use std::fmt;

use serde::Serialize;
use warden_audit::{AlertSet, AuditRecord, AuditState, classify};

/// One discrepancy in a trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Finding {
    /// A record sits at the wrong position.
    IndexMismatch {
        /// Position in the file (0-based).
        position: u64,
        /// The stored `audit_index`.
        found: u64,
    },
    /// Stored alerts differ from what the policy yields.
    AlertMismatch {
        /// The record's `audit_index`.
        audit_index: u64,
        /// The record's source sequence.
        sequence: u64,
        /// Alerts in the trail.
        stored: AlertSet,
        /// Alerts from replaying the policy.
        expected: AlertSet,
    },
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IndexMismatch { position, found } => {
                write!(f, "record at position {position} has audit_index {found}")
            }
            Self::AlertMismatch {
                audit_index,
                sequence,
                stored,
                expected,
            } => write!(
                f,
                "record {audit_index} (sequence {sequence}) stores [{stored}] but policy yields [{expected}]"
            ),
        }
    }
}

/// Result of verifying a trail.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Verification {
    /// Number of records checked.
    pub records: usize,
    /// Every discrepancy found, in trail order.
    pub findings: Vec<Finding>,
}

impl Verification {
    /// Whether the trail verified without findings.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }
}

/// Verifies index continuity and replays the classifier over `records`.
#[must_use]
pub fn verify(records: &[AuditRecord]) -> Verification {
    let mut findings = Vec::new();
    let mut state = AuditState::unknown();
    let mut run = records.first().and_then(|r| r.run_id);

    for (position, record) in (0u64..).zip(records) {
        if record.run_id != run {
            run = record.run_id;
            state = AuditState::unknown();
        }

        if record.audit_index != position {
            findings.push(Finding::IndexMismatch {
                position,
                found: record.audit_index,
            });
        }

        let (expected, next) = classify(&record.to_event(), &state);
        state = next;
        if expected != record.alerts {
            findings.push(Finding::AlertMismatch {
                audit_index: record.audit_index,
                sequence: record.sequence,
                stored: record.alerts,
                expected,
            });
        }
    }

    if !findings.is_empty() {
        tracing::warn!(findings = findings.len(), "audit trail failed verification");
    }

    Verification {
        records: records.len(),
        findings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{OFF, ON, records};
    use uuid::Uuid;
    use warden_audit::AlertFlag;
    use warden_audit::Transport::{Insecure, Secure};

    fn sample() -> Vec<AuditRecord> {
        records(&[
            (OFF, OFF, Secure),
            (ON, OFF, Secure),
            (ON, ON, Insecure),
            (OFF, OFF, Secure),
        ])
    }

    #[test]
    fn honest_trail_is_clean() {
        let result = verify(&sample());
        assert!(result.is_clean());
        assert_eq!(result.records, 4);
    }

    #[test]
    fn empty_trail_is_clean() {
        assert!(verify(&[]).is_clean());
    }

    #[test]
    fn erased_alert_is_found() {
        let mut trail = sample();
        trail[1].alerts = AlertSet::empty();
        let result = verify(&trail);
        assert_eq!(result.findings.len(), 1);
        assert!(matches!(
            &result.findings[0],
            Finding::AlertMismatch { audit_index: 1, expected, .. }
                if expected.contains(AlertFlag::Masking)
        ));
    }

    #[test]
    fn rewritten_state_propagates() {
        let mut trail = sample();
        // Record 1 is judged against record 0, so both stop matching.
        trail[0].physical_state = ON;
        let result = verify(&trail);
        let indices: Vec<u64> = result
            .findings
            .iter()
            .filter_map(|f| match f {
                Finding::AlertMismatch { audit_index, .. } => Some(*audit_index),
                Finding::IndexMismatch { .. } => None,
            })
            .collect();
        assert_eq!(indices, vec![0, 1]);
    }

    #[test]
    fn history_restarts_at_run_boundary() {
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let mut trail = records(&[(OFF, OFF, Secure)]);
        trail[0].run_id = Some(first);
        // A fresh run sees no history, so on/off is spoofing without masking.
        let mut resumed = records(&[(ON, OFF, Secure)]);
        resumed[0].audit_index = 1;
        resumed[0].run_id = Some(second);
        trail.extend(resumed);

        assert_eq!(trail[1].alerts, AlertSet::empty().with(AlertFlag::Spoofing));
        assert!(verify(&trail).is_clean());
    }

    #[test]
    fn masking_erased_within_one_run_is_still_found() {
        let run = Uuid::new_v4();
        let mut trail = sample();
        for record in &mut trail {
            record.run_id = Some(run);
        }
        trail[1].alerts = AlertSet::empty().with(AlertFlag::Spoofing);
        let result = verify(&trail);
        assert_eq!(result.findings.len(), 1);
    }

    #[test]
    fn dropped_record_is_found() {
        let mut trail = sample();
        trail.remove(3);
        trail.remove(0);
        let result = verify(&trail);
        assert!(result.findings.iter().any(|f| matches!(
            f,
            Finding::IndexMismatch {
                position: 0,
                found: 1
            }
        )));
    }

    #[test]
    fn finding_display() {
        let finding = Finding::AlertMismatch {
            audit_index: 3,
            sequence: 4,
            stored: AlertSet::empty(),
            expected: AlertSet::empty().with(AlertFlag::Spoofing),
        };
        assert_eq!(
            finding.to_string(),
            "record 3 (sequence 4) stores [OK] but policy yields [spoofing]"
        );
    }
}
