//! Cross-event memory held by the auditor.

use serde::Serialize;

use crate::event::{DeviceState, Event};

/// Last observed physical and reported states.
///
/// Both start unknown. The driver replaces the state exactly once per
/// processed event, after classification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuditState {
    /// Most recent physical state, `None` before the first event.
    pub last_physical_state: Option<DeviceState>,
    /// Most recent reported state, `None` before the first event.
    pub last_reported_state: Option<DeviceState>,
}

impl AuditState {
    /// The initial unknown/unknown state.
    #[must_use]
    pub const fn unknown() -> Self {
        Self {
            last_physical_state: None,
            last_reported_state: None,
        }
    }

    /// The state after observing `event`.
    #[must_use]
    pub const fn observed(event: &Event) -> Self {
        Self {
            last_physical_state: Some(event.physical_state),
            last_reported_state: Some(event.reported_state),
        }
    }
}

/// Kind of sequence irregularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    /// Same sequence number as the high-water mark.
    Duplicate,
    /// Lower than the high-water mark.
    Regression,
    /// Skips one or more numbers.
    Gap,
}

impl AnomalyKind {
    /// Returns the string representation of this kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Duplicate => "duplicate",
            Self::Regression => "regression",
            Self::Gap => "gap",
        }
    }
}

/// A non-monotonic or duplicate sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SequenceAnomaly {
    /// What went wrong.
    pub anomaly: AnomalyKind,
    /// Sequence number of the offending event.
    pub sequence: u64,
    /// High-water mark before this event.
    pub previous: u64,
}

/// Tracks the highest sequence number seen so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SequenceTracker {
    high_water: Option<u64>,
}

impl SequenceTracker {
    /// Creates a tracker that has seen nothing.
    #[must_use]
    pub const fn new() -> Self {
        Self { high_water: None }
    }

    /// Highest sequence observed, if any.
    #[must_use]
    pub const fn high_water(&self) -> Option<u64> {
        self.high_water
    }

    /// Records `sequence` and reports whether it broke monotonicity.
    ///
    /// The first sequence of a run is always accepted. The high-water mark
    /// only moves forward, so a single stray low number does not turn every
    /// following in-order event into a gap.
    pub fn observe(&mut self, sequence: u64) -> Option<SequenceAnomaly> {
        let Some(previous) = self.high_water else {
            self.high_water = Some(sequence);
            return None;
        };

        let anomaly = if sequence == previous {
            Some(AnomalyKind::Duplicate)
        } else if sequence < previous {
            Some(AnomalyKind::Regression)
        } else if sequence != previous.saturating_add(1) {
            Some(AnomalyKind::Gap)
        } else {
            None
        };

        self.high_water = Some(previous.max(sequence));
        anomaly.map(|anomaly| SequenceAnomaly {
            anomaly,
            sequence,
            previous,
        })
    }
}
