//! Untrusted device-state events.
//!
//! One [`Event`] per line arrives from the event source. Parsing is strict
//! about the fields the classifier depends on and lenient about everything
//! else: unknown fields are ignored, since the producer is untrusted rather
//! than schema-locked.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EventError;

/// Binary device state (e.g. a camera being on or off).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceState {
    /// Device is on.
    #[serde(alias = "ON", alias = "On")]
    On,
    /// Device is off.
    #[serde(alias = "OFF", alias = "Off")]
    Off,
}

impl DeviceState {
    /// Returns the string representation of this state.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Off => "off",
        }
    }

    /// Returns the opposite state.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::On => Self::Off,
            Self::Off => Self::On,
        }
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Security of the channel a report was sent over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// TLS-protected channel.
    #[serde(alias = "SECURE", alias = "Secure")]
    Secure,
    /// Plaintext channel.
    #[serde(alias = "INSECURE", alias = "Insecure")]
    Insecure,
}

/// URL schemes that carry no transport security.
pub const INSECURE_SCHEMES: &[&str] = &["http://", "mqtt://", "ws://"];

/// URL schemes that are TLS-protected.
pub const SECURE_SCHEMES: &[&str] = &["https://", "mqtts://", "wss://"];

impl Transport {
    /// Returns the string representation of this transport.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Secure => "secure",
            Self::Insecure => "insecure",
        }
    }

    /// Classifies an endpoint URL by its scheme.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::UnknownEndpoint`] if the scheme is neither a
    /// known secure nor a known insecure one.
    pub fn from_endpoint(endpoint: &str) -> Result<Self, EventError> {
        let lower = endpoint.trim().to_ascii_lowercase();
        if INSECURE_SCHEMES.iter().any(|s| lower.starts_with(s)) {
            Ok(Self::Insecure)
        } else if SECURE_SCHEMES.iter().any(|s| lower.starts_with(s)) {
            Ok(Self::Secure)
        } else {
            Err(EventError::UnknownEndpoint(endpoint.to_string()))
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single self-reported device-state event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    /// Source-assigned sequence number.
    pub sequence: u64,
    /// Ground-truth state at emission time.
    pub physical_state: DeviceState,
    /// State claimed by the device.
    pub reported_state: DeviceState,
    /// Channel security for this report.
    pub transport: Transport,
    /// Emission time.
    pub timestamp: DateTime<Utc>,
    /// Device identifier, if the source supplies one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    /// Contacted endpoint URL, if the source supplies one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

/// Timestamp as it may appear on the wire.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireTimestamp {
    Text(String),
    Unix(f64),
}

impl WireTimestamp {
    fn into_utc(self) -> Result<DateTime<Utc>, EventError> {
        match self {
            Self::Text(text) => DateTime::parse_from_rfc3339(&text)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| EventError::Invalid(format!("timestamp: {e}"))),
            Self::Unix(secs) => {
                let whole = secs.floor();
                let nanos = ((secs - whole) * 1e9).round().min(999_999_999.0) as u32;
                DateTime::from_timestamp(whole as i64, nanos)
                    .ok_or_else(|| EventError::Invalid(format!("timestamp out of range: {secs}")))
            }
        }
    }
}

/// Wire shape of an event; every field optional so that absence can be
/// reported by name.
#[derive(Debug, Deserialize)]
struct WireEvent {
    sequence: Option<u64>,
    physical_state: Option<DeviceState>,
    reported_state: Option<DeviceState>,
    transport: Option<Transport>,
    timestamp: Option<WireTimestamp>,
    device: Option<String>,
    endpoint: Option<String>,
}

impl Event {
    /// Creates an event stamped with the current time.
    #[must_use]
    pub fn new(
        sequence: u64,
        physical_state: DeviceState,
        reported_state: DeviceState,
        transport: Transport,
    ) -> Self {
        Self {
            sequence,
            physical_state,
            reported_state,
            transport,
            timestamp: Utc::now(),
            device: None,
            endpoint: None,
        }
    }

    /// Sets the emission timestamp.
    #[must_use]
    pub const fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Sets the device identifier.
    #[must_use]
    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device = Some(device.into());
        self
    }

    /// Sets the endpoint URL.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Parses one newline-delimited JSON record.
    ///
    /// An explicit `transport` field wins over one derived from `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns an [`EventError`] if the line is not valid JSON, a required
    /// field is missing, or a value is out of its domain.
    pub fn parse(line: &str) -> Result<Self, EventError> {
        let wire: WireEvent =
            serde_json::from_str(line).map_err(|e| EventError::Invalid(e.to_string()))?;

        let sequence = wire.sequence.ok_or(EventError::MissingField("sequence"))?;
        let physical_state = wire
            .physical_state
            .ok_or(EventError::MissingField("physical_state"))?;
        let reported_state = wire
            .reported_state
            .ok_or(EventError::MissingField("reported_state"))?;
        let transport = match (wire.transport, wire.endpoint.as_deref()) {
            (Some(transport), _) => transport,
            (None, Some(endpoint)) => Transport::from_endpoint(endpoint)?,
            (None, None) => return Err(EventError::MissingField("transport")),
        };
        let timestamp = wire
            .timestamp
            .ok_or(EventError::MissingField("timestamp"))?
            .into_utc()?;

        Ok(Self {
            sequence,
            physical_state,
            reported_state,
            transport,
            timestamp,
            device: wire.device,
            endpoint: wire.endpoint,
        })
    }

    /// Serializes the event as one JSON line (without the newline).
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
