//! Simulator configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};

/// Default device identifier.
pub const DEFAULT_DEVICE: &str = "camera_1";

/// Knobs for the simulated device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Device identifier stamped on every event.
    pub device: String,
    /// Chance per event that the physical state flips.
    pub toggle_probability: f64,
    /// Chance, while physically on, that the device reports "off".
    pub spoof_probability: f64,
    /// Chance that an event goes out over an insecure endpoint.
    pub insecure_probability: f64,
    /// RNG seed; `None` draws from OS entropy.
    pub seed: Option<u64>,
    /// Number of events to emit; `None` runs until stopped.
    pub count: Option<u64>,
    /// Pause between events, in milliseconds.
    pub interval_ms: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            device: DEFAULT_DEVICE.to_string(),
            toggle_probability: 0.25,
            spoof_probability: 0.40,
            insecure_probability: 0.5,
            seed: None,
            count: None,
            interval_ms: 1000,
        }
    }
}

impl SimConfig {
    /// Sets the RNG seed.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets the number of events to emit.
    #[must_use]
    pub const fn with_count(mut self, count: u64) -> Self {
        self.count = Some(count);
        self
    }

    /// Sets the pause between events.
    #[must_use]
    pub const fn with_interval_ms(mut self, interval_ms: u64) -> Self {
        self.interval_ms = interval_ms;
        self
    }

    /// Pause between events.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a probability is outside `[0, 1]` or the device
    /// name is empty.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("toggle_probability", self.toggle_probability),
            ("spoof_probability", self.spoof_probability),
            ("insecure_probability", self.insecure_probability),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(SimError::InvalidProbability { name, value });
            }
        }
        if self.device.trim().is_empty() {
            return Err(SimError::InvalidConfig(
                "device cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_device() {
        let config = SimConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.device, "camera_1");
        assert!((config.toggle_probability - 0.25).abs() < f64::EPSILON);
        assert!((config.spoof_probability - 0.40).abs() < f64::EPSILON);
        assert_eq!(config.interval(), Duration::from_secs(1));
    }

    #[test]
    fn out_of_range_probability_rejected() {
        let config = SimConfig {
            spoof_probability: 1.2,
            ..SimConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SimError::InvalidProbability {
                name: "spoof_probability",
                ..
            })
        ));
    }

    #[test]
    fn nan_probability_rejected() {
        let config = SimConfig {
            toggle_probability: f64::NAN,
            ..SimConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_device_rejected() {
        let config = SimConfig {
            device: "  ".to_string(),
            ..SimConfig::default()
        };
        assert!(matches!(config.validate(), Err(SimError::InvalidConfig(_))));
    }

    #[test]
    fn partial_json_takes_defaults() {
        let config: SimConfig = serde_json::from_str(r#"{"seed":7,"count":3}"#).expect("json");
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.count, Some(3));
        assert_eq!(config.device, DEFAULT_DEVICE);
    }
}
