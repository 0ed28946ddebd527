//! The simulated device.
//!
//! Each step may flip the physical state, may lie about it while the camera
//! is on, and contacts one outbound endpoint chosen from a secure or an
//! insecure catalogue.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;
use warden_audit::{DeviceState, Event, Transport};

use crate::config::SimConfig;
use crate::error::Result;

/// Endpoints reached over TLS.
pub const SECURE_ENDPOINTS: [&str; 3] = [
    "https://api.secure-server.com/upload",
    "mqtts://broker.secure.net/data",
    "wss://stream.iotcloud.com/feed",
];

/// Endpoints reached in cleartext.
pub const INSECURE_ENDPOINTS: [&str; 3] = [
    "http://api.insecure-server.com/data",
    "mqtt://broker.local/publish",
    "ws://stream.local/feed",
];

/// Untrusted event source for one device.
#[derive(Debug)]
pub struct DeviceSimulator {
    config: SimConfig,
    rng: StdRng,
    sequence: u64,
    physical: DeviceState,
}

impl DeviceSimulator {
    /// Creates a simulator. The device starts physically off.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid.
    pub fn new(config: SimConfig) -> Result<Self> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            config,
            rng,
            sequence: 0,
            physical: DeviceState::Off,
        })
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Number of events produced so far.
    #[must_use]
    pub const fn emitted(&self) -> u64 {
        self.sequence
    }

    /// Produces the next event.
    pub fn next_event(&mut self) -> Event {
        self.sequence += 1;

        if self.rng.gen_bool(self.config.toggle_probability) {
            self.physical = self.physical.toggled();
        }

        let spoofed =
            self.physical == DeviceState::On && self.rng.gen_bool(self.config.spoof_probability);
        let reported = if spoofed {
            DeviceState::Off
        } else {
            self.physical
        };

        let (catalogue, transport) = if self.rng.gen_bool(self.config.insecure_probability) {
            (&INSECURE_ENDPOINTS, Transport::Insecure)
        } else {
            (&SECURE_ENDPOINTS, Transport::Secure)
        };
        let endpoint = catalogue[self.rng.gen_range(0..catalogue.len())];

        debug!(
            sequence = self.sequence,
            physical = %self.physical,
            reported = %reported,
            endpoint,
            spoofed,
            "simulated event"
        );

        Event::new(self.sequence, self.physical, reported, transport)
            .with_device(self.config.device.clone())
            .with_endpoint(endpoint)
    }
}

impl Iterator for DeviceSimulator {
    type Item = Event;

    fn next(&mut self) -> Option<Event> {
        Some(self.next_event())
    }
}
