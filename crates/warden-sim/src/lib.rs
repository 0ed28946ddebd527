//! # warden-sim
//!
//! A simulated IoT camera that reports its own state, sometimes falsely.
//!
//! The simulator is the untrusted side of the system: it produces the event
//! stream the auditor checks. It can print JSON lines for piping into
//! `warden audit`, or feed an auditor channel in the same process.
//!
//! ```rust
//! use warden_sim::{DeviceSimulator, SimConfig};
//!
//! let mut sim = DeviceSimulator::new(SimConfig::default().with_seed(7))?;
//! let event = sim.next_event();
//! assert_eq!(event.sequence, 1);
//! assert_eq!(event.device.as_deref(), Some("camera_1"));
//! # Ok::<(), warden_sim::SimError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod runner;
pub mod simulator;

pub use config::{DEFAULT_DEVICE, SimConfig};
pub use error::{Result, SimError};
pub use runner::{run_to_channel, run_to_writer};
pub use simulator::{DeviceSimulator, INSECURE_ENDPOINTS, SECURE_ENDPOINTS};
