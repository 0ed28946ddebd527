//! CLI command implementations.
//!
//! Each submodule implements a specific CLI command:
//! - [`audit`] - Audit an event stream into a trail
//! - [`simulate`] - Print simulated device events
//! - [`demo`] - Simulator and auditor in one process
//! - [`report`] - Summaries, graphs, and verification of a trail
//! - [`init_config`] - Write a sample config file

pub mod audit;
pub mod demo;
pub mod init_config;
pub mod report;
pub mod simulate;

pub use audit::AuditCommand;
pub use demo::DemoCommand;
pub use init_config::InitConfigCommand;
pub use report::ReportCommand;
pub use simulate::SimulateCommand;
