//! Simulate command implementation.
//!
//! Prints simulated events to stdout as JSON lines, ready to be piped into
//! `warden audit`.

use tokio::io::AsyncWrite;
use warden_audit::ShutdownTx;
use warden_sim::{DeviceSimulator, run_to_writer};

use crate::cli::SimulateArgs;
use crate::error::CliError;

/// Simulate command executor.
pub struct SimulateCommand {
    args: SimulateArgs,
}

impl SimulateCommand {
    /// Create a new simulate command.
    #[must_use]
    pub const fn new(args: SimulateArgs) -> Self {
        Self { args }
    }

    /// Execute the simulate command, writing events to `writer`.
    ///
    /// # Errors
    ///
    /// Returns an error if the simulator config is invalid or writing fails.
    pub async fn execute<W>(&self, writer: &mut W, shutdown: &ShutdownTx) -> Result<(), CliError>
    where
        W: AsyncWrite + Unpin,
    {
        let mut sim = DeviceSimulator::new(self.args.sim.to_config())?;
        run_to_writer(&mut sim, writer, shutdown.subscribe()).await?;
        Ok(())
    }
}
