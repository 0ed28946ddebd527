//! Audit command implementation.
//!
//! Reads newline-delimited JSON events from stdin (or a file), runs them
//! through an [`Auditor`], and prints the run summary.

use std::io::Write;

use tokio::io::{AsyncBufRead, BufReader};
use tracing::{debug, warn};
use warden_audit::{Auditor, RunSummary, ShutdownTx, StopReason, spawn_line_reader};

use crate::cli::AuditArgs;
use crate::error::CliError;
use crate::output::OutputFormat;

/// Audit command executor.
pub struct AuditCommand {
    args: AuditArgs,
}

impl AuditCommand {
    /// Create a new audit command.
    #[must_use]
    pub const fn new(args: AuditArgs) -> Self {
        Self { args }
    }

    /// Execute the audit command.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid, the trail cannot be opened
    /// or written, or the input cannot be read.
    pub async fn execute<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        shutdown: &ShutdownTx,
    ) -> Result<(), CliError> {
        let summary = match &self.args.input {
            Some(path) => {
                let file = tokio::fs::File::open(path).await?;
                self.audit(BufReader::new(file), shutdown).await?
            }
            None => self.audit(BufReader::new(tokio::io::stdin()), shutdown).await?,
        };
        format.write(writer, &summary)?;
        Ok(())
    }

    async fn audit<R>(&self, input: R, shutdown: &ShutdownTx) -> Result<RunSummary, CliError>
    where
        R: AsyncBufRead + Unpin + Send + 'static,
    {
        let config = self.args.resolve_config()?;
        let mut auditor = Auditor::open(&config)?;
        let (events, reader) =
            spawn_line_reader(input, config.channel_capacity, config.max_line_bytes);

        let result = auditor.run(events, shutdown.subscribe()).await;

        if matches!(&result, Ok(s) if s.stop_reason == StopReason::StreamClosed) {
            match reader.await {
                Ok(Ok(lines)) => debug!(lines, "input exhausted"),
                Ok(Err(e)) => {
                    warn!(error = %e, "input read failed");
                    return Err(CliError::Io(e));
                }
                Err(e) => return Err(CliError::Command(format!("input reader failed: {e}"))),
            }
        } else {
            reader.abort();
        }

        Ok(result?)
    }
}
