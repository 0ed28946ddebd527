//! Demo command implementation.
//!
//! Runs the simulated device and the auditor in one process, connected by
//! the same bounded channel `audit` uses for stdin.

use std::io::Write;

use tokio::sync::mpsc;
use tracing::info;
use warden_audit::{Auditor, AuditorConfig, ShutdownTx};
use warden_sim::{DeviceSimulator, run_to_channel};

use crate::cli::DemoArgs;
use crate::error::CliError;
use crate::output::OutputFormat;

/// Demo command executor.
pub struct DemoCommand {
    args: DemoArgs,
}

impl DemoCommand {
    /// Create a new demo command.
    #[must_use]
    pub const fn new(args: DemoArgs) -> Self {
        Self { args }
    }

    /// Execute the demo command.
    ///
    /// # Errors
    ///
    /// Returns an error if either side is misconfigured or the trail cannot
    /// be written.
    pub async fn execute<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        shutdown: &ShutdownTx,
    ) -> Result<(), CliError> {
        let mut config = AuditorConfig::new(&self.args.trail);
        config.diagnostics_path.clone_from(&self.args.diagnostics);

        let mut sim = DeviceSimulator::new(self.args.sim.to_config())?;
        let mut auditor = Auditor::open(&config)?;

        let (tx, rx) = mpsc::channel(config.channel_capacity);
        let sim_shutdown = shutdown.subscribe();
        let producer = tokio::spawn(async move { run_to_channel(&mut sim, &tx, sim_shutdown).await });

        let summary = auditor.run(rx, shutdown.subscribe()).await;
        let delivered = producer
            .await
            .map_err(|e| CliError::Command(format!("simulator task failed: {e}")))??;
        info!(delivered, "simulator finished");

        format.write(writer, &summary?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Format, SimArgs};
    use warden_audit::shutdown_channel;
    use warden_report::TrailReport;

    fn args(trail: std::path::PathBuf, count: u64) -> DemoArgs {
        DemoArgs {
            sim: SimArgs {
                device: "camera_1".to_string(),
                count: Some(count),
                interval_ms: 0,
                seed: Some(21),
                toggle_probability: 0.25,
                spoof_probability: 0.40,
                insecure_probability: 0.5,
            },
            trail,
            diagnostics: None,
        }
    }

    #[tokio::test]
    async fn demo_writes_verifiable_trail() {
        let dir = tempfile::tempdir().expect("tempdir");
        let trail = dir.path().join("audit_log.jsonl");
        let (shutdown, _rx) = shutdown_channel();

        let mut out = Vec::new();
        DemoCommand::new(args(trail.clone(), 25))
            .execute(&mut out, &OutputFormat::new(Format::Json), &shutdown)
            .await
            .expect("demo");

        let summary: serde_json::Value = serde_json::from_slice(&out).expect("json");
        assert_eq!(summary["records"], 25);
        assert_eq!(summary["stop_reason"], "stream_closed");

        let report = TrailReport::load(&trail).expect("load");
        assert_eq!(report.records().len(), 25);
        assert!(report.verify().is_clean());
    }

    #[tokio::test]
    async fn invalid_probability_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut demo_args = args(dir.path().join("audit_log.jsonl"), 1);
        demo_args.sim.spoof_probability = 2.0;
        let (shutdown, _rx) = shutdown_channel();

        let err = DemoCommand::new(demo_args)
            .execute(&mut Vec::new(), &OutputFormat::default(), &shutdown)
            .await
            .expect_err("invalid");
        assert!(matches!(err, CliError::Simulator(_)));
    }
}
