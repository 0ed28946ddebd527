//! Report command implementation.
//!
//! Read-only views over a trail: summary counts, the event listing, the
//! provenance graph, and a replay-based integrity check.

use std::io::Write;
use std::path::Path;

use warden_report::{EventFilter, TrailReport};

use crate::cli::{GraphFormat, ReportCommands};
use crate::error::CliError;
use crate::output::{Message, OutputFormat};

/// Report command executor.
pub struct ReportCommand;

impl ReportCommand {
    /// Create a new report command.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Execute a report subcommand.
    ///
    /// # Errors
    ///
    /// Returns an error if the trail cannot be read, output fails, or
    /// verification finds discrepancies.
    pub fn execute<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        command: &ReportCommands,
    ) -> Result<(), CliError> {
        match command {
            ReportCommands::Summary { trail } => {
                let report = TrailReport::load(trail)?;
                format.write(writer, &report.summary())?;
            }
            ReportCommands::Events { trail, alert } => {
                let report = TrailReport::load(trail)?;
                let filter = alert.map_or(EventFilter::All, EventFilter::from);
                format.write(writer, &report.events(filter))?;
            }
            ReportCommands::Graph {
                trail,
                graph_format,
                output,
            } => {
                let report = TrailReport::load(trail)?;
                let graph = report.graph();
                let rendered = match graph_format {
                    GraphFormat::Dot => graph.to_dot(),
                    GraphFormat::Json => graph.to_json()?,
                };
                match output {
                    Some(path) => {
                        write_file(path, &rendered)?;
                        let message = Message::success(format!(
                            "wrote {} node(s), {} edge(s) to {}",
                            graph.nodes().len(),
                            graph.edges().len(),
                            path.display()
                        ));
                        format.write(writer, &message)?;
                    }
                    None => writer.write_all(rendered.as_bytes())?,
                }
            }
            ReportCommands::Verify { trail } => {
                let report = TrailReport::load(trail)?;
                let verification = report.verify();
                format.write(writer, &verification)?;
                if !verification.is_clean() {
                    return Err(CliError::VerificationFailed(verification.findings.len()));
                }
            }
        }
        Ok(())
    }
}

impl Default for ReportCommand {
    fn default() -> Self {
        Self::new()
    }
}

fn write_file(path: &Path, content: &str) -> Result<(), CliError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(())
}
