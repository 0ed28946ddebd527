//! Output formatting for CLI commands.
//!
//! Supports table (human-readable) and JSON output formats.

use std::io::Write;

use serde::Serialize;
use warden_audit::{AlertFlag, RunSummary};
use warden_report::{EventListing, Summary, Verification, network_label};

use crate::cli::Format;
use crate::error::CliError;

/// Output formatter that handles both table and JSON output.
#[derive(Debug, Clone)]
pub struct OutputFormat {
    format: Format,
}

impl OutputFormat {
    /// Create a new output formatter.
    #[must_use]
    pub const fn new(format: Format) -> Self {
        Self { format }
    }

    /// Write a serializable value to the output.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write<W, T>(&self, writer: &mut W, value: &T) -> Result<(), CliError>
    where
        W: Write,
        T: Serialize + TableDisplay,
    {
        match self.format {
            Format::Json => {
                serde_json::to_writer_pretty(&mut *writer, value)
                    .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
                writeln!(writer)?;
            }
            Format::Table => {
                value.write_table(writer)?;
            }
        }
        Ok(())
    }

    /// Write a serializable value to a string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_string<T>(&self, value: &T) -> Result<String, CliError>
    where
        T: Serialize + TableDisplay,
    {
        let mut buf = Vec::new();
        self.write(&mut buf, value)?;
        String::from_utf8(buf).map_err(|e| CliError::Format(format!("UTF-8 error: {e}")))
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::new(Format::Table)
    }
}

/// Trait for types that can be displayed as a table.
pub trait TableDisplay {
    /// Write the value as a human-readable table.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError>;
}

impl TableDisplay for RunSummary {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        let stats = &self.stats;
        writeln!(writer, "Audit Run")?;
        writeln!(writer, "══════════════════════════════════")?;
        writeln!(writer, "Run ID:           {}", self.run_id)?;
        writeln!(writer, "Stopped:          {:?}", self.stop_reason)?;
        writeln!(writer)?;
        writeln!(writer, "Records")?;
        writeln!(writer, "  Appended:       {}", stats.records)?;
        writeln!(writer, "  OK:             {}", stats.ok)?;
        writeln!(writer)?;
        writeln!(writer, "Alerts")?;
        writeln!(writer, "  Spoofing:       {}", stats.spoofing)?;
        writeln!(writer, "  Masking:        {}", stats.masking)?;
        writeln!(writer, "  TLS Violation:  {}", stats.tls_violation)?;
        writeln!(writer)?;
        writeln!(writer, "Diagnostics")?;
        writeln!(writer, "  Malformed:      {}", stats.malformed)?;
        writeln!(writer, "  Seq Anomalies:  {}", stats.sequence_anomalies)?;
        Ok(())
    }
}

impl TableDisplay for Summary {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Audit Trail Summary")?;
        writeln!(writer, "══════════════════════════════════")?;
        if self.total == 0 {
            writeln!(writer, "No records")?;
            return Ok(());
        }
        writeln!(writer, "Events:           {}", self.total)?;
        writeln!(writer, "OK:               {}", self.ok)?;
        writeln!(writer, "Flagged:          {}", self.flagged())?;
        if let (Some(first), Some(last)) = (self.first_timestamp, self.last_timestamp) {
            writeln!(
                writer,
                "Span:             {} .. {}",
                first.format("%Y-%m-%d %H:%M:%S UTC"),
                last.format("%Y-%m-%d %H:%M:%S UTC")
            )?;
        }
        writeln!(writer)?;
        writeln!(writer, "Alerts")?;
        for flag in AlertFlag::ALL {
            writeln!(writer, "  {:<16}{}", flag.as_str(), self.count(flag))?;
        }
        writeln!(writer)?;
        writeln!(writer, "{:<24}  {:>8}  {:>8}", "DEVICE", "EVENTS", "FLAGGED")?;
        writeln!(writer, "{}", "─".repeat(44))?;
        for (device, counts) in &self.devices {
            writeln!(
                writer,
                "{:<24}  {:>8}  {:>8}",
                truncate(device, 24),
                counts.total,
                counts.flagged
            )?;
        }
        Ok(())
    }
}

impl TableDisplay for Verification {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.is_clean() {
            writeln!(writer, "✓ {} record(s) verified", self.records)?;
            return Ok(());
        }
        writeln!(
            writer,
            "✗ {} finding(s) in {} record(s)",
            self.findings.len(),
            self.records
        )?;
        for finding in &self.findings {
            writeln!(writer, "  {finding}")?;
        }
        Ok(())
    }
}

impl TableDisplay for EventListing {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.is_empty() {
            writeln!(writer, "No matching records")?;
            return Ok(());
        }
        writeln!(
            writer,
            "{:>6}  {:>6}  {:<12}  {:<8}  {:<8}  {:<36}  {:<32}  {:<19}",
            "INDEX", "SEQ", "DEVICE", "PHYSICAL", "REPORTED", "NETWORK", "ALERTS", "AUDITED AT"
        )?;
        writeln!(writer, "{}", "─".repeat(140))?;
        for record in &self.records {
            writeln!(
                writer,
                "{:>6}  {:>6}  {:<12}  {:<8}  {:<8}  {:<36}  {:<32}  {:<19}",
                record.audit_index,
                record.sequence,
                truncate(record.device.as_deref().unwrap_or("-"), 12),
                record.physical_state.as_str(),
                record.reported_state.as_str(),
                truncate(network_label(record), 36),
                record.alerts.to_string(),
                record.audited_at.format("%Y-%m-%d %H:%M:%S")
            )?;
        }
        writeln!(writer)?;
        writeln!(writer, "{} record(s)", self.len())?;
        Ok(())
    }
}

/// Confirmation of a completed action.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    /// Message text.
    pub message: String,
}

impl Message {
    /// Create a success message.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl TableDisplay for Message {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "✓ {}", self.message)?;
        Ok(())
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}
