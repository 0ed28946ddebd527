//! Init-config command implementation.

use std::io::Write;

use warden_audit::AuditorConfig;

use crate::cli::InitConfigArgs;
use crate::error::CliError;
use crate::output::{Message, OutputFormat};

/// Init-config command executor.
pub struct InitConfigCommand {
    args: InitConfigArgs,
}

impl InitConfigCommand {
    /// Create a new init-config command.
    #[must_use]
    pub const fn new(args: InitConfigArgs) -> Self {
        Self { args }
    }

    /// Write the default auditor config to the target path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists and `--force` was not given, or
    /// writing fails.
    pub fn execute<W: Write>(&self, writer: &mut W, format: &OutputFormat) -> Result<(), CliError> {
        let path = &self.args.path;
        if path.exists() && !self.args.force {
            return Err(CliError::Config(format!(
                "{} already exists (use --force to overwrite)",
                path.display()
            )));
        }

        let config = AuditorConfig::default().with_diagnostics_path("audit_diagnostics.jsonl");
        std::fs::write(path, config.to_toml()?)?;

        format.write(
            writer,
            &Message::success(format!("wrote auditor config to {}", path.display())),
        )?;
        Ok(())
    }
}
