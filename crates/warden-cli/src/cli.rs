//! Command-line argument parsing with clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use warden_audit::{AlertFlag, AuditorConfig, ConfigError, DEFAULT_TRAIL_PATH};
use warden_report::EventFilter;
use warden_sim::{DEFAULT_DEVICE, SimConfig};

/// Warden - trusted auditor for untrusted device-state streams.
#[derive(Parser, Debug, Clone)]
#[command(name = "warden")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format.
    #[arg(short, long, value_enum, default_value_t = Format::Table, global = true)]
    pub format: Format,

    /// Emit logs as JSON on stderr.
    #[arg(long, env = "WARDEN_LOG_JSON", global = true)]
    pub log_json: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Format {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON output for scripting.
    Json,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Audit newline-delimited JSON events from stdin or a file.
    Audit(AuditArgs),

    /// Run the simulated device and print its events to stdout.
    Simulate(SimulateArgs),

    /// Run the simulated device straight into an auditor.
    Demo(DemoArgs),

    /// Inspect an audit trail.
    Report {
        /// Report subcommand to execute.
        #[command(subcommand)]
        command: ReportCommands,
    },

    /// Write a sample auditor config file.
    InitConfig(InitConfigArgs),
}

/// Arguments for the audit command.
#[derive(Args, Debug, Clone, Default)]
pub struct AuditArgs {
    /// JSON config file; flags below override its values.
    #[arg(short, long, env = "WARDEN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Audit trail path.
    #[arg(short, long)]
    pub trail: Option<PathBuf>,

    /// Diagnostics side file (JSON lines).
    #[arg(long)]
    pub diagnostics: Option<PathBuf>,

    /// Read events from this file instead of stdin.
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Capacity of the event channel.
    #[arg(long)]
    pub channel_capacity: Option<usize>,

    /// Reject lines longer than this many bytes.
    #[arg(long)]
    pub max_line_bytes: Option<usize>,
}

impl AuditArgs {
    /// Loads the config file (if any) and applies flag overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be loaded or the result is
    /// invalid.
    pub fn resolve_config(&self) -> Result<AuditorConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => AuditorConfig::load(path)?,
            None => AuditorConfig::default(),
        };
        if let Some(trail) = &self.trail {
            config.trail_path.clone_from(trail);
        }
        if let Some(diagnostics) = &self.diagnostics {
            config.diagnostics_path = Some(diagnostics.clone());
        }
        if let Some(capacity) = self.channel_capacity {
            config.channel_capacity = capacity;
        }
        if let Some(max) = self.max_line_bytes {
            config.max_line_bytes = max;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Simulated device settings shared by `simulate` and `demo`.
#[derive(Args, Debug, Clone)]
pub struct SimArgs {
    /// Device identifier.
    #[arg(long, default_value = DEFAULT_DEVICE)]
    pub device: String,

    /// Number of events to emit (default: until interrupted).
    #[arg(short = 'n', long)]
    pub count: Option<u64>,

    /// Milliseconds between events.
    #[arg(long, default_value_t = 1000)]
    pub interval_ms: u64,

    /// RNG seed for a reproducible stream.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Chance per event that the physical state flips.
    #[arg(long, default_value_t = 0.25)]
    pub toggle_probability: f64,

    /// Chance, while on, that the device claims to be off.
    #[arg(long, default_value_t = 0.40)]
    pub spoof_probability: f64,

    /// Chance that an event uses an insecure endpoint.
    #[arg(long, default_value_t = 0.5)]
    pub insecure_probability: f64,
}

impl SimArgs {
    /// Builds the simulator config.
    #[must_use]
    pub fn to_config(&self) -> SimConfig {
        SimConfig {
            device: self.device.clone(),
            toggle_probability: self.toggle_probability,
            spoof_probability: self.spoof_probability,
            insecure_probability: self.insecure_probability,
            seed: self.seed,
            count: self.count,
            interval_ms: self.interval_ms,
        }
    }
}

/// Arguments for the simulate command.
#[derive(Args, Debug, Clone)]
pub struct SimulateArgs {
    /// Simulator settings.
    #[command(flatten)]
    pub sim: SimArgs,
}

/// Arguments for the demo command.
#[derive(Args, Debug, Clone)]
pub struct DemoArgs {
    /// Simulator settings.
    #[command(flatten)]
    pub sim: SimArgs,

    /// Audit trail path.
    #[arg(short, long, default_value = DEFAULT_TRAIL_PATH)]
    pub trail: PathBuf,

    /// Diagnostics side file (JSON lines).
    #[arg(long)]
    pub diagnostics: Option<PathBuf>,
}

/// Report subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum ReportCommands {
    /// Count events and alerts.
    Summary {
        /// Audit trail path.
        #[arg(default_value = DEFAULT_TRAIL_PATH)]
        trail: PathBuf,
    },

    /// List audited events, optionally filtered by alert.
    Events {
        /// Audit trail path.
        #[arg(default_value = DEFAULT_TRAIL_PATH)]
        trail: PathBuf,

        /// Only show events matching this alert.
        #[arg(long, value_enum)]
        alert: Option<AlertFilter>,
    },

    /// Render the provenance graph.
    Graph {
        /// Audit trail path.
        #[arg(default_value = DEFAULT_TRAIL_PATH)]
        trail: PathBuf,

        /// Graph encoding.
        #[arg(long, value_enum, default_value_t = GraphFormat::Dot)]
        graph_format: GraphFormat,

        /// Write to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check indices and replay the policy over every record.
    Verify {
        /// Audit trail path.
        #[arg(default_value = DEFAULT_TRAIL_PATH)]
        trail: PathBuf,
    },
}

/// Alert filters for `report events`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AlertFilter {
    /// Events without alerts.
    Ok,
    /// Spoofing events.
    Spoofing,
    /// Masking events.
    Masking,
    /// Events sent over an insecure transport.
    TlsViolation,
}

impl From<AlertFilter> for EventFilter {
    fn from(filter: AlertFilter) -> Self {
        match filter {
            AlertFilter::Ok => Self::Ok,
            AlertFilter::Spoofing => Self::Flag(AlertFlag::Spoofing),
            AlertFilter::Masking => Self::Flag(AlertFlag::Masking),
            AlertFilter::TlsViolation => Self::Flag(AlertFlag::TlsViolation),
        }
    }
}

/// Provenance graph encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum GraphFormat {
    /// Graphviz DOT.
    #[default]
    Dot,
    /// JSON nodes and edges.
    Json,
}

/// Arguments for the init-config command.
#[derive(Args, Debug, Clone)]
pub struct InitConfigArgs {
    /// Where to write the config.
    #[arg(default_value = "warden.toml")]
    pub path: PathBuf,

    /// Overwrite an existing file.
    #[arg(long)]
    pub force: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_audit_with_overrides() {
        let cli = Cli::parse_from([
            "warden",
            "audit",
            "--trail",
            "/tmp/t.jsonl",
            "--max-line-bytes",
            "128",
        ]);
        let Commands::Audit(args) = cli.command else {
            unreachable!("expected audit command");
        };
        let config = args.resolve_config().expect("valid");
        assert_eq!(config.trail_path, PathBuf::from("/tmp/t.jsonl"));
        assert_eq!(config.max_line_bytes, 128);
    }

    #[test]
    fn audit_rejects_zero_capacity() {
        let args = AuditArgs {
            channel_capacity: Some(0),
            ..AuditArgs::default()
        };
        assert!(args.resolve_config().is_err());
    }

    #[test]
    fn sim_args_defaults() {
        let cli = Cli::parse_from(["warden", "simulate", "-n", "3", "--seed", "9"]);
        let Commands::Simulate(args) = cli.command else {
            unreachable!("expected simulate command");
        };
        let config = args.sim.to_config();
        assert_eq!(config.count, Some(3));
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.device, "camera_1");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn report_graph_defaults() {
        let cli = Cli::parse_from(["warden", "report", "graph"]);
        match cli.command {
            Commands::Report {
                command:
                    ReportCommands::Graph {
                        trail,
                        graph_format,
                        output,
                    },
            } => {
                assert_eq!(trail, PathBuf::from(DEFAULT_TRAIL_PATH));
                assert_eq!(graph_format, GraphFormat::Dot);
                assert!(output.is_none());
            }
            other => unreachable!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn report_events_alert_filter() {
        let cli = Cli::parse_from(["warden", "report", "events", "--alert", "tls-violation"]);
        let Commands::Report {
            command: ReportCommands::Events { trail, alert },
        } = cli.command
        else {
            unreachable!("expected report events");
        };
        assert_eq!(trail, PathBuf::from(DEFAULT_TRAIL_PATH));
        assert_eq!(alert, Some(AlertFilter::TlsViolation));
        assert_eq!(
            EventFilter::from(AlertFilter::TlsViolation),
            EventFilter::Flag(AlertFlag::TlsViolation)
        );
    }

    #[test]
    fn format_flag_is_global() {
        let cli = Cli::parse_from(["warden", "report", "summary", "--format", "json"]);
        assert_eq!(cli.format, Format::Json);
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
