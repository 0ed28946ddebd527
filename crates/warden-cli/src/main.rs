//! Warden CLI binary entrypoint.
//!
//! This is the main entry point for the `warden` command-line tool.

use std::io;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use warden_audit::{ShutdownTx, shutdown_channel};
use warden_cli::cli::{Cli, Commands};
use warden_cli::commands::{
    AuditCommand, DemoCommand, InitConfigCommand, ReportCommand, SimulateCommand,
};
use warden_cli::output::OutputFormat;

fn main() -> ExitCode {
    // Parse CLI arguments
    let cli = Cli::parse();

    init_tracing(cli.log_json);

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(run(cli));
    // A blocking stdin read may still be parked; don't wait on it.
    runtime.shutdown_timeout(Duration::from_millis(100));

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn spawn_signal_handler(shutdown: &ShutdownTx) {
    let shutdown = shutdown.clone();
    tokio::spawn(async move {
        if matches!(tokio::signal::ctrl_c().await, Ok(())) {
            info!("received SIGINT, initiating shutdown");
            let _ = shutdown.send(());
        }
    });
}

async fn run(cli: Cli) -> Result<(), warden_cli::CliError> {
    let format = OutputFormat::new(cli.format);
    let (shutdown, _) = shutdown_channel();
    spawn_signal_handler(&shutdown);

    match cli.command {
        Commands::Audit(args) => {
            let mut stdout = io::stdout().lock();
            AuditCommand::new(args)
                .execute(&mut stdout, &format, &shutdown)
                .await?;
        }
        Commands::Simulate(args) => {
            let mut stdout = tokio::io::stdout();
            SimulateCommand::new(args)
                .execute(&mut stdout, &shutdown)
                .await?;
        }
        Commands::Demo(args) => {
            let mut stdout = io::stdout().lock();
            DemoCommand::new(args)
                .execute(&mut stdout, &format, &shutdown)
                .await?;
        }
        Commands::Report { command } => {
            let mut stdout = io::stdout().lock();
            ReportCommand::new().execute(&mut stdout, &format, &command)?;
        }
        Commands::InitConfig(args) => {
            let mut stdout = io::stdout().lock();
            InitConfigCommand::new(args).execute(&mut stdout, &format)?;
        }
    }

    Ok(())
}
