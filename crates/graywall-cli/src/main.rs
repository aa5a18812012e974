//! Graywall CLI binary entrypoint.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use graywall_cli::cli::{Cli, Commands};
use graywall_cli::commands::{ConfigCommand, ReplayCommand};
use graywall_cli::output::OutputFormat;

fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), graywall_cli::CliError> {
    let format = OutputFormat::new(cli.format);
    let mut stdout = io::stdout().lock();

    match cli.command {
        Commands::Config { command } => {
            ConfigCommand::new().execute(&mut stdout, &format, &command)?;
        }
        Commands::Replay(args) => {
            ReplayCommand::new().execute(&mut stdout, &format, &args)?;
        }
    }

    Ok(())
}
