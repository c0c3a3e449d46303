//! boxform: headless client for box-protocol form servers.
//!
//! This is the main entry point for the boxform binary. It parses the CLI,
//! loads configuration, initializes logging and dispatches the subcommand.
//!
//! # I/O
//!
//! - **stdout**: one JSON line per mounted form
//! - **stderr**: diagnostics from `tracing`

use anyhow::{Context, Result};
use boxform::{cli::Cli, cli_handler, config::ConfigLoader};
use clap::Parser;
use tracing::debug;

fn main() -> Result<()> {
    // Parse CLI arguments first (before any other initialization)
    let cli = Cli::parse();

    // Load configuration with hierarchy merging
    let config = ConfigLoader::new()
        .load(&cli)
        .context("Failed to load configuration")?;

    init_tracing(cli.verbose, &config.general.log_level)?;

    debug!("Parsed CLI arguments: {:?}", cli);
    debug!("Loaded configuration: {:?}", config);

    cli_handler::handle_command(cli.command, config)
}

/// Initialize the tracing subscriber.
///
/// # Verbosity Levels
/// - 0 (default): `log_level` from config, else `RUST_LOG`, else warnings
/// - 1 (-v): Info level
/// - 2 (-vv): Debug level
/// - 3+ (-vvv): Trace level
fn init_tracing(verbose: u8, log_level: &str) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = match verbose {
        0 if !log_level.is_empty() => EnvFilter::new(log_level),
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    Ok(())
}
