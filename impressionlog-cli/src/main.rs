//! ImpressionLog CLI - Command-line interface
//!
//! Drives the impressionlog library: simulates scrolling lists against a live
//! impression engine and manages the configuration file.

mod commands;
mod error;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use impressionlog::config::{ConfigError, ConfigFile};
use impressionlog::logging::{init_logging, LoggingGuard};
use tracing::debug;

use commands::config::ConfigCommands;
use commands::simulate::SimulateArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "impressionlog", version, about = "Viewability impression tracking")]
struct Cli {
    /// Log at debug level (overrides the configured level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Read configuration from this file instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Scroll a simulated list and report the impressions it produces
    Simulate(SimulateArgs),

    /// View or modify configuration settings
    #[command(subcommand)]
    Config(ConfigCommands),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Simulate(args) => {
            let config = load_config(cli.config.as_deref())?;
            let _guard = init_cli_logging(&config, cli.verbose, cli.log_file)?;
            debug!(version = env!("CARGO_PKG_VERSION"), "impressionlog starting");
            commands::simulate::run(args, &config)
        }
        // Config commands must work on a missing or broken file.
        Commands::Config(command) => commands::config::run(command, cli.config.as_deref()),
    }
}

fn load_config(path: Option<&Path>) -> Result<ConfigFile, CliError> {
    let config = match path {
        Some(path) => ConfigFile::load_from(path)?,
        None => match ConfigFile::load() {
            Err(ConfigError::NoConfigDir) => ConfigFile::default(),
            other => other?,
        },
    };
    Ok(config)
}

fn init_cli_logging(
    config: &ConfigFile,
    verbose: bool,
    log_file: Option<PathBuf>,
) -> Result<LoggingGuard, CliError> {
    let mut logging = config.logging.clone();
    if verbose {
        logging.level = "debug".to_string();
    }
    if log_file.is_some() {
        logging.file = log_file;
    }
    Ok(init_logging(&logging)?)
}
