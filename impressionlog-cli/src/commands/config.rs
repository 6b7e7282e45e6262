//! Configuration management CLI commands.
//!
//! Provides `config show`, `config get`, `config set`, `config path`, and
//! `config init`. Every command accepts the global `--config` override and
//! falls back to the default location otherwise.

use std::path::{Path, PathBuf};

use clap::Subcommand;
use impressionlog::config::{config_file_path, ConfigError, ConfigFile, ConfigKey};

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show all configuration settings
    Show,

    /// Get a configuration value
    Get {
        /// Configuration key in format section.key (e.g., impression.delay_ms)
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key in format section.key (e.g., impression.delay_ms)
        key: String,

        /// Value to set
        value: String,
    },

    /// Show the configuration file path
    Path,

    /// Write a configuration file with default settings
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands, explicit: Option<&Path>) -> Result<(), CliError> {
    let path = resolve_path(explicit)?;
    match command {
        ConfigCommands::Show => run_show(&path),
        ConfigCommands::Get { key } => run_get(&path, &key),
        ConfigCommands::Set { key, value } => run_set(&path, explicit, &key, &value),
        ConfigCommands::Path => run_path(&path),
        ConfigCommands::Init { force } => run_init(&path, explicit, force),
    }
}

fn resolve_path(path: Option<&Path>) -> Result<PathBuf, CliError> {
    match path {
        Some(path) => Ok(path.to_path_buf()),
        None => config_file_path().ok_or(CliError::ConfigFile(ConfigError::NoConfigDir)),
    }
}

/// Write `config` to the `--config` path, or the default location without one.
fn save(config: &ConfigFile, explicit: Option<&Path>) -> Result<PathBuf, CliError> {
    match explicit {
        Some(path) => {
            config.save_to(path)?;
            Ok(path.to_path_buf())
        }
        None => Ok(config.save()?),
    }
}

/// Load the file at `path`, or defaults when it does not exist yet.
fn load_or_default(path: &Path) -> Result<ConfigFile, CliError> {
    if path.exists() {
        Ok(ConfigFile::load_from(path)?)
    } else {
        Ok(ConfigFile::default())
    }
}

fn parse_key(key: &str) -> Result<ConfigKey, CliError> {
    key.parse().map_err(|_| {
        CliError::Config(format!(
            "Unknown configuration key '{}'. Use 'impressionlog config show' to see available keys.",
            key
        ))
    })
}

/// Show all configuration settings.
fn run_show(path: &Path) -> Result<(), CliError> {
    let config = load_or_default(path)?;

    println!("Configuration Settings");
    println!("======================");
    if !path.exists() {
        println!("(no file at {}, showing defaults)", path.display());
    }
    println!();

    let mut current_section = "";
    for key in ConfigKey::ALL {
        let section = key.section();
        if section != current_section {
            if !current_section.is_empty() {
                println!();
            }
            println!("[{}]", section);
            current_section = section;
        }

        let value = key.get(&config);
        if value.is_empty() {
            println!("  {} = (not set)", key.key_name());
        } else {
            println!("  {} = {}", key.key_name(), value);
        }
    }

    Ok(())
}

/// Get a configuration value.
fn run_get(path: &Path, key: &str) -> Result<(), CliError> {
    let config_key = parse_key(key)?;
    let config = load_or_default(path)?;
    let value = config_key.get(&config);

    if value.is_empty() {
        println!("(not set)");
    } else {
        println!("{}", value);
    }

    Ok(())
}

/// Set a configuration value.
fn run_set(path: &Path, explicit: Option<&Path>, key: &str, value: &str) -> Result<(), CliError> {
    let config_key = parse_key(key)?;
    let mut config = load_or_default(path)?;
    config_key.set(&mut config, value)?;
    save(&config, explicit)?;

    println!("Set {} = {}", config_key.name(), config_key.get(&config));
    Ok(())
}

/// Show the configuration file path.
fn run_path(path: &Path) -> Result<(), CliError> {
    println!("{}", path.display());
    Ok(())
}

/// Write a default configuration file.
fn run_init(path: &Path, explicit: Option<&Path>, force: bool) -> Result<(), CliError> {
    if path.exists() && !force {
        return Err(CliError::Config(format!(
            "{} already exists. Use --force to overwrite it.",
            path.display()
        )));
    }

    let written = save(&ConfigFile::default(), explicit)?;
    println!("Wrote default configuration to {}", written.display());
    Ok(())
}
