//! Configuration error types.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read config file {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },

    /// The configuration file could not be written.
    #[error("Failed to write config file {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },

    /// The file is not valid INI.
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] ini::ParseError),

    /// A setting has an unusable value.
    #[error("Invalid value for {section}.{key}: '{value}' ({reason})")]
    InvalidValue {
        section: &'static str,
        key: &'static str,
        value: String,
        reason: String,
    },

    /// The platform has no user configuration directory.
    #[error("Could not determine the user configuration directory")]
    NoConfigDir,
}
