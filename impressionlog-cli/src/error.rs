//! CLI error type.

use impressionlog::config::ConfigError;
use impressionlog::impression::EngineError;
use impressionlog::logging::LoggingError;
use thiserror::Error;

/// Errors surfaced to the user by `impressionlog` commands.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    ConfigFile(#[from] ConfigError),

    #[error("Failed to initialise logging: {0}")]
    Logging(#[from] LoggingError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Failed to create Tokio runtime: {0}")]
    RuntimeCreation(std::io::Error),

    #[error("Failed to install Ctrl-C handler: {0}")]
    SignalHandler(#[from] ctrlc::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Failed to encode output: {0}")]
    Output(#[from] serde_json::Error),
}
