//! Error types for plugin authors

use thiserror::Error;

/// Errors that plugins (and their command actions) can return
#[derive(Error, Debug)]
pub enum PluginError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Command execution failed
    #[error("Command failed: {0}")]
    Command(String),

    /// Settings store rejected or failed a write
    #[error("Settings error: {0}")]
    Settings(String),

    /// Custom error with message
    #[error("{0}")]
    Custom(String),

    /// A required argument or flag was not supplied
    #[error("Missing argument: {0}")]
    MissingArgument(String),

    /// Command has no action of its own and needs a sub-command
    #[error("'{0}' requires a subcommand")]
    SubcommandRequired(String),
}

impl PluginError {
    /// Create a custom error with a message
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a command error
    pub fn command(message: impl Into<String>) -> Self {
        Self::Command(message.into())
    }
}
