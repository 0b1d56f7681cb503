//! Plugin host error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur in registry and dispatch operations
#[derive(Error, Debug)]
pub enum PluginHostError {
    /// No registered directory holds a module with this name
    #[error("Plugin '{name}' not found in any registered plugin directory")]
    PluginNotFound { name: String },

    /// Plugin directory could not be created
    #[error("Failed to create plugin directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Registry error (parsing, serializing)
    #[error("Registry error: {0}")]
    Registry(String),

    /// The registry document on disk could not be read at startup; changes
    /// are refused so the file is not replaced by an empty registry
    #[error(
        "Registry {} could not be read ({reason}); repair or remove it before making changes",
        .path.display()
    )]
    RegistryUnreadable { path: PathBuf, reason: String },

    /// Command name already taken in the composed tree
    #[error("Command '{command}' from plugin '{plugin}' conflicts with {existing}")]
    CommandConflict {
        command: String,
        plugin: String,
        existing: String,
    },

    /// Command definition the command line parser cannot represent
    #[error("Command '{command}' from plugin '{plugin}' is malformed: {reason}")]
    MalformedCommand {
        command: String,
        plugin: String,
        reason: String,
    },

    /// No command matches the invoked path
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// A command action failed
    #[error(transparent)]
    Command(#[from] support_plugin_api::PluginError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a single module (or a whole directory) was skipped during a load pass
#[derive(Error, Debug)]
pub enum ModuleErrorKind {
    /// Plugin directory missing or unreadable
    #[error("plugin directory unreadable: {0}")]
    DirectoryUnreadable(#[source] std::io::Error),

    /// Dynamic library could not be opened
    #[error("failed to load module: {0}")]
    Load(String),

    /// A required export is absent
    #[error("missing capability '{symbol}': {reason}")]
    MissingCapability { symbol: &'static str, reason: String },

    /// An export is present but does not have the expected shape
    #[error("capability '{symbol}' has the wrong shape: {reason}")]
    MisshapenCapability { symbol: &'static str, reason: String },

    /// Command supplier panicked
    #[error("module panicked while supplying commands")]
    Panicked,
}

/// A non-fatal, per-module (or per-directory) load failure
#[derive(Error, Debug)]
#[error("{}: {kind}", .path.display())]
pub struct ModuleError {
    /// Module file, or the directory for directory-level failures
    pub path: PathBuf,
    /// Plugin name derived from the file name, when known
    pub plugin: Option<String>,
    pub kind: ModuleErrorKind,
}

impl ModuleError {
    pub fn new(path: impl Into<PathBuf>, plugin: Option<String>, kind: ModuleErrorKind) -> Self {
        Self {
            path: path.into(),
            plugin,
            kind,
        }
    }
}
