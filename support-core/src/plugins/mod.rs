//! Plugin system for support
//!
//! This module provides the infrastructure for registering, loading and
//! composing plugins:
//!
//! - [`Registry`]: Persisted document of plugin directories, enablement and settings
//! - [`RegistryStore`]: The process-wide context that mutates and persists the registry
//! - [`PluginLoader`]: Discovers and loads enabled plugin modules
//! - [`CommandTree`]: Host commands merged with plugin-contributed commands
//! - [`PluginHostError`]: Error types for plugin operations
//!
//! # Plugin Discovery
//!
//! Every directory registered with `support plugins register <path>` is
//! walked recursively, in registration order. Files matching the platform
//! library convention are candidates:
//!
//! - `<name>.so` / `lib<name>.so` (`.dylib` on macOS, `.dll` on Windows)
//! - a trailing `_plugin` / `-plugin` is dropped, so `libdocker_plugin.so`
//!   is the `docker` plugin
//!
//! Only candidates enabled in the registry are loaded.

pub mod builtin;
mod composer;
mod error;
mod library;
mod loader;
mod registry;
mod store;

pub use composer::{CommandSource, CommandTree, ComposedCommand, RESERVED_NAMES, Resolution};
pub use error::{ModuleError, ModuleErrorKind, PluginHostError};
pub use library::{DynamicModule, LibraryOpener, ModuleOpener, StaticOpener};
pub use loader::{
    Discovery, LoadReport, LoadedModule, ModuleCandidate, PluginCommand, PluginLoader,
    discover_modules, find_module, is_module_file, module_name,
};
pub use registry::Registry;
pub use store::{Registration, RegistryStore};
