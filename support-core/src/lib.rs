//! support-core: Core library for the support CLI host
//!
//! This crate owns everything between the persisted registry document and the
//! command tree the user sees:
//!
//! - **Plugin registry** - [`Registry`] document and the [`RegistryStore`]
//!   context that persists every mutation
//! - **Module loader** - [`PluginLoader`] walks registered directories and
//!   loads enabled modules with per-module failure isolation
//! - **Command composition** - [`CommandTree`] merges host and plugin commands
//! - **Registry CLI surface** - [`plugins::builtin`] host commands
//!
//! # Startup
//!
//! ```no_run
//! use support_core::{CommandTree, PluginLoader, RegistryStore, plugins::builtin};
//!
//! fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = RegistryStore::open_default()?;
//!     let report = PluginLoader::new().load_all(store.registry());
//!     let tree = CommandTree::from_load(builtin::host_commands(), report);
//!     for entry in tree.iter() {
//!         println!("{}  {}", entry.command.name, entry.command.usage);
//!     }
//!     Ok(())
//! }
//! ```

pub mod plugins;

pub use plugins::{
    CommandSource, CommandTree, ComposedCommand, LibraryOpener, LoadReport, LoadedModule,
    ModuleError, ModuleErrorKind, ModuleOpener, PluginCommand, PluginHostError, PluginLoader,
    Registration, Registry, RegistryStore, Resolution, StaticOpener,
};
