//! PluginLoader - discovers enabled modules and collects their commands

use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};

use support_plugin_api::{Command, Plugin};

use super::error::{ModuleError, ModuleErrorKind};
use super::library::{LibraryOpener, ModuleOpener};
use super::registry::Registry;

/// Library extensions recognised on this platform
fn module_extensions() -> &'static [&'static str] {
    if cfg!(target_os = "macos") {
        &["dylib", "so"]
    } else if cfg!(target_os = "windows") {
        &["dll"]
    } else {
        &["so"]
    }
}

/// Whether `path` follows the platform's dynamic-module file convention
pub fn is_module_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| module_extensions().contains(&ext))
}

/// Derive the plugin name from a module file name.
///
/// `libdocker_plugin.so` -> `docker`, `ntfy_plugin.so` -> `ntfy`,
/// `hello.so` -> `hello`. Returns `None` for non-module files or when
/// nothing is left after stripping.
pub fn module_name(path: &Path) -> Option<String> {
    if !is_module_file(path) {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    let stem = stem.strip_prefix("lib").unwrap_or(stem);
    let stem = stem
        .strip_suffix("_plugin")
        .or_else(|| stem.strip_suffix("-plugin"))
        .unwrap_or(stem);

    if stem.is_empty() {
        None
    } else {
        Some(stem.to_string())
    }
}

/// A module file found while walking a plugin directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleCandidate {
    pub name: String,
    pub path: PathBuf,
}

/// Module files found under one plugin directory
#[derive(Debug, Default)]
pub struct Discovery {
    /// Module files in walk order
    pub candidates: Vec<ModuleCandidate>,
    /// Subdirectories and entries that could not be read; the walk skipped
    /// them and carried on
    pub unreadable: Vec<(PathBuf, std::io::Error)>,
}

/// Walk `dir` recursively and return every module file in it.
///
/// Entries are visited in file-name order so the result is deterministic for
/// a given filesystem state. Symlinked files are followed, symlinked
/// directories are not. Only a failure to read `dir` itself is an error.
pub fn discover_modules(dir: &Path) -> std::io::Result<Discovery> {
    let mut found = Discovery::default();
    walk(dir, &mut found)?;
    Ok(found)
}

fn walk(dir: &Path, found: &mut Discovery) -> std::io::Result<()> {
    let mut entries = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        match entry {
            Ok(entry) => entries.push(entry),
            Err(e) => found.unreadable.push((dir.to_path_buf(), e)),
        }
    }
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let path = entry.path();
        let file_type = match entry.file_type() {
            Ok(file_type) => file_type,
            Err(e) => {
                found.unreadable.push((path, e));
                continue;
            }
        };
        if file_type.is_dir() {
            if let Err(e) = walk(&path, found) {
                found.unreadable.push((path, e));
            }
            continue;
        }
        if !path.is_file() {
            continue;
        }
        if let Some(name) = module_name(&path) {
            found.candidates.push(ModuleCandidate { name, path });
        }
    }
    Ok(())
}

/// Find the first module named `name` across `dirs`, searched in order.
///
/// Unreadable directories are skipped.
pub fn find_module(dirs: &[PathBuf], name: &str) -> Option<PathBuf> {
    dirs.iter().find_map(|dir| match discover_modules(dir) {
        Ok(found) => found
            .candidates
            .into_iter()
            .find(|c| c.name == name)
            .map(|c| c.path),
        Err(e) => {
            tracing::debug!(dir = %dir.display(), error = %e, "Plugin directory unreadable");
            None
        }
    })
}

/// A command contributed by a loaded plugin
#[derive(Debug, Clone)]
pub struct PluginCommand {
    /// Identity reported by the module
    pub plugin: String,
    pub command: Command,
}

/// A module that passed validation.
///
/// Holds the plugin instance (and through it the mapped library), so it must
/// outlive every command the module contributed.
pub struct LoadedModule {
    pub name: String,
    pub path: PathBuf,
    pub command_count: usize,
    _instance: Box<dyn Plugin>,
}

impl std::fmt::Debug for LoadedModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedModule")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("command_count", &self.command_count)
            .finish()
    }
}

/// Outcome of one load pass
///
/// Field order is drop order: commands go before the modules that own
/// their code.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Commands in accumulation order (directory order, then walk order)
    pub commands: Vec<PluginCommand>,
    /// Modules that loaded and validated
    pub modules: Vec<LoadedModule>,
    /// Non-fatal failures, in the order they happened
    pub errors: Vec<ModuleError>,
}

impl LoadReport {
    /// Commands contributed by one plugin
    pub fn commands_for<'a>(&'a self, plugin: &'a str) -> impl Iterator<Item = &'a Command> {
        self.commands
            .iter()
            .filter(move |c| c.plugin == plugin)
            .map(|c| &c.command)
    }
}

/// Loads every enabled plugin module from the registered directories
pub struct PluginLoader<O = LibraryOpener> {
    opener: O,
}

impl PluginLoader<LibraryOpener> {
    /// Loader backed by real dynamic libraries
    pub fn new() -> Self {
        Self {
            opener: LibraryOpener,
        }
    }
}

impl Default for PluginLoader<LibraryOpener> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: ModuleOpener> PluginLoader<O> {
    pub fn with_opener(opener: O) -> Self {
        Self { opener }
    }

    /// Run one load pass.
    ///
    /// Never fails as a whole: unreadable directories and broken modules are
    /// recorded in [`LoadReport::errors`] and the pass moves on.
    pub fn load_all(&self, registry: &Registry) -> LoadReport {
        let mut report = LoadReport::default();
        let mut loaded: HashSet<String> = HashSet::new();

        for dir in registry.plugin_dirs() {
            let Discovery {
                candidates,
                unreadable,
            } = match discover_modules(dir) {
                Ok(found) => found,
                Err(e) => {
                    tracing::debug!(dir = %dir.display(), error = %e, "Plugin directory unreadable, skipping");
                    report.errors.push(ModuleError::new(
                        dir.clone(),
                        None,
                        ModuleErrorKind::DirectoryUnreadable(e),
                    ));
                    continue;
                }
            };
            for (path, e) in unreadable {
                tracing::debug!(dir = %path.display(), error = %e, "Skipping unreadable entry");
                report.errors.push(ModuleError::new(
                    path,
                    None,
                    ModuleErrorKind::DirectoryUnreadable(e),
                ));
            }

            for candidate in candidates {
                if !registry.is_enabled(&candidate.name) {
                    tracing::debug!(plugin = %candidate.name, "Plugin disabled, skipping");
                    continue;
                }
                if loaded.contains(&candidate.name) {
                    tracing::debug!(
                        plugin = %candidate.name,
                        path = %candidate.path.display(),
                        "Plugin already loaded from an earlier directory, skipping"
                    );
                    continue;
                }

                match self.load_module(&candidate) {
                    Ok((module, commands)) => {
                        tracing::info!(
                            plugin = %module.name,
                            commands = module.command_count,
                            "Plugin loaded"
                        );
                        loaded.insert(candidate.name.clone());
                        report.commands.extend(commands);
                        report.modules.push(module);
                    }
                    Err(kind) => {
                        let err = ModuleError::new(
                            candidate.path.clone(),
                            Some(candidate.name.clone()),
                            kind,
                        );
                        tracing::debug!(plugin = %candidate.name, error = %err, "Failed to load plugin");
                        report.errors.push(err);
                    }
                }
            }
        }

        tracing::debug!(
            modules = report.modules.len(),
            commands = report.commands.len(),
            errors = report.errors.len(),
            "Plugin load pass complete"
        );
        report
    }

    /// Open, validate and query a single module
    fn load_module(
        &self,
        candidate: &ModuleCandidate,
    ) -> Result<(LoadedModule, Vec<PluginCommand>), ModuleErrorKind> {
        let instance = self.opener.open(&candidate.path)?;

        let identity = instance.name().to_string();
        if identity != candidate.name {
            tracing::warn!(
                plugin = %candidate.name,
                identity = %identity,
                "Module identity differs from its file name"
            );
        }

        let commands = std::panic::catch_unwind(AssertUnwindSafe(|| instance.commands()))
            .map_err(|_| ModuleErrorKind::Panicked)?;

        let command_count = commands.len();
        let commands = commands
            .into_iter()
            .map(|command| PluginCommand {
                plugin: identity.clone(),
                command,
            })
            .collect();

        Ok((
            LoadedModule {
                name: identity,
                path: candidate.path.clone(),
                command_count,
                _instance: instance,
            },
            commands,
        ))
    }
}
