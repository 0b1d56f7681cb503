//! Command tree - host commands merged with plugin-contributed commands

use std::collections::{HashMap, HashSet};
use std::panic::AssertUnwindSafe;

use support_plugin_api::{ArgKind, Command, CommandArgs, CommandContext, CommandOutput, PluginError};

use super::builtin;
use super::error::{ModuleError, PluginHostError};
use super::loader::{LoadReport, LoadedModule, PluginCommand};
use super::store::RegistryStore;

/// Command names the command line parser generates itself
pub const RESERVED_NAMES: &[&str] = &["help"];

/// Argument names owned by the parser or the host's global options
const RESERVED_ARGS: &[&str] = &["help", "version", "verbose", "registry"];

/// Short aliases owned by the parser or the host's global options
const RESERVED_SHORTS: &[char] = &['h', 'V', 'v'];

/// Who contributed a top-level command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandSource {
    /// Compiled into the host
    Host,
    /// Contributed by the named plugin
    Plugin(String),
}

impl std::fmt::Display for CommandSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandSource::Host => write!(f, "the host"),
            CommandSource::Plugin(name) => write!(f, "plugin '{}'", name),
        }
    }
}

/// A top-level command and where it came from
#[derive(Debug, Clone)]
pub struct ComposedCommand {
    pub source: CommandSource,
    pub command: Command,
}

/// Result of resolving an invoked path against the tree
#[derive(Debug)]
pub struct Resolution<'a> {
    /// Top-level entry the path starts in
    pub entry: &'a ComposedCommand,
    /// Deepest command matched
    pub command: &'a Command,
    /// Number of path elements that name `command`
    pub depth: usize,
}

/// The composed command tree.
///
/// Field order is drop order: entries (and the plugin code they reference)
/// go before the modules that keep that code mapped.
#[derive(Debug, Default)]
pub struct CommandTree {
    entries: Vec<ComposedCommand>,
    index: HashMap<String, usize>,
    conflicts: Vec<PluginHostError>,
    load_errors: Vec<ModuleError>,
    _modules: Vec<LoadedModule>,
}

impl CommandTree {
    /// Merge host commands and plugin commands.
    ///
    /// Host commands go in first, then plugin commands in the order given.
    /// The first command registered under a top-level name keeps it; later
    /// ones are rejected and recorded in [`CommandTree::conflicts`]. Names in
    /// [`RESERVED_NAMES`] and empty names are treated as already taken, and
    /// commands the parser could not represent are rejected the same way.
    pub fn compose(host: Vec<Command>, plugins: Vec<PluginCommand>) -> Self {
        let mut tree = Self::default();
        for command in host {
            tree.insert(CommandSource::Host, command);
        }
        for PluginCommand { plugin, command } in plugins {
            tree.insert(CommandSource::Plugin(plugin), command);
        }
        tree
    }

    /// Compose from a load pass, taking ownership of its modules and errors
    pub fn from_load(host: Vec<Command>, report: LoadReport) -> Self {
        let LoadReport {
            commands,
            modules,
            errors,
        } = report;
        let mut tree = Self::compose(host, commands);
        tree.load_errors = errors;
        tree._modules = modules;
        tree
    }

    fn insert(&mut self, source: CommandSource, command: Command) {
        if let Some(err) = self.rejection(&source, &command) {
            tracing::warn!(error = %err, "Command rejected");
            self.conflicts.push(err);
            return;
        }

        tracing::trace!(command = %command.name, source = %source, "Command composed");
        self.index.insert(command.name.clone(), self.entries.len());
        self.entries.push(ComposedCommand { source, command });
    }

    fn rejection(&self, source: &CommandSource, command: &Command) -> Option<PluginHostError> {
        let reserved = command.name.is_empty() || RESERVED_NAMES.contains(&command.name.as_str());
        let existing = if reserved {
            Some("a name reserved by the command line".to_string())
        } else {
            self.index
                .get(&command.name)
                .map(|&i| self.entries[i].source.to_string())
        };
        if let Some(existing) = existing {
            return Some(PluginHostError::CommandConflict {
                command: command.name.clone(),
                plugin: source_name(source),
                existing,
            });
        }

        check_shape(command, &command.name)
            .err()
            .map(|reason| PluginHostError::MalformedCommand {
                command: command.name.clone(),
                plugin: source_name(source),
                reason,
            })
    }

    /// Top-level command by name
    pub fn get(&self, name: &str) -> Option<&ComposedCommand> {
        self.index.get(name).map(|&i| &self.entries[i])
    }

    /// Top-level commands in composition order
    pub fn iter(&self) -> impl Iterator<Item = &ComposedCommand> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Commands rejected because their name was taken or reserved, or
    /// because their definition is malformed
    pub fn conflicts(&self) -> &[PluginHostError] {
        &self.conflicts
    }

    /// Failures from the load pass this tree was built from
    pub fn load_errors(&self) -> &[ModuleError] {
        &self.load_errors
    }

    /// Find the longest command path matching `path`.
    ///
    /// Given `["docker", "stop", "web"]` this resolves to the `stop`
    /// sub-command with depth 2; `"web"` is left over as an argument.
    pub fn resolve(&self, path: &[String]) -> Option<Resolution<'_>> {
        let (first, rest) = path.split_first()?;
        let entry = self.get(first)?;

        let mut command = &entry.command;
        let mut depth = 1;
        for segment in rest {
            match command.find_subcommand(segment) {
                Some(sub) => {
                    command = sub;
                    depth += 1;
                }
                None => break,
            }
        }

        Some(Resolution {
            entry,
            command,
            depth,
        })
    }

    /// Resolve `path` and run the matched command.
    ///
    /// Path elements past the matched command are prepended to the
    /// positional arguments, unless the command only groups sub-commands;
    /// then the first of them names an unknown sub-command. Host commands run against `store`; plugin
    /// commands get a [`CommandContext`] scoped to their plugin.
    pub fn dispatch(
        &self,
        path: &[String],
        mut args: CommandArgs,
        store: &mut RegistryStore,
    ) -> Result<CommandOutput, PluginHostError> {
        let resolved = self
            .resolve(path)
            .ok_or_else(|| PluginHostError::UnknownCommand(path.join(" ")))?;

        if resolved.depth < path.len() {
            // a group that only routes has no arguments to absorb the rest
            if !resolved.command.subcommands.is_empty() && !resolved.command.has_action() {
                return Err(PluginHostError::UnknownCommand(
                    path[..=resolved.depth].join(" "),
                ));
            }
            let mut positional = path[resolved.depth..].to_vec();
            positional.append(&mut args.args);
            args.args = positional;
        }

        let matched = &path[..resolved.depth];
        tracing::debug!(command = %matched.join(" "), source = %resolved.entry.source, "Dispatching");

        match &resolved.entry.source {
            CommandSource::Host => builtin::execute(matched, &args, store),
            CommandSource::Plugin(plugin) => {
                let mut ctx = CommandContext::new(plugin.clone(), store);
                let result =
                    std::panic::catch_unwind(AssertUnwindSafe(|| resolved.command.invoke(&args, &mut ctx)))
                        .map_err(|_| {
                            PluginError::command(format!(
                                "plugin '{}' panicked while running '{}'",
                                plugin,
                                matched.join(" ")
                            ))
                        })?;
                Ok(result?)
            }
        }
    }
}

/// Reject definitions the parser would refuse at startup: reserved or
/// repeated names at any depth, and required positionals after optional ones.
fn check_shape(command: &Command, path: &str) -> Result<(), String> {
    let mut arg_names = HashSet::new();
    let mut shorts = HashSet::new();
    let mut optional_seen = false;

    for arg in &command.args {
        if arg.name.is_empty() || RESERVED_ARGS.contains(&arg.name.as_str()) {
            return Err(format!("'{}' uses reserved argument name '{}'", path, arg.name));
        }
        if !arg_names.insert(arg.name.as_str()) {
            return Err(format!("'{}' defines argument '{}' twice", path, arg.name));
        }
        match arg.kind {
            ArgKind::Positional => {
                if arg.required && optional_seen {
                    return Err(format!(
                        "'{}' has required argument '{}' after an optional one",
                        path, arg.name
                    ));
                }
                optional_seen |= !arg.required;
            }
            ArgKind::Flag | ArgKind::Switch => {
                if let Some(short) = arg.short {
                    if RESERVED_SHORTS.contains(&short) || !shorts.insert(short) {
                        return Err(format!(
                            "'{}' cannot use short alias '-{}' for '{}'",
                            path, short, arg.name
                        ));
                    }
                }
            }
        }
    }

    let mut sub_names = HashSet::new();
    for sub in &command.subcommands {
        let sub_path = format!("{} {}", path, sub.name);
        if sub.name.is_empty() || RESERVED_NAMES.contains(&sub.name.as_str()) {
            return Err(format!("'{}' uses a reserved name", sub_path));
        }
        if !sub_names.insert(sub.name.as_str()) {
            return Err(format!("'{}' is defined twice", sub_path));
        }
        check_shape(sub, &sub_path)?;
    }
    Ok(())
}

fn source_name(source: &CommandSource) -> String {
    match source {
        CommandSource::Host => "host".to_string(),
        CommandSource::Plugin(name) => name.clone(),
    }
}
