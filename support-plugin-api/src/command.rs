//! CLI command types shared by the host and plugins

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::context::CommandContext;
use crate::error::PluginError;

/// Result of running a command action
pub type CommandResult = Result<CommandOutput, PluginError>;

/// Action bound to a command.
///
/// Receives the parsed arguments and a context scoped to the plugin that
/// owns the command.
pub type Action = Arc<dyn Fn(&CommandArgs, &mut CommandContext<'_>) -> CommandResult + Send + Sync>;

/// How an argument is supplied on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    /// Bare value, matched by position
    Positional,
    /// `--name <value>` option
    Flag,
    /// `--name` on its own; present or absent
    Switch,
}

/// Specification for a command argument
#[derive(Debug, Clone)]
pub struct ArgSpec {
    /// Argument name
    pub name: String,
    /// Description for help text
    pub description: String,
    /// Whether this argument is required
    pub required: bool,
    /// Positional or flag
    pub kind: ArgKind,
    /// Optional short alias for flags (`-t`)
    pub short: Option<char>,
}

impl ArgSpec {
    /// A required positional argument
    pub fn positional(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required: true,
            kind: ArgKind::Positional,
            short: None,
        }
    }

    /// An optional `--name <value>` flag
    pub fn flag(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required: false,
            kind: ArgKind::Flag,
            short: None,
        }
    }

    /// A boolean `--name` switch
    pub fn switch(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: ArgKind::Switch,
            ..Self::flag(name, description)
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn short(mut self, short: char) -> Self {
        self.short = Some(short);
        self
    }
}

/// A named, invokable unit exposed to the user.
///
/// Host commands and plugin-contributed commands share this type. A command
/// either carries an action, or groups sub-commands, or both.
#[derive(Clone)]
pub struct Command {
    /// Name typed on the command line
    pub name: String,
    /// Short description for help text
    pub usage: String,
    /// Argument specifications
    pub args: Vec<ArgSpec>,
    /// Nested commands
    pub subcommands: Vec<Command>,
    action: Option<Action>,
}

impl Command {
    pub fn new(name: impl Into<String>, usage: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            usage: usage.into(),
            args: Vec::new(),
            subcommands: Vec::new(),
            action: None,
        }
    }

    pub fn arg(mut self, arg: ArgSpec) -> Self {
        self.args.push(arg);
        self
    }

    pub fn subcommand(mut self, command: Command) -> Self {
        self.subcommands.push(command);
        self
    }

    /// Bind the action run when this command is invoked
    pub fn action<F>(mut self, action: F) -> Self
    where
        F: Fn(&CommandArgs, &mut CommandContext<'_>) -> CommandResult + Send + Sync + 'static,
    {
        self.action = Some(Arc::new(action));
        self
    }

    pub fn has_action(&self) -> bool {
        self.action.is_some()
    }

    /// Find a direct sub-command by name
    pub fn find_subcommand(&self, name: &str) -> Option<&Command> {
        self.subcommands.iter().find(|c| c.name == name)
    }

    /// Run the bound action.
    ///
    /// Commands without an action are pure groups and report that a
    /// sub-command is needed.
    pub fn invoke(&self, args: &CommandArgs, ctx: &mut CommandContext<'_>) -> CommandResult {
        match &self.action {
            Some(action) => action(args, ctx),
            None => Err(PluginError::SubcommandRequired(self.name.clone())),
        }
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("usage", &self.usage)
            .field("args", &self.args)
            .field("subcommands", &self.subcommands)
            .field("has_action", &self.action.is_some())
            .finish()
    }
}

/// Arguments passed to a command action
#[derive(Debug, Default, Clone)]
pub struct CommandArgs {
    /// Positional arguments, in declaration order
    pub args: Vec<String>,
    /// Named flags (`--flag value`)
    pub flags: HashMap<String, String>,
}

impl CommandArgs {
    pub fn new(args: Vec<String>) -> Self {
        Self {
            args,
            flags: HashMap::new(),
        }
    }

    pub fn with_flag(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.flags.insert(name.into(), value.into());
        self
    }

    /// Positional argument at `index`
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }

    /// Positional argument at `index`, or a [`PluginError::MissingArgument`] naming it
    pub fn required_arg(&self, index: usize, name: &str) -> Result<&str, PluginError> {
        self.arg(index)
            .ok_or_else(|| PluginError::MissingArgument(name.to_string()))
    }

    pub fn flag(&self, name: &str) -> Option<&str> {
        self.flags.get(name).map(String::as_str)
    }

    /// Whether a switch was given
    pub fn switch(&self, name: &str) -> bool {
        self.flag(name).is_some_and(|v| v == "true")
    }

    pub fn required_flag(&self, name: &str) -> Result<&str, PluginError> {
        self.flag(name)
            .ok_or_else(|| PluginError::MissingArgument(format!("--{}", name)))
    }
}

/// Output from a CLI command handler
#[derive(Debug, PartialEq)]
pub enum CommandOutput {
    /// Plain text output (printed as-is)
    Text(String),
    /// Structured data (can be formatted as table, JSON, etc.)
    Table {
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    /// Success with no output
    Success,
    /// Exit with specific code
    Exit(i32),
}
