//! Host commands for managing the plugin registry
//!
//! `support plugins register <path> | enable <name> | disable <name> | list`

use std::path::Path;

use support_plugin_api::{ArgSpec, Command, CommandArgs, CommandOutput, PluginError};

use super::error::PluginHostError;
use super::store::{Registration, RegistryStore};

/// Name of the top-level registry command
pub const PLUGINS_COMMAND: &str = "plugins";

/// Commands compiled into the host.
///
/// These carry no actions; the tree routes them to [`execute`] with the
/// registry store.
pub fn host_commands() -> Vec<Command> {
    vec![
        Command::new(PLUGINS_COMMAND, "Manage plugins")
            .subcommand(
                Command::new("register", "Register a plugin directory")
                    .arg(ArgSpec::positional("path", "Directory to search for plugin modules")),
            )
            .subcommand(
                Command::new("enable", "Enable a plugin")
                    .arg(ArgSpec::positional("name", "Plugin name")),
            )
            .subcommand(
                Command::new("disable", "Disable a plugin")
                    .arg(ArgSpec::positional("name", "Plugin name")),
            )
            .subcommand(
                Command::new("list", "List all plugins")
                    .arg(ArgSpec::switch("json", "Print the enablement map as JSON")),
            ),
    ]
}

/// Run a host command.
///
/// `path` is the matched command path, e.g. `["plugins", "enable"]`.
pub fn execute(
    path: &[String],
    args: &CommandArgs,
    store: &mut RegistryStore,
) -> Result<CommandOutput, PluginHostError> {
    let path: Vec<&str> = path.iter().map(String::as_str).collect();
    match path.as_slice() {
        [PLUGINS_COMMAND, "register"] => register(store, args.required_arg(0, "path")?),
        [PLUGINS_COMMAND, "enable"] => enable(store, args.required_arg(0, "name")?),
        [PLUGINS_COMMAND, "disable"] => disable(store, args.required_arg(0, "name")?),
        [PLUGINS_COMMAND, "list"] => list(store, args.switch("json")),
        [PLUGINS_COMMAND] => Err(PluginError::SubcommandRequired(PLUGINS_COMMAND.to_string()).into()),
        other => Err(PluginHostError::UnknownCommand(other.join(" "))),
    }
}

fn register(store: &mut RegistryStore, path: &str) -> Result<CommandOutput, PluginHostError> {
    // stored absolute so later invocations from another cwd find it
    let path = std::path::absolute(Path::new(path))?;
    let path = path.as_path();
    let message = match store.register_directory(path)? {
        Registration::Added => format!("Registered plugin directory: {}", path.display()),
        Registration::AlreadyRegistered => {
            format!("Plugin directory already registered: {}", path.display())
        }
    };
    Ok(CommandOutput::Text(message))
}

fn enable(store: &mut RegistryStore, name: &str) -> Result<CommandOutput, PluginHostError> {
    let module = store.enable(name)?;
    Ok(CommandOutput::Text(format!(
        "Enabled plugin: {} ({})\nIts commands are available from the next invocation.",
        name,
        module.display()
    )))
}

fn disable(store: &mut RegistryStore, name: &str) -> Result<CommandOutput, PluginHostError> {
    store.disable(name)?;
    Ok(CommandOutput::Text(format!("Disabled plugin: {}", name)))
}

fn list(store: &RegistryStore, json: bool) -> Result<CommandOutput, PluginHostError> {
    let enabled = store.list();

    if json {
        let rendered = serde_json::to_string_pretty(enabled)
            .map_err(|e| PluginHostError::Registry(e.to_string()))?;
        return Ok(CommandOutput::Text(rendered));
    }

    if enabled.is_empty() {
        let dirs = store.registry().plugin_dirs();
        let mut text = String::from("No plugins known\n\n");
        if let Some(reason) = store.unreadable() {
            text.push_str(&format!(
                "Registry {} could not be read: {}\nRepair or remove it, then try again.\n\n",
                store.path().display(),
                reason
            ));
        }
        if dirs.is_empty() {
            text.push_str("No plugin directories registered.\n\n");
        } else {
            text.push_str("Plugin directories:\n");
            for dir in dirs {
                text.push_str(&format!("  {}\n", dir.display()));
            }
            text.push('\n');
        }
        text.push_str("To add a plugin:\n");
        text.push_str(&format!(
            "  1. Register a directory: support plugins register {}\n",
            support_paths::default_plugin_dir().display()
        ));
        text.push_str("  2. Copy the plugin library into it\n");
        text.push_str("  3. Enable the plugin: support plugins enable <name>");
        return Ok(CommandOutput::Text(text));
    }

    Ok(CommandOutput::Table {
        headers: vec!["Plugin".to_string(), "Enabled".to_string()],
        rows: enabled
            .iter()
            .map(|(name, on)| vec![name.clone(), on.to_string()])
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn path(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    fn store(dir: &TempDir) -> RegistryStore {
        RegistryStore::open(dir.path().join("registry.toml")).unwrap()
    }

    fn text(output: CommandOutput) -> String {
        match output {
            CommandOutput::Text(t) => t,
            other => panic!("expected text, got {:?}", other),
        }
    }

    #[test]
    fn test_host_commands_shape() {
        let commands = host_commands();
        assert_eq!(commands.len(), 1);

        let plugins = &commands[0];
        let names: Vec<&str> = plugins.subcommands.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["register", "enable", "disable", "list"]);
        assert!(plugins.find_subcommand("list").unwrap().args[0].name == "json");
    }

    #[test]
    fn test_register_twice_reports_existing() {
        let dir = TempDir::new().unwrap();
        let mut store = store(&dir);
        let plugins = dir.path().join("plugins");
        let args = CommandArgs::new(vec![plugins.display().to_string()]);

        let first = text(execute(&path(&["plugins", "register"]), &args, &mut store).unwrap());
        assert!(first.starts_with("Registered"));

        let second = text(execute(&path(&["plugins", "register"]), &args, &mut store).unwrap());
        assert!(second.contains("already registered"));
        assert_eq!(store.registry().plugin_dirs().len(), 1);
    }

    #[test]
    fn test_enable_missing_plugin_fails() {
        let dir = TempDir::new().unwrap();
        let mut store = store(&dir);

        let err = execute(
            &path(&["plugins", "enable"]),
            &CommandArgs::new(vec!["ghost".into()]),
            &mut store,
        )
        .unwrap_err();
        assert!(matches!(err, PluginHostError::PluginNotFound { .. }));
        assert!(store.list().is_empty());
    }

    #[test]
    fn test_missing_argument_is_reported() {
        let dir = TempDir::new().unwrap();
        let mut store = store(&dir);

        let err = execute(&path(&["plugins", "disable"]), &CommandArgs::default(), &mut store)
            .unwrap_err();
        assert!(err.to_string().contains("name"));
    }

    #[test]
    fn test_list_renders_table_and_json() {
        let dir = TempDir::new().unwrap();
        let mut store = store(&dir);
        store.disable("zeta").unwrap();
        store.disable("alpha").unwrap();

        let out = execute(&path(&["plugins", "list"]), &CommandArgs::default(), &mut store).unwrap();
        assert_eq!(
            out,
            CommandOutput::Table {
                headers: vec!["Plugin".into(), "Enabled".into()],
                rows: vec![
                    vec!["alpha".into(), "false".into()],
                    vec!["zeta".into(), "false".into()],
                ],
            }
        );

        let json = text(
            execute(
                &path(&["plugins", "list"]),
                &CommandArgs::default().with_flag("json", "true"),
                &mut store,
            )
            .unwrap(),
        );
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["alpha"], serde_json::Value::Bool(false));
    }

    #[test]
    fn test_list_empty_explains_next_steps() {
        let dir = TempDir::new().unwrap();
        let mut store = store(&dir);

        let out = text(execute(&path(&["plugins", "list"]), &CommandArgs::default(), &mut store).unwrap());
        assert!(out.contains("No plugins known"));
        assert!(out.contains("support plugins register"));
    }

    #[test]
    fn test_list_works_on_unreadable_registry() {
        let dir = TempDir::new().unwrap();
        let doc = dir.path().join("registry.toml");
        std::fs::write(&doc, "enabled = {").unwrap();
        let mut store = RegistryStore::open_or_empty(&doc);

        let out = text(execute(&path(&["plugins", "list"]), &CommandArgs::default(), &mut store).unwrap());
        assert!(out.contains("No plugins known"));
        assert!(out.contains("could not be read"));

        let err = execute(
            &path(&["plugins", "register"]),
            &CommandArgs::new(vec![dir.path().join("plugins").display().to_string()]),
            &mut store,
        )
        .unwrap_err();
        assert!(matches!(err, PluginHostError::RegistryUnreadable { .. }));
        assert_eq!(std::fs::read_to_string(&doc).unwrap(), "enabled = {");
    }

    #[test]
    fn test_group_and_unknown_paths() {
        let dir = TempDir::new().unwrap();
        let mut store = store(&dir);

        let err = execute(&path(&["plugins"]), &CommandArgs::default(), &mut store).unwrap_err();
        assert!(matches!(
            err,
            PluginHostError::Command(PluginError::SubcommandRequired(_))
        ));

        let err = execute(&path(&["plugins", "upgrade"]), &CommandArgs::default(), &mut store)
            .unwrap_err();
        assert!(matches!(err, PluginHostError::UnknownCommand(_)));
    }
}
