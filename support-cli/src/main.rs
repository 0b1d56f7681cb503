use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Result, bail};
use clap::Parser;
use support_core::plugins::builtin;
use support_core::{CommandTree, PluginLoader, RegistryStore};
use tracing_subscriber::EnvFilter;

mod commands;

/// Global options, read before plugins are loaded.
///
/// The full command tree depends on the registry, so only the options
/// needed to find and open it are parsed here. Everything from the first
/// command word on is handed to the composed parser untouched.
#[derive(Parser, Debug)]
#[command(name = "support", disable_help_flag = true, disable_version_flag = true)]
struct Bootstrap {
    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Registry document to use instead of the default location
    #[arg(long, value_name = "PATH")]
    registry: Option<PathBuf>,

    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Open the registry, falling back to an empty one so a broken document
/// never keeps `plugins list` and friends from running
fn open_store(registry: Option<PathBuf>) -> RegistryStore {
    let path = registry.unwrap_or_else(support_paths::registry_path);
    RegistryStore::open_or_empty(path)
}

fn main() -> Result<ExitCode> {
    let bootstrap = Bootstrap::parse();
    init_logging(bootstrap.verbose);

    let mut store = open_store(bootstrap.registry);
    let report = PluginLoader::new().load_all(store.registry());
    let tree = CommandTree::from_load(builtin::host_commands(), report);
    for err in tree.load_errors() {
        tracing::warn!(error = %err, "Plugin skipped");
    }
    tracing::debug!(
        commands = tree.len(),
        conflicts = tree.conflicts().len(),
        load_errors = tree.load_errors().len(),
        "Command tree composed"
    );

    let cli = commands::tree::build_cli(&tree);
    let argv = std::iter::once("support".to_string()).chain(bootstrap.command);
    let matches = match cli.try_get_matches_from(argv) {
        Ok(matches) => matches,
        Err(e) => e.exit(),
    };

    let Some(invocation) = commands::dispatch::invocation(&tree, &matches) else {
        bail!("No command specified");
    };

    let output = tree.dispatch(&invocation.path, invocation.args, &mut store)?;
    Ok(commands::output::render(output))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bootstrap_splits_globals_from_command() {
        let cli = Bootstrap::try_parse_from([
            "support",
            "-v",
            "--registry",
            "/tmp/registry.toml",
            "plugins",
            "list",
            "--json",
        ])
        .unwrap();

        assert!(cli.verbose);
        assert_eq!(cli.registry, Some(PathBuf::from("/tmp/registry.toml")));
        assert_eq!(cli.command, vec!["plugins", "list", "--json"]);
    }

    #[test]
    fn test_bootstrap_without_globals() {
        let cli = Bootstrap::try_parse_from(["support", "docker", "stop", "web"]).unwrap();

        assert!(!cli.verbose);
        assert!(cli.registry.is_none());
        assert_eq!(cli.command, vec!["docker", "stop", "web"]);
    }

    #[test]
    fn test_bootstrap_passes_help_through() {
        let cli = Bootstrap::try_parse_from(["support", "plugins", "--help"]).unwrap();
        assert_eq!(cli.command, vec!["plugins", "--help"]);
    }

    #[test]
    fn test_open_store_creates_registry() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("registry.toml");

        let store = open_store(Some(path.clone()));
        assert_eq!(store.path(), path.as_path());
        assert!(path.exists());
        assert!(store.unreadable().is_none());
    }

    #[test]
    fn test_garbage_registry_still_composes_tree() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("registry.toml");
        std::fs::write(&path, "plugin_dirs = [").unwrap();

        let mut store = open_store(Some(path.clone()));
        assert!(store.unreadable().is_some());

        let report = PluginLoader::new().load_all(store.registry());
        let tree = CommandTree::from_load(builtin::host_commands(), report);
        let matches = commands::tree::build_cli(&tree)
            .try_get_matches_from(["support", "plugins", "list"])
            .unwrap();
        let invocation = commands::dispatch::invocation(&tree, &matches).unwrap();

        let output = tree
            .dispatch(&invocation.path, invocation.args, &mut store)
            .unwrap();
        assert!(matches!(
            output,
            support_plugin_api::CommandOutput::Text(t) if t.contains("could not be read")
        ));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "plugin_dirs = [");
    }
}
