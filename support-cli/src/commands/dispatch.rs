//! Turn clap matches back into a command path and its arguments

use clap::ArgMatches;
use support_core::CommandTree;
use support_plugin_api::{ArgKind, Command, CommandArgs};

/// The command the user invoked
#[derive(Debug)]
pub struct Invocation {
    /// Command path, e.g. `["plugins", "enable"]`
    pub path: Vec<String>,
    pub args: CommandArgs,
}

/// Walk the matched sub-commands down the tree and collect the arguments of
/// the deepest one. `None` when no sub-command was given.
pub fn invocation(tree: &CommandTree, matches: &ArgMatches) -> Option<Invocation> {
    let (name, mut current) = matches.subcommand()?;
    let mut command = &tree.get(name)?.command;
    let mut path = vec![name.to_string()];

    while let Some((name, sub)) = current.subcommand() {
        let Some(next) = command.find_subcommand(name) else {
            break;
        };
        command = next;
        path.push(name.to_string());
        current = sub;
    }

    Some(Invocation {
        path,
        args: collect_args(command, current),
    })
}

fn collect_args(command: &Command, matches: &ArgMatches) -> CommandArgs {
    let mut args = CommandArgs::default();
    for spec in &command.args {
        match spec.kind {
            ArgKind::Positional => {
                if let Some(value) = matches.get_one::<String>(&spec.name) {
                    args.args.push(value.clone());
                }
            }
            ArgKind::Flag => {
                if let Some(value) = matches.get_one::<String>(&spec.name) {
                    args.flags.insert(spec.name.clone(), value.clone());
                }
            }
            ArgKind::Switch => {
                if matches.get_flag(&spec.name) {
                    args.flags.insert(spec.name.clone(), "true".to_string());
                }
            }
        }
    }
    args
}
