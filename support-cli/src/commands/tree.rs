//! Build the clap parser from the composed command tree

use clap::{Arg, ArgAction};
use support_core::CommandTree;
use support_plugin_api::{ArgKind, ArgSpec, Command};

/// Root parser: global options plus one sub-command per tree entry
pub fn build_cli(tree: &CommandTree) -> clap::Command {
    let mut cli = clap::Command::new("support")
        .about("Plugin-extensible command host")
        .version(env!("CARGO_PKG_VERSION"))
        .propagate_version(true)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .global(true)
                .help("Verbose output"),
        )
        .arg(
            Arg::new("registry")
                .long("registry")
                .value_name("PATH")
                .global(true)
                .help("Registry document to use instead of the default location"),
        );

    for entry in tree.iter() {
        cli = cli.subcommand(to_clap(&entry.command));
    }
    cli
}

fn to_clap(command: &Command) -> clap::Command {
    let mut cmd = clap::Command::new(command.name.clone()).about(command.usage.clone());

    for spec in &command.args {
        cmd = cmd.arg(to_arg(spec));
    }
    for sub in &command.subcommands {
        cmd = cmd.subcommand(to_clap(sub));
    }
    if !command.subcommands.is_empty() && !command.has_action() {
        cmd = cmd.subcommand_required(true).arg_required_else_help(true);
    }
    cmd
}

fn to_arg(spec: &ArgSpec) -> Arg {
    let arg = Arg::new(spec.name.clone()).help(spec.description.clone());
    let arg = match spec.kind {
        ArgKind::Positional => arg.required(spec.required).action(ArgAction::Set),
        ArgKind::Flag => arg
            .long(spec.name.clone())
            .value_name(spec.name.to_uppercase())
            .required(spec.required)
            .action(ArgAction::Set),
        ArgKind::Switch => arg.long(spec.name.clone()).action(ArgAction::SetTrue),
    };
    match (spec.kind, spec.short) {
        (ArgKind::Positional, _) | (_, None) => arg,
        (_, Some(short)) => arg.short(short),
    }
}
