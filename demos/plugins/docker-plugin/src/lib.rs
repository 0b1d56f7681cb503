//! Docker Plugin - An example plugin for support
//!
//! Contributes a `docker` command that shells out to the docker CLI:
//!
//! - `support docker list` - running containers (`docker ps`)
//! - `support docker stop <container>` - stop a container
//! - `support docker configure --host <HOST>` - remember the daemon address
//!
//! ## Building
//!
//! ```bash
//! cargo build --release
//! ```
//!
//! ## Installing
//!
//! ```bash
//! support plugins register ~/.config/support/plugins
//! cp target/release/libdocker_plugin.so ~/.config/support/plugins/
//! support plugins enable docker
//! ```

use std::process::Command as Process;

use support_plugin_api::{
    ArgSpec, Command, CommandContext, CommandOutput, CommandResult, Plugin, PluginError,
    export_plugin,
};

const HOST_SETTING: &str = "host";

#[derive(Default)]
pub struct DockerPlugin;

impl Plugin for DockerPlugin {
    fn name(&self) -> &str {
        "docker"
    }

    fn commands(&self) -> Vec<Command> {
        vec![
            Command::new("docker", "Manage Docker containers")
                .subcommand(
                    Command::new("list", "List all running Docker containers")
                        .action(|_, ctx| docker(ctx, &["ps"])),
                )
                .subcommand(
                    Command::new("stop", "Stop a Docker container")
                        .arg(ArgSpec::positional("container", "Container ID or name"))
                        .action(|args, ctx| {
                            let container = args.required_arg(0, "container")?;
                            docker(ctx, &["stop", container])
                        }),
                )
                .subcommand(
                    Command::new("configure", "Set the Docker daemon address")
                        .arg(
                            ArgSpec::flag("host", "Daemon address, e.g. tcp://10.0.0.5:2375")
                                .short('H')
                                .required(),
                        )
                        .action(|args, ctx| {
                            let host = args.required_flag("host")?;
                            ctx.put_setting(HOST_SETTING, host)?;
                            Ok(CommandOutput::Text(format!("Docker host set to {}", host)))
                        }),
                ),
        ]
    }
}

/// Run the docker CLI, pointing it at the configured daemon if there is one
fn docker(ctx: &mut CommandContext<'_>, args: &[&str]) -> CommandResult {
    let mut process = Process::new("docker");
    if let Some(host) = ctx.setting(HOST_SETTING).and_then(|v| v.as_str().map(String::from)) {
        ctx.log_debug(&format!("Using docker host {}", host));
        process.args(["--host", &host]);
    }

    let output = process
        .args(args)
        .output()
        .map_err(|e| PluginError::command(format!("failed to run docker: {}", e)))?;

    if !output.status.success() {
        return Err(PluginError::command(format!(
            "docker {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(CommandOutput::Text(
        String::from_utf8_lossy(&output.stdout).trim_end().to_string(),
    ))
}

export_plugin!(DockerPlugin);
