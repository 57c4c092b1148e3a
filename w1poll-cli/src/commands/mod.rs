//! Command handler modules for the CLI.

mod command;
mod config;
mod devices;
mod fetch;
mod run;

use std::path::Path;

use crate::cli::{Commands, ConfigCommands};
use crate::error::CliError;

/// Dispatch a CLI command to the appropriate handler.
pub fn dispatch(config_path: Option<&Path>, command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Run { heartbeat } => run::cmd_run(config_path, heartbeat),
        Commands::Fetch { apply, json } => fetch::cmd_fetch(config_path, apply, json),
        Commands::Devices { json } => devices::cmd_devices(config_path, json),
        Commands::Command => command::cmd_command(config_path),
        Commands::Config(subcmd) => match subcmd {
            ConfigCommands::Init { target, force } => {
                config::cmd_init(config_path, target.as_deref(), force)
            }
            ConfigCommands::Show => config::cmd_show(config_path),
            ConfigCommands::Path => config::cmd_path(config_path),
        },
    }
}

/// Creates the single-threaded runtime the poller runs on
fn create_runtime() -> Result<tokio::runtime::Runtime, CliError> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::Runtime(format!("Failed to create async runtime: {e}")))
}
