//! Print the remote fetch command.

use std::path::Path;

use w1poll_core::fetch::FetchConfig;

use crate::error::CliError;
use crate::util::{create_config_manager, load_settings};

/// Command handler printing the fetch invocation with the password redacted
pub fn cmd_command(config_path: Option<&Path>) -> Result<(), CliError> {
    let manager = create_config_manager(config_path)?;
    let settings = load_settings(&manager)?;

    let command = FetchConfig::from_settings(&settings)?.build_command()?;
    println!("{command}");
    if command.uses_sshpass() {
        println!("# password is passed to sshpass through the environment");
    }
    Ok(())
}
