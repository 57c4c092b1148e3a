//! Configuration file commands.

use std::path::Path;

use w1poll_core::config::PollerSettings;

use crate::error::CliError;
use crate::util::{create_config_manager, load_settings};

const REDACTED: &str = "*****";

/// Config init command handler
pub fn cmd_init(
    config_path: Option<&Path>,
    target: Option<&str>,
    force: bool,
) -> Result<(), CliError> {
    let manager = create_config_manager(config_path)?;
    let path = manager.config_path();
    if path.exists() && !force {
        return Err(CliError::Config(format!(
            "{} already exists, use --force to overwrite",
            path.display()
        )));
    }

    let mut settings = PollerSettings::default();
    if let Some(target) = target {
        settings.remote.target = target.trim().to_string();
        settings.validate()?;
    }
    manager.save(&settings)?;
    println!("Wrote {}", path.display());
    if settings.remote.target.is_empty() {
        println!("Set remote.target before running the poller.");
    }
    Ok(())
}

/// Config show command handler
pub fn cmd_show(config_path: Option<&Path>) -> Result<(), CliError> {
    let manager = create_config_manager(config_path)?;
    let mut settings = load_settings(&manager)?;
    if settings.remote.password().is_some() {
        settings.remote.password = Some(REDACTED.to_string());
    }

    let output = toml::to_string_pretty(&settings)
        .map_err(|e| CliError::Config(format!("Failed to serialize configuration: {e}")))?;
    print!("{output}");

    if let Err(e) = settings.validate() {
        eprintln!("Warning: {e}");
    }
    Ok(())
}

/// Config path command handler
pub fn cmd_path(config_path: Option<&Path>) -> Result<(), CliError> {
    let manager = create_config_manager(config_path)?;
    println!("config:   {}", manager.config_path().display());

    // The registry location is configurable, fall back to the default when unreadable
    let settings = load_settings(&manager).unwrap_or_default();
    println!("registry: {}", manager.registry_path(&settings).display());
    Ok(())
}
