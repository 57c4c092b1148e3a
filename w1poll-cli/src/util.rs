//! Shared utility functions used across command modules.

use std::path::Path;

use w1poll_core::config::{ConfigManager, DebugLevel, PollerSettings};
use w1poll_core::registry::FileRegistry;

use crate::error::CliError;

/// Creates a `ConfigManager` using the optional custom config directory
/// from CLI args.
pub fn create_config_manager(config_path: Option<&Path>) -> Result<ConfigManager, CliError> {
    match config_path {
        Some(path) => Ok(ConfigManager::with_config_dir(path.to_path_buf())),
        None => ConfigManager::new()
            .map_err(|e| CliError::Config(format!("Failed to initialize config: {e}"))),
    }
}

/// Loads settings through the given manager
pub fn load_settings(manager: &ConfigManager) -> Result<PollerSettings, CliError> {
    manager
        .load()
        .map_err(|e| CliError::Config(format!("Failed to load configuration: {e}")))
}

/// Opens the device registry configured in `settings`
pub fn open_registry(
    manager: &ConfigManager,
    settings: &PollerSettings,
) -> Result<FileRegistry, CliError> {
    Ok(FileRegistry::open(manager.registry_path(settings))?)
}

/// Debug level from the configuration, or `none` if it cannot be read
///
/// Runs before logging is set up, so failures are left for the command
/// itself to report.
pub fn configured_debug_level(config_path: Option<&Path>) -> DebugLevel {
    create_config_manager(config_path)
        .and_then(|manager| load_settings(&manager))
        .map(|settings| settings.logging.debug)
        .unwrap_or_default()
}
