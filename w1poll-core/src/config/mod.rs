//! Configuration management for `w1poll`
//!
//! This module provides the `ConfigManager` for loading and saving the
//! poller settings in TOML format.

mod manager;
pub mod settings;

pub use manager::{CONFIG_DIR_ENV, CONFIG_FILE_NAME, ConfigManager, expand_path};
pub use settings::{
    DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_HEARTBEAT_SECS, DEFAULT_INTERVAL_SECS, DebugLevel,
    LoggingSettings, PollerSettings, PollingSettings, RegistrySettings, RemoteSettings,
};
