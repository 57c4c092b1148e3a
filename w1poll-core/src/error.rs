//! Error types for `w1poll`
//!
//! Each concern owns its error enum; [`W1PollError`] wraps them for callers
//! that deal with several at once (the CLI host mostly).

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading, validating or saving configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read or write the configuration file
    #[error("Failed to access config file {path}: {source}")]
    Io {
        /// Path of the file involved
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for our schema
    #[error("Failed to parse config: {0}")]
    Parse(String),

    /// Failed to serialize configuration
    #[error("Failed to serialize config: {0}")]
    Serialize(String),

    /// A field has an invalid value
    #[error("Invalid value for '{field}': {reason}")]
    Validation {
        /// Name of the offending field
        field: String,
        /// Human-readable reason
        reason: String,
    },

    /// No configuration directory could be determined
    #[error("Could not determine configuration directory")]
    NoConfigDir,
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised when starting a remote fetch
#[derive(Debug, Error)]
pub enum FetchError {
    /// The external process could not be spawned
    #[error("Failed to spawn '{program}': {source}")]
    Spawn {
        /// Program that failed to start
        program: String,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Spawning requires a tokio runtime and none is active
    #[error("No async runtime available to watch the fetch process")]
    NoRuntime,

    /// The fetch configuration cannot produce a command
    #[error("Invalid fetch configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for fetch operations
pub type FetchResult<T> = Result<T, FetchError>;

/// Errors raised by a device registry
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A device already occupies the requested unit
    #[error("Unit {0} is already in use")]
    UnitInUse(u32),

    /// No device occupies the given unit
    #[error("No device with unit {0}")]
    UnknownUnit(u32),

    /// Unit numbers start at 1
    #[error("Unit number must be positive")]
    InvalidUnit,

    /// A device with this external ID already exists
    #[error("Device '{0}' already exists")]
    DuplicateDevice(String),

    /// Failed to read or write the registry file
    #[error("Registry storage error at {path}: {source}")]
    Io {
        /// Registry file path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Registry file contents are not valid
    #[error("Failed to decode registry: {0}")]
    Decode(String),
}

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Top-level error for `w1poll`
#[derive(Debug, Error)]
pub enum W1PollError {
    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Fetch error
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Registry error
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
