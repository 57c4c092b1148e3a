//! CLI error types and exit codes.

use w1poll_core::error::{ConfigError, FetchError, RegistryError, W1PollError};

/// Exit codes for CLI operations
pub mod exit_codes {
    /// General error - configuration, registry, or other non-fetch errors
    pub const GENERAL_ERROR: i32 = 1;
    /// Fetch failure - the remote command could not be run or failed
    pub const FETCH_FAILURE: i32 = 2;
}

/// CLI error type
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Remote fetch failed
    #[error("Fetch failed: {0}")]
    Fetch(String),

    /// Device registry error
    #[error("Registry error: {0}")]
    Registry(String),

    /// Async runtime error
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<FetchError> for CliError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::InvalidConfig(reason) => Self::Config(reason),
            other => Self::Fetch(other.to_string()),
        }
    }
}

impl From<RegistryError> for CliError {
    fn from(err: RegistryError) -> Self {
        Self::Registry(err.to_string())
    }
}

impl From<W1PollError> for CliError {
    fn from(err: W1PollError) -> Self {
        match err {
            W1PollError::Config(e) => e.into(),
            W1PollError::Fetch(e) => e.into(),
            W1PollError::Registry(e) => e.into(),
            W1PollError::Io(e) => Self::Io(e),
        }
    }
}

impl CliError {
    /// Returns the appropriate exit code for this error type.
    ///
    /// Exit codes:
    /// - 0: Success (not an error)
    /// - 1: General error (configuration, registry, runtime, IO)
    /// - 2: Fetch failure
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Fetch(_) => exit_codes::FETCH_FAILURE,
            Self::Config(_) | Self::Registry(_) | Self::Runtime(_) | Self::Io(_) => {
                exit_codes::GENERAL_ERROR
            }
        }
    }
}
