//! Poller settings stored in `config.toml`
//!
//! ```toml
//! [remote]
//! target = "pi@10.0.0.51"
//! identity_file = "~/.ssh/id_ed25519"
//!
//! [polling]
//! interval_secs = 60
//!
//! [logging]
//! debug = "basic"
//! ```

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Default polling interval between fetches (seconds)
pub const DEFAULT_INTERVAL_SECS: u64 = 60;

/// Default heartbeat period driving the scheduler (seconds)
pub const DEFAULT_HEARTBEAT_SECS: u64 = 10;

/// Default hard timeout for a single remote fetch (seconds)
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 60;

/// Default registry file name, relative to the config directory
pub const DEFAULT_REGISTRY_FILE: &str = "devices.json";

/// Top-level settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollerSettings {
    /// How to reach the remote host
    #[serde(default)]
    pub remote: RemoteSettings,
    /// Timing of the poll cycle
    #[serde(default)]
    pub polling: PollingSettings,
    /// Logging verbosity
    #[serde(default)]
    pub logging: LoggingSettings,
    /// Where the device registry is stored
    #[serde(default)]
    pub registry: RegistrySettings,
}

impl PollerSettings {
    /// Validates the settings
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] for an empty or malformed target.
    pub fn validate(&self) -> ConfigResult<()> {
        let target = self.remote.target.trim();
        if target.is_empty() {
            return Err(ConfigError::Validation {
                field: "remote.target".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if target.chars().any(char::is_whitespace) {
            return Err(ConfigError::Validation {
                field: "remote.target".to_string(),
                reason: format!("'{target}' must not contain whitespace"),
            });
        }
        if target.starts_with('-') {
            return Err(ConfigError::Validation {
                field: "remote.target".to_string(),
                reason: format!("'{target}' must not start with '-'"),
            });
        }
        if self.remote.port == Some(0) {
            return Err(ConfigError::Validation {
                field: "remote.port".to_string(),
                reason: "must be between 1 and 65535".to_string(),
            });
        }
        Ok(())
    }
}

/// Remote host access
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSettings {
    /// SSH destination, `user@host`
    #[serde(default)]
    pub target: String,
    /// Password fed through `sshpass`; takes precedence over `identity_file`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Private key passed to `ssh -i`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_file: Option<String>,
    /// SSH port when not 22
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

impl RemoteSettings {
    /// Returns the password if one is configured and non-empty
    #[must_use]
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref().filter(|p| !p.is_empty())
    }

    /// Returns the identity file if one is configured and non-empty
    #[must_use]
    pub fn identity_file(&self) -> Option<&str> {
        self.identity_file.as_deref().filter(|p| !p.trim().is_empty())
    }
}

impl fmt::Debug for RemoteSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteSettings")
            .field("target", &self.target)
            .field("password", &self.password().map(|_| "[REDACTED]"))
            .field("identity_file", &self.identity_file)
            .field("port", &self.port)
            .finish()
    }
}

/// Timing of the poll cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollingSettings {
    /// Seconds between the starts of two fetches (minimum 1, default 60)
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Seconds between scheduler ticks (minimum 1, default 10)
    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_secs: u64,
    /// Seconds before a fetch is killed (minimum 1, default 60)
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

const fn default_interval_secs() -> u64 {
    DEFAULT_INTERVAL_SECS
}

const fn default_heartbeat_secs() -> u64 {
    DEFAULT_HEARTBEAT_SECS
}

const fn default_fetch_timeout_secs() -> u64 {
    DEFAULT_FETCH_TIMEOUT_SECS
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_INTERVAL_SECS,
            heartbeat_secs: DEFAULT_HEARTBEAT_SECS,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
        }
    }
}

impl PollingSettings {
    /// Returns the polling interval, never below one second
    #[must_use]
    pub const fn effective_interval_secs(&self) -> u64 {
        if self.interval_secs == 0 {
            1
        } else {
            self.interval_secs
        }
    }

    /// Returns the heartbeat period, never below one second
    #[must_use]
    pub const fn effective_heartbeat_secs(&self) -> u64 {
        if self.heartbeat_secs == 0 {
            1
        } else {
            self.heartbeat_secs
        }
    }

    /// Returns the fetch timeout, never below one second
    #[must_use]
    pub const fn effective_fetch_timeout_secs(&self) -> u64 {
        if self.fetch_timeout_secs == 0 {
            1
        } else {
            self.fetch_timeout_secs
        }
    }
}

/// Logging verbosity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Debug level
    #[serde(default)]
    pub debug: DebugLevel,
}

/// Device registry location
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySettings {
    /// Registry file; relative paths resolve against the config directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Debug verbosity levels
///
/// The numeric codes are the bit masks older installations stored; they are
/// still accepted when parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "RawDebugLevel")]
pub enum DebugLevel {
    /// No debug output
    #[default]
    None,
    /// Debug output from the poller itself only
    Minimal,
    /// Basic debugging
    Basic,
    /// Basic debugging plus parsed remote lines
    BasicMessages,
    /// Remote connection handling only
    ConnectionsOnly,
    /// Remote connections plus the poll scheduler
    ConnectionsQueue,
    /// Everything
    All,
}

impl DebugLevel {
    /// All levels in display order
    pub const ALL: [Self; 7] = [
        Self::None,
        Self::Minimal,
        Self::Basic,
        Self::BasicMessages,
        Self::ConnectionsOnly,
        Self::ConnectionsQueue,
        Self::All,
    ];

    /// Returns the legacy numeric code for this level
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::None => 0,
            Self::Minimal => 2,
            Self::Basic => 62,
            Self::BasicMessages => 126,
            Self::ConnectionsOnly => 16,
            Self::ConnectionsQueue => 144,
            Self::All => -1,
        }
    }

    /// Looks up a level by its legacy numeric code
    #[must_use]
    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|level| level.code() == code)
    }

    /// Returns true when any debug output is enabled
    #[must_use]
    pub const fn is_enabled(self) -> bool {
        !matches!(self, Self::None)
    }

    /// Human-readable label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Minimal => "Minimal",
            Self::Basic => "Basic Debugging",
            Self::BasicMessages => "Basic+Messages",
            Self::ConnectionsOnly => "Connections Only",
            Self::ConnectionsQueue => "Connections+Queue",
            Self::All => "All",
        }
    }
}

impl FromStr for DebugLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || ConfigError::Validation {
            field: "logging.debug".to_string(),
            reason: format!("unknown debug level '{s}'"),
        };
        if let Ok(code) = s.trim().parse::<i32>() {
            return Self::from_code(code).ok_or_else(unknown);
        }
        let normalized = s.trim().to_lowercase().replace(['-', '+', ' '], "_");
        match normalized.as_str() {
            "none" | "off" => Ok(Self::None),
            "minimal" => Ok(Self::Minimal),
            "basic" | "basic_debugging" => Ok(Self::Basic),
            "basic_messages" => Ok(Self::BasicMessages),
            "connections_only" | "connections" => Ok(Self::ConnectionsOnly),
            "connections_queue" => Ok(Self::ConnectionsQueue),
            "all" => Ok(Self::All),
            _ => Err(unknown()),
        }
    }
}

/// Debug level as written in a config file: a name or a legacy code
#[derive(Deserialize)]
#[serde(untagged)]
enum RawDebugLevel {
    Code(i32),
    Name(String),
}

impl TryFrom<RawDebugLevel> for DebugLevel {
    type Error = ConfigError;

    fn try_from(raw: RawDebugLevel) -> Result<Self, Self::Error> {
        match raw {
            RawDebugLevel::Code(code) => Self::from_code(code).ok_or(ConfigError::Validation {
                field: "logging.debug".to_string(),
                reason: format!("unknown debug level code {code}"),
            }),
            RawDebugLevel::Name(name) => name.parse(),
        }
    }
}

impl fmt::Display for DebugLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::Minimal => "minimal",
            Self::Basic => "basic",
            Self::BasicMessages => "basic_messages",
            Self::ConnectionsOnly => "connections_only",
            Self::ConnectionsQueue => "connections_queue",
            Self::All => "all",
        };
        f.write_str(name)
    }
}
