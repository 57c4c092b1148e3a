//! Construction of the remote fetch command line
//!
//! Builds `timeout --signal=KILL <secs> ssh ...` (or `sshpass -e ssh ...`
//! for password-authenticated hosts) as a plain value so it can be shown,
//! inspected and tested without spawning anything.

use std::fmt;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use crate::config::{PollerSettings, expand_path};
use crate::error::{ConfigError, ConfigResult};

/// Sysfs directory holding the one-wire bus devices on the remote host
pub const W1_DEVICES_PATH: &str = "/sys/bus/w1/devices";

/// Shell script run on the remote host.
///
/// For every bus device with a `temperature` attribute it prints the device
/// ID without its family prefix, a tab, and the raw milli-degree reading.
/// A device whose attribute cannot be read prints nothing. The short sleep
/// between reads keeps the bus master from being hammered.
pub const REMOTE_SCRIPT: &str = concat!(
    "for i in /sys/bus/w1/devices/*-*; do ",
    "[ -e \"$i/temperature\" ] || continue; ",
    "v=$(cat \"$i/temperature\") || continue; ",
    "printf '%s\\t%s\\n' \"${i##*-}\" \"$v\"; ",
    "sleep 0.1; ",
    "done",
);

/// Wrapper enforcing the hard timeout
const TIMEOUT_PROGRAM: &str = "timeout";

/// SSH connection timeout passed to the client (seconds)
const SSH_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Environment variable `sshpass -e` reads the password from
pub const SSHPASS_ENV: &str = "SSHPASS";

/// How the remote host is authenticated
#[derive(Clone)]
pub enum FetchAuth {
    /// Password fed to `sshpass`
    Password(SecretString),
    /// Key-based login, optionally with an explicit identity file
    Key {
        /// Identity file passed with `-i`
        identity_file: Option<String>,
    },
}

impl fmt::Debug for FetchAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Password(_) => f.write_str("Password([REDACTED])"),
            Self::Key { identity_file } => f
                .debug_struct("Key")
                .field("identity_file", identity_file)
                .finish(),
        }
    }
}

/// Everything needed to build the fetch command
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// SSH destination, `user@host`
    pub target: String,
    /// SSH port when not 22
    pub port: Option<u16>,
    /// Authentication mode
    pub auth: FetchAuth,
    /// Hard wall-clock budget for the whole invocation
    pub timeout: Duration,
}

impl FetchConfig {
    /// Creates a key-authenticated config with the default 60s timeout
    #[must_use]
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            port: None,
            auth: FetchAuth::Key {
                identity_file: None,
            },
            timeout: Duration::from_secs(crate::config::DEFAULT_FETCH_TIMEOUT_SECS),
        }
    }

    /// Sets password authentication
    #[must_use]
    pub fn with_password(mut self, password: SecretString) -> Self {
        self.auth = FetchAuth::Password(password);
        self
    }

    /// Sets key authentication with an identity file
    #[must_use]
    pub fn with_identity_file(mut self, identity_file: impl Into<String>) -> Self {
        self.auth = FetchAuth::Key {
            identity_file: Some(identity_file.into()),
        };
        self
    }

    /// Sets the SSH port
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the hard timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builds a config from validated settings
    ///
    /// A password wins over an identity file when both are set.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the settings are incomplete.
    pub fn from_settings(settings: &PollerSettings) -> ConfigResult<Self> {
        settings.validate()?;
        let remote = &settings.remote;

        let auth = match (remote.password(), remote.identity_file()) {
            (Some(password), identity) => {
                if identity.is_some() {
                    tracing::warn!("Both password and identity file configured, using password");
                }
                FetchAuth::Password(SecretString::from(password.to_string()))
            }
            (None, identity) => FetchAuth::Key {
                identity_file: identity
                    .map(|path| expand_path(path).to_string_lossy().into_owned()),
            },
        };

        Ok(Self {
            target: remote.target.trim().to_string(),
            port: remote.port,
            auth,
            timeout: Duration::from_secs(settings.polling.effective_fetch_timeout_secs()),
        })
    }

    /// Builds the command line for this config
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty target.
    pub fn build_command(&self) -> ConfigResult<FetchCommand> {
        if self.target.is_empty() {
            return Err(ConfigError::Validation {
                field: "remote.target".to_string(),
                reason: "must not be empty".to_string(),
            });
        }

        let mut args = vec![
            "--signal=KILL".to_string(),
            self.timeout.as_secs().max(1).to_string(),
        ];
        let mut env = Vec::new();

        match &self.auth {
            FetchAuth::Password(password) => {
                args.extend(["sshpass".to_string(), "-e".to_string(), "ssh".to_string()]);
                env.push((SSHPASS_ENV.to_string(), password.clone()));
            }
            FetchAuth::Key { .. } => {
                args.extend(["ssh".to_string(), "-o".to_string(), "BatchMode=yes".to_string()]);
            }
        }

        args.extend([
            "-o".to_string(),
            "StrictHostKeyChecking=no".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={SSH_CONNECT_TIMEOUT_SECS}"),
        ]);

        if let Some(port) = self.port.filter(|p| *p != 22) {
            args.push("-p".to_string());
            args.push(port.to_string());
        }

        if let FetchAuth::Key {
            identity_file: Some(identity),
        } = &self.auth
        {
            args.push("-i".to_string());
            args.push(identity.clone());
        }

        args.push(self.target.clone());
        args.push(REMOTE_SCRIPT.to_string());

        Ok(FetchCommand {
            program: TIMEOUT_PROGRAM.to_string(),
            args,
            env,
        })
    }
}

/// A fully built fetch command
#[derive(Clone)]
pub struct FetchCommand {
    /// Program to execute
    pub program: String,
    /// Arguments, in order
    pub args: Vec<String>,
    /// Extra environment variables (values are secret)
    pub env: Vec<(String, SecretString)>,
}

impl FetchCommand {
    /// Returns true when the command authenticates through `sshpass`
    #[must_use]
    pub fn uses_sshpass(&self) -> bool {
        self.args.iter().any(|arg| arg == "sshpass")
    }

    /// Builds a tokio command, exposing the secret environment
    #[must_use]
    pub fn to_tokio_command(&self) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(&self.args);
        for (key, value) in &self.env {
            cmd.env(key, value.expose_secret());
        }
        cmd
    }
}

impl fmt::Debug for FetchCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchCommand")
            .field("program", &self.program)
            .field("args", &self.args)
            .field(
                "env",
                &self.env.iter().map(|(k, _)| k.as_str()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Shell-style rendering with secrets redacted
impl fmt::Display for FetchCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, _) in &self.env {
            write!(f, "{key}=***** ")?;
        }
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", shell_quote(arg))?;
        }
        Ok(())
    }
}

/// Quotes an argument for display in a POSIX shell
fn shell_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_=.,/@:%+".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}
