//! Logging setup
//!
//! Installs a `tracing-subscriber` fmt layer behind an [`EnvFilter`]. The
//! filter is derived from a base [`TracingLevel`] (usually from `-v` flags)
//! combined with the configured [`DebugLevel`], which can raise individual
//! modules above the base.

use std::fmt;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::DebugLevel;

static INSTALLED: AtomicBool = AtomicBool::new(false);

/// Crates whose output the filter controls
const CRATE_TARGETS: [&str; 2] = ["w1poll_core", "w1poll"];

/// Logging setup failures
#[derive(Debug, Error)]
pub enum TracingError {
    /// The filter directives were rejected
    #[error("Invalid log filter '{filter}': {reason}")]
    InvalidFilter {
        /// Directives that failed to parse
        filter: String,
        /// Parser message
        reason: String,
    },

    /// A global subscriber is already installed
    #[error("Logging is already initialized")]
    AlreadyInitialized,

    /// The log file could not be opened
    #[error("Cannot open log file {path}: {source}")]
    LogFile {
        /// Log file path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Level name not recognised
    #[error("Unknown log level '{0}'")]
    UnknownLevel(String),
}

/// Result type for logging setup
pub type TracingResult<T> = Result<T, TracingError>;

/// Base log level, ordered from quietest to noisiest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum TracingLevel {
    /// Errors only
    Error,
    /// Warnings and errors
    Warn,
    /// Normal operation messages
    #[default]
    Info,
    /// Per-cycle detail
    Debug,
    /// Per-line detail
    Trace,
}

impl TracingLevel {
    /// Level for a `-v` count: info by default, `-v` debug, `-vv` trace
    #[must_use]
    pub const fn from_verbosity(count: u8) -> Self {
        match count {
            0 => Self::Info,
            1 => Self::Debug,
            _ => Self::Trace,
        }
    }

    /// Directive name of the level
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

impl FromStr for TracingLevel {
    type Err = TracingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let level = match s.trim().to_ascii_lowercase().as_str() {
            "error" => Self::Error,
            "warn" | "warning" => Self::Warn,
            "info" => Self::Info,
            "debug" => Self::Debug,
            "trace" => Self::Trace,
            _ => return Err(TracingError::UnknownLevel(s.to_string())),
        };
        Ok(level)
    }
}

impl fmt::Display for TracingLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where log lines go
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TracingOutput {
    /// Standard error, keeping stdout for command output
    #[default]
    Stderr,
    /// Appended to a file, without ANSI colours
    File {
        /// Log file path
        path: PathBuf,
    },
}

/// Logging setup parameters
#[derive(Debug, Clone, Default)]
pub struct TracingConfig {
    /// Base level for the `w1poll` crates
    pub level: TracingLevel,
    /// Poller debug level
    pub debug: DebugLevel,
    /// Destination
    pub output: TracingOutput,
    /// Raw directives replacing the computed ones, e.g. from `RUST_LOG`
    pub filter: Option<String>,
}

impl TracingConfig {
    /// Default setup: info level to stderr
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base level
    #[must_use]
    pub const fn with_level(mut self, level: TracingLevel) -> Self {
        self.level = level;
        self
    }

    /// Sets the poller debug level
    #[must_use]
    pub const fn with_debug(mut self, debug: DebugLevel) -> Self {
        self.debug = debug;
        self
    }

    /// Sends output to a file
    #[must_use]
    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = TracingOutput::File { path: path.into() };
        self
    }

    /// Replaces the computed directives
    #[must_use]
    pub fn with_filter(mut self, directives: impl Into<String>) -> Self {
        self.filter = Some(directives.into());
        self
    }

    /// `EnvFilter` directives for this setup
    #[must_use]
    pub fn filter_directives(&self) -> String {
        if let Some(directives) = &self.filter {
            return directives.clone();
        }
        let crate_level = self.level.max(base_level(self.debug));
        let mut directives: Vec<String> = CRATE_TARGETS
            .iter()
            .map(|target| format!("{target}={crate_level}"))
            .collect();
        directives.extend(
            module_overrides(self.debug)
                .iter()
                .filter(|(_, level)| *level > crate_level)
                .map(|(module, level)| format!("w1poll_core::{module}={level}")),
        );
        directives.join(",")
    }

    fn make_writer(&self) -> TracingResult<BoxMakeWriter> {
        match &self.output {
            TracingOutput::Stderr => Ok(BoxMakeWriter::new(std::io::stderr)),
            TracingOutput::File { path } => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(|source| TracingError::LogFile {
                        path: path.clone(),
                        source,
                    })?;
                Ok(BoxMakeWriter::new(Mutex::new(file)))
            }
        }
    }
}

/// Crate-wide level implied by a debug level
const fn base_level(debug: DebugLevel) -> TracingLevel {
    match debug {
        DebugLevel::None
        | DebugLevel::Minimal
        | DebugLevel::ConnectionsOnly
        | DebugLevel::ConnectionsQueue => TracingLevel::Error,
        DebugLevel::Basic | DebugLevel::BasicMessages => TracingLevel::Debug,
        DebugLevel::All => TracingLevel::Trace,
    }
}

/// Per-module levels implied by a debug level
const fn module_overrides(debug: DebugLevel) -> &'static [(&'static str, TracingLevel)] {
    match debug {
        DebugLevel::None | DebugLevel::Basic | DebugLevel::All => &[],
        DebugLevel::Minimal => &[("poller", TracingLevel::Debug)],
        DebugLevel::BasicMessages => &[
            ("parser", TracingLevel::Trace),
            ("reconciler", TracingLevel::Trace),
        ],
        DebugLevel::ConnectionsOnly => &[("fetch", TracingLevel::Debug)],
        DebugLevel::ConnectionsQueue => &[
            ("fetch", TracingLevel::Debug),
            ("scheduler", TracingLevel::Trace),
        ],
    }
}

/// Installs the global subscriber
///
/// Only the first successful call has an effect.
///
/// # Errors
///
/// Returns an error if a subscriber is already installed, the directives do
/// not parse, or the log file cannot be opened.
pub fn init_tracing(config: &TracingConfig) -> TracingResult<()> {
    let directives = config.filter_directives();
    let filter = EnvFilter::try_new(&directives).map_err(|e| TracingError::InvalidFilter {
        filter: directives.clone(),
        reason: e.to_string(),
    })?;
    let writer = config.make_writer()?;

    if INSTALLED.swap(true, Ordering::SeqCst) {
        return Err(TracingError::AlreadyInitialized);
    }

    let ansi = matches!(config.output, TracingOutput::Stderr);
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_ansi(ansi)
                .with_writer(writer),
        )
        .try_init()
        .map_err(|_| TracingError::AlreadyInitialized)?;

    tracing::debug!(%directives, "Logging initialized");
    Ok(())
}

/// Opens an info span for a named poller operation
///
/// ```ignore
/// let _span = trace_operation!(span_names::SCHEDULER_TICK, unit = 3).entered();
/// ```
#[macro_export]
macro_rules! trace_operation {
    ($name:expr) => {
        tracing::info_span!($name)
    };
    ($name:expr, $($field:tt)*) => {
        tracing::info_span!($name, $($field)*)
    };
}

/// Span names used across the poller
pub mod span_names {
    /// One scheduler tick
    pub const SCHEDULER_TICK: &str = "scheduler.tick";
    /// Processing a finished fetch
    pub const FETCH_COMPLETE: &str = "fetch.complete";
}
