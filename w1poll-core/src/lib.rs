//! `w1poll` Core Library
//!
//! Polls one-wire thermometers attached to a remote Linux host over SSH and
//! keeps a local device registry in sync with the readings.
//!
//! # Crate Structure
//!
//! - [`config`] - Poller settings and TOML persistence
//! - [`fetch`] - Remote command construction and non-blocking process handling
//! - [`parser`] - Parsing of the remote output and temperature formatting
//! - [`registry`] - Device registry trait with memory and JSON file stores
//! - [`reconciler`] - Mapping readings onto registry devices
//! - [`scheduler`] - Poll-and-check state machine driven by heartbeats
//! - [`poller`] - Start / heartbeat / stop lifecycle for a host
//! - [`tracing`] - Logging setup and debug level mapping

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod fetch;
pub mod parser;
pub mod poller;
pub mod reconciler;
pub mod registry;
pub mod scheduler;
pub mod tracing;

pub use config::{ConfigManager, DebugLevel, PollerSettings};
pub use error::{
    ConfigError, ConfigResult, FetchError, FetchResult, RegistryError, RegistryResult,
    W1PollError,
};
pub use fetch::{
    FetchCommand, FetchConfig, FetchLauncher, FetchOutcome, FetchStatus, PendingFetch,
    SshFetchLauncher,
};
pub use parser::{SensorReading, format_temperature, parse_output};
pub use poller::Poller;
pub use reconciler::{DeviceReconciler, ReconcileSummary};
pub use registry::{
    DeviceEntry, DeviceRegistry, DeviceType, FileRegistry, MemoryRegistry, NewDevice,
    next_free_unit,
};
pub use scheduler::{PollScheduler, TickOutcome};
