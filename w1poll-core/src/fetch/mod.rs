//! Remote fetch of one-wire sensor readings
//!
//! Runs [`REMOTE_SCRIPT`] on the remote host through a separate `ssh` (or
//! `sshpass -e ssh`) process wrapped in `timeout --signal=KILL`, so a hung
//! session always ends in a non-zero exit.

mod command;
mod process;

pub use command::{
    FetchAuth, FetchCommand, FetchConfig, REMOTE_SCRIPT, SSHPASS_ENV, W1_DEVICES_PATH,
};
pub use process::{
    FetchLauncher, FetchOutcome, FetchStatus, PendingFetch, ProcessFetch, SshFetchLauncher,
};
