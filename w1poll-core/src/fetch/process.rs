//! Running the fetch command without blocking the caller
//!
//! [`SshFetchLauncher`] spawns the command and hands the process to a tokio
//! task that waits for it. The result comes back over a single-slot
//! `oneshot` channel, so checking on a fetch is a `try_recv` and never waits.

use std::fmt;
use std::process::{ExitStatus, Stdio};

use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;

use super::command::{FetchCommand, FetchConfig};
use crate::error::{FetchError, FetchResult};

/// Exit code of `timeout` when it had to kill the command
const TIMEOUT_KILLED_EXIT_CODE: i32 = 128 + 9;

/// Exit code of `timeout` when the command timed out with the default signal
const TIMEOUT_EXIT_CODE: i32 = 124;

/// How a fetch process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    /// Exit status 0
    Success,
    /// Non-zero exit status
    Failed {
        /// Exit code
        code: i32,
    },
    /// Terminated by a signal, or the watcher vanished
    Killed,
}

impl FetchStatus {
    /// Returns true for a zero exit status
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }

    /// Returns true when the exit code is the one `timeout` reports
    #[must_use]
    pub const fn looks_like_timeout(self) -> bool {
        matches!(
            self,
            Self::Failed {
                code: TIMEOUT_EXIT_CODE | TIMEOUT_KILLED_EXIT_CODE
            }
        )
    }
}

impl From<ExitStatus> for FetchStatus {
    fn from(status: ExitStatus) -> Self {
        if status.success() {
            Self::Success
        } else {
            status
                .code()
                .map_or(Self::Killed, |code| Self::Failed { code })
        }
    }
}

impl fmt::Display for FetchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("success"),
            Self::Failed { code } => write!(f, "exit {code}"),
            Self::Killed => f.write_str("killed"),
        }
    }
}

/// Captured result of a finished fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    /// How the process ended
    pub status: FetchStatus,
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
}

impl FetchOutcome {
    /// Successful outcome with the given stdout
    #[must_use]
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            status: FetchStatus::Success,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Failed outcome with the given exit code and stderr
    #[must_use]
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            status: FetchStatus::Failed { code },
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Non-empty stderr lines, trimmed
    pub fn stderr_lines(&self) -> impl Iterator<Item = &str> {
        self.stderr
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
    }
}

/// A fetch that has been started and may still be running
pub trait PendingFetch: Send {
    /// Checks for completion without blocking
    ///
    /// Returns `Some` exactly once, when the process has finished.
    fn poll(&mut self) -> Option<FetchOutcome>;

    /// Requests termination of the local process
    fn cancel(&mut self);
}

/// Starts remote fetches
pub trait FetchLauncher {
    /// Starts one fetch
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be started.
    fn launch(&self) -> FetchResult<Box<dyn PendingFetch>>;
}

/// Launcher running the SSH fetch command as a child process
#[derive(Debug, Clone)]
pub struct SshFetchLauncher {
    command: FetchCommand,
}

impl SshFetchLauncher {
    /// Creates a launcher for the given config
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidConfig`] if no command can be built.
    pub fn new(config: &FetchConfig) -> FetchResult<Self> {
        let command = config
            .build_command()
            .map_err(|e| FetchError::InvalidConfig(e.to_string()))?;
        Ok(Self { command })
    }

    /// Creates a launcher for an already built command
    #[must_use]
    pub const fn from_command(command: FetchCommand) -> Self {
        Self { command }
    }
}

impl FetchLauncher for SshFetchLauncher {
    fn launch(&self) -> FetchResult<Box<dyn PendingFetch>> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| FetchError::NoRuntime)?;

        let mut cmd = self.command.to_tokio_command();
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Spawning registers the child with the runtime's reaper
        let _guard = runtime.enter();
        let child = cmd.spawn().map_err(|source| FetchError::Spawn {
            program: self.command.program.clone(),
            source,
        })?;
        let pid = child.id();
        tracing::debug!(pid, command = %self.command, "Started remote fetch");

        let (result_tx, result_rx) = oneshot::channel();
        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();

        runtime.spawn(async move {
            tokio::select! {
                output = child.wait_with_output() => {
                    let outcome = match output {
                        Ok(output) => FetchOutcome {
                            status: output.status.into(),
                            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                        },
                        Err(e) => FetchOutcome {
                            status: FetchStatus::Killed,
                            stdout: String::new(),
                            stderr: format!("Failed to wait for fetch process: {e}"),
                        },
                    };
                    let _ = result_tx.send(outcome);
                }
                _ = cancel_rx => {
                    // Dropping the wait future drops the child, which kills it
                    tracing::debug!(pid, "Remote fetch cancelled");
                }
            }
        });

        Ok(Box::new(ProcessFetch {
            result_rx,
            cancel_tx: Some(cancel_tx),
        }))
    }
}

/// Handle to a fetch process watched by a tokio task
#[derive(Debug)]
pub struct ProcessFetch {
    result_rx: oneshot::Receiver<FetchOutcome>,
    cancel_tx: Option<oneshot::Sender<()>>,
}

impl PendingFetch for ProcessFetch {
    fn poll(&mut self) -> Option<FetchOutcome> {
        match self.result_rx.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Closed) => Some(FetchOutcome {
                status: FetchStatus::Killed,
                stdout: String::new(),
                stderr: "Fetch watcher ended without a result".to_string(),
            }),
        }
    }

    fn cancel(&mut self) {
        if let Some(cancel_tx) = self.cancel_tx.take() {
            let _ = cancel_tx.send(());
        }
    }
}
