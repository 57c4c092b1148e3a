//! CLI argument parsing types using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Polls one-wire thermometers on a remote host over SSH
#[derive(Parser)]
#[command(name = "w1poll")]
#[command(author, version, about = "Remote one-wire thermometer poller")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the configuration directory
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase output verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Append log output to this file instead of stderr
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Poll until interrupted
    #[command(about = "Poll the remote host until interrupted with Ctrl-C")]
    Run {
        /// Heartbeat period in seconds, overriding the configuration
        #[arg(long)]
        heartbeat: Option<u64>,
    },

    /// Run a single fetch
    #[command(about = "Fetch readings once and print them")]
    Fetch {
        /// Apply the readings to the device registry
        #[arg(long)]
        apply: bool,

        /// Print readings as JSON
        #[arg(long)]
        json: bool,
    },

    /// List registered devices
    #[command(about = "List devices in the registry")]
    Devices {
        /// Print devices as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the remote command
    #[command(about = "Print the command used to fetch readings, password redacted")]
    Command,

    /// Manage the configuration file
    #[command(subcommand, about = "Manage the configuration file")]
    Config(ConfigCommands),
}

/// Config subcommands
#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Write a configuration file
    #[command(about = "Create a configuration file with default values")]
    Init {
        /// SSH destination, `user@host`
        #[arg(short, long)]
        target: Option<String>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show the effective configuration
    #[command(about = "Show the effective configuration, password redacted")]
    Show,

    /// Show file locations
    #[command(about = "Show the configuration and registry file paths")]
    Path,
}
