//! `w1poll` - host process and command-line interface for the poller
//!
//! Runs the poll loop, performs one-off fetches, lists the device registry
//! and manages the configuration file.

mod cli;
mod commands;
mod error;
mod util;

use clap::Parser;
use cli::Cli;
use w1poll_core::tracing::{TracingConfig, TracingLevel, init_tracing};

fn main() {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    let level = if cli.quiet {
        TracingLevel::Error
    } else {
        TracingLevel::from_verbosity(cli.verbose)
    };
    let mut tracing_config = TracingConfig::new()
        .with_level(level)
        .with_debug(util::configured_debug_level(config_path));
    if let Some(path) = cli.log_file.as_deref() {
        tracing_config = tracing_config.with_log_file(path);
    }
    if let Ok(filter) = std::env::var("RUST_LOG")
        && !filter.trim().is_empty()
    {
        tracing_config = tracing_config.with_filter(filter);
    }
    if let Err(e) = init_tracing(&tracing_config) {
        eprintln!("Warning: failed to initialize logging: {e}");
    }

    let result = commands::dispatch(config_path, cli.command);

    if let Err(e) = result {
        if !cli.quiet {
            eprintln!("Error: {e}");
        }
        std::process::exit(e.exit_code());
    }
}
