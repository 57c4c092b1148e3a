//! One-off fetch command.

use std::path::Path;
use std::time::{Duration, Instant};

use w1poll_core::fetch::{FetchConfig, FetchLauncher, FetchOutcome, SshFetchLauncher};
use w1poll_core::parser::{SensorReading, parse_output};
use w1poll_core::reconciler::DeviceReconciler;
use w1poll_core::scheduler::DEADLINE_GRACE;

use super::create_runtime;
use crate::error::CliError;
use crate::util::{create_config_manager, load_settings, open_registry};

/// How often the fetch is checked for completion
const POLL_PERIOD: Duration = Duration::from_millis(100);

/// Fetch command handler
pub fn cmd_fetch(config_path: Option<&Path>, apply: bool, json: bool) -> Result<(), CliError> {
    let manager = create_config_manager(config_path)?;
    let settings = load_settings(&manager)?;
    let config = FetchConfig::from_settings(&settings)?;
    let launcher = SshFetchLauncher::new(&config)?;

    // Snapshot before launching, as the poll loop does
    let mut registry = if apply {
        Some(open_registry(&manager, &settings)?)
    } else {
        None
    };
    let mut reconciler = DeviceReconciler::new();
    if let Some(registry) = registry.as_ref() {
        reconciler.take_snapshot(registry);
    }

    let runtime = create_runtime()?;
    let outcome = runtime.block_on(run_once(&launcher, config.timeout + DEADLINE_GRACE))?;

    for line in outcome.stderr_lines() {
        if outcome.status.is_success() {
            tracing::warn!("{line}");
        } else {
            eprintln!("{line}");
        }
    }
    if !outcome.status.is_success() {
        return Err(CliError::Fetch(format!(
            "remote command ended with {}",
            outcome.status
        )));
    }

    let readings: Vec<SensorReading> = parse_output(&outcome.stdout).collect();
    print_readings(&readings, json)?;

    if let Some(registry) = registry.as_mut() {
        let summary = reconciler.reconcile(registry, readings);
        println!(
            "Applied {} readings to {}: {} created, {} updated, {} failed",
            summary.total(),
            registry.path().display(),
            summary.created,
            summary.updated,
            summary.failed
        );
        if summary.failed > 0 {
            return Err(CliError::Registry(format!(
                "{} of {} readings could not be applied",
                summary.failed,
                summary.total()
            )));
        }
    }
    Ok(())
}

/// Launches one fetch and waits for it without blocking the runtime
async fn run_once<L: FetchLauncher>(
    launcher: &L,
    deadline_after: Duration,
) -> Result<FetchOutcome, CliError> {
    let deadline = Instant::now() + deadline_after;
    let mut pending = launcher.launch()?;
    let mut ticker = tokio::time::interval(POLL_PERIOD);
    loop {
        ticker.tick().await;
        if let Some(outcome) = pending.poll() {
            return Ok(outcome);
        }
        if Instant::now() >= deadline {
            pending.cancel();
            return Err(CliError::Fetch(format!(
                "no result within {}s",
                deadline_after.as_secs()
            )));
        }
    }
}

fn print_readings(readings: &[SensorReading], json: bool) -> Result<(), CliError> {
    if json {
        let rows: Vec<serde_json::Value> = readings
            .iter()
            .map(|r| {
                serde_json::json!({
                    "sensor_id": r.sensor_id,
                    "raw_value": r.raw_value,
                    "value": r.display_value(),
                })
            })
            .collect();
        let output = serde_json::to_string_pretty(&rows)
            .map_err(|e| CliError::Fetch(format!("Failed to serialize readings: {e}")))?;
        println!("{output}");
    } else if readings.is_empty() {
        println!("No sensors reported.");
    } else {
        for reading in readings {
            println!("{}\t{}", reading.sensor_id, reading.display_value());
        }
    }
    Ok(())
}
