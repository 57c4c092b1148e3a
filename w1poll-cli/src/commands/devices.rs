//! List the device registry.

use std::path::Path;

use w1poll_core::registry::{DeviceEntry, DeviceRegistry};

use crate::error::CliError;
use crate::util::{create_config_manager, load_settings, open_registry};

/// Devices command handler
pub fn cmd_devices(config_path: Option<&Path>, json: bool) -> Result<(), CliError> {
    let manager = create_config_manager(config_path)?;
    let settings = load_settings(&manager)?;
    let registry = open_registry(&manager, &settings)?;
    let devices = registry.devices();

    if json {
        let output = serde_json::to_string_pretty(&devices)
            .map_err(|e| CliError::Registry(format!("Failed to serialize devices: {e}")))?;
        println!("{output}");
        return Ok(());
    }

    if devices.is_empty() {
        println!("No devices registered.");
        return Ok(());
    }
    print_table(&devices);
    Ok(())
}

fn print_table(devices: &[DeviceEntry]) {
    let id_width = devices
        .iter()
        .map(|d| d.device_id.len())
        .max()
        .unwrap_or(0)
        .max("DEVICE".len());

    println!(
        "{:>4}  {:<id_width$}  {:<11}  {:>7}  UPDATED",
        "UNIT", "DEVICE", "TYPE", "VALUE"
    );
    for device in devices {
        let updated = device
            .last_update
            .map_or_else(|| "-".to_string(), |t| t.format("%Y-%m-%d %H:%M:%S").to_string());
        let value = if device.value.is_empty() {
            "-"
        } else {
            device.value.as_str()
        };
        let kind = if device.used {
            device.device_type.to_string()
        } else {
            format!("{} (unused)", device.device_type)
        };
        println!(
            "{:>4}  {:<id_width$}  {:<11}  {:>7}  {updated}",
            device.unit, device.device_id, kind, value
        );
    }
}
