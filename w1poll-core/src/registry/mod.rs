//! Device registry collaborator
//!
//! The registry owns the persisted device entries. The poller only lists,
//! creates and updates entries; it never deletes them.

mod file;
mod memory;

pub use file::FileRegistry;
pub use memory::MemoryRegistry;

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RegistryResult;

/// Kind of device stored in the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    /// Temperature sensor (value in degrees Celsius)
    #[default]
    Temperature,
}

impl DeviceType {
    /// Numeric type tag used by home automation hosts for this device kind
    #[must_use]
    pub const fn type_tag(self) -> u8 {
        match self {
            Self::Temperature => 80,
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Temperature => f.write_str("temperature"),
        }
    }
}

/// A device known to the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceEntry {
    /// Locally assigned slot, unique and positive
    pub unit: u32,
    /// External device ID (the sensor ID)
    pub device_id: String,
    /// Display name
    pub name: String,
    /// Device kind
    #[serde(default)]
    pub device_type: DeviceType,
    /// Whether the device is shown as in use
    #[serde(default = "default_used")]
    pub used: bool,
    /// Last reported value, empty until the first update
    #[serde(default)]
    pub value: String,
    /// When the value was last updated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update: Option<DateTime<Utc>>,
}

const fn default_used() -> bool {
    true
}

impl DeviceEntry {
    /// Builds the entry a registry stores for a creation request
    #[must_use]
    pub fn from_new(new: NewDevice) -> Self {
        Self {
            unit: new.unit,
            device_id: new.device_id,
            name: new.name,
            device_type: new.device_type,
            used: new.used,
            value: String::new(),
            last_update: None,
        }
    }
}

/// Creation request for a device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDevice {
    /// Unit to occupy
    pub unit: u32,
    /// External device ID
    pub device_id: String,
    /// Display name
    pub name: String,
    /// Device kind
    pub device_type: DeviceType,
    /// Whether the device is shown as in use
    pub used: bool,
}

impl NewDevice {
    /// Creation request for a temperature sensor named after its ID
    #[must_use]
    pub fn temperature_sensor(unit: u32, sensor_id: &str) -> Self {
        Self {
            unit,
            device_id: sensor_id.to_string(),
            name: sensor_id.to_string(),
            device_type: DeviceType::Temperature,
            used: true,
        }
    }
}

/// Operations the poller needs from the host's device store
pub trait DeviceRegistry {
    /// Lists every device currently registered
    fn devices(&self) -> Vec<DeviceEntry>;

    /// Creates a device
    ///
    /// # Errors
    ///
    /// Returns an error if the unit is taken, the device ID already exists,
    /// or the store cannot persist the change.
    fn create_device(&mut self, device: NewDevice) -> RegistryResult<()>;

    /// Sets the displayed value of a device
    ///
    /// # Errors
    ///
    /// Returns an error if no device occupies `unit` or the store cannot
    /// persist the change.
    fn update_value(&mut self, unit: u32, value: &str) -> RegistryResult<()>;

    /// Returns the device-ID to unit mapping at this moment
    fn unit_map(&self) -> HashMap<String, u32> {
        self.devices()
            .into_iter()
            .map(|device| (device.device_id, device.unit))
            .collect()
    }
}

/// Smallest positive unit number not present in `used`
#[must_use]
pub fn next_free_unit(used: impl IntoIterator<Item = u32>) -> u32 {
    let taken: BTreeSet<u32> = used.into_iter().filter(|unit| *unit > 0).collect();
    let mut candidate = 1;
    for unit in taken {
        if unit != candidate {
            break;
        }
        candidate += 1;
    }
    candidate
}
