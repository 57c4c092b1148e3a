//! In-memory device registry

use std::collections::BTreeMap;

use chrono::Utc;

use super::{DeviceEntry, DeviceRegistry, NewDevice};
use crate::error::{RegistryError, RegistryResult};

/// Registry kept entirely in memory, ordered by unit
#[derive(Debug, Clone, Default)]
pub struct MemoryRegistry {
    devices: BTreeMap<u32, DeviceEntry>,
}

impl MemoryRegistry {
    /// Creates an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the given entries
    ///
    /// # Errors
    ///
    /// Returns an error if two entries share a unit or a device ID.
    pub fn with_devices(devices: impl IntoIterator<Item = DeviceEntry>) -> RegistryResult<Self> {
        let mut registry = Self::new();
        for device in devices {
            registry.insert(device)?;
        }
        Ok(registry)
    }

    /// Number of registered devices
    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Returns true when no device is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Device at `unit`, if any
    #[must_use]
    pub fn get(&self, unit: u32) -> Option<&DeviceEntry> {
        self.devices.get(&unit)
    }

    /// Device with the given external ID, if any
    #[must_use]
    pub fn find_by_device_id(&self, device_id: &str) -> Option<&DeviceEntry> {
        self.devices.values().find(|d| d.device_id == device_id)
    }

    /// Removes a device, as the host may do behind the poller's back
    pub fn remove(&mut self, unit: u32) -> Option<DeviceEntry> {
        self.devices.remove(&unit)
    }

    pub(super) fn insert(&mut self, device: DeviceEntry) -> RegistryResult<()> {
        if device.unit == 0 {
            return Err(RegistryError::InvalidUnit);
        }
        if self.devices.contains_key(&device.unit) {
            return Err(RegistryError::UnitInUse(device.unit));
        }
        if self.find_by_device_id(&device.device_id).is_some() {
            return Err(RegistryError::DuplicateDevice(device.device_id));
        }
        self.devices.insert(device.unit, device);
        Ok(())
    }
}

impl DeviceRegistry for MemoryRegistry {
    fn devices(&self) -> Vec<DeviceEntry> {
        self.devices.values().cloned().collect()
    }

    fn create_device(&mut self, device: NewDevice) -> RegistryResult<()> {
        self.insert(DeviceEntry::from_new(device))
    }

    fn update_value(&mut self, unit: u32, value: &str) -> RegistryResult<()> {
        let device = self
            .devices
            .get_mut(&unit)
            .ok_or(RegistryError::UnknownUnit(unit))?;
        device.value = value.to_string();
        device.last_update = Some(Utc::now());
        Ok(())
    }
}
