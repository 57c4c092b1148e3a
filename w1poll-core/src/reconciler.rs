//! Mapping sensor readings onto registry devices
//!
//! The sensor-to-unit snapshot is taken when a fetch is launched. Readings
//! of unknown sensors create a device in the smallest free unit, computed
//! from the live registry at creation time; known sensors get their value
//! updated. Devices are never deleted.

use std::collections::HashMap;

use crate::parser::SensorReading;
use crate::registry::{DeviceRegistry, NewDevice, next_free_unit};

/// Counts of what one reconcile pass did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    /// Devices created
    pub created: usize,
    /// Existing devices updated
    pub updated: usize,
    /// Readings the registry rejected
    pub failed: usize,
}

impl ReconcileSummary {
    /// Total readings processed
    #[must_use]
    pub const fn total(&self) -> usize {
        self.created + self.updated + self.failed
    }
}

/// Applies readings to a device registry
#[derive(Debug, Clone, Default)]
pub struct DeviceReconciler {
    known: HashMap<String, u32>,
}

impl DeviceReconciler {
    /// Creates a reconciler with an empty snapshot
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the sensor-to-unit snapshot with the registry's current state
    pub fn take_snapshot<R: DeviceRegistry + ?Sized>(&mut self, registry: &R) {
        self.known = registry.unit_map();
        tracing::trace!(devices = self.known.len(), "Took registry snapshot");
    }

    /// Unit recorded for a sensor, if any
    #[must_use]
    pub fn unit_for(&self, sensor_id: &str) -> Option<u32> {
        self.known.get(sensor_id).copied()
    }

    /// Applies every reading to the registry
    ///
    /// A registry error affects only its own reading.
    pub fn reconcile<R, I>(&mut self, registry: &mut R, readings: I) -> ReconcileSummary
    where
        R: DeviceRegistry + ?Sized,
        I: IntoIterator<Item = SensorReading>,
    {
        let mut summary = ReconcileSummary::default();
        for reading in readings {
            let value = reading.display_value();
            match self.unit_for(&reading.sensor_id) {
                Some(unit) => match registry.update_value(unit, &value) {
                    Ok(()) => {
                        tracing::debug!(
                            sensor = %reading.sensor_id,
                            unit,
                            %value,
                            "Updated device"
                        );
                        summary.updated += 1;
                    }
                    Err(e) => {
                        tracing::warn!(
                            sensor = %reading.sensor_id,
                            unit,
                            error = %e,
                            "Failed to update device"
                        );
                        summary.failed += 1;
                    }
                },
                None => match self.create(registry, &reading.sensor_id, &value) {
                    Ok(unit) => {
                        tracing::info!(sensor = %reading.sensor_id, unit, %value, "Created device");
                        summary.created += 1;
                    }
                    Err(e) => {
                        tracing::warn!(
                            sensor = %reading.sensor_id,
                            error = %e,
                            "Failed to create device"
                        );
                        summary.failed += 1;
                    }
                },
            }
        }
        summary
    }

    fn create<R: DeviceRegistry + ?Sized>(
        &mut self,
        registry: &mut R,
        sensor_id: &str,
        value: &str,
    ) -> crate::error::RegistryResult<u32> {
        let unit = next_free_unit(registry.devices().iter().map(|device| device.unit));
        registry.create_device(NewDevice::temperature_sensor(unit, sensor_id))?;
        self.known.insert(sensor_id.to_string(), unit);
        registry.update_value(unit, value)?;
        Ok(unit)
    }
}
