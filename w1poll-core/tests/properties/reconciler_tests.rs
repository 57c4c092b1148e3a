//! Property tests for device reconciliation

use std::collections::BTreeSet;

use proptest::prelude::*;
use w1poll_core::parser::SensorReading;
use w1poll_core::reconciler::DeviceReconciler;
use w1poll_core::registry::{DeviceRegistry, MemoryRegistry, NewDevice, next_free_unit};

fn sensor_ids_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[0-9a-f]{4}", 0..24)
}

fn registry_with_units(units: &BTreeSet<u32>) -> MemoryRegistry {
    let mut registry = MemoryRegistry::new();
    for unit in units {
        registry
            .create_device(NewDevice::temperature_sensor(*unit, &format!("existing-{unit}")))
            .unwrap();
    }
    registry
}

proptest! {
    /// Property: the free unit is positive, unused, and every smaller unit is used
    #[test]
    fn next_free_unit_is_smallest_gap(units in prop::collection::btree_set(1u32..64, 0..32)) {
        let free = next_free_unit(units.iter().copied());
        prop_assert!(free >= 1);
        prop_assert!(!units.contains(&free));
        prop_assert!((1..free).all(|u| units.contains(&u)));
    }

    /// Property: reconciling creates one device per distinct sensor with unique units
    #[test]
    fn reconcile_assigns_unique_units(
        existing in prop::collection::btree_set(1u32..32, 0..16),
        ids in sensor_ids_strategy(),
    ) {
        let mut registry = registry_with_units(&existing);
        let mut reconciler = DeviceReconciler::new();
        reconciler.take_snapshot(&registry);

        let readings = ids.iter().map(|id| SensorReading::new(id.clone(), 21_000));
        let summary = reconciler.reconcile(&mut registry, readings);

        let distinct: BTreeSet<&String> = ids.iter().collect();
        prop_assert_eq!(summary.created, distinct.len());
        prop_assert_eq!(summary.updated, ids.len() - distinct.len());
        prop_assert_eq!(summary.failed, 0);

        let devices = registry.devices();
        let units: BTreeSet<u32> = devices.iter().map(|d| d.unit).collect();
        prop_assert_eq!(units.len(), devices.len());
        prop_assert_eq!(devices.len(), existing.len() + distinct.len());

        // New units fill the lowest gaps first
        let expected: BTreeSet<u32> = (1u32..)
            .filter(|u| !existing.contains(u))
            .take(distinct.len())
            .collect();
        let created: BTreeSet<u32> = units.difference(&existing).copied().collect();
        prop_assert_eq!(created, expected);
    }

    /// Property: a second pass over the same sensors only updates
    #[test]
    fn second_pass_only_updates(ids in sensor_ids_strategy()) {
        let mut registry = MemoryRegistry::new();
        let mut reconciler = DeviceReconciler::new();
        let readings = || ids.iter().map(|id| SensorReading::new(id.clone(), 19_500));

        reconciler.take_snapshot(&registry);
        reconciler.reconcile(&mut registry, readings());
        let before = registry.len();

        reconciler.take_snapshot(&registry);
        let summary = reconciler.reconcile(&mut registry, readings());
        prop_assert_eq!(summary.created, 0);
        prop_assert_eq!(summary.updated, ids.len());
        prop_assert_eq!(registry.len(), before);
    }
}

#[test]
fn gap_is_filled_first() {
    let existing: BTreeSet<u32> = [1, 3].into_iter().collect();
    let mut registry = registry_with_units(&existing);
    let mut reconciler = DeviceReconciler::new();
    reconciler.take_snapshot(&registry);

    reconciler.reconcile(
        &mut registry,
        vec![SensorReading::new("A", 1000), SensorReading::new("B", 2000)],
    );
    assert_eq!(registry.find_by_device_id("A").unwrap().unit, 2);
    assert_eq!(registry.find_by_device_id("B").unwrap().unit, 4);
}
