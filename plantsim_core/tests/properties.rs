//! Property tests for population row counts.

use plantsim_core::{Initializer, Inspector, StateHandle, TestbedConfig};
use proptest::prelude::*;
use std::fmt::Write;
use tempfile::TempDir;

/// Builds a document with unique names: `n` actuators, one PLC per entry of
/// `sensors` holding that many sensors, `a` attackers.
fn document(actuators: &[bool], sensors: &[usize], attackers: usize) -> String {
    let mut doc = String::from("log_level: info\ndb_path: plant.sqlite\n");

    if !actuators.is_empty() {
        doc.push_str("actuators:\n");
        for (i, closed) in actuators.iter().enumerate() {
            let state = if *closed { "Closed" } else { "OPEN" };
            writeln!(doc, "  - {{name: A{}, initial_state: {}}}", i, state).unwrap();
        }
    }
    if !sensors.is_empty() {
        doc.push_str("plcs:\n");
        for (p, k) in sensors.iter().enumerate() {
            let names: Vec<String> = (0..*k).map(|s| format!("S{}_{}", p, s)).collect();
            writeln!(doc, "  - {{name: PLC{}, sensors: [{}]}}", p, names.join(", ")).unwrap();
        }
    }
    if attackers > 0 {
        doc.push_str("network_attacks:\n");
        for i in 0..attackers {
            writeln!(doc, "  - {{name: attack{}, target: scada}}", i).unwrap();
        }
    }
    doc
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_row_counts_match_declarations(
        actuators in prop::collection::vec(any::<bool>(), 0..6),
        sensors in prop::collection::vec(0usize..4, 0..4),
        attackers in 0usize..4,
    ) {
        let dir = TempDir::new().unwrap();
        let text = document(&actuators, &sensors, attackers);
        let config = TestbedConfig::from_yaml_str(&text, dir.path()).unwrap();
        let db_path = config.db_path.clone();

        let report = Initializer::new(config).unwrap().initialize().unwrap();
        let snapshot = Inspector::new(&db_path).snapshot().unwrap();

        let expected_devices = actuators.len() + sensors.iter().sum::<usize>();
        let expected_flags = sensors.len() + 1 + attackers;
        prop_assert_eq!(report.devices, expected_devices);
        prop_assert_eq!(report.flags, expected_flags);
        prop_assert_eq!(snapshot.devices.len(), expected_devices);
        prop_assert_eq!(snapshot.flags.len(), expected_flags);
        prop_assert!(snapshot.flags.iter().all(|f| f.flag == 1));
        prop_assert_eq!(snapshot.clock.map(|c| c.time), Some(0));

        let handle = StateHandle::open(&db_path).unwrap();
        for (i, closed) in actuators.iter().enumerate() {
            let expected = if *closed { "0" } else { "1" };
            let value = handle.device_value(&format!("A{}", i), 1).unwrap();
            prop_assert_eq!(value.as_deref(), Some(expected));
        }
    }
}
