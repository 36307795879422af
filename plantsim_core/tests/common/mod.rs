//! Shared helpers for the integration tests.

use plantsim_core::TestbedConfig;
use std::path::PathBuf;
use tempfile::TempDir;

/// Writes `body` under a standard header to `intermediate.yaml` in `dir`
/// and loads it. The store lands next to the document.
pub fn write_config(dir: &TempDir, body: &str) -> (PathBuf, TestbedConfig) {
    let path = dir.path().join("intermediate.yaml");
    let text = format!("log_level: debug\ndb_path: plant.sqlite\n{}", body);
    std::fs::write(&path, text).unwrap();
    let config = TestbedConfig::load(&path).unwrap();
    (path, config)
}

pub const WATER_TOWN: &str = r#"
inp_file: town.inp
actuators:
  - name: P1
    initial_state: Closed
plcs:
  - name: PLC1
    sensors: [S1, S2]
"#;
