//! Testbed configuration document.
//!
//! The document is produced by the surrounding toolchain; only the keys the
//! state store needs are modelled here, everything else is ignored.
//!
//! ```yaml
//! log_level: info
//! db_path: plant.sqlite
//! actuators:
//!   - name: P1
//!     initial_state: closed
//! plcs:
//!   - name: PLC1
//!     sensors: [T1, T2]
//! network_attacks:
//!   - name: mitm1
//!     target: PLC1
//! ```

use crate::error::{Result, StateError};
use crate::schema::SUPERVISOR_NAME;
use serde::{Deserialize, Deserializer};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

// ============================================================================
// LOG LEVEL
// ============================================================================

/// Verbosity requested by the configuration document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    /// Returns the equivalent `tracing` level. `Critical` has no direct
    /// counterpart and collapses onto `ERROR`.
    pub fn as_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warning => tracing::Level::WARN,
            LogLevel::Error | LogLevel::Critical => tracing::Level::ERROR,
        }
    }

    /// Returns the directive string accepted by `EnvFilter`.
    pub fn as_filter_directive(&self) -> &'static str {
        match self.as_tracing_level() {
            tracing::Level::TRACE => "trace",
            tracing::Level::DEBUG => "debug",
            tracing::Level::INFO => "info",
            tracing::Level::WARN => "warn",
            tracing::Level::ERROR => "error",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warning" | "warn" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            "critical" => Ok(LogLevel::Critical),
            _ => Err(format!("Unknown log level: {}", s)),
        }
    }
}

impl<'de> Deserialize<'de> for LogLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// DECLARED ACTORS
// ============================================================================

/// Initial position of an actuator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitialState {
    Open,
    Closed,
}

impl InitialState {
    /// Interprets a declared state. Only a case-insensitive `"closed"` means
    /// closed; every other text, including typos, reads as open.
    pub fn from_declared(text: &str) -> Self {
        if text.to_lowercase() == "closed" {
            InitialState::Closed
        } else {
            InitialState::Open
        }
    }

    /// Seed value written to the device table.
    pub fn seed_value(&self) -> &'static str {
        match self {
            InitialState::Closed => "0",
            InitialState::Open => "1",
        }
    }
}

/// A declared actuator (pump, valve).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ActuatorConfig {
    pub name: String,
    pub initial_state: String,
}

impl ActuatorConfig {
    pub fn state(&self) -> InitialState {
        InitialState::from_declared(&self.initial_state)
    }
}

/// A declared programmable controller and the sensors it reads.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PlcConfig {
    pub name: String,
    #[serde(default)]
    pub sensors: Vec<String>,
}

/// A declared network attacker.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AttackerConfig {
    pub name: String,
    pub target: String,
}

// ============================================================================
// DOCUMENT
// ============================================================================

/// Parsed configuration document.
#[derive(Debug, Clone, Deserialize)]
pub struct TestbedConfig {
    /// Verbosity for the run
    pub log_level: LogLevel,

    /// Location of the shared store. Resolved against the document's
    /// directory after loading.
    pub db_path: PathBuf,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub actuators: Vec<ActuatorConfig>,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub plcs: Vec<PlcConfig>,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub network_attacks: Vec<AttackerConfig>,
}

/// An empty YAML section (`actuators:` with no items) parses as null.
fn null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

impl TestbedConfig {
    /// Loads and parses the document at `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(StateError::ConfigNotFound(path.to_path_buf()));
        }

        let text = std::fs::read_to_string(path)
            .map_err(|e| StateError::malformed(path, format!("read failed: {}", e)))?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));

        Self::parse(&text, base_dir, path)
    }

    /// Parses an in-memory document; relative `db_path` values are resolved
    /// against `base_dir`.
    pub fn from_yaml_str(text: &str, base_dir: &Path) -> Result<Self> {
        Self::parse(text, base_dir, Path::new("<inline>"))
    }

    fn parse(text: &str, base_dir: &Path, origin: &Path) -> Result<Self> {
        let mut config: TestbedConfig =
            serde_yaml::from_str(text).map_err(|e| StateError::malformed(origin, e))?;

        if config.db_path.as_os_str().is_empty() {
            return Err(StateError::malformed(origin, "db_path is empty"));
        }
        if config.db_path.is_relative() {
            config.db_path = base_dir.join(&config.db_path);
        }

        Ok(config)
    }

    /// Rows the device table holds after population: every actuator plus
    /// every sensor of every controller.
    pub fn expected_device_rows(&self) -> usize {
        self.actuators.len() + self.plcs.iter().map(|p| p.sensors.len()).sum::<usize>()
    }

    /// Rows the flag table holds after population: every controller, the
    /// supervisor, every attacker.
    pub fn expected_flag_rows(&self) -> usize {
        self.plcs.len() + 1 + self.network_attacks.len()
    }

    /// Non-fatal lint over the declared actors. Population never depends on
    /// the outcome; duplicates are left for the store's key constraints.
    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        for actuator in &self.actuators {
            if actuator.name.trim().is_empty() {
                warnings.push(ConfigWarning::EmptyName {
                    section: "actuators",
                });
            }
            let declared = actuator.initial_state.to_lowercase();
            if declared != "open" && declared != "closed" {
                warnings.push(ConfigWarning::UnrecognizedInitialState {
                    actuator: actuator.name.clone(),
                    declared: actuator.initial_state.clone(),
                });
            }
        }

        for plc in &self.plcs {
            if plc.name.trim().is_empty() {
                warnings.push(ConfigWarning::EmptyName { section: "plcs" });
            }
            if plc.sensors.iter().any(|s| s.trim().is_empty()) {
                warnings.push(ConfigWarning::EmptyName {
                    section: "plcs.sensors",
                });
            }
        }

        let targets: HashSet<&str> = self
            .plcs
            .iter()
            .map(|p| p.name.as_str())
            .chain(std::iter::once(SUPERVISOR_NAME))
            .collect();
        for attacker in &self.network_attacks {
            if attacker.name.trim().is_empty() {
                warnings.push(ConfigWarning::EmptyName {
                    section: "network_attacks",
                });
            }
            if !targets.contains(attacker.target.as_str()) {
                warnings.push(ConfigWarning::UnknownAttackTarget {
                    attacker: attacker.name.clone(),
                    target: attacker.target.clone(),
                });
            }
        }

        warnings
    }
}

/// Findings from [`TestbedConfig::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// Initial state is neither "open" nor "closed"; it will be seeded as open
    UnrecognizedInitialState { actuator: String, declared: String },

    /// Attacker targets something that is neither a declared PLC nor the supervisor
    UnknownAttackTarget { attacker: String, target: String },

    /// A blank name in the given section
    EmptyName { section: &'static str },
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigWarning::UnrecognizedInitialState { actuator, declared } => write!(
                f,
                "actuator {} declares initial_state '{}', seeding as open",
                actuator, declared
            ),
            ConfigWarning::UnknownAttackTarget { attacker, target } => {
                write!(f, "attacker {} targets unknown actor {}", attacker, target)
            }
            ConfigWarning::EmptyName { section } => write!(f, "blank name in {}", section),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<TestbedConfig> {
        TestbedConfig::from_yaml_str(text, Path::new("/srv/testbed"))
    }

    #[test]
    fn test_minimal_document() {
        let config = parse("log_level: info\ndb_path: plant.sqlite\n").unwrap();

        assert_eq!(config.log_level, LogLevel::Info);
        assert_eq!(config.db_path, PathBuf::from("/srv/testbed/plant.sqlite"));
        assert!(config.actuators.is_empty());
        assert!(config.plcs.is_empty());
        assert!(config.network_attacks.is_empty());
        assert_eq!(config.expected_device_rows(), 0);
        assert_eq!(config.expected_flag_rows(), 1);
    }

    #[test]
    fn test_absolute_db_path_kept() {
        let config = parse("log_level: debug\ndb_path: /tmp/state.db\n").unwrap();
        assert_eq!(config.db_path, PathBuf::from("/tmp/state.db"));
    }

    #[test]
    fn test_full_document_with_extra_keys() {
        let config = parse(
            r#"
log_level: WARNING
db_path: db.sqlite
inp_file: town.inp
iterations: 100
actuators:
  - name: P1
    initial_state: Closed
  - name: V2
    initial_state: open
plcs:
  - name: PLC1
    sensors: [T1, T2]
    actuators: [P1]
  - name: PLC2
network_attacks:
  - name: attack1
    target: PLC1
    type: mitm
"#,
        )
        .unwrap();

        assert_eq!(config.log_level, LogLevel::Warning);
        assert_eq!(config.actuators.len(), 2);
        assert_eq!(config.actuators[0].state(), InitialState::Closed);
        assert_eq!(config.actuators[1].state(), InitialState::Open);
        assert!(config.plcs[1].sensors.is_empty());
        assert_eq!(config.expected_device_rows(), 4);
        assert_eq!(config.expected_flag_rows(), 4);
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_null_sections_are_empty() {
        let config = parse("log_level: info\ndb_path: x.db\nactuators:\nplcs:\n").unwrap();
        assert!(config.actuators.is_empty());
        assert!(config.plcs.is_empty());
    }

    #[test]
    fn test_missing_required_keys() {
        assert!(matches!(
            parse("db_path: x.db\n"),
            Err(StateError::ConfigMalformed { .. })
        ));
        assert!(matches!(
            parse("log_level: info\n"),
            Err(StateError::ConfigMalformed { .. })
        ));
    }

    #[test]
    fn test_unknown_log_level_is_malformed() {
        assert!(matches!(
            parse("log_level: chatty\ndb_path: x.db\n"),
            Err(StateError::ConfigMalformed { .. })
        ));
    }

    #[test]
    fn test_unparseable_document_is_malformed() {
        assert!(matches!(
            parse("log_level: [info\n"),
            Err(StateError::ConfigMalformed { .. })
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let err = TestbedConfig::load("/definitely/not/here.yaml").unwrap_err();
        assert!(matches!(err, StateError::ConfigNotFound(_)));
    }

    #[test]
    fn test_initial_state_mapping() {
        assert_eq!(InitialState::from_declared("closed").seed_value(), "0");
        assert_eq!(InitialState::from_declared("CLOSED").seed_value(), "0");
        assert_eq!(InitialState::from_declared("Open").seed_value(), "1");
        // Typos fall through to open
        assert_eq!(InitialState::from_declared("clsoed").seed_value(), "1");
    }

    #[test]
    fn test_validate_flags_gaps() {
        let config = parse(
            r#"
log_level: info
db_path: x.db
actuators:
  - name: P1
    initial_state: shut
plcs:
  - name: PLC1
network_attacks:
  - name: a1
    target: PLC9
  - name: a2
    target: scada
"#,
        )
        .unwrap();

        let warnings = config.validate();
        assert_eq!(warnings.len(), 2);
        assert!(warnings.contains(&ConfigWarning::UnrecognizedInitialState {
            actuator: "P1".into(),
            declared: "shut".into(),
        }));
        assert!(warnings.contains(&ConfigWarning::UnknownAttackTarget {
            attacker: "a1".into(),
            target: "PLC9".into(),
        }));
    }

    #[test]
    fn test_log_level_filter_directive() {
        assert_eq!(LogLevel::Critical.as_filter_directive(), "error");
        assert_eq!(LogLevel::Warning.as_filter_directive(), "warn");
        assert_eq!("Debug".parse::<LogLevel>().unwrap(), LogLevel::Debug);
    }

    #[test]
    fn test_validate_blank_names() {
        let config = parse(
            r#"
log_level: info
db_path: x.db
actuators:
  - {name: " ", initial_state: open}
plcs:
  - {name: "", sensors: [T1, ""]}
network_attacks:
  - {name: "", target: scada}
"#,
        )
        .unwrap();

        let warnings = config.validate();
        assert_eq!(
            warnings,
            vec![
                ConfigWarning::EmptyName {
                    section: "actuators"
                },
                ConfigWarning::EmptyName { section: "plcs" },
                ConfigWarning::EmptyName {
                    section: "plcs.sensors"
                },
                ConfigWarning::EmptyName {
                    section: "network_attacks"
                },
            ]
        );
        assert_eq!(warnings[1].to_string(), "blank name in plcs");
    }
}
