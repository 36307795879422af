//! Table layout of the shared state store.
//!
//! Three tables make up a run's state:
//! - `plant`: one row per actuator and sensor, value stored as text
//! - `master_time`: the singleton simulation clock
//! - `sync`: one readiness flag per coordinating actor
//!
//! Device values stay loosely typed on purpose; consumers parse them per
//! device.

use serde::{Deserialize, Serialize};

/// Process id assigned to every row of the initial snapshot.
pub const INITIAL_PROCESS_ID: i64 = 1;

/// Reserved key of the clock row.
pub const CLOCK_ROW_ID: i64 = 1;

/// Clock value after initialization.
pub const CLOCK_START: i64 = 0;

/// Flag value every actor starts with.
pub const INITIAL_FLAG: i64 = 1;

/// Supervisory control actor, always present in `sync`.
pub const SUPERVISOR_NAME: &str = "scada";

/// Seed value for every sensor.
pub const SENSOR_SEED_VALUE: &str = "0";

pub(crate) const CREATE_PLANT: &str = "CREATE TABLE IF NOT EXISTS plant (
    name  TEXT    NOT NULL,
    pid   INTEGER NOT NULL,
    value TEXT,
    PRIMARY KEY (name, pid)
)";

pub(crate) const CREATE_MASTER_TIME: &str =
    "CREATE TABLE IF NOT EXISTS master_time (id INTEGER PRIMARY KEY, time INTEGER)";

pub(crate) const CREATE_SYNC: &str = "CREATE TABLE IF NOT EXISTS sync (
    name TEXT NOT NULL,
    flag INT  NOT NULL,
    PRIMARY KEY (name)
)";

pub(crate) const INSERT_DEVICE: &str = "INSERT INTO plant (name, pid, value) VALUES (?1, ?2, ?3)";

pub(crate) const RESET_CLOCK: &str = "REPLACE INTO master_time (id, time) VALUES (?1, ?2)";

pub(crate) const INSERT_FLAG: &str = "INSERT INTO sync (name, flag) VALUES (?1, ?2)";

/// The tables owned by the initializer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Table {
    Plant,
    MasterTime,
    Sync,
}

impl Table {
    /// All tables, in dump order.
    pub fn all() -> [Table; 3] {
        [Table::Plant, Table::MasterTime, Table::Sync]
    }

    /// SQL table name.
    pub fn name(&self) -> &'static str {
        match self {
            Table::Plant => "plant",
            Table::MasterTime => "master_time",
            Table::Sync => "sync",
        }
    }

    /// Columns in declaration order.
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            Table::Plant => &["name", "pid", "value"],
            Table::MasterTime => &["id", "time"],
            Table::Sync => &["name", "flag"],
        }
    }

    pub(crate) fn create_statement(&self) -> &'static str {
        match self {
            Table::Plant => CREATE_PLANT,
            Table::MasterTime => CREATE_MASTER_TIME,
            Table::Sync => CREATE_SYNC,
        }
    }

    pub(crate) fn drop_statement(&self) -> &'static str {
        match self {
            Table::Plant => "DROP TABLE IF EXISTS plant",
            Table::MasterTime => "DROP TABLE IF EXISTS master_time",
            Table::Sync => "DROP TABLE IF EXISTS sync",
        }
    }

    /// Stable ordering for reads, primary key first.
    pub(crate) fn select_statement(&self) -> &'static str {
        match self {
            Table::Plant => "SELECT name, pid, value FROM plant ORDER BY pid, rowid",
            Table::MasterTime => "SELECT id, time FROM master_time ORDER BY id",
            Table::Sync => "SELECT name, flag FROM sync ORDER BY rowid",
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for Table {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "plant" => Ok(Table::Plant),
            "master_time" => Ok(Table::MasterTime),
            "sync" => Ok(Table::Sync),
            _ => Err(format!("Unknown table: {}", s)),
        }
    }
}

/// One row of `plant`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRow {
    pub name: String,
    pub process_id: i64,
    pub value: Option<String>,
}

/// The `master_time` row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockRow {
    pub id: i64,
    pub time: i64,
}

/// One row of `sync`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagRow {
    pub name: String,
    pub flag: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_names_round_trip() {
        for table in Table::all() {
            assert_eq!(table.name().parse::<Table>().unwrap(), table);
        }
        assert!("devices".parse::<Table>().is_err());
    }

    #[test]
    fn test_create_statements_are_idempotent() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        for _ in 0..2 {
            for table in Table::all() {
                conn.execute(table.create_statement(), []).unwrap();
            }
        }
        for table in Table::all() {
            conn.execute(table.drop_statement(), []).unwrap();
            conn.execute(table.drop_statement(), []).unwrap();
        }
    }
}
