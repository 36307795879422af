//! Error types for the simulation state store.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading configuration or building the state store.
#[derive(Debug, Error)]
pub enum StateError {
    /// The configuration document does not exist
    #[error("Configuration not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    /// The configuration document failed to parse or lacks a required key
    #[error("Malformed configuration {}: {reason}", .path.display())]
    ConfigMalformed {
        path: PathBuf,
        reason: String,
    },

    /// The store file could not be opened or created
    #[error("State store unavailable at {}: {source}", .path.display())]
    StoreUnavailable {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// A declared device or actor name collides with an existing primary key
    #[error("Duplicate key '{key}' in table {table}")]
    DuplicateKey {
        table: &'static str,
        key: String,
    },

    /// A runtime update addressed a row that does not exist
    #[error("Unknown key '{key}' in table {table}")]
    UnknownKey {
        table: &'static str,
        key: String,
    },

    /// A clock advance would move time backwards or past `i64::MAX`
    #[error("Cannot advance clock at {time} by {ticks}")]
    InvalidClockAdvance {
        time: i64,
        ticks: i64,
    },

    /// The store has not been populated (table missing)
    #[error("State store not initialized: table {0} is missing")]
    NotInitialized(&'static str),

    /// Any other store failure
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl StateError {
    /// Creates a malformed-configuration error.
    pub fn malformed(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        Self::ConfigMalformed {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates a store-unavailable error.
    pub fn unavailable(path: impl Into<PathBuf>, source: rusqlite::Error) -> Self {
        Self::StoreUnavailable {
            path: path.into(),
            source,
        }
    }

    /// Maps a failed insert onto `DuplicateKey` when SQLite reports a
    /// primary-key violation; other failures pass through unchanged.
    pub(crate) fn from_insert(err: rusqlite::Error, table: &'static str, key: &str) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _)
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Self::DuplicateKey {
                    table,
                    key: key.to_string(),
                }
            }
            _ => Self::Sqlite(err),
        }
    }

    /// Returns true for errors that mean the store itself could not be reached.
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, Self::StoreUnavailable { .. })
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, StateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraint_violation_maps_to_duplicate_key() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE t (name TEXT PRIMARY KEY); INSERT INTO t VALUES ('a');",
        )
        .unwrap();
        let err = conn.execute("INSERT INTO t VALUES ('a')", []).unwrap_err();

        match StateError::from_insert(err, "t", "a") {
            StateError::DuplicateKey { table, key } => {
                assert_eq!(table, "t");
                assert_eq!(key, "a");
            }
            other => panic!("expected DuplicateKey, got {other:?}"),
        }
    }

    #[test]
    fn test_other_failures_pass_through() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        let err = conn.execute("INSERT INTO missing VALUES ('a')", []).unwrap_err();

        assert!(matches!(
            StateError::from_insert(err, "missing", "a"),
            StateError::Sqlite(_)
        ));
    }

    #[test]
    fn test_display_names_phase_and_key() {
        let err = StateError::DuplicateKey {
            table: "plant",
            key: "P1".into(),
        };
        assert_eq!(err.to_string(), "Duplicate key 'P1' in table plant");
    }
}
