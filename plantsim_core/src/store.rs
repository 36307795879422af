//! SQLite-backed state store shared by every simulation process.

use crate::error::{Result, StateError};
use crate::schema::Table;
use rusqlite::{Connection, OpenFlags, OptionalExtension};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// How long a connection waits on a lock held by another process.
pub const BUSY_TIMEOUT_MS_DEFAULT: u64 = 5_000;

/// An open connection to the store file.
///
/// Only the initializer issues schema statements through this type; other
/// components use it for row access.
#[derive(Debug)]
pub struct StateStore {
    conn: Connection,
    path: PathBuf,
}

impl StateStore {
    /// Opens the store at `path`, creating the file if it does not exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        Self::open_with_flags(path.as_ref(), flags)
    }

    /// Opens a store that must already exist.
    pub fn open_existing<P: AsRef<Path>>(path: P, read_only: bool) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(StateError::unavailable(
                path,
                rusqlite::Error::InvalidPath(path.to_path_buf()),
            ));
        }

        let access = if read_only {
            OpenFlags::SQLITE_OPEN_READ_ONLY
        } else {
            OpenFlags::SQLITE_OPEN_READ_WRITE
        };
        Self::open_with_flags(path, access | OpenFlags::SQLITE_OPEN_NO_MUTEX)
    }

    fn open_with_flags(path: &Path, flags: OpenFlags) -> Result<Self> {
        let conn = Connection::open_with_flags(path, flags)
            .map_err(|e| StateError::unavailable(path, e))?;
        conn.busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS_DEFAULT))
            .map_err(|e| StateError::unavailable(path, e))?;

        // Force SQLite to read the header so unreadable or foreign files fail here.
        conn.query_row("SELECT count(*) FROM sqlite_master", [], |row| row.get::<_, i64>(0))
            .map_err(|e| StateError::unavailable(path, e))?;

        tracing::trace!("Opened state store at {}", path.display());

        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    /// Returns the location of the store file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true if `table` exists in the store.
    pub fn table_exists(&self, table: Table) -> Result<bool> {
        table_exists(&self.conn, table)
    }

    /// Number of rows in `table`, or `NotInitialized` when it is absent.
    pub fn row_count(&self, table: Table) -> Result<usize> {
        if !self.table_exists(table)? {
            return Err(StateError::NotInitialized(table.name()));
        }
        let sql = format!("SELECT count(*) FROM {}", table.name());
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    pub(crate) fn conn_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }
}

pub(crate) fn table_exists(conn: &Connection, table: Table) -> Result<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [table.name()],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}
