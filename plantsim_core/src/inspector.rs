//! Read-only diagnostic view over the state store.

use crate::error::Result;
use crate::schema::{ClockRow, DeviceRow, FlagRow, Table, CLOCK_ROW_ID};
use crate::store::StateStore;
use rusqlite::types::ValueRef;
use rusqlite::OptionalExtension;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Rendered contents of one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDump {
    pub table: Table,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,

    /// False when the table does not exist in the store
    pub present: bool,
}

impl TableDump {
    fn absent(table: Table) -> Self {
        Self {
            table,
            columns: table.columns().iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
            present: false,
        }
    }
}

impl std::fmt::Display for TableDump {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.present {
            return write!(f, "{}: absent", self.table);
        }

        // Padding below counts chars, so widths must too.
        let mut widths: Vec<usize> = self
            .columns
            .iter()
            .map(|c| c.chars().count())
            .collect();
        for row in &self.rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let noun = if self.rows.len() == 1 { "row" } else { "rows" };
        writeln!(f, "{} ({} {})", self.table, self.rows.len(), noun)?;
        let header: Vec<String> = self
            .columns
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{:<w$}", c, w = *w))
            .collect();
        write!(f, "  {}", header.join("  ").trim_end())?;
        for row in &self.rows {
            let cells: Vec<String> = row
                .iter()
                .zip(&widths)
                .map(|(c, w)| format!("{:<w$}", c, w = *w))
                .collect();
            write!(f, "\n  {}", cells.join("  ").trim_end())?;
        }
        Ok(())
    }
}

/// Typed copy of the whole store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateSnapshot {
    pub devices: Vec<DeviceRow>,
    pub clock: Option<ClockRow>,
    pub flags: Vec<FlagRow>,
}

/// Lazy sequence of table dumps. Each table is queried when reached.
#[derive(Debug)]
pub struct TableDumps {
    store: StateStore,
    pending: std::array::IntoIter<Table, 3>,
}

impl Iterator for TableDumps {
    type Item = Result<TableDump>;

    fn next(&mut self) -> Option<Self::Item> {
        let table = self.pending.next()?;
        Some(dump_table(&self.store, table))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.pending.size_hint()
    }
}

/// Opens the store on demand; never writes.
#[derive(Debug, Clone)]
pub struct Inspector {
    db_path: PathBuf,
}

impl Inspector {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    /// Dumps `plant`, `master_time` and `sync`, in that order.
    ///
    /// Fails with `StoreUnavailable` if the store cannot be opened. Every
    /// call opens a fresh read-only connection.
    pub fn dump(&self) -> Result<TableDumps> {
        let store = StateStore::open_existing(&self.db_path, true)?;
        Ok(TableDumps {
            store,
            pending: Table::all().into_iter(),
        })
    }

    /// Reads every table into typed rows. Absent tables read as empty.
    pub fn snapshot(&self) -> Result<StateSnapshot> {
        let store = StateStore::open_existing(&self.db_path, true)?;
        let conn = store.conn();

        let devices = if store.table_exists(Table::Plant)? {
            let mut stmt = conn.prepare(Table::Plant.select_statement())?;
            let rows = stmt.query_map([], |row| {
                Ok(DeviceRow {
                    name: row.get(0)?,
                    process_id: row.get(1)?,
                    value: row.get(2)?,
                })
            })?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        } else {
            Vec::new()
        };

        let clock = if store.table_exists(Table::MasterTime)? {
            conn.query_row(
                "SELECT id, time FROM master_time WHERE id = ?1",
                [CLOCK_ROW_ID],
                |row| {
                    Ok(ClockRow {
                        id: row.get(0)?,
                        time: row.get(1)?,
                    })
                },
            )
            .optional()?
        } else {
            None
        };

        let flags = if store.table_exists(Table::Sync)? {
            let mut stmt = conn.prepare(Table::Sync.select_statement())?;
            let rows = stmt.query_map([], |row| {
                Ok(FlagRow {
                    name: row.get(0)?,
                    flag: row.get(1)?,
                })
            })?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        } else {
            Vec::new()
        };

        Ok(StateSnapshot {
            devices,
            clock,
            flags,
        })
    }
}

fn dump_table(store: &StateStore, table: Table) -> Result<TableDump> {
    if !store.table_exists(table)? {
        tracing::debug!("{}: absent", table);
        return Ok(TableDump::absent(table));
    }

    let mut stmt = store.conn().prepare(table.select_statement())?;
    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
    let width = columns.len();

    let mut rows = Vec::new();
    let mut cursor = stmt.query([])?;
    while let Some(row) = cursor.next()? {
        let mut cells = Vec::with_capacity(width);
        for i in 0..width {
            cells.push(render(row.get_ref(i)?));
        }
        rows.push(cells);
    }

    let dump = TableDump {
        table,
        columns,
        rows,
        present: true,
    };
    tracing::debug!("{}", dump);
    Ok(dump)
}

fn render(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => "NULL".to_string(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(r) => r.to_string(),
        ValueRef::Text(t) => String::from_utf8_lossy(t).into_owned(),
        ValueRef::Blob(b) => format!("<{} bytes>", b.len()),
    }
}
