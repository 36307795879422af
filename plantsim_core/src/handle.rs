//! Row-level access for simulation processes.
//!
//! PLC, SCADA and attacker processes open the store after initialization and
//! only read or update existing rows. No statement here creates, drops or
//! inserts.

use crate::error::{Result, StateError};
use crate::schema::{Table, CLOCK_ROW_ID};
use crate::store::StateStore;
use rusqlite::{params, OptionalExtension, Transaction, TransactionBehavior};
use std::path::Path;

/// A simulation actor's connection to the shared store.
#[derive(Debug)]
pub struct StateHandle {
    store: StateStore,
}

impl StateHandle {
    /// Opens an already-initialized store for read/write.
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let store = StateStore::open_existing(db_path, false)?;
        for table in Table::all() {
            if !store.table_exists(table)? {
                return Err(StateError::NotInitialized(table.name()));
            }
        }
        Ok(Self { store })
    }

    /// Current value of a device, `None` if no such device exists.
    pub fn device_value(&self, name: &str, process_id: i64) -> Result<Option<String>> {
        let value = self
            .store
            .conn()
            .query_row(
                "SELECT value FROM plant WHERE name = ?1 AND pid = ?2",
                params![name, process_id],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()?;
        Ok(value.flatten())
    }

    /// Overwrites the value of an existing device.
    pub fn set_device_value(&self, name: &str, process_id: i64, value: &str) -> Result<()> {
        let changed = self.store.conn().execute(
            "UPDATE plant SET value = ?3 WHERE name = ?1 AND pid = ?2",
            params![name, process_id, value],
        )?;
        if changed == 0 {
            return Err(StateError::UnknownKey {
                table: Table::Plant.name(),
                key: format!("{}/{}", name, process_id),
            });
        }
        Ok(())
    }

    /// Current simulation time.
    pub fn clock_time(&self) -> Result<i64> {
        self.store
            .conn()
            .query_row(
                "SELECT time FROM master_time WHERE id = ?1",
                [CLOCK_ROW_ID],
                |row| row.get(0),
            )
            .optional()?
            .ok_or(StateError::NotInitialized(Table::MasterTime.name()))
    }

    /// Advances the clock by `ticks` and returns the new time.
    ///
    /// Negative steps and steps past `i64::MAX` are rejected and leave the
    /// clock unchanged.
    pub fn advance_clock(&self, ticks: i64) -> Result<i64> {
        let tx = Transaction::new_unchecked(self.store.conn(), TransactionBehavior::Immediate)?;

        let time: i64 = tx
            .query_row(
                "SELECT time FROM master_time WHERE id = ?1",
                [CLOCK_ROW_ID],
                |row| row.get(0),
            )
            .optional()?
            .ok_or(StateError::NotInitialized(Table::MasterTime.name()))?;

        let next = match time.checked_add(ticks) {
            Some(next) if ticks >= 0 => next,
            _ => return Err(StateError::InvalidClockAdvance { time, ticks }),
        };

        tx.execute(
            "UPDATE master_time SET time = ?2 WHERE id = ?1",
            params![CLOCK_ROW_ID, next],
        )?;
        tx.commit()?;
        Ok(next)
    }

    /// Flag of a coordinating actor, `None` if the actor is not registered.
    pub fn flag(&self, name: &str) -> Result<Option<i64>> {
        let flag = self
            .store
            .conn()
            .query_row("SELECT flag FROM sync WHERE name = ?1", [name], |row| row.get(0))
            .optional()?;
        Ok(flag)
    }

    /// Sets the flag of a registered actor.
    pub fn set_flag(&self, name: &str, flag: i64) -> Result<()> {
        let changed = self.store.conn().execute(
            "UPDATE sync SET flag = ?2 WHERE name = ?1",
            params![name, flag],
        )?;
        if changed == 0 {
            return Err(StateError::UnknownKey {
                table: Table::Sync.name(),
                key: name.to_string(),
            });
        }
        Ok(())
    }
}
