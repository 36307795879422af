//! The Initializer - builds a run's state store from the configuration.
//!
//! Owns the only schema-changing statements in the crate. Each phase runs in
//! a single exclusive transaction, so readers see either the previous state
//! or the finished one:
//! - `reset()` drops every table
//! - `populate()` creates the tables and seeds one row per declared actor

use crate::config::TestbedConfig;
use crate::error::{Result, StateError};
use crate::schema::{
    Table, CLOCK_ROW_ID, CLOCK_START, INITIAL_FLAG, INITIAL_PROCESS_ID, INSERT_DEVICE,
    INSERT_FLAG, RESET_CLOCK, SENSOR_SEED_VALUE, SUPERVISOR_NAME,
};
use crate::store::StateStore;
use rusqlite::{params, Transaction, TransactionBehavior};
use tracing::{debug, info, warn, Span};

/// Rows written by a successful `populate()`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PopulateReport {
    pub devices: usize,
    pub flags: usize,
}

/// Builds and resets the shared state store.
#[derive(Debug)]
pub struct Initializer {
    config: TestbedConfig,
    store: StateStore,

    /// Logging context for every event this initializer emits
    span: Span,
}

impl Initializer {
    /// Opens (creating if needed) the store named by `config.db_path`.
    pub fn new(config: TestbedConfig) -> Result<Self> {
        let span = tracing::info_span!(
            "initializer",
            db = %config.db_path.display(),
            log_level = config.log_level.as_filter_directive(),
        );

        let store = {
            let _enter = span.enter();
            info!("Initializing database.");
            for warning in config.validate() {
                warn!("Configuration: {}", warning);
            }
            StateStore::open(&config.db_path)?
        };

        Ok(Self {
            config,
            store,
            span,
        })
    }

    /// Returns the configuration this initializer was built from.
    pub fn config(&self) -> &TestbedConfig {
        &self.config
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Drops all three tables. Safe on a store that has none.
    pub fn reset(&mut self) -> Result<()> {
        let _enter = self.span.enter();

        let tx = self
            .store
            .conn_mut()
            .transaction_with_behavior(TransactionBehavior::Exclusive)?;
        for table in Table::all() {
            tx.execute(table.drop_statement(), [])?;
        }
        tx.commit()?;

        info!("Dropped simulation tables");
        Ok(())
    }

    /// Creates the tables and seeds them from the configuration.
    ///
    /// Any failure rolls the whole unit back; a duplicate name surfaces as
    /// `DuplicateKey` naming the table and the key.
    pub fn populate(&mut self) -> Result<PopulateReport> {
        let _enter = self.span.enter();

        let tx = self
            .store
            .conn_mut()
            .transaction_with_behavior(TransactionBehavior::Exclusive)?;

        // An early return drops `tx`, which rolls back.
        let report = write_tables(&tx, &self.config)?;
        tx.commit()?;

        info!(
            "Populated state store: {} device rows, {} sync rows",
            report.devices, report.flags
        );
        Ok(report)
    }

    /// `reset()` followed by `populate()`.
    pub fn initialize(&mut self) -> Result<PopulateReport> {
        self.reset()?;
        self.populate()
    }
}

fn write_tables(tx: &Transaction<'_>, config: &TestbedConfig) -> Result<PopulateReport> {
    let mut report = PopulateReport::default();

    tx.execute(Table::Plant.create_statement(), [])?;
    {
        let mut insert = tx.prepare(INSERT_DEVICE)?;

        for actuator in &config.actuators {
            let value = actuator.state().seed_value();
            insert
                .execute(params![actuator.name, INITIAL_PROCESS_ID, value])
                .map_err(|e| StateError::from_insert(e, Table::Plant.name(), &actuator.name))?;
            debug!("actuator {} = {}", actuator.name, value);
            report.devices += 1;
        }

        for plc in &config.plcs {
            for sensor in &plc.sensors {
                insert
                    .execute(params![sensor, INITIAL_PROCESS_ID, SENSOR_SEED_VALUE])
                    .map_err(|e| StateError::from_insert(e, Table::Plant.name(), sensor))?;
                debug!("sensor {} ({}) = {}", sensor, plc.name, SENSOR_SEED_VALUE);
                report.devices += 1;
            }
        }
    }

    tx.execute(Table::MasterTime.create_statement(), [])?;
    tx.execute(RESET_CLOCK, params![CLOCK_ROW_ID, CLOCK_START])?;

    tx.execute(Table::Sync.create_statement(), [])?;
    {
        let mut insert = tx.prepare(INSERT_FLAG)?;
        let actors = config
            .plcs
            .iter()
            .map(|p| p.name.as_str())
            .chain(std::iter::once(SUPERVISOR_NAME))
            .chain(config.network_attacks.iter().map(|a| a.name.as_str()));

        for name in actors {
            insert
                .execute(params![name, INITIAL_FLAG])
                .map_err(|e| StateError::from_insert(e, Table::Sync.name(), name))?;
            report.flags += 1;
        }
    }

    Ok(report)
}
