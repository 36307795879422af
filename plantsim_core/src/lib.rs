//! PlantSim Core - shared simulation state for cyber-physical testbeds
//!
//! A testbed run is a set of independent processes (PLCs, a SCADA actor,
//! network attackers, the physical process) that coordinate through one
//! SQLite file. This crate builds that file from the testbed configuration
//! and gives the processes row-level access to it.
//!
//! # State layout
//!
//! ```text
//! ┌──────────────────────────┐  ┌─────────────────┐  ┌─────────────────┐
//! │ plant                    │  │ master_time     │  │ sync            │
//! │ (name, pid) -> value     │  │ id=1 -> time    │  │ name -> flag    │
//! │ actuators "0"/"1"        │  │ reset to 0      │  │ PLCs, scada,    │
//! │ sensors "0"              │  │                 │  │ attackers = 1   │
//! └──────────────────────────┘  └─────────────────┘  └─────────────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use plantsim_core::{Initializer, Inspector, TestbedConfig};
//!
//! # fn main() -> plantsim_core::Result<()> {
//! let config = TestbedConfig::load("intermediate.yaml")?;
//! let db_path = config.db_path.clone();
//!
//! let mut initializer = Initializer::new(config)?;
//! initializer.reset()?;
//! initializer.populate()?;
//!
//! for dump in Inspector::new(&db_path).dump()? {
//!     println!("{}", dump?);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod handle;
pub mod initializer;
pub mod inspector;
pub mod schema;
pub mod store;

pub use config::{
    ActuatorConfig, AttackerConfig, ConfigWarning, InitialState, LogLevel, PlcConfig,
    TestbedConfig,
};
pub use error::{Result, StateError};
pub use handle::StateHandle;
pub use initializer::{Initializer, PopulateReport};
pub use inspector::{Inspector, StateSnapshot, TableDump, TableDumps};
pub use schema::{ClockRow, DeviceRow, FlagRow, Table};
pub use store::StateStore;
