//! # Vehicle Runtime
//!
//! The on-board computer of the fare-collection system.
//!
//! ## Modules
//!
//! - `config` - `VehicleConfig` (TOML + `FC_*` environment)
//! - `controller` - reacts to departure and zone signals
//! - `lookup` - answers passenger devices' ticket queries
//! - `backup` - crash backup of roster and tickets
//! - `console` - stdin commands for both binaries
//!
//! ## Startup Sequence
//!
//! 1. Load configuration
//! 2. Restore the backup, if any
//! 3. Bind ping, pong, uplink and lookup sockets (failure: exit -1)
//! 4. Start the pong worker pool and the lookup service
//! 5. Read signals until `quit`
//!
//! Any fatal error after start-up writes a backup before exiting with -1.

pub mod backup;
pub mod config;
pub mod console;
pub mod controller;
pub mod lookup;

pub use backup::{BackupError, BackupStore, Snapshot};
pub use config::{ConfigError, VehicleConfig};
pub use console::{ConsoleError, DeviceInput, Signal};
pub use controller::{ControllerError, RosterSource, TicketSource, VehicleController, VehicleState};
pub use lookup::{request_ticket, LookupError, LookupServer, LOOKUP_TIMEOUT};
