//! # FC-02 Presence
//!
//! Detects which passengers are aboard by exchanging beacons with their
//! handheld devices.
//!
//! ## Architecture
//!
//! This crate follows Hexagonal Architecture (Ports & Adapters):
//!
//! - **Domain Layer** (`domain/`): Pure logic, no I/O
//!   - `PresenceCycle`: beacon counting and roster filtering per tick
//!   - `RosterCollector`: mutex-guarded roster under construction
//!   - `MuteSwitch`, `LivenessMonitor`: device-side state
//!
//! - **Ports Layer** (`ports/`): `BeaconSocket` driven port
//!
//! - **Service Layer** (`service/`):
//!   - `PresenceTracker`: runs one departure cycle on the vehicle
//!   - `PongWorkerPool`: bounded executor for inbound pongs
//!   - `DeviceResponder`: answers pings on a passenger device
//!
//! - **Adapters Layer** (`adapters/`): tokio UDP sockets (multicast)
//!
//! ## Cycle
//!
//! ```text
//! departed -> [ping -> wait interval -> fold replies] x5 -> roster
//!                  \-> 3 consecutive send failures -> PresenceError
//! ```
//!
//! The first fold adopts the replies as the roster; every later fold keeps
//! only passengers that answered again.

pub mod adapters;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use domain::{
    DeviceConfig, Harvest, LivenessMonitor, MuteSwitch, PoolConfig, PresenceConfig, PresenceCycle,
    RosterCollector,
};
pub use error::PresenceError;
pub use ports::{BeaconSocket, TransportError};
pub use service::{
    serve_pongs, DeviceCommand, DeviceHandle, DeviceResponder, PongJob, PongWorkerPool,
    PresenceTracker,
};
