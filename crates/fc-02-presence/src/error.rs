//! Error types for the presence subsystem

use thiserror::Error;

use crate::ports::TransportError;

/// Errors that cross the presence subsystem boundary.
#[derive(Debug, Error)]
pub enum PresenceError {
    /// Too many beacons in a row could not be sent. Fatal for the vehicle.
    #[error("Beacon send failed {failures} times in a row")]
    BeaconBudgetExhausted { failures: u32 },

    /// The worker queue stayed full for every retry; the pong was dropped.
    #[error("Pong queue still full after {retries} retries")]
    PoolSaturated { retries: u32 },

    /// The worker pool has shut down.
    #[error("Pong worker pool is closed")]
    PoolClosed,

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}
