//! Error types for the ticket table

use thiserror::Error;

/// Errors raised while building a table. Probing never fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    #[error("Ticket table capacity must be positive")]
    ZeroCapacity,

    #[error("Snapshot holds {tickets} tickets but only {placed} fit into capacity {capacity}")]
    SnapshotOverflow {
        tickets: usize,
        placed: usize,
        capacity: usize,
    },
}
