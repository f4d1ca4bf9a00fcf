//! Domain Layer - Pure data structure
//!
//! RULES:
//! - No I/O operations
//! - No async code

pub mod hashing;
pub mod table;

pub use table::{Probe, TicketTable, DEFAULT_CAPACITY};
