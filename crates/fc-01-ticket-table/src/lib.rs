//! # FC-01 Ticket Table
//!
//! Fixed-capacity, open-addressed index from customer number to ticket,
//! used by the vehicle to answer passenger lookups.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): Pure data structure, no I/O
//!   - `TicketTable`: dense slot array with linear probing
//!   - `Probe`: three-way probe outcome (`Found`, `Vacant`, `Exhausted`)
//!   - `hashing`: primary slot and wrap-around probe order
//!
//! ## Invariants
//!
//! - Capacity never changes after construction.
//! - Entries are never removed, so a probe may stop at the first empty slot.
//! - Insert and lookup start probing from the same owner hash.
//! - A full table is reported as a value (`false` / `Probe::Exhausted`),
//!   never as an error.
//!
//! ## Usage Example
//!
//! ```ignore
//! use fc_01_ticket_table::TicketTable;
//!
//! let mut table = TicketTable::new();
//! table.add(ticket);
//! assert_eq!(table.lookup(ticket.owner()), Some(&ticket));
//! ```

pub mod domain;
pub mod error;


pub use domain::{Probe, TicketTable, DEFAULT_CAPACITY};
pub use error::TableError;
