//! Slot addressing for the ticket table
//!
//! The primary slot is the owner hash reduced modulo the capacity; probing
//! then walks forward one slot at a time and wraps to slot 0.

use fare_types::CustomerNumber;

/// Primary slot of `customer` in a table of `capacity` slots.
///
/// `capacity` must be non-zero.
pub fn primary_slot(customer: CustomerNumber, capacity: usize) -> usize {
    (customer.table_hash() % capacity as u64) as usize
}

/// Every slot index exactly once, starting at `start` and wrapping.
pub fn probe_sequence(start: usize, capacity: usize) -> impl Iterator<Item = usize> {
    (start..capacity).chain(0..start)
}
