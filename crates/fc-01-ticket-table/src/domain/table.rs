//! Open-addressed ticket table
//!
//! INVARIANTS:
//! - `len <= capacity`, and capacity is fixed for the table's lifetime.
//! - A ticket is reachable by probing forward from its owner's primary slot;
//!   since entries are never removed, no probe path has holes.

use fare_types::{CustomerNumber, Ticket, TicketList};
use serde::{Deserialize, Serialize};

use super::hashing::{primary_slot, probe_sequence};
use crate::error::TableError;

/// Prime capacity sized at twice the expected 800 passengers per vehicle.
pub const DEFAULT_CAPACITY: usize = 1601;

/// Outcome of probing for a customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    /// Slot holding a ticket owned by the customer.
    Found(usize),
    /// First empty slot on the probe path: the customer is absent and a new
    /// ticket for it would land here.
    Vacant(usize),
    /// Every slot was visited without a match or an empty slot.
    Exhausted,
}

/// Fixed-capacity map from customer number to ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TableSnapshot", into = "TableSnapshot")]
pub struct TicketTable {
    slots: Vec<Option<Ticket>>,
    len: usize,
    /// Insertions that did not land on their primary slot.
    collisions: u64,
}

/// Persisted shape: capacity plus live tickets in slot order.
#[derive(Serialize, Deserialize)]
struct TableSnapshot {
    capacity: usize,
    tickets: Vec<Ticket>,
}

impl From<TicketTable> for TableSnapshot {
    fn from(table: TicketTable) -> Self {
        Self {
            capacity: table.capacity(),
            tickets: table.slots.into_iter().flatten().collect(),
        }
    }
}

impl TryFrom<TableSnapshot> for TicketTable {
    type Error = TableError;

    fn try_from(snapshot: TableSnapshot) -> Result<Self, Self::Error> {
        let mut table = TicketTable::with_capacity(snapshot.capacity)?;
        let tickets = snapshot.tickets.len();
        if !table.add_all(snapshot.tickets) {
            return Err(TableError::SnapshotOverflow {
                tickets,
                placed: table.len(),
                capacity: table.capacity(),
            });
        }
        Ok(table)
    }
}

impl Default for TicketTable {
    fn default() -> Self {
        Self::new()
    }
}

impl TicketTable {
    /// Empty table with [`DEFAULT_CAPACITY`] slots.
    pub fn new() -> Self {
        Self::empty(DEFAULT_CAPACITY)
    }

    /// Empty table with `capacity` slots.
    ///
    /// # Errors
    ///
    /// `ZeroCapacity` if `capacity` is 0.
    pub fn with_capacity(capacity: usize) -> Result<Self, TableError> {
        if capacity == 0 {
            return Err(TableError::ZeroCapacity);
        }
        Ok(Self::empty(capacity))
    }

    fn empty(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
            len: 0,
            collisions: 0,
        }
    }

    /// Insert a ticket at the first empty slot of its owner's probe path.
    ///
    /// Returns `false` only when the whole table was probed without finding
    /// an empty slot. A ticket structurally equal to one already on the path
    /// is not stored twice and reports `true`.
    pub fn add(&mut self, ticket: Ticket) -> bool {
        let capacity = self.capacity();
        let start = primary_slot(ticket.owner(), capacity);

        for slot in probe_sequence(start, capacity) {
            match &self.slots[slot] {
                None => {
                    if slot != start {
                        self.collisions += 1;
                    }
                    self.slots[slot] = Some(ticket);
                    self.len += 1;
                    return true;
                }
                Some(existing) if *existing == ticket => return true,
                Some(_) => {}
            }
        }
        false
    }

    /// Insert every ticket, reporting whether all of them were placed.
    pub fn add_all(&mut self, tickets: impl IntoIterator<Item = Ticket>) -> bool {
        tickets
            .into_iter()
            .fold(true, |placed, ticket| self.add(ticket) && placed)
    }

    /// Ticket owned by `customer`, if present.
    pub fn lookup(&self, customer: CustomerNumber) -> Option<&Ticket> {
        match self.probe(customer) {
            Probe::Found(slot) => self.slots[slot].as_ref(),
            Probe::Vacant(_) | Probe::Exhausted => None,
        }
    }

    /// Walk the probe path of `customer` and report where it ended.
    pub fn probe(&self, customer: CustomerNumber) -> Probe {
        let capacity = self.capacity();
        let start = primary_slot(customer, capacity);

        for slot in probe_sequence(start, capacity) {
            match &self.slots[slot] {
                None => return Probe::Vacant(slot),
                Some(ticket) if ticket.owner() == customer => return Probe::Found(slot),
                Some(_) => {}
            }
        }
        Probe::Exhausted
    }

    /// Insert every live ticket of `other`. `true` iff none were dropped.
    pub fn merge(&mut self, other: &TicketTable) -> bool {
        self.add_all(other.iter().cloned())
    }

    /// Live tickets in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &Ticket> + '_ {
        self.slots.iter().flatten()
    }

    /// Copy of the live tickets as a list.
    pub fn to_list(&self) -> TicketList {
        self.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// Number of insertions displaced from their primary slot.
    pub fn collisions(&self) -> u64 {
        self.collisions
    }
}
