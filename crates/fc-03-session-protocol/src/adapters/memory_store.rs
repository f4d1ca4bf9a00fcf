//! Reference `TicketStore` kept in memory.
//!
//! Flat pricing per zone, incrementing ids, local-time timestamps. A ticket
//! covers `zone_count` consecutive zones from its start zone.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Local;
use fare_types::{CustomerNumber, PassengerRoster, Ticket, TicketList, Zone, TIMESTAMP_FORMAT};
use parking_lot::Mutex;
use tracing::debug;

use crate::ports::{StoreError, TicketStore};

/// Price of one zone, in the smallest currency unit.
pub const DEFAULT_ZONE_PRICE: u32 = 1200;
/// Zones covered by a newly issued ticket.
pub const DEFAULT_ZONE_COUNT: u8 = 2;

#[derive(Debug, Default)]
struct Ledger {
    by_customer: HashMap<CustomerNumber, Vec<Ticket>>,
    last_id: u32,
}

#[derive(Debug)]
pub struct InMemoryTicketStore {
    ledger: Mutex<Ledger>,
    zone_price: u32,
    zone_count: u8,
    existing_calls: AtomicUsize,
    issue_calls: AtomicUsize,
}

impl Default for InMemoryTicketStore {
    fn default() -> Self {
        Self::new(DEFAULT_ZONE_PRICE, DEFAULT_ZONE_COUNT)
    }
}

impl InMemoryTicketStore {
    pub fn new(zone_price: u32, zone_count: u8) -> Self {
        Self {
            ledger: Mutex::new(Ledger::default()),
            zone_price,
            zone_count,
            existing_calls: AtomicUsize::new(0),
            issue_calls: AtomicUsize::new(0),
        }
    }

    /// Record a ticket as already issued.
    pub fn insert(&self, ticket: Ticket) {
        let mut ledger = self.ledger.lock();
        ledger.last_id = ledger.last_id.max(ticket.id());
        ledger
            .by_customer
            .entry(ticket.owner())
            .or_default()
            .push(ticket);
    }

    pub fn existing_calls(&self) -> usize {
        self.existing_calls.load(Ordering::SeqCst)
    }

    pub fn issue_calls(&self) -> usize {
        self.issue_calls.load(Ordering::SeqCst)
    }

    fn covers(ticket: &Ticket, zone: Zone) -> bool {
        let start = u16::from(ticket.start_zone().get());
        let end = start + u16::from(ticket.zone_count());
        (start..end).contains(&u16::from(zone.get()))
    }
}

#[async_trait]
impl TicketStore for InMemoryTicketStore {
    async fn existing_tickets(&self, roster: &PassengerRoster) -> Result<TicketList, StoreError> {
        self.existing_calls.fetch_add(1, Ordering::SeqCst);
        let ledger = self.ledger.lock();
        let tickets: TicketList = roster
            .iter()
            .filter_map(|customer| {
                ledger
                    .by_customer
                    .get(&customer)?
                    .iter()
                    .rev()
                    .find(|t| Self::covers(t, roster.zone()))
                    .cloned()
            })
            .collect();
        Ok(tickets)
    }

    async fn issue_tickets(&self, roster: &PassengerRoster) -> Result<TicketList, StoreError> {
        self.issue_calls.fetch_add(1, Ordering::SeqCst);
        let issued_at = Local::now().format(TIMESTAMP_FORMAT).to_string();
        let price = self.zone_price.saturating_mul(u32::from(self.zone_count));

        let mut ledger = self.ledger.lock();
        let mut issued = TicketList::new();
        for customer in roster.iter() {
            ledger.last_id += 1;
            let ticket = Ticket::new(
                ledger.last_id,
                issued_at.clone(),
                price,
                roster.zone().get(),
                self.zone_count,
                customer.get(),
            )
            .map_err(|e| StoreError::Rejected(e.to_string()))?;
            ledger
                .by_customer
                .entry(customer)
                .or_default()
                .push(ticket.clone());
            issued.push(ticket);
        }
        debug!(count = issued.len(), zone = %roster.zone(), "[fc-03] Tickets issued");
        Ok(issued)
    }
}
