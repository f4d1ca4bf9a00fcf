//! Ticket issuance for one roster: reuse what passengers already hold and
//! issue tickets only for the rest.

use std::sync::Arc;

use fare_types::{PassengerRoster, TicketList};
use tracing::debug;

use crate::ports::{StoreError, TicketStore};

pub struct TicketIssuer {
    store: Arc<dyn TicketStore>,
}

impl TicketIssuer {
    pub fn new(store: Arc<dyn TicketStore>) -> Self {
        Self { store }
    }

    /// Existing tickets merged with newly issued ones for the remainder.
    ///
    /// `issue_tickets` is only called when some passenger holds no ticket.
    pub async fn tickets_for(&self, roster: &PassengerRoster) -> Result<TicketList, StoreError> {
        let mut tickets = self.store.existing_tickets(roster).await?;

        let mut holders = PassengerRoster::new(roster.zone());
        holders.extend(tickets.customers());
        let remainder = roster.without(&holders);

        debug!(
            zone = %roster.zone(),
            existing = tickets.len(),
            missing = remainder.len(),
            "[fc-03] Resolving tickets"
        );

        if !remainder.is_empty() {
            let issued = self.store.issue_tickets(&remainder).await?;
            tickets.merge_with(issued);
        }
        Ok(tickets)
    }
}
