//! # Vehicle Controller
//!
//! Turns external vehicle signals into presence cycles and ticket requests,
//! and owns the vehicle's ticket table.
//!
//! ```text
//! departed        -> presence cycle -> roster -> request tickets -> table
//! zone_changed(z) -> roster.with_zone(z)      -> request tickets -> table
//!                    (no roster yet: presence cycle first)
//! ```
//!
//! Ticket requests are retried `request_attempts` times; running out is a
//! fatal error that the binary answers with a backup and exit.

use std::sync::Arc;

use async_trait::async_trait;
use fare_types::{CustomerNumber, PassengerRoster, Ticket, TicketList, Zone};
use fc_01_ticket_table::TicketTable;
use fc_02_presence::{PresenceError, PresenceTracker};
use fc_03_session_protocol::{DatagramTransport, UplinkClient, UplinkError};
use parking_lot::RwLock;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::backup::{BackupError, BackupStore, Snapshot};

/// Produces the roster of passengers aboard.
#[async_trait]
pub trait RosterSource: Send + Sync {
    async fn observe(&self, zone: Zone) -> Result<PassengerRoster, PresenceError>;
}

#[async_trait]
impl RosterSource for PresenceTracker {
    async fn observe(&self, zone: Zone) -> Result<PassengerRoster, PresenceError> {
        self.run_cycle(zone).await
    }
}

/// Obtains tickets for a roster from the backend.
#[async_trait]
pub trait TicketSource: Send + Sync {
    async fn fetch(&self, roster: &PassengerRoster) -> Result<TicketList, UplinkError>;
}

#[async_trait]
impl<T: DatagramTransport> TicketSource for UplinkClient<T> {
    async fn fetch(&self, roster: &PassengerRoster) -> Result<TicketList, UplinkError> {
        self.request_tickets(roster).await
    }
}

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("Presence cycle failed: {0}")]
    Presence(#[from] PresenceError),

    #[error("No tickets after {attempts} requests: {last}")]
    TicketsUnavailable {
        attempts: u32,
        #[source]
        last: UplinkError,
    },
}

/// Mutable vehicle state.
#[derive(Debug, Clone)]
pub struct VehicleState {
    pub zone: Zone,
    /// `None` until the first presence cycle completes.
    pub roster: Option<PassengerRoster>,
    pub table: TicketTable,
}

impl VehicleState {
    pub fn new(zone: Zone) -> Self {
        Self {
            zone,
            roster: None,
            table: TicketTable::new(),
        }
    }

    /// State recovered from a backup; the current zone wins over the
    /// roster's recorded one.
    pub fn restore(zone: Zone, snapshot: Snapshot) -> Self {
        Self {
            zone,
            roster: Some(snapshot.roster.with_zone(zone)),
            table: snapshot.table,
        }
    }
}

pub struct VehicleController {
    presence: Arc<dyn RosterSource>,
    tickets: Arc<dyn TicketSource>,
    backup: BackupStore,
    request_attempts: u32,
    state: RwLock<VehicleState>,
}

impl VehicleController {
    pub fn new(
        presence: Arc<dyn RosterSource>,
        tickets: Arc<dyn TicketSource>,
        backup: BackupStore,
        request_attempts: u32,
        state: VehicleState,
    ) -> Self {
        Self {
            presence,
            tickets,
            backup,
            request_attempts,
            state: RwLock::new(state),
        }
    }

    /// The vehicle left a stop: find out who is aboard, then get their tickets.
    pub async fn on_departed(&self) -> Result<TicketList, ControllerError> {
        let zone = self.zone();
        info!(%zone, "Vehicle departed; counting passengers");
        let roster = self.presence.observe(zone).await?;
        info!(passengers = roster.len(), "Passenger roster complete");
        self.refresh(roster).await
    }

    /// The vehicle crossed into `zone`: re-request tickets for the same
    /// passengers in the new zone.
    pub async fn on_zone_changed(&self, zone: Zone) -> Result<TicketList, ControllerError> {
        let roster = {
            let mut state = self.state.write();
            state.zone = zone;
            state.roster.clone().map(|roster| roster.with_zone(zone))
        };
        match roster {
            Some(roster) => {
                info!(%zone, passengers = roster.len(), "Zone transit; updating tickets");
                self.refresh(roster).await
            }
            None => {
                info!(%zone, "Zone transit before any roster; counting passengers");
                self.on_departed().await
            }
        }
    }

    /// Request tickets for `roster` and replace the table with the result.
    async fn refresh(&self, roster: PassengerRoster) -> Result<TicketList, ControllerError> {
        self.state.write().roster = Some(roster.clone());
        let tickets = self.request_with_retry(&roster).await?;

        let mut table = TicketTable::new();
        if !table.add_all(tickets.iter().cloned()) {
            warn!(
                tickets = tickets.len(),
                capacity = table.capacity(),
                "Ticket table full; some tickets dropped"
            );
        }
        info!(tickets = table.len(), collisions = table.collisions(), "Ticket table updated");
        self.state.write().table = table;

        if let Err(e) = self.save_backup() {
            warn!(error = %e, path = %self.backup.path().display(), "Could not write backup");
        }
        Ok(tickets)
    }

    async fn request_with_retry(&self, roster: &PassengerRoster) -> Result<TicketList, ControllerError> {
        let mut attempt = 1;
        loop {
            match self.tickets.fetch(roster).await {
                Ok(tickets) => return Ok(tickets),
                Err(e) if attempt < self.request_attempts => {
                    warn!(error = %e, attempt, "Ticket request failed; retrying");
                    attempt += 1;
                }
                Err(last) => {
                    error!(error = %last, attempts = attempt, "Ticket request failed; giving up");
                    return Err(ControllerError::TicketsUnavailable {
                        attempts: attempt,
                        last,
                    });
                }
            }
        }
    }

    /// Save roster and table; used on the fatal path before exiting.
    pub fn emergency_backup(&self) -> Result<(), BackupError> {
        self.save_backup()?;
        info!(path = %self.backup.path().display(), "Data saved in backup");
        Ok(())
    }

    fn save_backup(&self) -> Result<(), BackupError> {
        let (roster, table) = {
            let state = self.state.read();
            let roster = state
                .roster
                .clone()
                .unwrap_or_else(|| PassengerRoster::new(state.zone));
            (roster, state.table.clone())
        };
        self.backup.save(&roster, &table)
    }

    /// Ticket held by `customer`, if any.
    pub fn lookup(&self, customer: CustomerNumber) -> Option<Ticket> {
        self.state.read().table.lookup(customer).cloned()
    }

    pub fn zone(&self) -> Zone {
        self.state.read().zone
    }

    pub fn roster(&self) -> Option<PassengerRoster> {
        self.state.read().roster.clone()
    }

    pub fn ticket_count(&self) -> usize {
        self.state.read().table.len()
    }
}
