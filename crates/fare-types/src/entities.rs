//! # Core Domain Entities
//!
//! ## Clusters
//!
//! - **Identity**: `CustomerNumber`
//! - **Fares**: `Zone`, `Ticket`, `TicketList`
//!
//! All constructors validate; deserialization goes through the same checks
//! via `#[serde(try_from = ...)]`.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::errors::TicketError;

/// Lexical format of ticket timestamps (24h clock).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Highest supported zone number.
pub const MAX_ZONE: u8 = 5;

/// Valid span of a ticket, in zones.
pub const ZONE_COUNT_RANGE: std::ops::RangeInclusive<u8> = 2..=10;

// =============================================================================
// IDENTITY
// =============================================================================

/// A passenger's customer number. Always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct CustomerNumber(u32);

impl CustomerNumber {
    /// Validate and wrap a raw customer number.
    pub fn new(raw: u32) -> Result<Self, TicketError> {
        if raw == 0 {
            return Err(TicketError::InvalidCustomerNumber);
        }
        Ok(Self(raw))
    }

    /// The raw number.
    #[must_use]
    pub fn get(self) -> u32 {
        self.0
    }

    /// Owner-only hash used to place and find tickets in a table.
    ///
    /// Insertion and lookup MUST seed their probes from this same value.
    #[must_use]
    pub fn table_hash(self) -> u64 {
        53 * 7 + u64::from(self.0)
    }
}

impl TryFrom<u32> for CustomerNumber {
    type Error = TicketError;

    fn try_from(raw: u32) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

impl From<CustomerNumber> for u32 {
    fn from(customer: CustomerNumber) -> Self {
        customer.0
    }
}

impl fmt::Display for CustomerNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// FARES
// =============================================================================

/// A fare zone, 1 through 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Zone(u8);

impl Zone {
    /// The zone vehicles start in when nothing else is known.
    pub const FIRST: Zone = Zone(1);

    /// Validate and wrap a zone number.
    pub fn new(raw: u8) -> Result<Self, TicketError> {
        if raw == 0 || raw > MAX_ZONE {
            return Err(TicketError::InvalidZone(raw));
        }
        Ok(Self(raw))
    }

    /// The raw zone number.
    #[must_use]
    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for Zone {
    fn default() -> Self {
        Self::FIRST
    }
}

impl TryFrom<u8> for Zone {
    type Error = TicketError;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

impl From<Zone> for u8 {
    fn from(zone: Zone) -> Self {
        zone.0
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An issued ticket. Immutable once constructed.
///
/// Equality is structural over all fields; table placement uses only the
/// owner (see [`Ticket::customer_hash`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawTicket")]
pub struct Ticket {
    id: u32,
    issued_at: String,
    price: u32,
    start_zone: Zone,
    zone_count: u8,
    owner: CustomerNumber,
}

/// Unvalidated wire shape of a ticket.
#[derive(Deserialize)]
struct RawTicket {
    id: u32,
    issued_at: String,
    price: u32,
    start_zone: u8,
    zone_count: u8,
    owner: u32,
}

impl TryFrom<RawTicket> for Ticket {
    type Error = TicketError;

    fn try_from(raw: RawTicket) -> Result<Self, Self::Error> {
        Ticket::new(
            raw.id,
            raw.issued_at,
            raw.price,
            raw.start_zone,
            raw.zone_count,
            raw.owner,
        )
    }
}

impl Ticket {
    /// Build a ticket, rejecting any out-of-range field.
    ///
    /// # Errors
    ///
    /// - `InvalidId` if `id` is 0
    /// - `InvalidTimestamp` unless `issued_at` is `YYYY-MM-DD hh:mm:ss`
    /// - `InvalidPrice` if `price` is 0
    /// - `InvalidZone` unless `start_zone` is 1-5
    /// - `InvalidZoneCount` unless `zone_count` is 2-10
    /// - `InvalidCustomerNumber` if `owner` is 0
    pub fn new(
        id: u32,
        issued_at: impl Into<String>,
        price: u32,
        start_zone: u8,
        zone_count: u8,
        owner: u32,
    ) -> Result<Self, TicketError> {
        if id == 0 {
            return Err(TicketError::InvalidId);
        }
        let issued_at = issued_at.into();
        validate_timestamp(&issued_at)?;
        if price == 0 {
            return Err(TicketError::InvalidPrice);
        }
        let start_zone = Zone::new(start_zone)?;
        if !ZONE_COUNT_RANGE.contains(&zone_count) {
            return Err(TicketError::InvalidZoneCount(zone_count));
        }
        let owner = CustomerNumber::new(owner)?;

        Ok(Self {
            id,
            issued_at,
            price,
            start_zone,
            zone_count,
            owner,
        })
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn issued_at(&self) -> &str {
        &self.issued_at
    }

    pub fn price(&self) -> u32 {
        self.price
    }

    pub fn start_zone(&self) -> Zone {
        self.start_zone
    }

    pub fn zone_count(&self) -> u8 {
        self.zone_count
    }

    pub fn owner(&self) -> CustomerNumber {
        self.owner
    }

    /// Hash over the owner only, independent of full equality.
    #[must_use]
    pub fn customer_hash(&self) -> u64 {
        self.owner.table_hash()
    }
}

/// Check the fixed 19-character layout, then the calendar values.
fn validate_timestamp(value: &str) -> Result<(), TicketError> {
    let bytes = value.as_bytes();
    let layout_ok = bytes.len() == 19
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            10 => *b == b' ',
            13 | 16 => *b == b':',
            _ => b.is_ascii_digit(),
        });
    if !layout_ok || NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT).is_err() {
        return Err(TicketError::InvalidTimestamp(value.to_string()));
    }
    Ok(())
}

/// Ordered collection of tickets, as exchanged with the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketList {
    tickets: Vec<Ticket>,
}

impl TicketList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, ticket: Ticket) {
        self.tickets.push(ticket);
    }

    /// First ticket owned by `customer`, if any.
    pub fn get(&self, customer: CustomerNumber) -> Option<&Ticket> {
        self.tickets.iter().find(|t| t.owner() == customer)
    }

    /// Owners of every ticket in the list.
    pub fn customers(&self) -> impl Iterator<Item = CustomerNumber> + '_ {
        self.tickets.iter().map(Ticket::owner)
    }

    /// Append the tickets of `other` that are not already present.
    pub fn merge_with(&mut self, other: TicketList) {
        for ticket in other.tickets {
            if !self.tickets.contains(&ticket) {
                self.tickets.push(ticket);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Ticket> {
        self.tickets.iter()
    }
}

impl From<Vec<Ticket>> for TicketList {
    fn from(tickets: Vec<Ticket>) -> Self {
        Self { tickets }
    }
}

impl FromIterator<Ticket> for TicketList {
    fn from_iter<I: IntoIterator<Item = Ticket>>(iter: I) -> Self {
        Self {
            tickets: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for TicketList {
    type Item = Ticket;
    type IntoIter = std::vec::IntoIter<Ticket>;

    fn into_iter(self) -> Self::IntoIter {
        self.tickets.into_iter()
    }
}

impl<'a> IntoIterator for &'a TicketList {
    type Item = &'a Ticket;
    type IntoIter = std::slice::Iter<'a, Ticket>;

    fn into_iter(self) -> Self::IntoIter {
        self.tickets.iter()
    }
}
