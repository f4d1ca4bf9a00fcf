//! # Wire Payloads
//!
//! Messages that travel as single datagrams between vehicle, passenger
//! devices and the local ticket-lookup service.

use serde::{Deserialize, Serialize};

use crate::entities::{CustomerNumber, Ticket};

/// Presence beacon traffic between the vehicle and passenger devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BeaconMessage {
    /// Vehicle -> devices (multicast): "who is aboard?"
    Ping,
    /// Device -> vehicle: "I am aboard".
    Pong(CustomerNumber),
    /// Vehicle -> device: pong received.
    Ack,
    /// Device -> vehicle: the device is muted and does not report presence.
    Inactive,
}

/// Answer of the vehicle's lookup service to a customer-number query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LookupReply {
    Found(Ticket),
    NotFound,
}
