//! # FC-03 Session Protocol
//!
//! Reliable request/reply/ack exchanges over UDP between vehicles and the
//! backend.
//!
//! ## Architecture
//!
//! This crate follows Hexagonal Architecture (Ports & Adapters):
//!
//! - **Domain Layer** (`domain/`): Pure logic, no I/O
//!   - `Frame`: one sequence byte followed by the payload
//!   - `ServerSession`: per-exchange state machine
//!   - `PortWindow`: rotating session ports
//!
//! - **Ports Layer** (`ports/`):
//!   - `DatagramTransport`, `TransportBinder`: sockets
//!   - `TicketStore`: backend system of record
//!
//! - **Service Layer** (`service/`):
//!   - `Dispatcher`: one session per inbound request
//!   - `SessionTask`: serves one client
//!   - `UplinkClient`: the vehicle side
//!   - `TicketIssuer`: existing tickets plus newly issued ones
//!
//! - **Adapters Layer** (`adapters/`): tokio UDP, in-memory ticket store
//!
//! ## Exchange
//!
//! ```text
//! client                dispatcher :2408          session :2409+n
//!   | --[1|roster]-------->|                            |
//!   |                      |--spawn------------------->|
//!   |<-------------------------------[2|tickets]-------|  resend every 4s
//!   | --[3|"ack"]------------------------------------->|  3rd fire: give up
//! ```
//!
//! A duplicate request gets the identical reply bytes again; the store is
//! consulted once per session.

pub mod adapters;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use adapters::{InMemoryTicketStore, UdpBinder};
pub use domain::{
    Frame, PortWindow, SendPolicy, ServerSession, SessionConfig, SessionOutcome, UplinkConfig,
    DEFAULT_DISPATCHER_PORT, DEFAULT_SESSION_PORT_START, DEFAULT_SESSION_PORT_WIDTH,
    RESEND_TIMEOUT,
};
pub use error::{DispatchError, SessionError, UplinkError};
pub use ports::{DatagramTransport, StoreError, TicketStore, TransportBinder, TransportError};
pub use service::{Dispatcher, SessionReport, SessionTask, TicketIssuer, UplinkClient};
