//! # Adapters Layer
//!
//! - `udp`: tokio UDP transport and session binder
//! - `memory_store`: in-memory `TicketStore`

pub mod memory_store;
pub mod udp;

pub use memory_store::InMemoryTicketStore;
pub use udp::{UdpBinder, MAX_DATAGRAM_SIZE};
