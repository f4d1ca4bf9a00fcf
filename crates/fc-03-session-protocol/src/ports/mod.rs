//! # Ports Layer

pub mod outbound;

pub use outbound::{DatagramTransport, StoreError, TicketStore, TransportBinder, TransportError};
