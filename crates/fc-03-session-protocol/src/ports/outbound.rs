//! # Driven Ports (Outbound SPI)
//!
//! - `DatagramTransport`: one bound datagram socket
//! - `TransportBinder`: binds session sockets for the dispatcher
//! - `TicketStore`: the backend system of record for tickets

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use fare_types::{PassengerRoster, TicketList};
use thiserror::Error;

/// A bound datagram socket.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; a session task owns its transport
/// while the dispatcher shares its accept socket.
#[async_trait]
pub trait DatagramTransport: Send + Sync {
    async fn send_datagram(&self, bytes: &[u8], target: SocketAddr) -> Result<(), TransportError>;

    async fn recv_datagram(&self) -> Result<(Vec<u8>, SocketAddr), TransportError>;

    fn local_addr(&self) -> Result<SocketAddr, TransportError>;
}

#[async_trait]
impl<T: DatagramTransport + ?Sized> DatagramTransport for Arc<T> {
    async fn send_datagram(&self, bytes: &[u8], target: SocketAddr) -> Result<(), TransportError> {
        (**self).send_datagram(bytes, target).await
    }

    async fn recv_datagram(&self) -> Result<(Vec<u8>, SocketAddr), TransportError> {
        (**self).recv_datagram().await
    }

    fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        (**self).local_addr()
    }
}

/// Creates session transports on demand.
#[async_trait]
pub trait TransportBinder: Send + Sync {
    type Transport: DatagramTransport + 'static;

    /// Bind a transport on `port` (0 = any free port).
    async fn bind(&self, port: u16) -> Result<Self::Transport, TransportError>;
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Socket I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Socket closed")]
    Closed,
}

/// Backend ticket service.
///
/// Pricing and zone rules live behind this trait.
#[async_trait]
pub trait TicketStore: Send + Sync {
    /// Valid tickets already held by passengers of `roster`.
    async fn existing_tickets(&self, roster: &PassengerRoster) -> Result<TicketList, StoreError>;

    /// Issue new tickets for every passenger of `roster`.
    async fn issue_tickets(&self, roster: &PassengerRoster) -> Result<TicketList, StoreError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Ticket store unavailable: {0}")]
    Unavailable(String),

    #[error("Ticket store rejected request: {0}")]
    Rejected(String),
}
