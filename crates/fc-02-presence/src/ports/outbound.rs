//! # Driven Ports (Outbound SPI)
//!
//! The host provides a datagram socket; production code uses
//! `tokio::net::UdpSocket` (see `adapters::udp`).

use std::net::SocketAddr;

use async_trait::async_trait;
use fare_types::{BeaconMessage, CodecError};
use thiserror::Error;

/// Datagram socket carrying beacon traffic.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`: the pong listener and every pool
/// worker share one socket.
#[async_trait]
pub trait BeaconSocket: Send + Sync {
    /// Encode `message` and send it as one datagram to `target`.
    async fn send_beacon(
        &self,
        message: BeaconMessage,
        target: SocketAddr,
    ) -> Result<(), TransportError>;

    /// Wait for the next datagram. Payload is returned undecoded.
    async fn recv_beacon(&self) -> Result<(Vec<u8>, SocketAddr), TransportError>;
}

/// Errors from socket operations.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Socket I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The socket will never deliver again.
    #[error("Socket closed")]
    Closed,
}
