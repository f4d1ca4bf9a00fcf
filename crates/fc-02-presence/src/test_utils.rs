//! Test utilities for presence.
//!
//! In-memory `BeaconSocket` pairs so tests can run under paused tokio time
//! without real sockets. Enable with the `test-utils` feature flag.

use std::net::SocketAddr;

use async_trait::async_trait;
use fare_types::{decode, encode, BeaconMessage};
use parking_lot::Mutex;
use tokio::sync::{mpsc, Mutex as AsyncMutex};

use crate::ports::{BeaconSocket, TransportError};

type Datagram = (Vec<u8>, SocketAddr);

/// One end of an in-memory datagram link.
///
/// Everything sent from one end arrives at the other regardless of the
/// target address; targets are recorded for assertions.
pub struct MemoryBeaconSocket {
    local: SocketAddr,
    peer: mpsc::UnboundedSender<Datagram>,
    inbox: AsyncMutex<mpsc::UnboundedReceiver<Datagram>>,
    sent: Mutex<Vec<(BeaconMessage, SocketAddr)>>,
}

impl MemoryBeaconSocket {
    /// Two connected ends with the given local addresses.
    pub fn pair(a: SocketAddr, b: SocketAddr) -> (Self, Self) {
        let (to_b, b_inbox) = mpsc::unbounded_channel();
        let (to_a, a_inbox) = mpsc::unbounded_channel();
        (
            Self::new(a, to_b, a_inbox),
            Self::new(b, to_a, b_inbox),
        )
    }

    fn new(
        local: SocketAddr,
        peer: mpsc::UnboundedSender<Datagram>,
        inbox: mpsc::UnboundedReceiver<Datagram>,
    ) -> Self {
        Self {
            local,
            peer,
            inbox: AsyncMutex::new(inbox),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local
    }

    /// Every beacon sent from this end, with its target.
    pub fn sent(&self) -> Vec<(BeaconMessage, SocketAddr)> {
        self.sent.lock().clone()
    }

    /// Receive and decode the next beacon.
    pub async fn next_beacon(&self) -> Result<(BeaconMessage, SocketAddr), TransportError> {
        let (payload, from) = self.recv_beacon().await?;
        Ok((decode(&payload)?, from))
    }

    /// Send raw bytes, bypassing the codec.
    pub fn send_raw(&self, payload: Vec<u8>) -> Result<(), TransportError> {
        self.peer
            .send((payload, self.local))
            .map_err(|_| TransportError::Closed)
    }
}

#[async_trait]
impl BeaconSocket for MemoryBeaconSocket {
    async fn send_beacon(
        &self,
        message: BeaconMessage,
        target: SocketAddr,
    ) -> Result<(), TransportError> {
        self.sent.lock().push((message, target));
        self.send_raw(encode(&message)?)
    }

    async fn recv_beacon(&self) -> Result<(Vec<u8>, SocketAddr), TransportError> {
        self.inbox
            .lock()
            .await
            .recv()
            .await
            .ok_or(TransportError::Closed)
    }
}
