//! Ticket lookup service for passenger devices.
//!
//! Request: one encoded customer number. Reply: an encoded `LookupReply`
//! sent back to the requesting address.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use fare_types::{decode, encode, CodecError, CustomerNumber, LookupReply};
use fc_03_session_protocol::{DatagramTransport, TransportError};
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::controller::VehicleController;

/// How long a device waits for a lookup reply.
pub const LOOKUP_TIMEOUT: Duration = Duration::from_secs(4);

pub struct LookupServer<T> {
    transport: T,
    controller: Arc<VehicleController>,
}

impl<T: DatagramTransport> LookupServer<T> {
    pub fn new(transport: T, controller: Arc<VehicleController>) -> Self {
        Self {
            transport,
            controller,
        }
    }

    /// Answer one request. Undecodable requests are dropped.
    pub async fn serve_one(&self) -> Result<(), TransportError> {
        let (payload, from) = self.transport.recv_datagram().await?;
        let customer = match decode::<CustomerNumber>(&payload) {
            Ok(customer) => customer,
            Err(e) => {
                warn!(error = %e, %from, "Lookup request not recognized; dropped");
                return Ok(());
            }
        };

        let reply = match self.controller.lookup(customer) {
            Some(ticket) => LookupReply::Found(ticket),
            None => {
                debug!(%customer, "Ticket not found");
                LookupReply::NotFound
            }
        };
        let bytes = match encode(&reply) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "Could not encode lookup reply");
                return Ok(());
            }
        };
        if let Err(e) = self.transport.send_datagram(&bytes, from).await {
            warn!(error = %e, %from, "Could not send lookup reply");
        }
        Ok(())
    }

    /// Serve until the socket closes.
    pub async fn run(self) {
        let local = self.transport.local_addr().ok();
        info!(?local, "Ticket lookup service started");
        loop {
            match self.serve_one().await {
                Ok(()) => {}
                Err(TransportError::Closed) => {
                    info!("Lookup socket closed");
                    return;
                }
                Err(e) => warn!(error = %e, "I/O exception; could not receive datagram"),
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum LookupError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Malformed lookup reply: {0}")]
    Codec(#[from] CodecError),

    #[error("No lookup reply within {0:?}")]
    Timeout(Duration),
}

/// Ask the vehicle at `vehicle` for `customer`'s ticket.
///
/// Datagrams from other senders are ignored while waiting.
pub async fn request_ticket<T: DatagramTransport + ?Sized>(
    transport: &T,
    vehicle: SocketAddr,
    customer: CustomerNumber,
    wait: Duration,
) -> Result<LookupReply, LookupError> {
    transport.send_datagram(&encode(&customer)?, vehicle).await?;
    timeout(wait, await_reply(transport, vehicle))
        .await
        .map_err(|_| LookupError::Timeout(wait))?
}

async fn await_reply<T: DatagramTransport + ?Sized>(
    transport: &T,
    vehicle: SocketAddr,
) -> Result<LookupReply, LookupError> {
    loop {
        let (payload, from) = transport.recv_datagram().await?;
        if from == vehicle {
            return Ok(decode(&payload)?);
        }
        debug!(%from, "Datagram from unexpected sender; dropped");
    }
}
