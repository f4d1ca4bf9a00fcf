//! Vehicle-side client of the session protocol.

use std::net::SocketAddr;

use fare_types::{decode, encode, PassengerRoster, TicketList};
use parking_lot::Mutex;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use super::send::send_with_retry;
use crate::domain::{Frame, UplinkConfig, ACK_PAYLOAD, SEQ_ACK, SEQ_REPLY, SEQ_REQUEST};
use crate::error::UplinkError;
use crate::ports::{DatagramTransport, TransportError};

/// Sends rosters to the dispatcher and acknowledges the session's reply.
///
/// One instance is reused for every request; calls must not overlap.
///
/// Replies already acknowledged are remembered for `reply_linger`. If such a
/// reply shows up again (its ack was lost and the session resent it), it is
/// acknowledged once more and never handed to a later call.
pub struct UplinkClient<T> {
    transport: T,
    config: UplinkConfig,
    acked: Mutex<Vec<AckedReply>>,
}

/// A reply this client has acknowledged.
#[derive(Debug)]
struct AckedReply {
    responder: SocketAddr,
    payload: Vec<u8>,
    expires: Instant,
}

impl<T: DatagramTransport> UplinkClient<T> {
    pub fn new(transport: T, config: UplinkConfig) -> Self {
        Self {
            transport,
            config,
            acked: Mutex::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &UplinkConfig {
        &self.config
    }

    /// Request tickets for `roster`.
    ///
    /// The request goes to the dispatcher; the reply comes from a session on
    /// another port, and the ack is sent to wherever the reply came from.
    /// A reply that fails to decode is still acknowledged before the error
    /// is returned, so the session does not keep resending it.
    ///
    /// # Errors
    ///
    /// - `Transport` if a send fails on every attempt
    /// - `NoReply` after `max_requests` unanswered requests
    /// - `MalformedReply` if the reply holds no ticket list
    pub async fn request_tickets(&self, roster: &PassengerRoster) -> Result<TicketList, UplinkError> {
        let request = Frame::encode(SEQ_REQUEST, &encode(roster).map_err(UplinkError::Encode)?);
        let dispatcher = self.config.dispatcher;

        for attempt in 1..=self.config.max_requests {
            send_with_retry(&self.transport, &request, dispatcher, self.config.send).await?;
            debug!(attempt, %dispatcher, passengers = roster.len(), "[fc-03] Waiting for tickets reply");

            let deadline = Instant::now() + self.config.resend_timeout;
            if let Some((payload, responder)) = self.await_reply(deadline).await? {
                self.acknowledge(responder).await?;
                self.remember(responder, &payload);
                let tickets = decode::<TicketList>(&payload).map_err(UplinkError::MalformedReply)?;
                info!(tickets = tickets.len(), %responder, "[fc-03] Tickets received");
                return Ok(tickets);
            }
            warn!(attempt, "[fc-03] Uplink timeout; resending request");
        }

        Err(UplinkError::NoReply {
            requests: self.config.max_requests,
        })
    }

    /// Wait until `deadline` for a fresh reply frame. Anything else is
    /// dropped; resends of an acknowledged reply are acknowledged again.
    async fn await_reply(
        &self,
        deadline: Instant,
    ) -> Result<Option<(Vec<u8>, SocketAddr)>, UplinkError> {
        loop {
            tokio::select! {
                received = self.transport.recv_datagram() => match received {
                    Ok((bytes, from)) => match Frame::parse(&bytes) {
                        Ok(frame) if frame.seq == SEQ_REPLY && self.already_acked(from, frame.payload) => {
                            debug!(%from, "[fc-03] Resent reply of a finished call; acknowledging again");
                            self.acknowledge(from).await?;
                        }
                        Ok(frame) if frame.seq == SEQ_REPLY => {
                            return Ok(Some((frame.payload.to_vec(), from)));
                        }
                        Ok(frame) => debug!(seq = frame.seq, %from, "[fc-03] Unexpected frame; dropped"),
                        Err(e) => debug!(error = %e, %from, "[fc-03] Datagram dropped"),
                    },
                    Err(TransportError::Closed) => return Err(TransportError::Closed.into()),
                    Err(e) => warn!(error = %e, "[fc-03] Receive failed"),
                },
                () = sleep_until(deadline) => return Ok(None),
            }
        }
    }

    fn remember(&self, responder: SocketAddr, payload: &[u8]) {
        let now = Instant::now();
        let mut acked = self.acked.lock();
        acked.retain(|reply| reply.expires > now && reply.responder != responder);
        acked.push(AckedReply {
            responder,
            payload: payload.to_vec(),
            expires: now + self.config.reply_linger,
        });
    }

    /// Whether `payload` from `responder` is a reply this client already acknowledged.
    fn already_acked(&self, responder: SocketAddr, payload: &[u8]) -> bool {
        let now = Instant::now();
        let mut acked = self.acked.lock();
        acked.retain(|reply| reply.expires > now);
        acked
            .iter()
            .any(|reply| reply.responder == responder && reply.payload == payload)
    }

    async fn acknowledge(&self, responder: SocketAddr) -> Result<(), UplinkError> {
        let ack = Frame::encode(SEQ_ACK, &encode(ACK_PAYLOAD).map_err(UplinkError::Encode)?);
        debug!(%responder, "[fc-03] Sending ack");
        send_with_retry(&self.transport, &ack, responder, self.config.send).await?;
        Ok(())
    }
}
