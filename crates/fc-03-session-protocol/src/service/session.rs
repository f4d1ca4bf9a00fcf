//! Backend session task: serves exactly one client exchange.

use std::net::SocketAddr;
use std::sync::Arc;

use fare_types::{decode, encode, PassengerRoster};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use super::issuance::TicketIssuer;
use super::send::send_with_retry;
use crate::domain::{
    Action, Frame, ServerSession, SessionConfig, SessionOutcome, TimerAction, SEQ_REPLY,
};
use crate::error::SessionError;
use crate::ports::{DatagramTransport, TransportError};

/// Summary of a finished session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub peer: SocketAddr,
    pub outcome: SessionOutcome,
    pub timer_fires: u32,
    /// Replies put on the wire, replays and resends included.
    pub replies_sent: u32,
}

enum Step {
    Continue,
    /// A reply went out; restart the resend timer.
    Rearm,
    Done(SessionOutcome),
}

/// One session bound to its own transport, talking to one peer.
pub struct SessionTask<T> {
    transport: T,
    peer: SocketAddr,
    issuer: Arc<TicketIssuer>,
    config: SessionConfig,
    machine: ServerSession,
    replies_sent: u32,
}

impl<T: DatagramTransport> SessionTask<T> {
    pub fn new(
        transport: T,
        peer: SocketAddr,
        issuer: Arc<TicketIssuer>,
        config: SessionConfig,
    ) -> Self {
        Self {
            machine: ServerSession::new(config.max_timer_fires),
            transport,
            peer,
            issuer,
            config,
            replies_sent: 0,
        }
    }

    /// Process `first` (the datagram that created the session), then serve
    /// the peer until it acknowledges or the retry budget runs out.
    pub async fn run(mut self, first: Vec<u8>) -> SessionReport {
        let local = self.transport.local_addr().ok();
        debug!(peer = %self.peer, ?local, "[fc-03] Session started");

        let mut deadline = Instant::now() + self.config.resend_timeout;
        let mut next = Some(first);

        let outcome = loop {
            let payload = match next.take() {
                Some(payload) => payload,
                None => {
                    tokio::select! {
                        received = self.transport.recv_datagram() => match received {
                            Ok((payload, from)) if from == self.peer => payload,
                            Ok((_, from)) => {
                                debug!(%from, "[fc-03] Datagram from foreign peer; dropped");
                                continue;
                            }
                            Err(TransportError::Closed) => break self.machine.send_failed(),
                            Err(e) => {
                                warn!(error = %e, "[fc-03] I/O exception; datagram dropped");
                                continue;
                            }
                        },
                        () = sleep_until(deadline) => {
                            match self.on_timer().await {
                                Step::Done(outcome) => break outcome,
                                Step::Continue | Step::Rearm => {
                                    deadline = Instant::now() + self.config.resend_timeout;
                                }
                            }
                            continue;
                        }
                    }
                }
            };

            match self.on_datagram(&payload).await {
                Step::Continue => {}
                Step::Rearm => deadline = Instant::now() + self.config.resend_timeout,
                Step::Done(outcome) => break outcome,
            }
        };

        let report = SessionReport {
            peer: self.peer,
            outcome,
            timer_fires: self.machine.timer_fires(),
            replies_sent: self.replies_sent,
        };
        match outcome {
            SessionOutcome::Acknowledged => {
                info!(peer = %self.peer, "[fc-03] Ack from client received; session closed")
            }
            _ => warn!(peer = %self.peer, ?outcome, "[fc-03] Session terminated without ack"),
        }
        report
    }

    async fn on_datagram(&mut self, payload: &[u8]) -> Step {
        let frame = match Frame::parse(payload) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "[fc-03] Datagram dropped");
                return Step::Continue;
            }
        };

        match self.machine.on_datagram(&frame) {
            Action::Serve(body) => match self.serve(body).await {
                Ok(reply) => {
                    if self.send(&reply).await.is_err() {
                        return Step::Done(self.machine.send_failed());
                    }
                    self.machine.reply_sent(reply);
                    Step::Rearm
                }
                Err(e) => {
                    warn!(error = %e, "[fc-03] Could not process request; datagram dropped");
                    Step::Continue
                }
            },
            Action::Replay(reply) => {
                info!(peer = %self.peer, "[fc-03] Duplicate request; resending reply");
                if self.send(&reply).await.is_err() {
                    return Step::Done(self.machine.send_failed());
                }
                Step::Rearm
            }
            Action::Ignore => {
                warn!(seq = frame.seq, "[fc-03] Unrecognized sequence number; datagram dropped");
                Step::Continue
            }
            Action::Terminate(outcome) => Step::Done(outcome),
        }
    }

    async fn on_timer(&mut self) -> Step {
        match self.machine.on_timer() {
            TimerAction::Resend(reply) => {
                info!(fires = self.machine.timer_fires(), "[fc-03] Session timeout; resending");
                if self.send(&reply).await.is_err() {
                    return Step::Done(self.machine.send_failed());
                }
                Step::Rearm
            }
            TimerAction::Rearm => {
                debug!(fires = self.machine.timer_fires(), "[fc-03] Session timeout with no reply pending");
                Step::Continue
            }
            TimerAction::Terminate(outcome) => Step::Done(outcome),
        }
    }

    /// Decode the roster, resolve its tickets and build the reply frame.
    async fn serve(&self, body: &[u8]) -> Result<Vec<u8>, SessionError> {
        let roster: PassengerRoster = decode(body)?;
        let tickets = self.issuer.tickets_for(&roster).await?;
        debug!(passengers = roster.len(), tickets = tickets.len(), "[fc-03] Request served");
        Ok(Frame::encode(SEQ_REPLY, &encode(&tickets)?))
    }

    async fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        send_with_retry(&self.transport, bytes, self.peer, self.config.send).await?;
        self.replies_sent += 1;
        Ok(())
    }
}
