//! Backend accept loop.
//!
//! Every datagram on the well-known port starts a new session on the next
//! port of the window. The window advances even when binding fails, so one
//! busy port cannot stall the rotation.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::issuance::TicketIssuer;
use super::session::{SessionReport, SessionTask};
use crate::domain::{PortWindow, SessionConfig};
use crate::ports::{DatagramTransport, TransportBinder, TransportError};

pub struct Dispatcher<B> {
    socket: Arc<dyn DatagramTransport>,
    binder: B,
    window: PortWindow,
    issuer: Arc<TicketIssuer>,
    config: SessionConfig,
}

impl<B: TransportBinder> Dispatcher<B> {
    pub fn new(
        socket: Arc<dyn DatagramTransport>,
        binder: B,
        window: PortWindow,
        issuer: Arc<TicketIssuer>,
        config: SessionConfig,
    ) -> Self {
        Self {
            socket,
            binder,
            window,
            issuer,
            config,
        }
    }

    /// Receive one datagram and hand it to a fresh session.
    ///
    /// Returns `None` when the session could not be created; the datagram
    /// is dropped and the client will retry.
    pub async fn accept_one(
        &mut self,
    ) -> Result<Option<JoinHandle<SessionReport>>, TransportError> {
        let (payload, from) = self.socket.recv_datagram().await?;
        let port = self.window.next_port();
        info!(%from, port, "[fc-03] Request received; starting session");

        match self.binder.bind(port).await {
            Ok(transport) => {
                let task = SessionTask::new(
                    transport,
                    from,
                    Arc::clone(&self.issuer),
                    self.config.clone(),
                );
                Ok(Some(tokio::spawn(task.run(payload))))
            }
            Err(e) => {
                warn!(port, error = %e, %from, "[fc-03] Session construction failed; datagram dropped");
                Ok(None)
            }
        }
    }

    /// Accept until the listening socket closes.
    pub async fn run(mut self) {
        let local = self.socket.local_addr().ok();
        info!(?local, "[fc-03] Dispatcher accepting requests");
        loop {
            match self.accept_one().await {
                Ok(_) => {}
                Err(TransportError::Closed) => {
                    info!("[fc-03] Dispatcher socket closed");
                    return;
                }
                Err(e) => warn!(error = %e, "[fc-03] I/O exception; datagram dropped"),
            }
        }
    }

    pub fn window(&self) -> &PortWindow {
        &self.window
    }
}
