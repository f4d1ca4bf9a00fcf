//! Test utilities for the session protocol.
//!
//! `MemoryNetwork` routes datagrams between `MemoryTransport`s by address,
//! so dispatcher, sessions and clients can run under paused tokio time.
//! Enable with the `test-utils` feature flag.

use std::collections::HashMap;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicU16, AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{mpsc, Mutex as AsyncMutex};

use crate::ports::{DatagramTransport, TransportBinder, TransportError};

type Datagram = (Vec<u8>, SocketAddr);

/// First port handed out for binds on port 0.
const EPHEMERAL_START: u16 = 50_000;

/// Address-routed in-memory datagram network.
///
/// Datagrams to unbound addresses vanish, as with UDP.
pub struct MemoryNetwork {
    host: IpAddr,
    routes: Mutex<HashMap<SocketAddr, mpsc::UnboundedSender<Datagram>>>,
    drops: Mutex<HashMap<SocketAddr, u32>>,
    next_ephemeral: AtomicU16,
}

impl MemoryNetwork {
    /// `host` is the address used by `TransportBinder::bind`.
    pub fn new(host: IpAddr) -> Arc<Self> {
        Arc::new(Self {
            host,
            routes: Mutex::new(HashMap::new()),
            drops: Mutex::new(HashMap::new()),
            next_ephemeral: AtomicU16::new(EPHEMERAL_START),
        })
    }

    /// Bind a transport at `addr`.
    pub fn attach(self: &Arc<Self>, addr: SocketAddr) -> Result<MemoryTransport, TransportError> {
        let mut routes = self.routes.lock();
        if routes.contains_key(&addr) {
            return Err(io::Error::from(io::ErrorKind::AddrInUse).into());
        }
        let (tx, rx) = mpsc::unbounded_channel();
        routes.insert(addr, tx);
        Ok(MemoryTransport {
            network: Arc::clone(self),
            local: addr,
            inbox: AsyncMutex::new(rx),
            sent: Mutex::new(Vec::new()),
            failing_sends: AtomicU32::new(0),
        })
    }

    /// Silently lose the next `count` datagrams addressed to `addr`.
    pub fn drop_next(&self, addr: SocketAddr, count: u32) {
        *self.drops.lock().entry(addr).or_default() += count;
    }

    /// Unbind `addr`; its transport then reports `Closed` once drained.
    pub fn close(&self, addr: SocketAddr) {
        self.routes.lock().remove(&addr);
    }

    pub fn is_bound(&self, addr: SocketAddr) -> bool {
        self.routes.lock().contains_key(&addr)
    }

    fn deliver(&self, from: SocketAddr, bytes: &[u8], target: SocketAddr) {
        {
            let mut drops = self.drops.lock();
            if let Some(pending) = drops.get_mut(&target) {
                if *pending > 0 {
                    *pending -= 1;
                    return;
                }
            }
        }
        if let Some(route) = self.routes.lock().get(&target) {
            let _ = route.send((bytes.to_vec(), from));
        }
    }
}

#[async_trait]
impl TransportBinder for Arc<MemoryNetwork> {
    type Transport = MemoryTransport;

    async fn bind(&self, port: u16) -> Result<MemoryTransport, TransportError> {
        let port = match port {
            0 => self.next_ephemeral.fetch_add(1, Ordering::SeqCst),
            port => port,
        };
        self.attach(SocketAddr::new(self.host, port))
    }
}

/// One bound endpoint of a `MemoryNetwork`.
pub struct MemoryTransport {
    network: Arc<MemoryNetwork>,
    local: SocketAddr,
    inbox: AsyncMutex<mpsc::UnboundedReceiver<Datagram>>,
    sent: Mutex<Vec<Datagram>>,
    failing_sends: AtomicU32,
}

impl MemoryTransport {
    pub fn addr(&self) -> SocketAddr {
        self.local
    }

    /// Make the next `count` sends fail with an I/O error.
    pub fn fail_next_sends(&self, count: u32) {
        self.failing_sends.store(count, Ordering::SeqCst);
    }

    /// Every datagram successfully sent from here, with its target.
    pub fn sent(&self) -> Vec<Datagram> {
        self.sent.lock().clone()
    }
}

impl Drop for MemoryTransport {
    fn drop(&mut self) {
        self.network.close(self.local);
    }
}

#[async_trait]
impl DatagramTransport for MemoryTransport {
    async fn send_datagram(&self, bytes: &[u8], target: SocketAddr) -> Result<(), TransportError> {
        let failing = self
            .failing_sends
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if failing.is_ok() {
            return Err(io::Error::from(io::ErrorKind::BrokenPipe).into());
        }
        self.sent.lock().push((bytes.to_vec(), target));
        self.network.deliver(self.local, bytes, target);
        Ok(())
    }

    async fn recv_datagram(&self) -> Result<(Vec<u8>, SocketAddr), TransportError> {
        self.inbox
            .lock()
            .await
            .recv()
            .await
            .ok_or(TransportError::Closed)
    }

    fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.local)
    }
}
