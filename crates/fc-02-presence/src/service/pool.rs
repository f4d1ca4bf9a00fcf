//! Bounded executor for pong datagrams.
//!
//! A fixed set of workers drains a bounded queue. When the queue is full the
//! submitting task waits `retry_delay` and tries again, up to
//! `max_submit_retries` times, then drops the pong.

use std::net::SocketAddr;
use std::sync::Arc;

use fare_types::{decode, BeaconMessage};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::domain::{PoolConfig, RosterCollector};
use crate::error::PresenceError;
use crate::ports::{BeaconSocket, TransportError};

/// One received pong datagram.
#[derive(Debug, Clone)]
pub struct PongJob {
    pub payload: Vec<u8>,
    pub from: SocketAddr,
}

pub struct PongWorkerPool {
    sender: mpsc::Sender<PongJob>,
    /// Shared by the workers; held here too so the queue outlives them.
    queue: Arc<Mutex<mpsc::Receiver<PongJob>>>,
    config: PoolConfig,
    workers: Vec<JoinHandle<()>>,
}

impl PongWorkerPool {
    /// Spawn the workers. Must be called inside a tokio runtime.
    pub fn start(
        config: PoolConfig,
        collector: Arc<RosterCollector>,
        socket: Arc<dyn BeaconSocket>,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let queue = Arc::new(Mutex::new(receiver));

        let workers = (0..config.workers)
            .map(|id| {
                let receiver = Arc::clone(&queue);
                let collector = Arc::clone(&collector);
                let socket = Arc::clone(&socket);
                tokio::spawn(async move {
                    loop {
                        let job = receiver.lock().await.recv().await;
                        let Some(job) = job else { break };
                        handle_pong(job, &collector, socket.as_ref()).await;
                    }
                    debug!(worker = id, "[fc-02] Pong worker stopped");
                })
            })
            .collect();

        info!(
            workers = config.workers,
            queue = config.queue_capacity,
            "[fc-02] Pong worker pool started"
        );
        Self {
            sender,
            queue,
            config,
            workers,
        }
    }

    /// Queue a pong, waiting out a full queue for a bounded number of retries.
    ///
    /// Returns the number of retries it took.
    ///
    /// # Errors
    ///
    /// - `PoolSaturated` when every retry found the queue full (pong dropped)
    /// - `PoolClosed` when the workers are gone
    pub async fn submit(&self, job: PongJob) -> Result<u32, PresenceError> {
        let mut job = job;
        let mut retries = 0;
        loop {
            match self.sender.try_send(job) {
                Ok(()) => return Ok(retries),
                Err(mpsc::error::TrySendError::Full(rejected)) => {
                    if retries == self.config.max_submit_retries {
                        warn!(from = %rejected.from, retries, "[fc-02] Pong queue full; dropped");
                        return Err(PresenceError::PoolSaturated { retries });
                    }
                    debug!("[fc-02] Rejected from queue; retrying after delay");
                    retries += 1;
                    job = rejected;
                    sleep(self.config.retry_delay).await;
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    return Err(PresenceError::PoolClosed);
                }
            }
        }
    }

    /// Jobs waiting for a worker.
    pub fn queued(&self) -> usize {
        self.config.queue_capacity.max(1) - self.sender.capacity()
    }

    /// Stop accepting jobs and wait for queued ones to finish.
    pub async fn shutdown(self) {
        drop(self.sender);
        drop(self.queue);
        for worker in self.workers {
            if let Err(e) = worker.await {
                warn!(error = %e, "[fc-02] Pong worker panicked");
            }
        }
    }
}

/// Decode one pong, record the passenger and acknowledge the device.
async fn handle_pong(job: PongJob, collector: &RosterCollector, socket: &dyn BeaconSocket) {
    match decode::<BeaconMessage>(&job.payload) {
        Ok(BeaconMessage::Pong(customer)) => {
            collector.record(customer);
            if let Err(e) = socket.send_beacon(BeaconMessage::Ack, job.from).await {
                warn!(error = %e, device = %job.from, "[fc-02] Could not ack pong");
            }
        }
        Ok(BeaconMessage::Inactive) => {
            debug!(device = %job.from, "[fc-02] Device is muted");
            collector.record_muted();
        }
        Ok(other) => {
            debug!(?other, device = %job.from, "[fc-02] Unexpected beacon on pong port; dropped");
        }
        Err(e) => {
            warn!(error = %e, device = %job.from, "[fc-02] Invalid pong payload; dropped");
        }
    }
}

/// Receive pongs forever and hand each one to the pool.
///
/// Receive errors are logged and skipped; only a closed socket or pool ends
/// the loop.
pub async fn serve_pongs(socket: Arc<dyn BeaconSocket>, pool: Arc<PongWorkerPool>) {
    loop {
        match socket.recv_beacon().await {
            Ok((payload, from)) => match pool.submit(PongJob { payload, from }).await {
                Ok(_) | Err(PresenceError::PoolSaturated { .. }) => {}
                Err(e) => {
                    warn!(error = %e, "[fc-02] Pong listener stopping");
                    return;
                }
            },
            Err(TransportError::Closed) => {
                info!("[fc-02] Pong socket closed");
                return;
            }
            Err(e) => warn!(error = %e, "[fc-02] Could not receive pong; dropping"),
        }
    }
}
