//! Passenger-device side of the beacon exchange.

use std::net::SocketAddr;
use std::sync::Arc;

use fare_types::{decode, BeaconMessage};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::domain::{DeviceConfig, LivenessMonitor, MuteSwitch};
use crate::ports::{BeaconSocket, TransportError};

/// Control messages for a running responder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceCommand {
    Mute,
    Unmute,
    Shutdown,
}

/// Handle to a spawned [`DeviceResponder`].
pub struct DeviceHandle {
    commands: mpsc::Sender<DeviceCommand>,
    connected: watch::Receiver<bool>,
    vehicle: watch::Receiver<Option<SocketAddr>>,
    task: JoinHandle<()>,
}

impl DeviceHandle {
    pub async fn mute(&self) {
        self.send(DeviceCommand::Mute).await;
    }

    pub async fn unmute(&self) {
        self.send(DeviceCommand::Unmute).await;
    }

    /// Stop the responder and wait for it to exit.
    pub async fn shutdown(self) {
        self.send(DeviceCommand::Shutdown).await;
        if let Err(e) = self.task.await {
            warn!(error = %e, "[fc-02] Device responder panicked");
        }
    }

    /// "Connected" indicator; flips false after too many silent ack windows.
    pub fn connected(&self) -> watch::Receiver<bool> {
        self.connected.clone()
    }

    /// Address of the vehicle that last pinged this device.
    pub fn vehicle(&self) -> Option<SocketAddr> {
        *self.vehicle.borrow()
    }

    async fn send(&self, command: DeviceCommand) {
        if self.commands.send(command).await.is_err() {
            debug!(?command, "[fc-02] Device responder already stopped");
        }
    }
}

/// Answers pings with the device's customer number unless muted.
pub struct DeviceResponder {
    config: DeviceConfig,
    socket: Arc<dyn BeaconSocket>,
    mute: MuteSwitch,
    liveness: LivenessMonitor,
    vehicle: watch::Sender<Option<SocketAddr>>,
}

impl DeviceResponder {
    pub fn new(config: DeviceConfig, socket: Arc<dyn BeaconSocket>) -> Self {
        Self {
            mute: MuteSwitch::new(config.mute_cooldown),
            liveness: LivenessMonitor::new(config.missed_ack_threshold),
            config,
            socket,
            vehicle: watch::Sender::new(None),
        }
    }

    /// Spawn the responder loop on the current runtime.
    pub fn spawn(self) -> DeviceHandle {
        let (commands, command_rx) = mpsc::channel(8);
        let (connected_tx, connected) = watch::channel(false);
        let vehicle = self.vehicle.subscribe();
        let task = tokio::spawn(self.run(command_rx, connected_tx));
        DeviceHandle {
            commands,
            connected,
            vehicle,
            task,
        }
    }

    async fn run(
        mut self,
        mut commands: mpsc::Receiver<DeviceCommand>,
        connected: watch::Sender<bool>,
    ) {
        info!(customer = %self.config.customer, "[fc-02] Device waiting for pings");
        let mut ack_deadline = Instant::now() + self.config.ack_window;

        loop {
            tokio::select! {
                biased;

                command = commands.recv() => match command {
                    Some(DeviceCommand::Mute) => {
                        info!(cooldown = ?self.config.mute_cooldown, "[fc-02] Device muted");
                        self.mute.mute(Instant::now());
                    }
                    Some(DeviceCommand::Unmute) => {
                        info!("[fc-02] Device unmuted");
                        self.mute.unmute();
                    }
                    Some(DeviceCommand::Shutdown) | None => break,
                },

                received = self.socket.recv_beacon() => match received {
                    Ok((payload, from)) => {
                        if self.on_datagram(&payload, from).await {
                            ack_deadline = Instant::now() + self.config.ack_window;
                            if self.liveness.ack_received() {
                                connected.send_replace(true);
                            }
                        }
                    }
                    Err(TransportError::Closed) => break,
                    Err(e) => warn!(error = %e, "[fc-02] Device receive failed"),
                },

                () = sleep_until(ack_deadline) => {
                    ack_deadline += self.config.ack_window;
                    if self.liveness.window_missed() {
                        warn!(missed = self.liveness.missed(), "[fc-02] No acks from vehicle; not connected");
                        connected.send_replace(false);
                    }
                }
            }
        }
        debug!("[fc-02] Device responder stopped");
    }

    /// Handle one datagram. Returns `true` if it was an ack.
    async fn on_datagram(&mut self, payload: &[u8], from: SocketAddr) -> bool {
        match decode::<BeaconMessage>(payload) {
            Ok(BeaconMessage::Ping) => {
                self.vehicle.send_if_modified(|vehicle| {
                    let changed = *vehicle != Some(from);
                    *vehicle = Some(from);
                    changed
                });
                let reply = self.mute.answer(self.config.customer, Instant::now());
                let target = SocketAddr::new(from.ip(), self.config.reply_port);
                if let Err(e) = self.socket.send_beacon(reply, target).await {
                    warn!(error = %e, %target, "[fc-02] Could not answer ping");
                }
                false
            }
            Ok(BeaconMessage::Ack) => {
                debug!(vehicle = %from, "[fc-02] Ack received");
                true
            }
            Ok(other) => {
                debug!(?other, "[fc-02] Beacon not meant for devices; dropped");
                false
            }
            Err(e) => {
                warn!(error = %e, "[fc-02] Beacon payload not recognized; dropped");
                false
            }
        }
    }
}
