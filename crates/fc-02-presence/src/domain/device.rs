//! Device-side state: the time-boxed mute and the ack liveness counter.

use std::time::Duration;

use fare_types::{BeaconMessage, CustomerNumber};
use tokio::time::Instant;

/// Manual mute that re-enables itself after a cooldown.
#[derive(Debug, Clone)]
pub struct MuteSwitch {
    cooldown: Duration,
    muted_until: Option<Instant>,
}

impl MuteSwitch {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            muted_until: None,
        }
    }

    pub fn mute(&mut self, now: Instant) {
        self.muted_until = Some(now + self.cooldown);
    }

    pub fn unmute(&mut self) {
        self.muted_until = None;
    }

    /// Whether the device is muted at `now`. An expired mute is cleared.
    pub fn is_muted(&mut self, now: Instant) -> bool {
        match self.muted_until {
            Some(until) if now < until => true,
            Some(_) => {
                self.muted_until = None;
                false
            }
            None => false,
        }
    }

    /// Beacon a device owned by `customer` answers a ping with.
    pub fn answer(&mut self, customer: CustomerNumber, now: Instant) -> BeaconMessage {
        if self.is_muted(now) {
            BeaconMessage::Inactive
        } else {
            BeaconMessage::Pong(customer)
        }
    }
}

/// Counts consecutive ack windows without an ack.
#[derive(Debug, Clone)]
pub struct LivenessMonitor {
    threshold: u32,
    missed: u32,
    connected: bool,
}

impl LivenessMonitor {
    /// Starts disconnected; the first ack connects.
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            missed: 0,
            connected: false,
        }
    }

    /// Returns `true` if this changed the indicator.
    pub fn ack_received(&mut self) -> bool {
        self.missed = 0;
        let changed = !self.connected;
        self.connected = true;
        changed
    }

    /// An ack window closed empty. Returns `true` if this changed the indicator.
    pub fn window_missed(&mut self) -> bool {
        self.missed = self.missed.saturating_add(1);
        if self.connected && self.missed >= self.threshold {
            self.connected = false;
            return true;
        }
        false
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn missed(&self) -> u32 {
        self.missed
    }
}
