//! Vehicle-side presence cycle driver.

use std::sync::Arc;

use fare_types::{BeaconMessage, PassengerRoster, Zone};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::domain::{PresenceConfig, PresenceCycle, RosterCollector, SendOutcome};
use crate::error::PresenceError;
use crate::ports::BeaconSocket;

/// Sends pings and turns the collected pongs into a stable roster.
pub struct PresenceTracker {
    config: PresenceConfig,
    socket: Arc<dyn BeaconSocket>,
    collector: Arc<RosterCollector>,
}

impl PresenceTracker {
    pub fn new(
        config: PresenceConfig,
        socket: Arc<dyn BeaconSocket>,
        collector: Arc<RosterCollector>,
    ) -> Self {
        Self {
            config,
            socket,
            collector,
        }
    }

    pub fn config(&self) -> &PresenceConfig {
        &self.config
    }

    /// Run one departure cycle and return the roster observed in `zone`.
    ///
    /// Each interval: send a ping, wait, then fold the pongs that arrived.
    /// Replies only count after a ping actually went out.
    ///
    /// # Errors
    ///
    /// `BeaconBudgetExhausted` once `max_send_failures` pings in a row fail.
    pub async fn run_cycle(&self, zone: Zone) -> Result<PassengerRoster, PresenceError> {
        let mut cycle = PresenceCycle::new(zone, &self.config);

        let stale = self.collector.take(zone);
        if !stale.replies.is_empty() {
            debug!(count = stale.replies.len(), "[fc-02] Discarding stale pongs");
        }
        info!(%zone, target = %self.config.beacon_target, "[fc-02] Presence cycle started");

        loop {
            let outcome = match self
                .socket
                .send_beacon(BeaconMessage::Ping, self.config.beacon_target)
                .await
            {
                Ok(()) => {
                    debug!(beacon = cycle.beacons_sent() + 1, "[fc-02] Ping sent");
                    Some(cycle.beacon_sent())
                }
                Err(e) => {
                    warn!(error = %e, "[fc-02] Ping unsuccessful; dropped");
                    match cycle.beacon_failed() {
                        SendOutcome::Abort { failures } => {
                            return Err(PresenceError::BeaconBudgetExhausted { failures });
                        }
                        _ => None,
                    }
                }
            };

            sleep(self.config.beacon_interval).await;

            if outcome.is_some() {
                let harvest = self.collector.take(zone);
                debug!(
                    replies = harvest.replies.len(),
                    muted = harvest.muted,
                    "[fc-02] Folding pongs"
                );
                cycle.fold(harvest.replies);
            }

            if outcome == Some(SendOutcome::Complete) {
                break;
            }
        }

        let roster = cycle.into_roster();
        info!(%zone, passengers = roster.len(), "[fc-02] Presence cycle complete");
        Ok(roster)
    }
}
