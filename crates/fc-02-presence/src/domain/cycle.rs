//! Presence cycle state machine
//!
//! Pure bookkeeping for one departure cycle: counts beacons, tracks the
//! consecutive failure budget and folds reply sets into the roster.

use fare_types::{PassengerRoster, Zone};

use super::config::PresenceConfig;

/// What the tracker should do after a send attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Keep beaconing.
    Continue,
    /// Enough beacons went out; the next fold is the last one.
    Complete,
    /// The failure budget is spent.
    Abort { failures: u32 },
}

#[derive(Debug, Clone)]
pub struct PresenceCycle {
    zone: Zone,
    roster: Option<PassengerRoster>,
    beacons_sent: u32,
    consecutive_failures: u32,
    beacons_per_cycle: u32,
    max_send_failures: u32,
}

impl PresenceCycle {
    pub fn new(zone: Zone, config: &PresenceConfig) -> Self {
        Self {
            zone,
            roster: None,
            beacons_sent: 0,
            consecutive_failures: 0,
            beacons_per_cycle: config.beacons_per_cycle,
            max_send_failures: config.max_send_failures,
        }
    }

    pub fn beacon_sent(&mut self) -> SendOutcome {
        self.beacons_sent += 1;
        self.consecutive_failures = 0;
        if self.is_complete() {
            SendOutcome::Complete
        } else {
            SendOutcome::Continue
        }
    }

    pub fn beacon_failed(&mut self) -> SendOutcome {
        self.consecutive_failures += 1;
        if self.consecutive_failures >= self.max_send_failures {
            SendOutcome::Abort {
                failures: self.consecutive_failures,
            }
        } else {
            SendOutcome::Continue
        }
    }

    /// Fold one interval's replies: adopt on the first tick, intersect after.
    pub fn fold(&mut self, replies: PassengerRoster) {
        let replies = replies.with_zone(self.zone);
        self.roster = Some(match self.roster.take() {
            None => replies,
            Some(previous) => previous.intersection(&replies),
        });
    }

    pub fn is_complete(&self) -> bool {
        self.beacons_sent >= self.beacons_per_cycle
    }

    pub fn beacons_sent(&self) -> u32 {
        self.beacons_sent
    }

    /// Current roster; `None` until the first fold.
    pub fn roster(&self) -> Option<&PassengerRoster> {
        self.roster.as_ref()
    }

    /// Final roster. A cycle that never folded yields an empty roster.
    pub fn into_roster(self) -> PassengerRoster {
        self.roster
            .unwrap_or_else(|| PassengerRoster::new(self.zone))
    }
}
