//! Roster under construction, shared by every pong worker.

use fare_types::{CustomerNumber, PassengerRoster, Zone};
use parking_lot::Mutex;

/// Replies gathered since the previous take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Harvest {
    pub replies: PassengerRoster,
    /// Devices that answered `Inactive`.
    pub muted: usize,
}

#[derive(Debug, Default)]
struct Pending {
    replies: PassengerRoster,
    muted: usize,
}

/// Single-mutex accumulator. Workers record into it, the tracker takes the
/// contents by value once per tick and leaves an empty collector behind.
#[derive(Debug, Default)]
pub struct RosterCollector {
    pending: Mutex<Pending>,
}

impl RosterCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, customer: CustomerNumber) {
        self.pending.lock().replies.insert(customer);
    }

    pub fn record_muted(&self) {
        self.pending.lock().muted += 1;
    }

    /// Hand over everything recorded so far, tagged with `zone`.
    pub fn take(&self, zone: Zone) -> Harvest {
        let pending = std::mem::take(&mut *self.pending.lock());
        Harvest {
            replies: pending.replies.with_zone(zone),
            muted: pending.muted,
        }
    }

    pub fn len(&self) -> usize {
        self.pending.lock().replies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
