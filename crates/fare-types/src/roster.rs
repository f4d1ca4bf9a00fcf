//! Passenger roster: the customers believed to be aboard, tagged with the
//! zone in which they were observed.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::entities::{CustomerNumber, Zone};

/// Set of customer numbers plus the zone the set was observed in.
///
/// Rosters are values. A component that builds one hands it over; the
/// receiver owns it and nobody keeps writing into it afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassengerRoster {
    zone: Zone,
    passengers: BTreeSet<CustomerNumber>,
}

impl PassengerRoster {
    /// Empty roster for `zone`.
    #[must_use]
    pub fn new(zone: Zone) -> Self {
        Self {
            zone,
            passengers: BTreeSet::new(),
        }
    }

    pub fn zone(&self) -> Zone {
        self.zone
    }

    /// Same passengers, observed in a different zone.
    #[must_use]
    pub fn with_zone(mut self, zone: Zone) -> Self {
        self.zone = zone;
        self
    }

    /// Returns `false` if the customer was already present.
    pub fn insert(&mut self, customer: CustomerNumber) -> bool {
        self.passengers.insert(customer)
    }

    pub fn remove(&mut self, customer: CustomerNumber) -> bool {
        self.passengers.remove(&customer)
    }

    pub fn contains(&self, customer: CustomerNumber) -> bool {
        self.passengers.contains(&customer)
    }

    /// Passengers present in both rosters, tagged with `self`'s zone.
    #[must_use]
    pub fn intersection(&self, other: &PassengerRoster) -> PassengerRoster {
        PassengerRoster {
            zone: self.zone,
            passengers: self
                .passengers
                .intersection(&other.passengers)
                .copied()
                .collect(),
        }
    }

    /// Passengers of `self` that are absent from `other`.
    #[must_use]
    pub fn without(&self, other: &PassengerRoster) -> PassengerRoster {
        PassengerRoster {
            zone: self.zone,
            passengers: self
                .passengers
                .difference(&other.passengers)
                .copied()
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.passengers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passengers.is_empty()
    }

    /// Customers in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = CustomerNumber> + '_ {
        self.passengers.iter().copied()
    }
}

impl Extend<CustomerNumber> for PassengerRoster {
    fn extend<I: IntoIterator<Item = CustomerNumber>>(&mut self, iter: I) {
        self.passengers.extend(iter);
    }
}
