//! Presence configuration with production defaults.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

use fare_types::CustomerNumber;

/// Multicast group devices listen on.
pub const DEFAULT_GROUP: Ipv4Addr = Ipv4Addr::new(239, 0, 1, 139);
/// Port devices receive beacons on.
pub const DEFAULT_BEACON_PORT: u16 = 2224;
/// Port the vehicle sends pings from.
pub const DEFAULT_PING_PORT: u16 = 2222;
/// Port the vehicle receives pongs on.
pub const DEFAULT_PONG_PORT: u16 = 2223;

/// Vehicle-side beacon cycle parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceConfig {
    /// Delay between beacons; replies are folded once per interval.
    pub beacon_interval: Duration,
    /// Successful beacons that complete a cycle.
    pub beacons_per_cycle: u32,
    /// Consecutive send failures that abort a cycle.
    pub max_send_failures: u32,
    /// Where pings are sent (the multicast group in production).
    pub beacon_target: SocketAddr,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            beacon_interval: Duration::from_secs(1),
            beacons_per_cycle: 5,
            max_send_failures: 3,
            beacon_target: SocketAddr::V4(SocketAddrV4::new(DEFAULT_GROUP, DEFAULT_BEACON_PORT)),
        }
    }
}

/// Pong worker pool sizing and overflow policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    pub queue_capacity: usize,
    pub workers: usize,
    /// Wait before retrying a submission to a full queue.
    pub retry_delay: Duration,
    /// Retries before a pong is dropped.
    pub max_submit_retries: u32,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 20,
            workers: 10,
            retry_delay: Duration::from_millis(10),
            max_submit_retries: 50,
        }
    }
}

/// Passenger device parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    pub customer: CustomerNumber,
    /// How long a manual mute lasts before the device answers again.
    pub mute_cooldown: Duration,
    /// Expected spacing of vehicle acks.
    pub ack_window: Duration,
    /// Consecutive empty ack windows before the device reports "not connected".
    pub missed_ack_threshold: u32,
    /// Vehicle port pongs are sent to; the host comes from the ping.
    pub reply_port: u16,
}

impl DeviceConfig {
    pub fn new(customer: CustomerNumber) -> Self {
        Self {
            customer,
            mute_cooldown: Duration::from_secs(60),
            ack_window: Duration::from_secs(60),
            missed_ack_threshold: 3,
            reply_port: DEFAULT_PONG_PORT,
        }
    }
}
