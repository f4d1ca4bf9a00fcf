//! Timing and retry parameters shared by both ends of a session.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

/// Backend port clients send requests to.
pub const DEFAULT_DISPATCHER_PORT: u16 = 2408;
/// First port of the session window.
pub const DEFAULT_SESSION_PORT_START: u16 = 2409;
/// Number of ports in the session window.
pub const DEFAULT_SESSION_PORT_WIDTH: u16 = 2000;
/// Resend timeout used by server and client alike.
pub const RESEND_TIMEOUT: Duration = Duration::from_secs(4);

/// Retry policy for a single datagram send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendPolicy {
    /// Total attempts, the first one included.
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for SendPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_millis(10),
        }
    }
}

/// Server-side session parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub resend_timeout: Duration,
    /// Timer fires without an ack that end the session.
    pub max_timer_fires: u32,
    pub send: SendPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            resend_timeout: RESEND_TIMEOUT,
            max_timer_fires: 3,
            send: SendPolicy::default(),
        }
    }
}

/// Client-side parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UplinkConfig {
    pub dispatcher: SocketAddr,
    pub resend_timeout: Duration,
    /// Requests sent before the call gives up.
    pub max_requests: u32,
    /// How long an acknowledged session may keep resending its reply if
    /// the ack was lost. Matches the server's resend budget.
    pub reply_linger: Duration,
    pub send: SendPolicy,
}

impl UplinkConfig {
    pub fn new(dispatcher: SocketAddr) -> Self {
        Self {
            dispatcher,
            resend_timeout: RESEND_TIMEOUT,
            max_requests: 5,
            reply_linger: RESEND_TIMEOUT * 3,
            send: SendPolicy::default(),
        }
    }
}

impl Default for UplinkConfig {
    fn default() -> Self {
        Self::new(SocketAddr::V4(SocketAddrV4::new(
            Ipv4Addr::LOCALHOST,
            DEFAULT_DISPATCHER_PORT,
        )))
    }
}
