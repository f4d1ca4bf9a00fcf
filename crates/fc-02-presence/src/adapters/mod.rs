//! # Adapters Layer
//!
//! - `udp`: `BeaconSocket` over `tokio::net::UdpSocket`

pub mod udp;

pub use udp::{bind_device_socket, bind_ping_socket, bind_pong_socket, MAX_BEACON_SIZE};
