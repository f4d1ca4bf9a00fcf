//! tokio UDP sockets as `BeaconSocket`s.
//!
//! # Sockets
//!
//! - vehicle ping socket: bound to the ping port, multicast TTL 1, loopback on
//! - vehicle pong socket: bound to the pong port, unicast acks go out from it
//! - device socket: bound to the beacon port and joined to the group

use std::io;
use std::net::{Ipv4Addr, SocketAddr};

use async_trait::async_trait;
use fare_types::{encode, BeaconMessage};
use tokio::net::UdpSocket;
use tracing::debug;

use crate::ports::{BeaconSocket, TransportError};

/// Largest beacon datagram accepted.
pub const MAX_BEACON_SIZE: usize = 128;

#[async_trait]
impl BeaconSocket for UdpSocket {
    async fn send_beacon(
        &self,
        message: BeaconMessage,
        target: SocketAddr,
    ) -> Result<(), TransportError> {
        let bytes = encode(&message)?;
        self.send_to(&bytes, target).await?;
        Ok(())
    }

    async fn recv_beacon(&self) -> Result<(Vec<u8>, SocketAddr), TransportError> {
        let mut buf = [0u8; MAX_BEACON_SIZE];
        let (len, from) = self.recv_from(&mut buf).await?;
        Ok((buf[..len].to_vec(), from))
    }
}

/// Bind the vehicle's ping socket.
pub async fn bind_ping_socket(local: SocketAddr) -> io::Result<UdpSocket> {
    let socket = UdpSocket::bind(local).await?;
    socket.set_multicast_ttl_v4(1)?;
    socket.set_multicast_loop_v4(true)?;
    debug!(local = %socket.local_addr()?, "[fc-02] Ping socket bound");
    Ok(socket)
}

/// Bind a unicast socket (the vehicle's pong socket).
pub async fn bind_pong_socket(local: SocketAddr) -> io::Result<UdpSocket> {
    let socket = UdpSocket::bind(local).await?;
    debug!(local = %socket.local_addr()?, "[fc-02] Pong socket bound");
    Ok(socket)
}

/// Bind a device socket on `port` and join `group` when it is multicast.
pub async fn bind_device_socket(port: u16, group: Ipv4Addr) -> io::Result<UdpSocket> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, port)).await?;
    if group.is_multicast() {
        socket.join_multicast_v4(group, Ipv4Addr::UNSPECIFIED)?;
    }
    debug!(local = %socket.local_addr()?, %group, "[fc-02] Device socket bound");
    Ok(socket)
}
