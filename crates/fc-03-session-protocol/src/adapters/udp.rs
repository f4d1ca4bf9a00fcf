//! `DatagramTransport` over `tokio::net::UdpSocket`.

use std::net::{IpAddr, SocketAddr};

use async_trait::async_trait;
use tokio::net::UdpSocket;

use crate::ports::{DatagramTransport, TransportBinder, TransportError};

/// Largest UDP payload over IPv4.
pub const MAX_DATAGRAM_SIZE: usize = 65_507;

#[async_trait]
impl DatagramTransport for UdpSocket {
    async fn send_datagram(&self, bytes: &[u8], target: SocketAddr) -> Result<(), TransportError> {
        self.send_to(bytes, target).await?;
        Ok(())
    }

    async fn recv_datagram(&self) -> Result<(Vec<u8>, SocketAddr), TransportError> {
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        let (len, from) = self.recv_from(&mut buf).await?;
        buf.truncate(len);
        Ok((buf, from))
    }

    fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(UdpSocket::local_addr(self)?)
    }
}

/// Binds session sockets on a fixed host address.
#[derive(Debug, Clone, Copy)]
pub struct UdpBinder {
    host: IpAddr,
}

impl UdpBinder {
    pub fn new(host: IpAddr) -> Self {
        Self { host }
    }
}

#[async_trait]
impl TransportBinder for UdpBinder {
    type Transport = UdpSocket;

    async fn bind(&self, port: u16) -> Result<UdpSocket, TransportError> {
        Ok(UdpSocket::bind((self.host, port)).await?)
    }
}
