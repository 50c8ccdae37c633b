//! Datagram Link (C3): a UDP socket bound to all interfaces, with
//! address reuse, accepting pushed REPLY frames from sensors.

use async_trait::async_trait;
use socket2::{Domain, Socket, Type};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tracing::debug;

use super::DatagramLink;

/// Slightly larger than the maximum expected frame (6 + 255).
const MAX_DATAGRAM: usize = 64;

pub struct UdpLink {
    socket: UdpSocket,
}

impl UdpLink {
    pub async fn bind(port: u16) -> std::io::Result<Self> {
        let addr: SocketAddr = ([0, 0, 0, 0], port).into();
        let raw = Socket::new(Domain::IPV4, Type::DGRAM, None)?;
        raw.set_reuse_address(true)?;
        raw.set_nonblocking(true)?;
        raw.bind(&addr.into())?;

        let socket = UdpSocket::from_std(raw.into())?;
        Ok(UdpLink { socket })
    }
}

#[async_trait]
impl DatagramLink for UdpLink {
    async fn recv(&mut self, timeout_s: f64) -> Vec<u8> {
        let mut buf = [0u8; MAX_DATAGRAM];
        let deadline = Duration::from_secs_f64(timeout_s.max(0.0));

        match tokio::time::timeout(deadline, self.socket.recv_from(&mut buf)).await {
            Ok(Ok((n, _src))) => buf[..n].to_vec(),
            Ok(Err(e)) => {
                debug!(error = %e, "udp recv error");
                Vec::new()
            }
            Err(_) => Vec::new(),
        }
    }

    async fn close(&mut self) {
        // `UdpSocket` has no explicit close; dropping releases the fd.
        // Present for contract symmetry with `Link::close`.
    }
}
