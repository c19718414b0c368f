//! UDP socket helpers for discovery broadcasts and preconnect probes.
//!
//! Sockets are created through `std::net` first so broadcast can be
//! enabled before the socket is handed to Tokio.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use tokio::net::UdpSocket;

use crate::TransportError;

/// Largest datagram any lanlobby component sends or expects to receive.
pub const MAX_DATAGRAM_LEN: usize = 1024;

/// Binds an ephemeral, broadcast-enabled socket for sending advertisements.
pub fn bind_broadcast_sender() -> Result<UdpSocket, TransportError> {
    bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0), true)
}

/// Binds a broadcast-capable socket that receives on `port` on all
/// interfaces. Fails if the port is already taken.
pub fn bind_listener(port: u16) -> Result<UdpSocket, TransportError> {
    bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port), true)
}

/// Binds a plain datagram socket at `addr` (no broadcast).
pub fn bind_datagram(addr: SocketAddr) -> Result<UdpSocket, TransportError> {
    bind(addr, false)
}

fn bind(addr: SocketAddr, broadcast: bool) -> Result<UdpSocket, TransportError> {
    let bind_err = |source| TransportError::BindFailed {
        addr: addr.to_string(),
        source,
    };
    let std_socket = std::net::UdpSocket::bind(addr).map_err(bind_err)?;
    std_socket.set_nonblocking(true).map_err(bind_err)?;
    if broadcast {
        std_socket.set_broadcast(true).map_err(bind_err)?;
    }
    let socket = UdpSocket::from_std(std_socket).map_err(bind_err)?;
    tracing::debug!(%addr, broadcast, "udp socket bound");
    Ok(socket)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bind_listener_reports_port_in_use() {
        let first = bind_listener(0).unwrap();
        let port = first.local_addr().unwrap().port();

        let err = bind_listener(port).unwrap_err();
        assert!(matches!(err, TransportError::BindFailed { .. }));
        assert!(err.to_string().contains(&port.to_string()));
    }

    #[tokio::test]
    async fn test_datagram_roundtrip_on_loopback() {
        let receiver = bind_datagram("127.0.0.1:0".parse().unwrap()).unwrap();
        let sender = bind_broadcast_sender().unwrap();
        let target = receiver.local_addr().unwrap();

        sender.send_to(b"ping", target).await.unwrap();

        let mut buf = [0u8; MAX_DATAGRAM_LEN];
        let (len, _) = receiver.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..len], b"ping");
    }
}
