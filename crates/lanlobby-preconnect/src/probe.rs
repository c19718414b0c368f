//! Client-side probe.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use lanlobby_protocol::{
    JsonCodec, PreconnectQuery, PreconnectResponse, PreconnectVerdict, decode_datagram,
    encode_datagram,
};
use lanlobby_transport::udp::{self, MAX_DATAGRAM_LEN};
use tokio::net::UdpSocket;
use tracing::debug;

use crate::PreconnectConfig;

/// Outcome of a probe as seen by the client.
///
/// The first four mirror the host's verdicts; the rest describe why no
/// verdict was obtained and never travel on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PreconnectResult {
    Ok,
    BadPassword,
    LobbyFull,
    VersionMismatch,
    /// No response within the deadline.
    Timeout,
    /// The probe could not be sent or received.
    NetworkError,
    /// A response arrived but could not be decoded.
    Unknown,
}

impl PreconnectResult {
    pub fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl From<PreconnectVerdict> for PreconnectResult {
    fn from(verdict: PreconnectVerdict) -> Self {
        match verdict {
            PreconnectVerdict::Ok => Self::Ok,
            PreconnectVerdict::BadPassword => Self::BadPassword,
            PreconnectVerdict::LobbyFull => Self::LobbyFull,
            PreconnectVerdict::VersionMismatch => Self::VersionMismatch,
        }
    }
}

impl fmt::Display for PreconnectResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "OK"),
            Self::BadPassword => write!(f, "BadPassword"),
            Self::LobbyFull => write!(f, "LobbyFull"),
            Self::VersionMismatch => write!(f, "VersionMismatch"),
            Self::Timeout => write!(f, "Timeout"),
            Self::NetworkError => write!(f, "NetworkError"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Asks the preconnect responder at `target` whether a join with these
/// credentials would be accepted.
///
/// Waits at most `config.deadline()`. Never fails: every problem maps to a
/// [`PreconnectResult`].
pub async fn probe(
    target: SocketAddr,
    password: &str,
    player_version: u32,
    player_name: &str,
    config: &PreconnectConfig,
) -> PreconnectResult {
    let query = PreconnectQuery::QueryJoin {
        password: password.to_string(),
        player_version,
        player_name: player_name.to_string(),
    };

    let result = match tokio::time::timeout(config.deadline(), exchange(target, &query)).await {
        Ok(result) => result,
        Err(_) => PreconnectResult::Timeout,
    };
    debug!(%target, %result, "preconnect probe finished");
    result
}

async fn exchange(target: SocketAddr, query: &PreconnectQuery) -> PreconnectResult {
    let codec = JsonCodec;
    let local = match target.ip() {
        IpAddr::V4(_) => SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
        IpAddr::V6(_) => SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0),
    };
    let socket = match udp::bind_datagram(local) {
        Ok(socket) => socket,
        Err(e) => {
            debug!(error = %e, "cannot open probe socket");
            return PreconnectResult::NetworkError;
        }
    };
    let bytes = match encode_datagram(&codec, query) {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!(error = %e, "cannot encode probe");
            return PreconnectResult::Unknown;
        }
    };
    if let Err(e) = socket.send_to(&bytes, target).await {
        debug!(error = %e, %target, "probe send failed");
        return PreconnectResult::NetworkError;
    }

    receive_verdict(&socket, target, &codec).await
}

/// Reads until a datagram from `target`'s port arrives. Traffic from other
/// ports is skipped. The source address is not compared: a responder bound
/// to every interface may answer from another of its addresses.
async fn receive_verdict(
    socket: &UdpSocket,
    target: SocketAddr,
    codec: &JsonCodec,
) -> PreconnectResult {
    let mut buf = [0u8; MAX_DATAGRAM_LEN];
    loop {
        let (len, from) = match socket.recv_from(&mut buf).await {
            Ok(received) => received,
            Err(e) => {
                debug!(error = %e, "probe receive failed");
                return PreconnectResult::NetworkError;
            }
        };
        if from.port() != target.port() {
            continue;
        }
        return match decode_datagram::<PreconnectResponse>(codec, &buf[..len]) {
            Ok(response) => {
                if !response.reason.is_empty() {
                    debug!(reason = %response.reason, "preconnect verdict reason");
                }
                response.result.into()
            }
            Err(e) => {
                debug!(error = %e, %target, "undecodable preconnect response");
                PreconnectResult::Unknown
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_conversion() {
        assert_eq!(PreconnectResult::from(PreconnectVerdict::Ok), PreconnectResult::Ok);
        assert_eq!(
            PreconnectResult::from(PreconnectVerdict::VersionMismatch),
            PreconnectResult::VersionMismatch
        );
        assert!(PreconnectResult::Ok.is_ok());
        assert!(!PreconnectResult::Timeout.is_ok());
    }

    #[test]
    fn test_display() {
        assert_eq!(PreconnectResult::LobbyFull.to_string(), "LobbyFull");
        assert_eq!(PreconnectResult::NetworkError.to_string(), "NetworkError");
    }
}
