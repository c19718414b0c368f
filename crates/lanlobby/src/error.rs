//! Unified error type for lanlobby.

use lanlobby_discovery::DiscoveryError;
use lanlobby_lobby::LobbyError;
use lanlobby_preconnect::PreconnectError;
use lanlobby_protocol::{JoinRejection, ProtocolError};
use lanlobby_replication::ReplicationError;
use lanlobby_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each wrapping variant generates the `From`
/// impl, so `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum LanLobbyError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Preconnect(#[from] PreconnectError),

    #[error(transparent)]
    Lobby(#[from] LobbyError),

    #[error(transparent)]
    Replication(#[from] ReplicationError),

    /// The host refused the join.
    #[error("join rejected: {reason}")]
    JoinRejected { reason: JoinRejection },

    /// A client-side operation was attempted without a joined lobby.
    #[error("not joined to a lobby")]
    NotJoined,

    #[error("timed out waiting for {0}")]
    Timeout(&'static str),

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let lobby_err: LanLobbyError = err.into();
        assert!(matches!(lobby_err, LanLobbyError::Transport(_)));
        assert!(lobby_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidMessage("bad".into());
        let lobby_err: LanLobbyError = err.into();
        assert!(matches!(lobby_err, LanLobbyError::Protocol(_)));
    }

    #[test]
    fn test_from_lobby_error() {
        let lobby_err: LanLobbyError = LobbyError::NoActiveLobby.into();
        assert!(matches!(lobby_err, LanLobbyError::Lobby(_)));
    }

    #[test]
    fn test_from_replication_error() {
        let err = ReplicationError::SyncTimedOut { attempts: 3 };
        let lobby_err: LanLobbyError = err.into();
        assert!(lobby_err.to_string().contains("3 attempts"));
    }

    #[test]
    fn test_join_rejected_display() {
        let err = LanLobbyError::JoinRejected {
            reason: JoinRejection::BadPassword,
        };
        assert_eq!(err.to_string(), "join rejected: wrong password");
    }
}
