//! Discovery errors.

use lanlobby_protocol::ProtocolError;
use lanlobby_transport::TransportError;

/// Errors returned by [`DiscoveryService`](crate::DiscoveryService).
///
/// Only setup can fail. Once a background loop runs, bad datagrams and
/// send failures are logged and skipped.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    /// The discovery socket could not be opened.
    #[error("discovery socket: {0}")]
    Socket(#[from] TransportError),

    /// A received advertisement could not be used.
    #[error("bad advertisement: {0}")]
    Packet(#[from] ProtocolError),

    #[error("invalid discovery config: {0}")]
    InvalidConfig(String),
}
