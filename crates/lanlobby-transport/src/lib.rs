//! Transport layer for lanlobby.
//!
//! Two kinds of traffic flow through a LAN lobby:
//!
//! - **Connectionless datagrams** (discovery broadcasts, preconnect probes)
//!   over UDP. See [`udp`] for the socket helpers.
//! - **Session connections** (join, roster replication, kick) over a
//!   WebSocket. The [`Transport`] and [`Connection`] traits abstract over
//!   the concrete protocol.
//!
//! The [`ConnectionRegistry`] tracks which session connections are still
//! alive so the lobby can sweep ghost members and tear down rejected or
//! kicked peers.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
mod registry;
pub mod udp;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
pub use registry::{CloseSignal, ConnectionControl, ConnectionRegistry};
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketTransport};

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier for a peer's session connection.
///
/// Stable for the lifetime of the connection and unique within a host
/// process. `ConnectionId(0)` is reserved for the hosting peer itself,
/// which sits in its own roster without a network connection.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// The reserved id of the hosting peer.
    pub const HOST: ConnectionId = ConnectionId(0);

    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }

    /// Returns `true` for the reserved host id.
    pub fn is_host(self) -> bool {
        self == Self::HOST
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Accepts new incoming session connections.
pub trait Transport: Send + Sync + 'static {
    /// The connection type produced by this transport.
    type Connection: Connection;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync;

    /// Waits for and accepts the next incoming connection.
    async fn accept(&mut self) -> Result<Self::Connection, Self::Error>;

    /// Gracefully shuts down the transport, stopping new connections.
    async fn shutdown(&self) -> Result<(), Self::Error>;
}

/// A single connection that can send and receive bytes.
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync;

    /// Sends data to the remote peer.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error>;

    /// Receives the next message from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    /// Must be cancel-safe: dropping the future before it resolves loses
    /// no data, so callers can race it in `tokio::select!`.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Closes the connection.
    async fn close(&self) -> Result<(), Self::Error>;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}
