//! `LobbyServer` builder and accept loop.
//!
//! The host side of the full join: every accepted WebSocket connection
//! gets a handler task that performs the `Join` handshake against the
//! lobby actor and then mirrors the roster to its client.

use std::net::SocketAddr;
use std::sync::Arc;

use lanlobby_lobby::LobbyHandle;
use lanlobby_protocol::JsonCodec;
use lanlobby_transport::{ConnectionRegistry, Transport, WebSocketTransport};
use tokio::sync::watch;

use crate::LanLobbyError;
use crate::config::SessionConfig;
use crate::handler::handle_connection;

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState {
    pub(crate) lobby: LobbyHandle,
    pub(crate) registry: ConnectionRegistry,
    pub(crate) codec: JsonCodec,
    pub(crate) session: SessionConfig,
}

/// Builder for a [`LobbyServer`].
///
/// ```rust,ignore
/// let server = LobbyServer::builder()
///     .session_config(config.session.clone())
///     .build(lobby, registry)
///     .await?;
/// let addr = server.local_addr()?;
/// tokio::spawn(server.run(shutdown_rx));
/// ```
#[derive(Debug, Default)]
pub struct LobbyServerBuilder {
    session: SessionConfig,
}

impl LobbyServerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets bind address, port, and connection timings.
    pub fn session_config(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }

    /// Binds the session listener for `lobby`. Connections register in
    /// `registry`, which the lobby uses for sweeps and teardown.
    pub async fn build(
        self,
        lobby: LobbyHandle,
        registry: ConnectionRegistry,
    ) -> Result<LobbyServer, LanLobbyError> {
        self.session.validate()?;
        let transport = WebSocketTransport::bind(&self.session.bind_target().to_string()).await?;
        let state = Arc::new(ServerState {
            lobby,
            registry,
            codec: JsonCodec,
            session: self.session,
        });
        Ok(LobbyServer { transport, state })
    }
}

/// Session listener for one hosted lobby.
pub struct LobbyServer {
    transport: WebSocketTransport,
    state: Arc<ServerState>,
}

impl LobbyServer {
    pub fn builder() -> LobbyServerBuilder {
        LobbyServerBuilder::new()
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    /// Accepts connections until `shutdown` flips to `true` (or its sender
    /// is dropped). Connections already accepted keep running until the
    /// lobby closes or the client leaves.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<(), LanLobbyError> {
        tracing::info!(addr = ?self.local_addr().ok(), "lobby server running");

        loop {
            tokio::select! {
                accepted = self.transport.accept() => match accepted {
                    Ok(conn) => {
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(conn, state).await {
                                tracing::debug!(error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(e) => tracing::warn!(error = %e, "accept failed"),
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::debug!("lobby server stopped");
        Ok(())
    }
}
