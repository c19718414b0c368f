//! Client side of a session connection.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use lanlobby_protocol::{
    ClientMessage, Codec, ConnectionId, JsonCodec, ProtocolError, RosterSnapshot, ServerMessage,
};
use lanlobby_replication::{
    ClientRosterView, ReplicationError, ResyncPolicy, RosterRequester, ensure_synchronized,
};
use lanlobby_transport::{Connection, WebSocketConnection};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::LanLobbyError;

/// Where a joined client stands with its host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Joined,
    /// The host started the game.
    GameStarting,
    Kicked { reason: String },
    /// The host disbanded the lobby.
    LobbyClosed,
    /// The connection dropped without a goodbye.
    Disconnected,
}

impl SessionState {
    /// Returns `true` while the connection to the host is up.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Joined | Self::GameStarting)
    }
}

/// What a client presents when joining.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinCredentials {
    pub display_name: String,
    pub loadout_tag: String,
    pub password: String,
    pub version: u32,
}

/// A joined client. Dropping it stops the reader and closes the socket.
pub struct LobbyClient {
    connection: Arc<WebSocketConnection>,
    connection_id: ConnectionId,
    view: ClientRosterView,
    state: watch::Receiver<SessionState>,
    codec: JsonCodec,
    reader: JoinHandle<()>,
}

impl LobbyClient {
    /// Connects to the host's session listener at `host` and joins.
    ///
    /// # Errors
    /// - `LanLobbyError::JoinRejected` with the host's reason
    /// - `LanLobbyError::Timeout` if no verdict arrives in time
    /// - transport and protocol errors
    pub async fn join(
        host: SocketAddr,
        credentials: JoinCredentials,
        handshake_timeout: Duration,
    ) -> Result<Self, LanLobbyError> {
        let codec = JsonCodec;
        let connection = WebSocketConnection::connect(host).await?;

        let join = ClientMessage::Join {
            display_name: credentials.display_name,
            loadout_tag: credentials.loadout_tag,
            password: credentials.password,
            version: credentials.version,
        };
        connection.send(&codec.encode(&join)?).await?;

        let data = match tokio::time::timeout(handshake_timeout, connection.recv()).await {
            Ok(Ok(Some(data))) => data,
            Ok(Ok(None)) => {
                let reason = "host closed before replying".to_string();
                return Err(ProtocolError::InvalidMessage(reason).into());
            }
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => return Err(LanLobbyError::Timeout("join verdict")),
        };

        let (connection_id, roster) = match codec.decode::<ServerMessage>(&data)? {
            ServerMessage::JoinAccepted {
                connection_id,
                roster,
            } => (connection_id, roster),
            ServerMessage::JoinRejected { reason, message } => {
                tracing::info!(%host, %reason, %message, "join rejected");
                let _ = connection.close().await;
                return Err(LanLobbyError::JoinRejected { reason });
            }
            other => {
                return Err(ProtocolError::InvalidMessage(format!(
                    "unexpected reply to join: {other:?}"
                ))
                .into());
            }
        };

        let view = ClientRosterView::new();
        view.apply(roster);
        let (state_tx, state_rx) = watch::channel(SessionState::Joined);
        let connection = Arc::new(connection);
        let reader = tokio::spawn(read_loop(Arc::clone(&connection), view.clone(), state_tx));

        tracing::info!(%host, %connection_id, "joined lobby");
        Ok(Self {
            connection,
            connection_id,
            view,
            state: state_rx,
            codec,
            reader,
        })
    }

    /// The id the host assigned to this connection.
    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    pub fn host_addr(&self) -> SocketAddr {
        self.connection.peer_addr()
    }

    pub fn view(&self) -> &ClientRosterView {
        &self.view
    }

    pub fn roster(&self) -> Option<RosterSnapshot> {
        self.view.snapshot()
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn state_receiver(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    /// Resolves once the host announces the game start.
    ///
    /// # Errors
    /// `LanLobbyError::NotJoined` if the session ends first.
    pub async fn game_starting(&self) -> Result<(), LanLobbyError> {
        let mut state = self.state.clone();
        let reached = state
            .wait_for(|s| !matches!(s, SessionState::Joined))
            .await
            .map(|s| *s == SessionState::GameStarting)
            .unwrap_or(false);
        if reached {
            Ok(())
        } else {
            Err(LanLobbyError::NotJoined)
        }
    }

    /// Waits for a roster, asking the host for one if none arrives.
    pub async fn synchronize(
        &self,
        policy: &ResyncPolicy,
    ) -> Result<RosterSnapshot, LanLobbyError> {
        Ok(ensure_synchronized(&self.view, self, policy).await?)
    }

    /// Asks the host to resend the roster.
    pub async fn request_roster(&self) -> Result<(), LanLobbyError> {
        self.send(&ClientMessage::RequestRoster).await
    }

    pub async fn set_loadout(&self, loadout_tag: impl Into<String>) -> Result<(), LanLobbyError> {
        self.send(&ClientMessage::SetLoadout {
            loadout_tag: loadout_tag.into(),
        })
        .await
    }

    /// Leaves the lobby and closes the connection.
    pub async fn leave(self) -> Result<(), LanLobbyError> {
        let sent = self.send(&ClientMessage::Leave).await;
        let _ = self.connection.close().await;
        tracing::info!(connection_id = %self.connection_id, "left lobby");
        sent
    }

    async fn send(&self, msg: &ClientMessage) -> Result<(), LanLobbyError> {
        if !self.state.borrow().is_active() {
            return Err(LanLobbyError::NotJoined);
        }
        let bytes = self.codec.encode(msg)?;
        self.connection.send(&bytes).await?;
        Ok(())
    }
}

impl RosterRequester for LobbyClient {
    async fn request_roster(&self) -> Result<(), ReplicationError> {
        LobbyClient::request_roster(self)
            .await
            .map_err(|e| ReplicationError::RequestFailed(e.to_string()))
    }
}

impl Drop for LobbyClient {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

impl std::fmt::Debug for LobbyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LobbyClient")
            .field("connection_id", &self.connection_id)
            .field("host", &self.connection.peer_addr())
            .field("state", &*self.state.borrow())
            .finish()
    }
}

async fn read_loop(
    conn: Arc<WebSocketConnection>,
    view: ClientRosterView,
    state: watch::Sender<SessionState>,
) {
    let codec = JsonCodec;

    loop {
        let data = match conn.recv().await {
            Ok(Some(data)) => data,
            Ok(None) => break,
            Err(e) => {
                tracing::debug!(error = %e, "client recv error");
                break;
            }
        };

        let msg: ServerMessage = match codec.decode(&data) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::debug!(error = %e, "failed to decode server message");
                continue;
            }
        };

        match msg {
            ServerMessage::Roster { roster } => {
                let revision = roster.revision;
                let outcome = view.apply(roster);
                tracing::trace!(revision, ?outcome, "roster received");
            }
            ServerMessage::Ping { nonce } => {
                let pong = ClientMessage::Pong { nonce };
                match codec.encode(&pong) {
                    Ok(bytes) => {
                        if let Err(e) = conn.send(&bytes).await {
                            tracing::debug!(error = %e, "pong failed");
                        }
                    }
                    Err(e) => tracing::warn!(error = %e, "cannot encode pong"),
                }
            }
            ServerMessage::GameStarting => {
                tracing::info!("host started the game");
                state.send_replace(SessionState::GameStarting);
            }
            ServerMessage::Kicked { reason } => {
                tracing::info!(%reason, "kicked from lobby");
                state.send_replace(SessionState::Kicked { reason });
                break;
            }
            ServerMessage::LobbyClosed => {
                tracing::info!("lobby closed by host");
                state.send_replace(SessionState::LobbyClosed);
                break;
            }
            ServerMessage::JoinAccepted { .. } | ServerMessage::JoinRejected { .. } => {
                tracing::debug!("ignoring join reply outside handshake");
            }
        }
    }

    state.send_if_modified(|current| {
        if current.is_active() {
            *current = SessionState::Disconnected;
            true
        } else {
            false
        }
    });
    tracing::debug!("client reader stopped");
}
