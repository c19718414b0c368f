//! The hosted lobby's owner: creates, replaces, and disbands it.

use std::sync::Arc;

use lanlobby_protocol::ConnectionId;
use lanlobby_transport::ConnectionControl;

use crate::actor::spawn_lobby;
use crate::{LobbyConfig, LobbyError, LobbyHandle};

/// Owns at most one running lobby per process.
///
/// This is the entry point for lobby operations from higher layers (the
/// session server and the collaborator API).
pub struct LobbyHost {
    connections: Arc<dyn ConnectionControl>,
    active: Option<LobbyHandle>,
}

impl LobbyHost {
    pub fn new(connections: Arc<dyn ConnectionControl>) -> Self {
        Self {
            connections,
            active: None,
        }
    }

    /// Creates a lobby, replacing the current one if any. The host is
    /// seeded as member 0.
    ///
    /// # Errors
    /// `LobbyError::InvalidConfig`; the previous lobby keeps running.
    pub async fn create_lobby(&mut self, config: LobbyConfig) -> Result<LobbyHandle, LobbyError> {
        config.validate()?;
        self.disband().await;

        let name = config.name.clone();
        let handle = spawn_lobby(config, Arc::clone(&self.connections))?;
        self.active = Some(handle.clone());
        tracing::info!(lobby = %name, "lobby created");
        Ok(handle)
    }

    /// Stops the current lobby. Every connection mirror ends, which makes
    /// the session handlers tell their clients and hang up. Returns
    /// `false` if nothing was hosted.
    pub async fn disband(&mut self) -> bool {
        let Some(handle) = self.active.take() else {
            return false;
        };
        // Already stopped is as good as stopped.
        let _ = handle.shutdown().await;
        tracing::info!("lobby disbanded");
        true
    }

    /// The running lobby, if any.
    pub fn active(&self) -> Option<&LobbyHandle> {
        self.active.as_ref().filter(|h| !h.is_closed())
    }

    /// The running lobby.
    ///
    /// # Errors
    /// `LobbyError::NoActiveLobby` when nothing is hosted.
    pub fn handle(&self) -> Result<&LobbyHandle, LobbyError> {
        self.active().ok_or(LobbyError::NoActiveLobby)
    }

    pub async fn kick(&self, connection_id: ConnectionId) -> Result<bool, LobbyError> {
        self.handle()?.kick(connection_id).await
    }

    pub async fn start(&self) -> Result<bool, LobbyError> {
        self.handle()?.start().await
    }

    /// Resolves when the running lobby starts its game.
    pub async fn started(&self) -> Result<(), LobbyError> {
        self.handle()?.started().await
    }
}

impl std::fmt::Debug for LobbyHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LobbyHost")
            .field("hosting", &self.active().is_some())
            .finish()
    }
}
