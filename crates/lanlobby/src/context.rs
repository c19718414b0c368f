//! The process-wide entry point UI and game code talk to.

use std::net::SocketAddr;
use std::sync::Arc;

use lanlobby_discovery::{DiscoveryEvent, DiscoveryService, LiveAdvertisement, LobbyAdvertisement};
use lanlobby_lobby::{LobbyConfig, LobbyHandle, LobbyHost};
use lanlobby_preconnect::{JoinPolicy, PreconnectResponder, PreconnectResult, probe};
use lanlobby_protocol::{ConnectionId, PROTOCOL_VERSION, RosterSnapshot, preconnect_port};
use lanlobby_transport::{ConnectionRegistry, TransportError};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::client::{JoinCredentials, LobbyClient};
use crate::server::LobbyServer;
use crate::{LanLobbyConfig, LanLobbyError};

/// Addresses of a lobby this process hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostedLobby {
    /// Session listener clients join through.
    pub session_addr: SocketAddr,
    /// Preconnect responder.
    pub preconnect_addr: SocketAddr,
}

/// Everything that runs while this process hosts a lobby.
struct HostedSession {
    lobby: LobbyHandle,
    addrs: HostedLobby,
    _responder: PreconnectResponder,
    server_shutdown: watch::Sender<bool>,
}

impl Drop for HostedSession {
    fn drop(&mut self) {
        let _ = self.server_shutdown.send(true);
    }
}

/// Guard for an [`on_roster_changed`](LanLobbyContext::on_roster_changed)
/// callback. The callback stops when this is dropped.
#[derive(Debug)]
pub struct RosterSubscription {
    task: JoinHandle<()>,
}

impl Drop for RosterSubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// One peer's view of LAN lobbies: browse, pre-check, join, or host.
///
/// Must be used from within a Tokio runtime.
pub struct LanLobbyContext {
    config: LanLobbyConfig,
    discovery: DiscoveryService,
    registry: ConnectionRegistry,
    host: LobbyHost,
    hosted: Option<HostedSession>,
    client: Option<LobbyClient>,
}

impl LanLobbyContext {
    pub fn new(config: LanLobbyConfig) -> Result<Self, LanLobbyError> {
        config.session.validate()?;
        config.resync.validate()?;
        let discovery = DiscoveryService::new(config.discovery.clone())?;
        let registry = ConnectionRegistry::new();
        let host = LobbyHost::new(Arc::new(registry.clone()));
        Ok(Self {
            config,
            discovery,
            registry,
            host,
            hosted: None,
            client: None,
        })
    }

    pub fn config(&self) -> &LanLobbyConfig {
        &self.config
    }

    // ----- browsing --------------------------------------------------------

    /// Starts listening for advertisements. Returns the bound address.
    pub fn start_browsing(&mut self) -> Result<SocketAddr, LanLobbyError> {
        Ok(self.discovery.start_listening()?)
    }

    pub fn stop_browsing(&mut self) {
        self.discovery.stop_listening();
    }

    /// Lobbies heard from recently, sorted by name.
    pub fn list_discovered_lobbies(&self) -> Vec<LobbyAdvertisement> {
        self.discovery.discovered_lobbies()
    }

    /// Discovery changes since the last call. Call once per frame.
    pub fn drain_discovery_events(&mut self) -> Vec<DiscoveryEvent> {
        self.discovery.drain_events()
    }

    // ----- joining ---------------------------------------------------------

    /// Pre-checks a join to an advertised lobby. The host's responder sits
    /// one above the discovery port the advertisement arrived on.
    pub async fn probe_join(
        &self,
        lobby: &LobbyAdvertisement,
        password: &str,
    ) -> PreconnectResult {
        let discovery_port = self
            .discovery
            .local_addr()
            .map_or(self.config.discovery.port, |addr| addr.port());
        let Some(port) = preconnect_port(discovery_port) else {
            tracing::debug!(discovery_port, "no preconnect port above discovery port");
            return PreconnectResult::NetworkError;
        };
        self.probe_at(SocketAddr::new(lobby.endpoint.ip(), port), password)
            .await
    }

    /// Pre-checks a join against the responder at `target`.
    pub async fn probe_at(&self, target: SocketAddr, password: &str) -> PreconnectResult {
        probe(
            target,
            password,
            PROTOCOL_VERSION,
            &self.config.player_name,
            &self.config.preconnect,
        )
        .await
    }

    /// Joins the lobby whose session listener is at `session_addr` and
    /// waits until its roster is known. Leaves any lobby joined before.
    pub async fn request_join(
        &mut self,
        session_addr: SocketAddr,
        password: &str,
    ) -> Result<ConnectionId, LanLobbyError> {
        self.leave().await;

        let credentials = JoinCredentials {
            display_name: self.config.player_name.clone(),
            loadout_tag: self.config.loadout_tag.clone(),
            password: password.to_string(),
            version: PROTOCOL_VERSION,
        };
        let handshake_timeout = self.config.session.handshake_timeout;
        let client = LobbyClient::join(session_addr, credentials, handshake_timeout).await?;
        client.synchronize(&self.config.resync).await?;

        let id = client.connection_id();
        self.client = Some(client);
        Ok(id)
    }

    /// The joined lobby's client, if any.
    pub fn client(&self) -> Option<&LobbyClient> {
        self.client.as_ref()
    }

    pub async fn set_loadout(&self, loadout_tag: &str) -> Result<(), LanLobbyError> {
        match &self.client {
            Some(client) => client.set_loadout(loadout_tag).await,
            None => Err(LanLobbyError::NotJoined),
        }
    }

    /// Leaves the joined lobby. No-op if not joined.
    pub async fn leave(&mut self) {
        if let Some(client) = self.client.take() {
            if let Err(e) = client.leave().await {
                tracing::debug!(error = %e, "leave failed");
            }
        }
    }

    // ----- hosting ---------------------------------------------------------

    /// Hosts a lobby: roster actor, session listener, preconnect
    /// responder, and advertiser. Replaces a lobby hosted before.
    ///
    /// # Errors
    /// Any setup failure; nothing is left running in that case.
    pub async fn host_lobby(&mut self, lobby: LobbyConfig) -> Result<HostedLobby, LanLobbyError> {
        self.disband().await;

        let password = lobby.password.clone();
        let protocol_version = lobby.protocol_version;
        let handle = self.host.create_lobby(lobby).await?;

        match self.start_hosted_services(handle.clone(), password, protocol_version).await {
            Ok(session) => {
                let addrs = session.addrs;
                self.hosted = Some(session);
                tracing::info!(
                    session = %addrs.session_addr,
                    preconnect = %addrs.preconnect_addr,
                    "hosting lobby"
                );
                Ok(addrs)
            }
            Err(e) => {
                self.host.disband().await;
                Err(e)
            }
        }
    }

    async fn start_hosted_services(
        &mut self,
        lobby: LobbyHandle,
        password: String,
        protocol_version: u32,
    ) -> Result<HostedSession, LanLobbyError> {
        let server = LobbyServer::builder()
            .session_config(self.config.session.clone())
            .build(lobby.clone(), self.registry.clone())
            .await?;
        let session_addr = server
            .local_addr()
            .map_err(TransportError::AcceptFailed)?;

        let responder = PreconnectResponder::spawn(
            self.config.preconnect_port()?,
            JoinPolicy::new(password, protocol_version),
            lobby.summary_receiver(),
        )?;

        self.discovery.start_advertising(
            LiveAdvertisement::new(lobby.summary_receiver(), session_addr.port()),
            self.config.discovery.broadcast_interval,
        )?;

        let (server_shutdown, shutdown_rx) = watch::channel(false);
        tokio::spawn(async move {
            if let Err(e) = server.run(shutdown_rx).await {
                tracing::warn!(error = %e, "lobby server failed");
            }
        });

        Ok(HostedSession {
            lobby,
            addrs: HostedLobby {
                session_addr,
                preconnect_addr: responder.local_addr(),
            },
            _responder: responder,
            server_shutdown,
        })
    }

    /// The hosted lobby's addresses, if hosting.
    pub fn hosted(&self) -> Option<HostedLobby> {
        self.hosted.as_ref().map(|h| h.addrs)
    }

    /// Removes a member from the hosted lobby.
    pub async fn request_kick(&self, connection_id: ConnectionId) -> Result<bool, LanLobbyError> {
        Ok(self.host.kick(connection_id).await?)
    }

    /// Starts the hosted game. Returns `true` only for the call that
    /// started it.
    pub async fn request_start(&self) -> Result<bool, LanLobbyError> {
        Ok(self.host.start().await?)
    }

    /// Resolves when the hosted game starts.
    pub async fn started(&self) -> Result<(), LanLobbyError> {
        Ok(self.host.started().await?)
    }

    /// Stops hosting: advertising and preconnect stop, clients are told
    /// the lobby closed. Returns `false` if nothing was hosted.
    pub async fn disband(&mut self) -> bool {
        let Some(session) = self.hosted.take() else {
            return false;
        };
        self.discovery.stop_advertising();
        drop(session);
        self.host.disband().await
    }

    // ----- roster ----------------------------------------------------------

    /// The roster this process currently knows: the hosted lobby's, else
    /// the joined lobby's.
    pub fn roster(&self) -> Option<RosterSnapshot> {
        if let Some(hosted) = &self.hosted {
            return Some(hosted.lobby.mirror().latest());
        }
        self.client.as_ref().and_then(LobbyClient::roster)
    }

    /// Calls `callback` with the current roster, then after every change,
    /// until the returned subscription is dropped or the lobby ends.
    ///
    /// # Errors
    /// `LanLobbyError::NotJoined` when neither hosting nor joined.
    pub fn on_roster_changed<F>(&self, callback: F) -> Result<RosterSubscription, LanLobbyError>
    where
        F: Fn(&RosterSnapshot) + Send + 'static,
    {
        let task = if let Some(hosted) = &self.hosted {
            let mut mirror = hosted.lobby.mirror();
            tokio::spawn(async move {
                while let Some(roster) = mirror.changed().await {
                    callback(&roster);
                }
            })
        } else if let Some(client) = &self.client {
            let mut rx = client.view().subscribe();
            rx.mark_changed();
            tokio::spawn(async move {
                while rx.changed().await.is_ok() {
                    let roster = rx.borrow_and_update().clone();
                    if let Some(roster) = roster {
                        callback(&roster);
                    }
                }
            })
        } else {
            return Err(LanLobbyError::NotJoined);
        };
        Ok(RosterSubscription { task })
    }

    /// Leaves, disbands, and stops discovery. Idempotent.
    pub async fn shutdown(&mut self) {
        self.leave().await;
        self.disband().await;
        self.discovery.shutdown();
        tracing::info!("lan lobby context shut down");
    }
}

impl std::fmt::Debug for LanLobbyContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LanLobbyContext")
            .field("hosted", &self.hosted())
            .field("joined", &self.client.as_ref().map(LobbyClient::connection_id))
            .field("live_connections", &self.registry.len())
            .finish()
    }
}
