//! # lanlobby
//!
//! LAN lobbies for multiplayer games: find hosts on the local network,
//! check a join before committing to it, and keep every peer's lobby
//! roster in step with the host's.
//!
//! A host runs four things, all started by
//! [`LanLobbyContext::host_lobby`]:
//!
//! - the lobby actor, the single owner of the roster
//! - a WebSocket session listener clients join through
//! - a UDP preconnect responder that answers "would I get in?"
//! - a UDP advertiser broadcasting the lobby summary
//!
//! A client browses advertisements, probes a lobby, and joins it:
//!
//! ```rust,no_run
//! use lanlobby::prelude::*;
//!
//! # async fn demo() -> Result<(), LanLobbyError> {
//! let mut ctx = LanLobbyContext::new(LanLobbyConfig::default())?;
//! ctx.start_browsing()?;
//! // ... a frame or two later:
//! if let Some(lobby) = ctx.list_discovered_lobbies().first() {
//!     if ctx.probe_join(lobby, "").await.is_ok() {
//!         ctx.request_join(lobby.endpoint, "").await?;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod context;
mod error;
mod handler;
mod server;

pub use client::{JoinCredentials, LobbyClient, SessionState};
pub use config::{LanLobbyConfig, SessionConfig};
pub use context::{HostedLobby, LanLobbyContext, RosterSubscription};
pub use error::LanLobbyError;
pub use server::{LobbyServer, LobbyServerBuilder};

pub use lanlobby_discovery as discovery;
pub use lanlobby_lobby as lobby;
pub use lanlobby_preconnect as preconnect;
pub use lanlobby_protocol as protocol;
pub use lanlobby_replication as replication;
pub use lanlobby_transport as transport;

/// Installs a `tracing` subscriber that logs to stdout, filtered by
/// `RUST_LOG` (default `info`). Does nothing if one is already set.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

pub mod prelude {
    pub use crate::{
        HostedLobby, JoinCredentials, LanLobbyConfig, LanLobbyContext, LanLobbyError, LobbyClient,
        SessionConfig, SessionState,
    };
    pub use lanlobby_discovery::{DiscoveryEvent, LobbyAdvertisement};
    pub use lanlobby_lobby::LobbyConfig;
    pub use lanlobby_preconnect::PreconnectResult;
    pub use lanlobby_protocol::{ConnectionId, JoinRejection, LobbyState, Member, RosterSnapshot};
}
