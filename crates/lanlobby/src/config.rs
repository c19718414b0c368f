//! Process-wide configuration.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use lanlobby_discovery::DiscoveryConfig;
use lanlobby_preconnect::PreconnectConfig;
use lanlobby_protocol::{DEFAULT_SESSION_PORT, preconnect_port};
use lanlobby_replication::ResyncPolicy;
use serde::{Deserialize, Serialize};

use crate::LanLobbyError;

/// Session (WebSocket) connection settings, both sides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Address the host's session listener binds.
    pub bind_addr: IpAddr,
    /// Session listener port. 0 picks an ephemeral port.
    pub port: u16,
    /// How long a new connection may take to send its `Join`, and a
    /// client to receive the verdict.
    pub handshake_timeout: Duration,
    /// Interval between host pings.
    pub ping_interval: Duration,
    /// A connection silent for this long is dropped.
    pub idle_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_SESSION_PORT,
            handshake_timeout: Duration::from_secs(5),
            ping_interval: Duration::from_secs(2),
            idle_timeout: Duration::from_secs(15),
        }
    }
}

impl SessionConfig {
    pub fn bind_target(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }

    pub fn validate(&self) -> Result<(), LanLobbyError> {
        if self.ping_interval.is_zero() {
            return Err(LanLobbyError::InvalidConfig(
                "ping_interval must be greater than zero".into(),
            ));
        }
        if self.idle_timeout <= self.ping_interval {
            return Err(LanLobbyError::InvalidConfig(
                "idle_timeout must exceed ping_interval".into(),
            ));
        }
        Ok(())
    }
}

/// Everything a [`LanLobbyContext`](crate::LanLobbyContext) needs.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LanLobbyConfig {
    /// Name this player shows in rosters.
    pub player_name: String,
    /// Loadout selected when joining.
    pub loadout_tag: String,
    pub discovery: DiscoveryConfig,
    pub preconnect: PreconnectConfig,
    pub session: SessionConfig,
    pub resync: ResyncPolicy,
}

impl LanLobbyConfig {
    /// Port the preconnect responder binds. Follows the discovery port;
    /// an ephemeral discovery port gives an ephemeral responder port.
    ///
    /// # Errors
    /// `LanLobbyError::InvalidConfig` if the discovery port is the last
    /// port.
    pub fn preconnect_port(&self) -> Result<u16, LanLobbyError> {
        match self.discovery.port {
            0 => Ok(0),
            port => preconnect_port(port).ok_or_else(|| {
                LanLobbyError::InvalidConfig(format!(
                    "discovery port {port} leaves no room for the preconnect port"
                ))
            }),
        }
    }
}
