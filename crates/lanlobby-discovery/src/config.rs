//! Discovery configuration.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use lanlobby_protocol::{DEFAULT_DISCOVERY_PORT, preconnect_port};
use serde::{Deserialize, Serialize};

use crate::DiscoveryError;

/// Advertisements older than this are hidden from the lobby list.
pub const STALENESS_WINDOW: Duration = Duration::from_secs(5);

/// Settings for [`DiscoveryService`](crate::DiscoveryService).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// UDP port advertisements are sent to and received on.
    pub port: u16,
    /// Destination address of advertisements. The limited broadcast
    /// address by default; tests point it at loopback.
    pub broadcast_addr: IpAddr,
    /// Time between two advertisements.
    pub broadcast_interval: Duration,
    /// Age after which a lobby disappears from the visible list.
    pub staleness_window: Duration,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_DISCOVERY_PORT,
            broadcast_addr: IpAddr::V4(Ipv4Addr::BROADCAST),
            broadcast_interval: Duration::from_secs(1),
            staleness_window: STALENESS_WINDOW,
        }
    }
}

impl DiscoveryConfig {
    /// Where advertisements are sent.
    pub fn broadcast_target(&self) -> SocketAddr {
        SocketAddr::new(self.broadcast_addr, self.port)
    }

    /// Entries older than this are removed from the registry entirely.
    pub fn prune_after(&self) -> Duration {
        self.staleness_window.saturating_mul(2)
    }

    /// Checks the values a running service depends on.
    pub fn validate(&self) -> Result<(), DiscoveryError> {
        if self.broadcast_interval.is_zero() {
            return Err(DiscoveryError::InvalidConfig(
                "broadcast_interval must be greater than zero".into(),
            ));
        }
        if self.staleness_window.is_zero() {
            return Err(DiscoveryError::InvalidConfig(
                "staleness_window must be greater than zero".into(),
            ));
        }
        if preconnect_port(self.port).is_none() {
            return Err(DiscoveryError::InvalidConfig(format!(
                "port {} leaves no room for the preconnect port",
                self.port
            )));
        }
        Ok(())
    }
}
