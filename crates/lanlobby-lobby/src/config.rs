//! Lobby configuration.

use std::time::Duration;

use lanlobby_protocol::PROTOCOL_VERSION;
use serde::{Deserialize, Serialize};

use crate::LobbyError;

/// Default command channel size for lobby actors.
const DEFAULT_CHANNEL_SIZE: usize = 64;

/// Settings fixed when a lobby is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbyConfig {
    /// Lobby name shown in discovery lists.
    pub name: String,

    /// Join password. Empty means open. Cannot change after creation.
    pub password: String,

    /// Maximum members, host included.
    pub max_players: usize,

    /// The host's own roster entry.
    pub host_name: String,
    pub host_loadout: String,

    /// Protocol version joining clients must speak.
    pub protocol_version: u32,

    /// How often members with dead connections are swept out.
    pub sweep_interval: Duration,

    /// Command channel capacity; senders wait when it is full.
    pub command_channel_size: usize,
}

impl Default for LobbyConfig {
    fn default() -> Self {
        Self {
            name: "LAN Lobby".into(),
            password: String::new(),
            max_players: 4,
            host_name: "Host".into(),
            host_loadout: String::new(),
            protocol_version: PROTOCOL_VERSION,
            sweep_interval: Duration::from_secs(1),
            command_channel_size: DEFAULT_CHANNEL_SIZE,
        }
    }
}

impl LobbyConfig {
    pub fn validate(&self) -> Result<(), LobbyError> {
        if self.max_players == 0 {
            return Err(LobbyError::InvalidConfig(
                "max_players must be at least 1".into(),
            ));
        }
        if self.sweep_interval.is_zero() {
            return Err(LobbyError::InvalidConfig(
                "sweep_interval must be greater than zero".into(),
            ));
        }
        if self.command_channel_size == 0 {
            return Err(LobbyError::InvalidConfig(
                "command_channel_size must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lobby_config_default() {
        let config = LobbyConfig::default();
        assert_eq!(config.max_players, 4);
        assert!(config.password.is_empty());
        assert_eq!(config.protocol_version, PROTOCOL_VERSION);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let config = LobbyConfig {
            max_players: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(LobbyError::InvalidConfig(_))
        ));
    }
}
