//! The receiver-side table of advertised lobbies.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use lanlobby_protocol::{Advertisement, PROTOCOL_VERSION, ProtocolError};
use tokio::time::Instant;

/// Identity of an advertised lobby: sender address, advertised session
/// port, and lobby name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LobbyKey {
    pub address: IpAddr,
    pub port: u16,
    pub name: String,
}

/// A lobby as seen by a browsing peer.
#[derive(Debug, Clone, PartialEq)]
pub struct LobbyAdvertisement {
    pub name: String,
    /// Sender IP paired with the advertised session port.
    pub endpoint: SocketAddr,
    pub max_players: usize,
    pub current_players: usize,
    pub password_protected: bool,
    pub is_open: bool,
    /// Protocol version the host speaks.
    pub version: u32,
    pub last_seen: Instant,
}

impl LobbyAdvertisement {
    /// Builds an entry from a decoded packet and the datagram source.
    ///
    /// # Errors
    /// `ProtocolError::InvalidMessage` for packets whose counters cannot
    /// describe a real lobby.
    pub fn from_packet(
        packet: Advertisement,
        source: IpAddr,
        seen: Instant,
    ) -> Result<Self, ProtocolError> {
        if packet.max_players == 0 {
            return Err(ProtocolError::InvalidMessage(
                "max_players must be at least 1".into(),
            ));
        }
        if packet.current_players > packet.max_players {
            return Err(ProtocolError::InvalidMessage(format!(
                "{} players exceed capacity {}",
                packet.current_players, packet.max_players
            )));
        }
        let is_open = packet.is_open();
        Ok(Self {
            name: packet.lobby_name,
            endpoint: SocketAddr::new(source, packet.port),
            max_players: packet.max_players,
            current_players: packet.current_players,
            password_protected: packet.password_protected,
            is_open,
            version: packet.version,
            last_seen: seen,
        })
    }

    pub fn key(&self) -> LobbyKey {
        LobbyKey {
            address: self.endpoint.ip(),
            port: self.endpoint.port(),
            name: self.name.clone(),
        }
    }

    /// Returns `true` if the host speaks this build's protocol version.
    pub fn is_compatible(&self) -> bool {
        self.version == PROTOCOL_VERSION
    }

    /// Equal in everything but `last_seen`.
    fn same_listing(&self, other: &Self) -> bool {
        self.name == other.name
            && self.endpoint == other.endpoint
            && self.max_players == other.max_players
            && self.current_players == other.current_players
            && self.password_protected == other.password_protected
            && self.is_open == other.is_open
            && self.version == other.version
    }

    fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_seen)
    }
}

/// Change notifications from the listener.
#[derive(Debug, Clone, PartialEq)]
pub enum DiscoveryEvent {
    Discovered(LobbyAdvertisement),
    Updated(LobbyAdvertisement),
    Expired(LobbyKey),
}

/// Latest advertisement per lobby.
///
/// Pure bookkeeping: the caller supplies the clock, which keeps staleness
/// testable without sockets.
#[derive(Debug)]
pub struct LobbyRegistry {
    entries: HashMap<LobbyKey, LobbyAdvertisement>,
    staleness_window: Duration,
}

impl LobbyRegistry {
    pub fn new(staleness_window: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            staleness_window,
        }
    }

    /// Inserts or overwrites the entry for `entry`'s key.
    ///
    /// Returns an event only when the lobby list a reader sees changes: a
    /// new key, different counters or flags, or a stale entry coming back.
    /// A plain refresh only moves `last_seen`.
    pub fn upsert(&mut self, entry: LobbyAdvertisement) -> Option<DiscoveryEvent> {
        match self.entries.entry(entry.key()) {
            Entry::Occupied(mut slot) => {
                let previous = slot.insert(entry.clone());
                let was_hidden = previous.age(entry.last_seen) > self.staleness_window;
                if was_hidden || !previous.same_listing(&entry) {
                    Some(DiscoveryEvent::Updated(entry))
                } else {
                    None
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(entry.clone());
                Some(DiscoveryEvent::Discovered(entry))
            }
        }
    }

    /// Entries seen within the staleness window, sorted by name then
    /// endpoint.
    pub fn visible(&self, now: Instant) -> Vec<LobbyAdvertisement> {
        let mut lobbies: Vec<_> = self
            .entries
            .values()
            .filter(|entry| entry.age(now) <= self.staleness_window)
            .cloned()
            .collect();
        lobbies.sort_by(|a, b| a.name.cmp(&b.name).then(a.endpoint.cmp(&b.endpoint)));
        lobbies
    }

    /// Removes entries older than `max_age` and returns their keys.
    pub fn prune(&mut self, now: Instant, max_age: Duration) -> Vec<LobbyKey> {
        let mut expired = Vec::new();
        self.entries.retain(|key, entry| {
            if entry.age(now) > max_age {
                expired.push(key.clone());
                false
            } else {
                true
            }
        });
        expired
    }

    /// Number of stored entries, stale ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
