//! Core wire types for lanlobby.
//!
//! Three families of messages travel between peers:
//!
//! - **Discovery** ([`Advertisement`]): broadcast by a host over UDP.
//! - **Preconnect** ([`PreconnectQuery`], [`PreconnectResponse`]): a one-shot
//!   UDP request/response answering "would my join succeed?".
//! - **Session** ([`ClientMessage`], [`ServerMessage`]): exchanged over the
//!   full connection once a client commits to joining.
//!
//! Every struct here is a fixed schema. Fields added later must carry
//! `#[serde(default)]` so older peers keep decoding newer packets.

use std::fmt;

use serde::{Deserialize, Serialize};

pub use lanlobby_transport::ConnectionId;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Protocol version spoken by this build. Bumped on incompatible changes.
pub const PROTOCOL_VERSION: u32 = 1;

/// UDP port hosts broadcast advertisements to and peers listen on.
pub const DEFAULT_DISCOVERY_PORT: u16 = 47777;

/// The preconnect responder listens on `discovery port + this offset`.
pub const PRECONNECT_PORT_OFFSET: u16 = 1;

/// TCP port the host's session (WebSocket) listener binds by default.
pub const DEFAULT_SESSION_PORT: u16 = 47779;

/// Returns the preconnect port paired with a discovery port, or `None`
/// when the discovery port is the last one and has no successor.
pub fn preconnect_port(discovery_port: u16) -> Option<u16> {
    discovery_port.checked_add(PRECONNECT_PORT_OFFSET)
}

// ---------------------------------------------------------------------------
// Lobby state
// ---------------------------------------------------------------------------

/// Lifecycle state of a lobby roster.
///
/// ```text
/// Open ⇄ Full ──→ Started
///   └────────────────┘
/// ```
///
/// `Open` and `Full` follow occupancy: removing a member from a full lobby
/// reopens it. `Started` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum LobbyState {
    /// Accepting joins.
    #[default]
    Open,
    /// At capacity, not started yet.
    Full,
    /// Game started; joins are permanently rejected.
    Started,
}

impl LobbyState {
    /// Derives the state from occupancy and the start latch.
    pub fn from_occupancy(members: usize, max_players: usize, started: bool) -> Self {
        if started {
            Self::Started
        } else if members >= max_players {
            Self::Full
        } else {
            Self::Open
        }
    }

    /// Returns `true` if the lobby accepts new members.
    pub fn is_joinable(self) -> bool {
        matches!(self, Self::Open)
    }

    /// Returns `true` once the game has started.
    pub fn is_started(self) -> bool {
        matches!(self, Self::Started)
    }

    /// Returns `true` if moving from `self` to `target` is a legal edge.
    pub fn can_transition_to(self, target: Self) -> bool {
        match (self, target) {
            (Self::Started, _) => false,
            (from, to) => from != to,
        }
    }
}

impl fmt::Display for LobbyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "Open"),
            Self::Full => write!(f, "Full"),
            Self::Started => write!(f, "Started"),
        }
    }
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

/// A host's periodic discovery broadcast.
///
/// The sender's IP is not in the packet; receivers take it from the
/// datagram source and pair it with `port`. Only whether a password is
/// set is advertised, never the password itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advertisement {
    /// Protocol version of the advertising host.
    pub version: u32,
    /// Display name of the lobby.
    pub lobby_name: String,
    /// Session port clients connect to for the full join.
    pub port: u16,
    pub max_players: usize,
    pub current_players: usize,
    #[serde(default)]
    pub password_protected: bool,
    /// Explicit open flag. Older hosts omit it; see [`Advertisement::is_open`].
    #[serde(default, rename = "is_open", skip_serializing_if = "Option::is_none")]
    pub open: Option<bool>,
}

impl Advertisement {
    /// Whether the lobby accepts joins, falling back to occupancy when the
    /// host did not send the flag.
    pub fn is_open(&self) -> bool {
        self.open
            .unwrap_or(self.current_players < self.max_players)
    }
}

// ---------------------------------------------------------------------------
// Preconnect
// ---------------------------------------------------------------------------

/// A preconnect probe. Tagged by `type` so unknown probe kinds fail to
/// decode and are dropped at the boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PreconnectQuery {
    /// "Would a join with these credentials succeed?"
    QueryJoin {
        #[serde(default)]
        password: String,
        #[serde(rename = "playerVersion")]
        player_version: u32,
        #[serde(default, rename = "playerName")]
        player_name: String,
    },
}

/// The host's verdict on a preconnect probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PreconnectVerdict {
    #[serde(rename = "OK")]
    Ok,
    BadPassword,
    LobbyFull,
    VersionMismatch,
}

impl fmt::Display for PreconnectVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "OK"),
            Self::BadPassword => write!(f, "BadPassword"),
            Self::LobbyFull => write!(f, "LobbyFull"),
            Self::VersionMismatch => write!(f, "VersionMismatch"),
        }
    }
}

/// Response to a [`PreconnectQuery`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreconnectResponse {
    pub result: PreconnectVerdict,
    /// Human-readable detail for logs. UI should localize from `result`.
    #[serde(default)]
    pub reason: String,
}

// ---------------------------------------------------------------------------
// Roster
// ---------------------------------------------------------------------------

/// One entry in a lobby roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub connection_id: ConnectionId,
    pub display_name: String,
    /// Selected weapon/character, opaque to the lobby.
    #[serde(default)]
    pub loadout_tag: String,
    #[serde(default)]
    pub ping_millis: u32,
}

/// Full copy of a roster as replicated to clients.
///
/// `revision` increases on every host-side mutation. Clients keep the
/// highest revision they have seen and ignore older snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterSnapshot {
    pub revision: u64,
    pub lobby_name: String,
    pub max_players: usize,
    pub state: LobbyState,
    pub members: Vec<Member>,
}

impl RosterSnapshot {
    /// Returns `true` if `id` is in the member list.
    pub fn contains(&self, id: ConnectionId) -> bool {
        self.members.iter().any(|m| m.connection_id == id)
    }
}

/// The lobby's public face: counters published by the host on every
/// roster change. Advertisements and preconnect verdicts are computed from
/// this copy, never from the live roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbySummary {
    pub lobby_name: String,
    pub max_players: usize,
    pub current_players: usize,
    pub state: LobbyState,
    pub password_protected: bool,
}

impl LobbySummary {
    /// Builds the advertisement for a host whose session listener is on
    /// `session_port`.
    pub fn advertisement(&self, session_port: u16) -> Advertisement {
        Advertisement {
            version: PROTOCOL_VERSION,
            lobby_name: self.lobby_name.clone(),
            port: session_port,
            max_players: self.max_players,
            current_players: self.current_players,
            password_protected: self.password_protected,
            open: Some(self.state.is_joinable()),
        }
    }
}

// ---------------------------------------------------------------------------
// Session messages
// ---------------------------------------------------------------------------

/// Why the host refused a join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JoinRejection {
    BadPassword,
    LobbyFull,
    AlreadyStarted,
    VersionMismatch,
    /// The connection already has a roster entry.
    DuplicateConnection,
}

impl fmt::Display for JoinRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::BadPassword => "wrong password",
            Self::LobbyFull => "lobby is full",
            Self::AlreadyStarted => "game already started",
            Self::VersionMismatch => "protocol version mismatch",
            Self::DuplicateConnection => "connection already joined",
        };
        f.write_str(text)
    }
}

/// Client → host messages on a session connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Must be the first message on a new connection.
    Join {
        display_name: String,
        #[serde(default)]
        loadout_tag: String,
        #[serde(default)]
        password: String,
        version: u32,
    },
    /// "Send me the current roster." Used when no snapshot has arrived.
    RequestRoster,
    /// Change the selected loadout.
    SetLoadout { loadout_tag: String },
    /// Echo of a host [`ServerMessage::Ping`].
    Pong { nonce: u64 },
    /// Leave the lobby voluntarily.
    Leave,
}

/// Host → client messages on a session connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// The join was accepted; `connection_id` is the client's roster key.
    JoinAccepted {
        connection_id: ConnectionId,
        roster: RosterSnapshot,
    },
    /// The join was refused. The host closes the connection right after.
    JoinRejected {
        reason: JoinRejection,
        #[serde(default)]
        message: String,
    },
    /// A fresh roster snapshot.
    Roster { roster: RosterSnapshot },
    /// Latency probe; the client answers with [`ClientMessage::Pong`].
    Ping { nonce: u64 },
    /// The host started the game.
    GameStarting,
    /// The host removed this client from the lobby.
    Kicked {
        #[serde(default)]
        reason: String,
    },
    /// The host disbanded the lobby.
    LobbyClosed,
}
