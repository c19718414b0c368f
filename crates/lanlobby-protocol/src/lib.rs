//! Wire protocol for lanlobby.
//!
//! This crate defines what peers say to each other:
//!
//! - **Types** ([`Advertisement`], [`PreconnectQuery`], [`ClientMessage`],
//!   [`RosterSnapshot`], ...): the fixed-schema messages on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how messages become bytes.
//! - **Datagram framing** ([`encode_datagram`], [`decode_datagram`]): magic
//!   prefixes for connectionless UDP payloads.
//! - **Errors** ([`ProtocolError`]).
//!
//! It knows nothing about sockets, tasks, or lobbies.
//!
//! ```text
//! Transport (bytes) → Protocol (typed messages) → Discovery / Preconnect / Lobby
//! ```

mod codec;
mod datagram;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use datagram::{Datagram, decode_datagram, encode_datagram};
pub use error::ProtocolError;
pub use types::{
    Advertisement, ClientMessage, ConnectionId, DEFAULT_DISCOVERY_PORT, DEFAULT_SESSION_PORT,
    JoinRejection, LobbyState, LobbySummary, Member, PRECONNECT_PORT_OFFSET, PROTOCOL_VERSION,
    PreconnectQuery, PreconnectResponse, PreconnectVerdict, RosterSnapshot, ServerMessage,
    preconnect_port,
};
