//! Lobby membership for lanlobby hosts.
//!
//! The host owns the only authoritative [`LobbyRoster`]. It lives inside a
//! single actor task; joins, kicks, start, and liveness sweeps are
//! commands processed strictly in arrival order, so no two mutations ever
//! interleave. Every mutation publishes a fresh roster snapshot to the
//! connection mirrors and a [`LobbySummary`] to the advertiser and
//! preconnect responder.
//!
//! # Key types
//!
//! - [`LobbyRoster`]: the state machine itself, free of I/O
//! - [`LobbyHandle`]: sends commands to a running lobby actor
//! - [`LobbyHost`]: creates, replaces, and disbands the hosted lobby
//! - [`LobbyConfig`]: name, password, capacity, sweep timing
//!
//! [`LobbySummary`]: lanlobby_protocol::LobbySummary

mod actor;
mod config;
mod error;
mod host;
mod roster;

pub use actor::LobbyHandle;
pub use config::LobbyConfig;
pub use error::LobbyError;
pub use host::LobbyHost;
pub use roster::{JoinOutcome, JoinRequest, LobbyRoster};
