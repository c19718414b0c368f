//! Roster replication for lanlobby.
//!
//! The host owns the authoritative roster; clients hold read-only copies.
//! Replication is full-snapshot, never incremental: rosters are small, and
//! a snapshot applied twice is harmless.
//!
//! ```text
//! host:   lobby actor ──publish──→ RosterPublisher ──→ RosterMirror (per connection)
//!                                                        │ (session connection)
//! client:                          ClientRosterView ←──apply──┘
//! ```
//!
//! # Key types
//!
//! - [`RosterPublisher`] / [`RosterMirror`]: host side, backed by a
//!   `tokio::sync::watch` channel. Each mirror is a single-slot buffer
//!   where the latest snapshot wins.
//! - [`ClientRosterView`]: client side, replaced wholesale on apply.
//! - [`ensure_synchronized`]: bounded wait-then-request loop for clients
//!   that missed the initial push.

#![allow(async_fn_in_trait)]

mod error;
mod publisher;
mod resync;
mod view;

pub use error::ReplicationError;
pub use publisher::{RosterMirror, RosterPublisher};
pub use resync::{ResyncPolicy, RosterRequester, ensure_synchronized};
pub use view::{ApplyOutcome, ClientRosterView};
