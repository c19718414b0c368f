//! LAN lobby discovery.
//!
//! A host advertises its lobby by broadcasting a small [`Advertisement`]
//! datagram on a fixed UDP port at a fixed interval. Every peer that wants
//! to browse lobbies listens on the same port and keeps the latest
//! advertisement per lobby in a [`LobbyRegistry`], forgetting entries that
//! go quiet.
//!
//! ```text
//! host:   AdvertisementSource ──tick──→ UDP broadcast
//!                                           │
//! peer:   listener task ──upsert──→ LobbyRegistry ──→ discovered_lobbies()
//!                         └──event──→ drain_events()
//! ```
//!
//! [`DiscoveryService`] owns both halves; either can run alone.
//!
//! [`Advertisement`]: lanlobby_protocol::Advertisement

mod advertiser;
mod config;
mod error;
mod listener;
mod registry;
mod service;

pub use advertiser::{AdvertisementSource, LiveAdvertisement};
pub use config::{DiscoveryConfig, STALENESS_WINDOW};
pub use error::DiscoveryError;
pub use registry::{DiscoveryEvent, LobbyAdvertisement, LobbyKey, LobbyRegistry};
pub use service::{DiscoveryService, EVENT_QUEUE_CAPACITY};
