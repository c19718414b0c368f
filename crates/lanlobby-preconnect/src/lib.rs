//! Preconnect: "would my join succeed?" answered in one UDP round trip.
//!
//! Before opening a full session connection, a client sends a
//! [`PreconnectQuery`] to the host's preconnect port (discovery port + 1).
//! The host's [`PreconnectResponder`] evaluates it against the lobby's
//! published summary with [`JoinPolicy`] and answers with a verdict.
//! [`probe`] is the client half; it never waits longer than its timeout
//! plus a short grace period.
//!
//! [`PreconnectQuery`]: lanlobby_protocol::PreconnectQuery

mod config;
mod error;
mod policy;
mod probe;
mod responder;

pub use config::{PROBE_GRACE, PreconnectConfig};
pub use error::PreconnectError;
pub use policy::JoinPolicy;
pub use probe::{PreconnectResult, probe};
pub use responder::PreconnectResponder;
