//! Registry of live session connections.
//!
//! Each connection handler registers its id when the connection is
//! accepted and unregisters it when the handler exits. The lobby uses the
//! registry (through [`ConnectionControl`]) for two things:
//!
//! - liveness sweeps: a roster member whose id is no longer registered is
//!   a ghost and gets dropped;
//! - teardown: rejected joins and kicks signal the owning handler to close
//!   its socket.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;

use crate::ConnectionId;

/// The narrow view of the connection layer the lobby needs.
pub trait ConnectionControl: Send + Sync + 'static {
    /// Returns `true` if the connection still exists.
    fn is_alive(&self, id: ConnectionId) -> bool;

    /// Asks the connection's owner to tear it down. No-op for unknown ids.
    fn close(&self, id: ConnectionId);
}

/// Shared table of live connections. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct ConnectionRegistry {
    live: Arc<Mutex<HashMap<ConnectionId, watch::Sender<bool>>>>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection and returns the signal its handler should
    /// watch for close requests. Re-registering an id replaces the old
    /// entry and closes the previous signal.
    pub fn register(&self, id: ConnectionId) -> CloseSignal {
        let (tx, rx) = watch::channel(false);
        let previous = self
            .live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, tx);
        if let Some(previous) = previous {
            let _ = previous.send(true);
        }
        tracing::trace!(%id, "connection registered");
        CloseSignal { rx }
    }

    /// Removes a connection. Called by the handler on exit.
    pub fn unregister(&self, id: ConnectionId) {
        self.live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
        tracing::trace!(%id, "connection unregistered");
    }

    /// Number of live connections.
    pub fn len(&self) -> usize {
        self.live.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns `true` if no connection is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Closes every registered connection.
    pub fn close_all(&self) {
        let drained: Vec<_> = self
            .live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .collect();
        for (_, tx) in drained {
            let _ = tx.send(true);
        }
    }
}

impl ConnectionControl for ConnectionRegistry {
    fn is_alive(&self, id: ConnectionId) -> bool {
        self.live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&id)
    }

    fn close(&self, id: ConnectionId) {
        let entry = self
            .live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
        if let Some(tx) = entry {
            let _ = tx.send(true);
            tracing::debug!(%id, "connection close requested");
        }
    }
}

/// Resolves once the registry asks the connection to close.
#[derive(Debug, Clone)]
pub struct CloseSignal {
    rx: watch::Receiver<bool>,
}

impl CloseSignal {
    /// Waits until a close was requested. Also resolves if the registry
    /// entry was dropped without an explicit request.
    pub async fn closed(&mut self) {
        let _ = self.rx.wait_for(|closed| *closed).await;
    }

    /// Returns `true` if a close was already requested.
    pub fn is_closed(&self) -> bool {
        *self.rx.borrow()
    }
}
