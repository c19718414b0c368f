//! Client side of roster replication.

use std::sync::Arc;

use lanlobby_protocol::{Member, RosterSnapshot};
use tokio::sync::watch;

/// What [`ClientRosterView::apply`] did with a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The view was replaced and subscribers were notified.
    Applied,
    /// Same revision as the current view; nothing changed.
    Duplicate,
    /// Older than the current view; ignored.
    Stale,
}

/// A client's read-only replica of the host roster.
///
/// Cheap to clone; clones share the same underlying view. The view is
/// empty until the first snapshot arrives, and every apply replaces it
/// wholesale.
#[derive(Debug, Clone)]
pub struct ClientRosterView {
    tx: Arc<watch::Sender<Option<RosterSnapshot>>>,
}

impl ClientRosterView {
    /// Creates an empty, unsynchronized view.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Replaces the view with `snapshot` unless it is a duplicate or
    /// older than what the view already holds.
    pub fn apply(&self, snapshot: RosterSnapshot) -> ApplyOutcome {
        let mut outcome = ApplyOutcome::Applied;
        self.tx.send_if_modified(|current| {
            if let Some(held) = current {
                if snapshot.revision < held.revision {
                    outcome = ApplyOutcome::Stale;
                    return false;
                }
                if snapshot.revision == held.revision {
                    outcome = ApplyOutcome::Duplicate;
                    return false;
                }
            }
            *current = Some(snapshot);
            true
        });
        if outcome == ApplyOutcome::Applied {
            tracing::trace!("roster view replaced");
        }
        outcome
    }

    /// Copy of the current snapshot, if any has arrived.
    pub fn snapshot(&self) -> Option<RosterSnapshot> {
        self.tx.borrow().clone()
    }

    /// Current members, empty before the first snapshot.
    pub fn members(&self) -> Vec<Member> {
        self.tx
            .borrow()
            .as_ref()
            .map(|s| s.members.clone())
            .unwrap_or_default()
    }

    /// Returns `true` once any snapshot has been applied.
    pub fn is_synchronized(&self) -> bool {
        self.tx.borrow().is_some()
    }

    /// Subscribes to view replacements.
    pub fn subscribe(&self) -> watch::Receiver<Option<RosterSnapshot>> {
        self.tx.subscribe()
    }

    /// Forgets the current snapshot, e.g. after leaving a lobby.
    pub fn clear(&self) {
        self.tx.send_if_modified(|current| current.take().is_some());
    }
}

impl Default for ClientRosterView {
    fn default() -> Self {
        Self::new()
    }
}
