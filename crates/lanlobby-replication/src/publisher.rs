//! Host side of roster replication.

use lanlobby_protocol::RosterSnapshot;
use tokio::sync::watch;

/// Publishes roster snapshots to every connection's mirror.
///
/// Owned by the lobby actor, which is the only writer.
#[derive(Debug)]
pub struct RosterPublisher {
    tx: watch::Sender<RosterSnapshot>,
}

impl RosterPublisher {
    /// Creates a publisher seeded with the roster's first snapshot.
    pub fn new(initial: RosterSnapshot) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx }
    }

    /// Publishes `snapshot` if it differs from the current one.
    ///
    /// Returns `true` if mirrors were notified. Older revisions are
    /// ignored so a late publish can never roll clients back.
    pub fn publish(&self, snapshot: RosterSnapshot) -> bool {
        self.tx.send_if_modified(|current| {
            if snapshot.revision < current.revision || *current == snapshot {
                return false;
            }
            *current = snapshot;
            true
        })
    }

    /// Returns a new mirror for a connection. The mirror starts with the
    /// current snapshot marked as unseen, so the first `changed()` call
    /// yields it immediately.
    pub fn mirror(&self) -> RosterMirror {
        let mut rx = self.tx.subscribe();
        rx.mark_changed();
        RosterMirror { rx }
    }
}

/// A connection's view of the published roster: a single-slot buffer
/// where intermediate snapshots may be skipped but the latest is never
/// lost.
#[derive(Debug, Clone)]
pub struct RosterMirror {
    rx: watch::Receiver<RosterSnapshot>,
}

impl RosterMirror {
    /// Waits for a snapshot this mirror has not yielded yet.
    ///
    /// Returns `None` once the publisher is gone (lobby disbanded).
    /// Cancel-safe.
    pub async fn changed(&mut self) -> Option<RosterSnapshot> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// A new mirror on the same publisher whose first `changed()` yields
    /// the current snapshot. Holding mirrors does not keep the publisher
    /// alive.
    pub fn fork(&self) -> RosterMirror {
        let mut rx = self.rx.clone();
        rx.mark_changed();
        RosterMirror { rx }
    }

    /// Current snapshot, marking it as seen.
    pub fn latest(&mut self) -> RosterSnapshot {
        self.rx.borrow_and_update().clone()
    }

    /// Returns `true` if a snapshot is waiting to be yielded.
    pub fn has_pending(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use lanlobby_protocol::{ConnectionId, LobbyState, Member};

    use super::*;

    fn snap(revision: u64, members: u64) -> RosterSnapshot {
        RosterSnapshot {
            revision,
            lobby_name: "Alpha".into(),
            max_players: 4,
            state: LobbyState::Open,
            members: (0..members)
                .map(|i| Member {
                    connection_id: ConnectionId::new(i),
                    display_name: format!("p{i}"),
                    loadout_tag: String::new(),
                    ping_millis: 0,
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_new_mirror_yields_current_snapshot_first() {
        let publisher = RosterPublisher::new(snap(1, 1));
        let mut mirror = publisher.mirror();
        assert!(mirror.has_pending());

        let first = mirror.changed().await.unwrap();
        assert_eq!(first.revision, 1);
        assert!(!mirror.has_pending());
    }

    #[tokio::test]
    async fn test_every_mirror_sees_latest_publish() {
        let publisher = RosterPublisher::new(snap(1, 1));
        let mut a = publisher.mirror();
        let mut b = publisher.mirror();
        a.latest();
        b.latest();

        assert!(publisher.publish(snap(2, 2)));
        assert!(publisher.publish(snap(3, 3)));

        // Intermediate revision 2 is coalesced away.
        assert_eq!(a.changed().await.unwrap().revision, 3);
        assert_eq!(b.changed().await.unwrap().revision, 3);
    }

    #[test]
    fn test_identical_and_older_snapshots_are_not_published() {
        let publisher = RosterPublisher::new(snap(5, 2));
        let mut mirror = publisher.mirror();
        mirror.latest();

        assert!(!publisher.publish(snap(5, 2)));
        assert!(!publisher.publish(snap(4, 3)));
        assert!(!mirror.has_pending());
        assert_eq!(mirror.latest().revision, 5);
    }

    #[tokio::test]
    async fn test_fork_starts_with_current_snapshot() {
        let publisher = RosterPublisher::new(snap(1, 1));
        let mut template = publisher.mirror();
        template.latest();
        publisher.publish(snap(2, 2));

        let mut forked = template.fork();
        assert_eq!(forked.changed().await.unwrap().revision, 2);
    }

    #[tokio::test]
    async fn test_mirror_ends_when_publisher_dropped() {
        let publisher = RosterPublisher::new(snap(1, 1));
        let mut mirror = publisher.mirror();
        mirror.latest();
        drop(publisher);
        assert!(mirror.changed().await.is_none());
    }
}
