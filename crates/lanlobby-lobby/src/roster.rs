//! The roster state machine, free of I/O.

use lanlobby_protocol::{
    ConnectionId, JoinRejection, LobbyState, LobbySummary, Member, RosterSnapshot,
};

use crate::LobbyConfig;

/// A join attempt on a session connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinRequest {
    pub connection_id: ConnectionId,
    pub display_name: String,
    pub loadout_tag: String,
    pub password: String,
    /// Protocol version the client speaks.
    pub version: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Accepted,
    Rejected(JoinRejection),
}

impl JoinOutcome {
    pub fn is_accepted(self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// The authoritative member list of a hosted lobby.
///
/// Invariants held after every operation:
/// - at most `max_players` members;
/// - connection ids are unique;
/// - once started, no join succeeds;
/// - the password never changes.
///
/// `revision` increases on every change, so snapshots taken after a change
/// always compare newer than those taken before it.
#[derive(Debug, Clone)]
pub struct LobbyRoster {
    name: String,
    password: String,
    max_players: usize,
    protocol_version: u32,
    members: Vec<Member>,
    started: bool,
    revision: u64,
}

impl LobbyRoster {
    /// Creates a roster with the host as its first member.
    pub fn new(config: &LobbyConfig) -> Self {
        let host = Member {
            connection_id: ConnectionId::HOST,
            display_name: config.host_name.clone(),
            loadout_tag: config.host_loadout.clone(),
            ping_millis: 0,
        };
        Self {
            name: config.name.clone(),
            password: config.password.clone(),
            max_players: config.max_players.max(1),
            protocol_version: config.protocol_version,
            members: vec![host],
            started: false,
            revision: 1,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn max_players(&self) -> usize {
        self.max_players
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.members.iter().any(|m| m.connection_id == id)
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn password_protected(&self) -> bool {
        !self.password.is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn state(&self) -> LobbyState {
        LobbyState::from_occupancy(self.members.len(), self.max_players, self.started)
    }

    /// Validates and applies a join.
    ///
    /// Checks, first failure wins: protocol version, password, started,
    /// duplicate connection, capacity. A rejected join leaves the roster
    /// untouched.
    pub fn join(&mut self, request: JoinRequest) -> JoinOutcome {
        let rejection = if request.version != self.protocol_version {
            Some(JoinRejection::VersionMismatch)
        } else if self.password_protected() && request.password != self.password {
            Some(JoinRejection::BadPassword)
        } else if self.started {
            Some(JoinRejection::AlreadyStarted)
        } else if self.contains(request.connection_id) {
            Some(JoinRejection::DuplicateConnection)
        } else if self.members.len() >= self.max_players {
            Some(JoinRejection::LobbyFull)
        } else {
            None
        };
        if let Some(reason) = rejection {
            return JoinOutcome::Rejected(reason);
        }

        let before = self.state();
        self.members.push(Member {
            connection_id: request.connection_id,
            display_name: request.display_name,
            loadout_tag: request.loadout_tag,
            ping_millis: 0,
        });
        self.bump(before);
        debug_assert!(self.members.len() <= self.max_players);
        JoinOutcome::Accepted
    }

    /// Removes a member. Absent ids and the host itself are no-ops.
    pub fn kick(&mut self, id: ConnectionId) -> Option<Member> {
        if id.is_host() {
            return None;
        }
        let index = self.members.iter().position(|m| m.connection_id == id)?;
        let before = self.state();
        let removed = self.members.remove(index);
        self.bump(before);
        Some(removed)
    }

    /// Latches the roster into `Started`. Returns `true` only on the call
    /// that flipped the latch.
    pub fn start(&mut self) -> bool {
        if self.started {
            return false;
        }
        let before = self.state();
        self.started = true;
        self.bump(before);
        true
    }

    /// Drops every non-host member whose connection `is_alive` reports
    /// dead, returning them.
    pub fn sweep(&mut self, is_alive: impl Fn(ConnectionId) -> bool) -> Vec<Member> {
        let before = self.state();
        let mut dropped = Vec::new();
        self.members.retain(|member| {
            if member.connection_id.is_host() || is_alive(member.connection_id) {
                true
            } else {
                dropped.push(member.clone());
                false
            }
        });
        if !dropped.is_empty() {
            self.bump(before);
        }
        dropped
    }

    /// Records a measured round trip. Returns `true` if the value changed.
    pub fn update_ping(&mut self, id: ConnectionId, ping_millis: u32) -> bool {
        let Some(member) = self.member_mut(id) else {
            return false;
        };
        if member.ping_millis == ping_millis {
            return false;
        }
        member.ping_millis = ping_millis;
        self.bump(self.state());
        true
    }

    /// Changes a member's loadout. Refused once the game has started.
    pub fn update_loadout(&mut self, id: ConnectionId, loadout_tag: String) -> bool {
        if self.started {
            return false;
        }
        let Some(member) = self.member_mut(id) else {
            return false;
        };
        if member.loadout_tag == loadout_tag {
            return false;
        }
        member.loadout_tag = loadout_tag;
        self.bump(self.state());
        true
    }

    pub fn snapshot(&self) -> RosterSnapshot {
        RosterSnapshot {
            revision: self.revision,
            lobby_name: self.name.clone(),
            max_players: self.max_players,
            state: self.state(),
            members: self.members.clone(),
        }
    }

    pub fn summary(&self) -> LobbySummary {
        LobbySummary {
            lobby_name: self.name.clone(),
            max_players: self.max_players,
            current_players: self.members.len(),
            state: self.state(),
            password_protected: self.password_protected(),
        }
    }

    fn member_mut(&mut self, id: ConnectionId) -> Option<&mut Member> {
        self.members.iter_mut().find(|m| m.connection_id == id)
    }

    /// Records a mutation made while the roster was in `before`.
    fn bump(&mut self, before: LobbyState) {
        let after = self.state();
        debug_assert!(
            before == after || before.can_transition_to(after),
            "illegal lobby transition {before} -> {after}"
        );
        self.revision += 1;
    }
}

#[cfg(test)]
mod tests {
    use lanlobby_protocol::PROTOCOL_VERSION;

    use super::*;

    fn roster(password: &str, max_players: usize) -> LobbyRoster {
        LobbyRoster::new(&LobbyConfig {
            name: "Alpha".into(),
            password: password.into(),
            max_players,
            ..Default::default()
        })
    }

    fn request(id: u64, password: &str) -> JoinRequest {
        JoinRequest {
            connection_id: ConnectionId::new(id),
            display_name: format!("player-{id}"),
            loadout_tag: "rifle".into(),
            password: password.into(),
            version: PROTOCOL_VERSION,
        }
    }

    #[test]
    fn test_host_is_seeded_as_first_member() {
        let roster = roster("", 4);
        assert_eq!(roster.len(), 1);
        assert_eq!(roster.members()[0].connection_id, ConnectionId::HOST);
        assert_eq!(roster.state(), LobbyState::Open);
    }

    #[test]
    fn test_state_follows_legal_edges() {
        let mut roster = roster("", 2);
        let mut seen = vec![roster.state()];
        roster.join(request(5, ""));
        seen.push(roster.state());
        roster.kick(ConnectionId::new(5));
        seen.push(roster.state());
        roster.join(request(6, ""));
        roster.start();
        seen.push(roster.state());
        roster.kick(ConnectionId::new(6));
        seen.push(roster.state());

        assert_eq!(
            seen,
            [
                LobbyState::Open,
                LobbyState::Full,
                LobbyState::Open,
                LobbyState::Started,
                LobbyState::Started,
            ]
        );
        for pair in seen.windows(2) {
            assert!(pair[0] == pair[1] || pair[0].can_transition_to(pair[1]));
        }
    }

    #[test]
    fn test_capacity_limit() {
        let mut roster = roster("", 3);
        assert!(roster.join(request(5, "")).is_accepted());
        assert_eq!(roster.state(), LobbyState::Open);
        assert!(roster.join(request(6, "")).is_accepted());
        assert_eq!(roster.state(), LobbyState::Full);

        assert_eq!(
            roster.join(request(7, "")),
            JoinOutcome::Rejected(JoinRejection::LobbyFull)
        );
        assert_eq!(roster.len(), 3);
        assert!(!roster.contains(ConnectionId::new(7)));
    }

    #[test]
    fn test_bad_password_leaves_roster_unchanged() {
        let mut roster = roster("x", 4);
        let before = roster.snapshot();

        for attempt in ["y", "", "X"] {
            assert_eq!(
                roster.join(request(5, attempt)),
                JoinOutcome::Rejected(JoinRejection::BadPassword)
            );
        }
        assert_eq!(roster.snapshot(), before);
        assert!(roster.join(request(5, "x")).is_accepted());
    }

    #[test]
    fn test_bad_password_reported_even_when_full_or_started() {
        let mut roster = roster("x", 1);
        assert_eq!(
            roster.join(request(5, "y")),
            JoinOutcome::Rejected(JoinRejection::BadPassword)
        );
        roster.start();
        assert_eq!(
            roster.join(request(5, "y")),
            JoinOutcome::Rejected(JoinRejection::BadPassword)
        );
    }

    #[test]
    fn test_version_checked_first() {
        let mut roster = roster("x", 4);
        let mut old = request(5, "wrong");
        old.version = PROTOCOL_VERSION + 1;
        assert_eq!(
            roster.join(old),
            JoinOutcome::Rejected(JoinRejection::VersionMismatch)
        );
    }

    #[test]
    fn test_duplicate_connection_rejected() {
        let mut roster = roster("", 4);
        assert!(roster.join(request(5, "")).is_accepted());
        assert_eq!(
            roster.join(request(5, "")),
            JoinOutcome::Rejected(JoinRejection::DuplicateConnection)
        );
        assert_eq!(roster.len(), 2);
    }

    #[test]
    fn test_no_join_after_start_but_kick_still_works() {
        let mut roster = roster("", 4);
        assert!(roster.join(request(5, "")).is_accepted());
        assert!(roster.start());
        assert_eq!(roster.state(), LobbyState::Started);

        assert_eq!(
            roster.join(request(9, "")),
            JoinOutcome::Rejected(JoinRejection::AlreadyStarted)
        );
        assert_eq!(roster.len(), 2);

        assert!(roster.kick(ConnectionId::new(5)).is_some());
        assert_eq!(roster.state(), LobbyState::Started);
    }

    #[test]
    fn test_start_is_idempotent() {
        let mut once = roster("", 4);
        once.start();
        let mut twice = roster("", 4);
        twice.start();
        assert!(!twice.start());
        assert_eq!(once.snapshot(), twice.snapshot());
    }

    #[test]
    fn test_kick_absent_is_noop() {
        let mut roster = roster("", 4);
        roster.join(request(5, ""));
        let before = roster.snapshot();
        assert!(roster.kick(ConnectionId::new(99)).is_none());
        assert_eq!(roster.snapshot(), before);
    }

    #[test]
    fn test_host_cannot_be_kicked() {
        let mut roster = roster("", 4);
        assert!(roster.kick(ConnectionId::HOST).is_none());
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn test_full_reopens_after_kick() {
        let mut roster = roster("", 2);
        roster.join(request(5, ""));
        assert_eq!(roster.state(), LobbyState::Full);
        roster.kick(ConnectionId::new(5));
        assert_eq!(roster.state(), LobbyState::Open);
        assert!(roster.join(request(6, "")).is_accepted());
    }

    #[test]
    fn test_capacity_holds_under_interleaving() {
        let mut roster = roster("", 3);
        // Deterministic pseudo-random op sequence.
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        for _ in 0..500 {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            let id = ConnectionId::new(1 + seed % 6);
            match seed % 7 {
                0..=3 => {
                    roster.join(request(id.into_inner(), ""));
                }
                4 | 5 => {
                    roster.kick(id);
                }
                _ => {
                    if seed % 50 == 0 {
                        roster.start();
                    }
                }
            }
            assert!(roster.len() <= roster.max_players());
            let mut ids: Vec<_> = roster.members().iter().map(|m| m.connection_id).collect();
            ids.sort();
            ids.dedup();
            assert_eq!(ids.len(), roster.len());
        }
    }

    #[test]
    fn test_sweep_drops_dead_connections_but_not_host() {
        let mut roster = roster("", 4);
        roster.join(request(5, ""));
        roster.join(request(6, ""));

        let dropped = roster.sweep(|id| id == ConnectionId::new(6));
        assert_eq!(dropped.len(), 1);
        assert_eq!(dropped[0].connection_id, ConnectionId::new(5));
        assert!(roster.contains(ConnectionId::HOST));
        assert!(roster.contains(ConnectionId::new(6)));

        let revision = roster.revision();
        assert!(roster.sweep(|_| true).is_empty());
        assert_eq!(roster.revision(), revision);
    }

    #[test]
    fn test_revision_increases_only_on_change() {
        let mut roster = roster("", 4);
        let r0 = roster.revision();
        roster.join(request(5, ""));
        let r1 = roster.revision();
        assert!(r1 > r0);

        assert!(roster.update_ping(ConnectionId::new(5), 30));
        assert!(!roster.update_ping(ConnectionId::new(5), 30));
        assert_eq!(roster.revision(), r1 + 1);
    }

    #[test]
    fn test_loadout_frozen_after_start() {
        let mut roster = roster("", 4);
        roster.join(request(5, ""));
        assert!(roster.update_loadout(ConnectionId::new(5), "shotgun".into()));
        roster.start();
        assert!(!roster.update_loadout(ConnectionId::new(5), "sniper".into()));
        assert_eq!(roster.snapshot().members[1].loadout_tag, "shotgun");
    }

    #[test]
    fn test_summary_never_carries_password() {
        let roster = roster("hunter2", 4);
        let summary = roster.summary();
        assert!(summary.password_protected);
        assert_eq!(summary.current_players, 1);
        assert!(!format!("{summary:?}").contains("hunter2"));
    }
}
