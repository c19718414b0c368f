//! Host-side evaluation of preconnect queries.

use lanlobby_protocol::{
    LobbySummary, PreconnectQuery, PreconnectResponse, PreconnectVerdict,
};

/// What a host checks a join against. The password is fixed when the
/// lobby is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinPolicy {
    password: String,
    protocol_version: u32,
}

impl JoinPolicy {
    /// An empty `password` makes the lobby open to everyone.
    pub fn new(password: impl Into<String>, protocol_version: u32) -> Self {
        Self {
            password: password.into(),
            protocol_version,
        }
    }

    pub fn password_protected(&self) -> bool {
        !self.password.is_empty()
    }

    /// Answers `query` against the lobby's current `summary`.
    ///
    /// Checks run in a fixed order and the first failure wins: protocol
    /// version, then capacity/started, then password.
    pub fn evaluate(&self, query: &PreconnectQuery, summary: &LobbySummary) -> PreconnectResponse {
        let PreconnectQuery::QueryJoin {
            password,
            player_version,
            ..
        } = query;

        let (result, reason) = if *player_version != self.protocol_version {
            (
                PreconnectVerdict::VersionMismatch,
                format!(
                    "host speaks protocol {}, client speaks {}",
                    self.protocol_version, player_version
                ),
            )
        } else if summary.state.is_started() {
            (PreconnectVerdict::LobbyFull, "game already started".to_string())
        } else if !summary.state.is_joinable() {
            (
                PreconnectVerdict::LobbyFull,
                format!("lobby is full ({}/{})", summary.current_players, summary.max_players),
            )
        } else if self.password_protected() && *password != self.password {
            (PreconnectVerdict::BadPassword, "wrong password".to_string())
        } else {
            (PreconnectVerdict::Ok, String::new())
        };

        PreconnectResponse { result, reason }
    }
}
