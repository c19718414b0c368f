//! Error types for the lobby layer.

/// Errors from lobby operations. Join rejections are not errors; see
/// [`JoinOutcome`](crate::JoinOutcome).
#[derive(Debug, thiserror::Error)]
pub enum LobbyError {
    /// The lobby actor has stopped (disbanded or replaced).
    #[error("lobby is unavailable")]
    Unavailable,

    /// No lobby is being hosted.
    #[error("no lobby is hosted")]
    NoActiveLobby,

    #[error("invalid lobby config: {0}")]
    InvalidConfig(String),
}
