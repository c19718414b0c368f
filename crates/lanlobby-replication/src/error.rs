//! Error types for the replication layer.

/// Errors surfaced by client-side roster synchronization.
#[derive(Debug, thiserror::Error)]
pub enum ReplicationError {
    /// No snapshot arrived even after explicit resync requests.
    #[error("no roster snapshot after {attempts} attempts")]
    SyncTimedOut { attempts: u32 },

    /// Sending a resync request to the host failed.
    #[error("roster request failed: {0}")]
    RequestFailed(String),

    /// The view being synchronized was dropped.
    #[error("roster view closed")]
    ViewClosed,

    #[error("invalid resync policy: {0}")]
    InvalidPolicy(String),
}
