//! Bounded wait for the first roster snapshot, with explicit resync.
//!
//! The host pushes a snapshot right after accepting a join, but that push
//! can be missed (e.g. the view was created after the reply was read).
//! Instead of waiting forever, the client polls its view with exponential
//! backoff and, after a few quiet polls, asks the host for a snapshot.

use std::time::Duration;

use lanlobby_protocol::RosterSnapshot;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{ClientRosterView, ReplicationError};

/// Something that can ask the host to resend the roster.
pub trait RosterRequester: Send + Sync {
    /// Sends a roster request. Does not wait for the reply; the reply
    /// arrives through the normal snapshot path.
    async fn request_roster(&self) -> Result<(), ReplicationError>;
}

/// Timing for [`ensure_synchronized`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResyncPolicy {
    /// Total polling attempts before giving up.
    pub max_attempts: u32,
    /// Attempts that only wait. Every attempt after these also sends a
    /// roster request.
    pub passive_attempts: u32,
    /// Wait of the first attempt.
    pub initial_backoff: Duration,
    /// Cap on the per-attempt wait.
    pub max_backoff: Duration,
    /// Random extra wait as a fraction of the backoff, in `0.0..=1.0`
    /// (0.0 disables).
    pub jitter: f64,
}

impl Default for ResyncPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            passive_attempts: 2,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(2),
            jitter: 0.2,
        }
    }
}

impl ResyncPolicy {
    /// Checks values that would otherwise panic or never wait.
    pub fn validate(&self) -> Result<(), ReplicationError> {
        if self.max_attempts == 0 {
            return Err(ReplicationError::InvalidPolicy(
                "max_attempts must be at least 1".into(),
            ));
        }
        if self.initial_backoff.is_zero() || self.max_backoff < self.initial_backoff {
            return Err(ReplicationError::InvalidPolicy(
                "backoff must be nonzero and max_backoff at least initial_backoff".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.jitter) {
            return Err(ReplicationError::InvalidPolicy(format!(
                "jitter {} outside 0.0..=1.0",
                self.jitter
            )));
        }
        Ok(())
    }

    /// The wait before attempt `attempt` (0-based) gives up, without jitter.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    fn jittered(&self, base: Duration) -> Duration {
        if self.jitter <= 0.0 {
            return base;
        }
        let extra = rand::rng().random_range(0.0..=self.jitter.min(1.0));
        base.saturating_add(base.mul_f64(extra))
    }
}

/// Waits until `view` holds a snapshot, requesting one from the host once
/// the passive attempts are used up.
///
/// # Errors
/// - [`ReplicationError::SyncTimedOut`] if every attempt elapses empty.
/// - Any error from `requester`.
pub async fn ensure_synchronized(
    view: &ClientRosterView,
    requester: &impl RosterRequester,
    policy: &ResyncPolicy,
) -> Result<RosterSnapshot, ReplicationError> {
    let mut rx = view.subscribe();

    for attempt in 0..policy.max_attempts {
        if let Some(snapshot) = rx.borrow_and_update().clone() {
            return Ok(snapshot);
        }

        if attempt >= policy.passive_attempts {
            tracing::debug!(attempt, "no roster yet, requesting resync");
            requester.request_roster().await?;
        }

        let wait = policy.jittered(policy.backoff(attempt));
        if let Ok(Err(_)) = tokio::time::timeout(wait, rx.changed()).await {
            return Err(ReplicationError::ViewClosed);
        }
    }

    rx.borrow().clone().ok_or(ReplicationError::SyncTimedOut {
        attempts: policy.max_attempts,
    })
}
