use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Extra wait on top of a probe's timeout, covering scheduling delay.
pub const PROBE_GRACE: Duration = Duration::from_millis(150);

/// Client-side probe timing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreconnectConfig {
    pub timeout: Duration,
    pub grace: Duration,
}

impl Default for PreconnectConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(1),
            grace: PROBE_GRACE,
        }
    }
}

impl PreconnectConfig {
    /// Hard upper bound on a probe.
    pub fn deadline(&self) -> Duration {
        self.timeout + self.grace
    }
}
