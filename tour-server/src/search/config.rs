//! Tunables for the search lifecycle.

use std::time::Duration;

use crate::aggregate::ResolvePolicy;

/// Configuration parameters for price searches.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// How many times a transient fetch failure is retried before the
    /// session gives up. "Not ready" replies never count against this.
    pub max_retries: u32,

    /// Fixed delay before retrying a failed fetch.
    pub retry_delay: Duration,

    /// Delay used when the backend says "not ready" without saying when.
    pub not_ready_delay: Duration,

    /// How hotels referenced by offers are looked up.
    pub resolve_policy: ResolvePolicy,
}

impl SearchConfig {
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn with_not_ready_delay(mut self, delay: Duration) -> Self {
        self.not_ready_delay = delay;
        self
    }

    pub fn with_resolve_policy(mut self, policy: ResolvePolicy) -> Self {
        self.resolve_policy = policy;
        self
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            retry_delay: Duration::from_secs(1),
            not_ready_delay: Duration::from_secs(2),
            resolve_policy: ResolvePolicy::PerHotel,
        }
    }
}
