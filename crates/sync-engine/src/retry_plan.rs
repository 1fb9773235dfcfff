// crates/sync-engine/src/retry_plan.rs
//! Decides whether and when a failed pass is retried

use crate::classify::{FollowUp, SyncErrorKind};
use momentum_resilience::RetryPolicy;
use std::time::Duration;

/// Retry budget per error category
///
/// A network failure earns one retry until connectivity is reported
/// restored. Server and busy failures back off exponentially until the
/// policy's attempts are used. A successful pass resets both budgets.
#[derive(Debug, Clone)]
pub struct RetryPlanner {
    policy: RetryPolicy,
    network_retry_used: bool,
    backoff_attempts: usize,
}

impl RetryPlanner {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            network_retry_used: false,
            backoff_attempts: 0,
        }
    }

    /// Delay before retrying after a failure of `kind`, or `None` to stop
    pub fn plan(&mut self, kind: SyncErrorKind) -> Option<Duration> {
        match kind.follow_up() {
            FollowUp::RetryOnce => {
                if self.network_retry_used {
                    return None;
                }
                self.network_retry_used = true;
                Some(self.policy.delay_for_attempt(1))
            }
            FollowUp::RetryWithBackoff => {
                if self.backoff_attempts >= self.policy.max_retries() {
                    return None;
                }
                self.backoff_attempts += 1;
                Some(self.policy.delay_for_attempt(self.backoff_attempts))
            }
            _ => None,
        }
    }

    pub fn record_success(&mut self) {
        self.network_retry_used = false;
        self.backoff_attempts = 0;
    }

    /// Starts a new connectivity epoch
    pub fn connectivity_restored(&mut self) {
        self.network_retry_used = false;
    }
}

impl Default for RetryPlanner {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}
