use std::time::Duration;

use crate::retry::RetryPolicy;

/// Tuning for the publishing pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishConfig {
    /// Applies to publish calls and to transient token-refresh failures.
    pub retry: RetryPolicy,
    /// Upper bound for any single marketplace call.
    pub call_timeout: Duration,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            call_timeout: Duration::from_secs(30),
        }
    }
}

impl PublishConfig {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.retry.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }
}
