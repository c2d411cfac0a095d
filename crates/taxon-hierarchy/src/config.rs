use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Retry policy for the hierarchy writer.
///
/// Only transient store failures are retried. After `max_attempts` calls
/// the writer gives up and reports `HierarchyWriteFailed`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterConfig {
    /// Total calls per store write, including the first one.
    pub max_attempts: u32,
    /// Base delay between attempts; attempt `n` waits `n * retry_backoff_ms`.
    pub retry_backoff_ms: u64,
    /// Add up to one base delay of random jitter to each wait.
    pub jitter: bool,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_backoff_ms: 5,
            jitter: true,
        }
    }
}

impl WriterConfig {
    /// Single attempt, no waiting. Useful for tests and fail-fast tools.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            retry_backoff_ms: 0,
            jitter: false,
        }
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let base = self.retry_backoff_ms.saturating_mul(u64::from(attempt));
        let jitter = if self.jitter && self.retry_backoff_ms > 0 {
            rand::thread_rng().gen_range(0..=self.retry_backoff_ms)
        } else {
            0
        };
        Duration::from_millis(base.saturating_add(jitter))
    }
}
