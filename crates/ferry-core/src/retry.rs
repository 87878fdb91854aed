//! Bounded retry with exponential backoff.

use serde::{Deserialize, Serialize};

/// Retry policy for transient gateway failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryConfig {
    /// Maximum retry attempts after the initial try.
    pub max_retries: u32,
    /// Base delay for the first retry.
    pub base_delay_ms: u64,
    /// Upper bound on any single delay.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay_ms: 250,
            max_delay_ms: 4_000,
        }
    }
}

impl RetryConfig {
    /// Backoff delay before retry `attempt` (1-based), with ±25% jitter.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> u64 {
        let exp = attempt.saturating_sub(1).min(16);
        let base = self
            .base_delay_ms
            .saturating_mul(1_u64 << exp)
            .min(self.max_delay_ms);
        // Jitter in [0.75, 1.25) so synchronized callers spread out.
        let jitter = 0.75 + rand::random::<f64>() * 0.5;
        ((base as f64) * jitter) as u64
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
