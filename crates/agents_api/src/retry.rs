use std::time::Duration;

/// Maximum retry attempts after an initial request attempt.
pub const MAX_RETRIES: u32 = 3;
/// Base delay multiplied by `2^attempt` for each retry.
pub const BASE_DELAY_MS: u64 = 1000;

/// Statuses treated as transient.
pub const RETRYABLE_STATUSES: [u16; 4] = [429, 502, 503, 504];

/// Retry policy for transient HTTP failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            base_delay: Duration::from_millis(BASE_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt` (1-based): `base * 2^attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(30);
        self.base_delay.saturating_mul(2u32.saturating_pow(exponent))
    }
}

/// Status-only retry policy; the response body never makes a failure retryable.
pub fn is_retryable_status(status: u16) -> bool {
    RETRYABLE_STATUSES.contains(&status)
}

/// Compute the default exponential backoff delay for a retry attempt (1-based).
pub fn retry_delay(attempt: u32) -> Duration {
    RetryPolicy::default().delay_for(attempt)
}
