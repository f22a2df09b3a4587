//! Reconnect backoff policy.
//!
//! After a transport failure the session retries automatically, waiting
//! `base_delay * 2^(attempt-1)` before attempt `attempt`. Once the attempt
//! number exceeds `max_attempts` the session transitions to
//! [`Failed`](crate::ConnectionState::Failed) and schedules nothing further.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

// ============================================================================
// Constants
// ============================================================================

/// Default delay before the first reconnect attempt.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Default maximum number of reconnect attempts.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

// ============================================================================
// ReconnectPolicy
// ============================================================================

/// Exponential backoff policy with a bounded attempt count.
///
/// With the defaults (1s base, 5 attempts) the delays are 1s, 2s, 4s, 8s,
/// 16s; a sixth failure is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Delay before the first reconnect attempt.
    pub base_delay: Duration,
    /// Maximum number of reconnect attempts before giving up.
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: DEFAULT_BASE_DELAY,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl ReconnectPolicy {
    /// Creates a policy with the given base delay and attempt cap.
    #[inline]
    #[must_use]
    pub const fn new(base_delay: Duration, max_attempts: u32) -> Self {
        Self {
            base_delay,
            max_attempts,
        }
    }

    /// Returns the delay before reconnect attempt `attempt` (1-based).
    ///
    /// Returns `None` when the attempt number is out of range, meaning the
    /// session must give up instead of scheduling a retry.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt > self.max_attempts {
            return None;
        }

        Some(self.base_delay * 2u32.saturating_pow(attempt - 1))
    }
}

// ============================================================================
// Tests
// ============================================================================
