//! Session configuration.
//!
//! Provides a type-safe interface for configuring a session: the relay
//! endpoint, reconnect policy, heartbeat cadence, typing window, and the
//! outbound message length limit.
//!
//! # Example
//!
//! ```ignore
//! use schat_client::SessionConfig;
//! use url::Url;
//!
//! let config = SessionConfig::new()
//!     .with_endpoint(Url::parse("ws://relay.schat.im:8080")?)
//!     .with_max_attempts(8);
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};

use super::backoff::{DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS, ReconnectPolicy};

// ============================================================================
// Constants
// ============================================================================

/// Environment variable holding the relay endpoint URL.
pub const ENDPOINT_ENV: &str = "SCHAT_RELAY_URL";

/// Default interval between heartbeat frames while connected.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Default window during which a typing indicator stays raised.
pub const DEFAULT_TYPING_WINDOW: Duration = Duration::from_secs(2);

/// Default maximum outbound message length, in characters.
pub const DEFAULT_MAX_MESSAGE_LEN: usize = 280;

// ============================================================================
// SessionConfig
// ============================================================================

/// Configuration for a relay session.
///
/// The endpoint is the only setting without a default. A config without one
/// is still valid: `start()` then lands in the
/// [`Unconfigured`](crate::ConnectionState::Unconfigured) terminal state
/// instead of attempting a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Relay endpoint. `None` means unconfigured.
    pub endpoint: Option<Url>,

    /// Delay before the first reconnect attempt.
    pub base_delay: Duration,

    /// Maximum number of reconnect attempts before giving up.
    pub max_attempts: u32,

    /// Interval between heartbeat frames while connected.
    pub heartbeat_interval: Duration,

    /// Window during which a typing indicator stays raised.
    pub typing_window: Duration,

    /// Maximum outbound message length, in characters.
    pub max_message_len: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            base_delay: DEFAULT_BASE_DELAY,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            typing_window: DEFAULT_TYPING_WINDOW,
            max_message_len: DEFAULT_MAX_MESSAGE_LEN,
        }
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl SessionConfig {
    /// Creates a config with default settings and no endpoint.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a config with the endpoint taken from [`ENDPOINT_ENV`].
    ///
    /// An unset variable yields an unconfigured config, which is a valid
    /// state, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the variable is set but not a valid URL.
    pub fn from_env() -> Result<Self> {
        match std::env::var(ENDPOINT_ENV) {
            Ok(raw) => {
                let url = Url::parse(&raw).map_err(|e| {
                    Error::config(format!("invalid {ENDPOINT_ENV} \"{raw}\": {e}"))
                })?;
                Ok(Self::new().with_endpoint(url))
            }
            Err(_) => Ok(Self::new()),
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl SessionConfig {
    /// Sets the relay endpoint.
    #[inline]
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: Url) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    /// Sets the delay before the first reconnect attempt.
    #[inline]
    #[must_use]
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Sets the maximum number of reconnect attempts.
    #[inline]
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Sets the heartbeat interval.
    #[inline]
    #[must_use]
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Sets the typing-indicator window.
    #[inline]
    #[must_use]
    pub fn with_typing_window(mut self, window: Duration) -> Self {
        self.typing_window = window;
        self
    }

    /// Sets the maximum outbound message length, in characters.
    #[inline]
    #[must_use]
    pub fn with_max_message_len(mut self, len: usize) -> Self {
        self.max_message_len = len;
        self
    }
}

// ============================================================================
// Accessors
// ============================================================================

impl SessionConfig {
    /// Returns the reconnect policy derived from this config.
    #[inline]
    #[must_use]
    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy::new(self.base_delay, self.max_attempts)
    }

    /// Returns `true` if a relay endpoint is configured.
    #[inline]
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.endpoint.is_some()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::new();

        assert!(!config.is_configured());
        assert_eq!(config.base_delay, Duration::from_secs(1));
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.heartbeat_interval, Duration::from_secs(30));
        assert_eq!(config.typing_window, Duration::from_secs(2));
        assert_eq!(config.max_message_len, 280);
    }

    #[test]
    fn test_builder_methods() {
        let endpoint = Url::parse("ws://127.0.0.1:9000").expect("valid url");
        let config = SessionConfig::new()
            .with_endpoint(endpoint.clone())
            .with_base_delay(Duration::from_millis(50))
            .with_max_attempts(2)
            .with_heartbeat_interval(Duration::from_secs(5))
            .with_typing_window(Duration::from_millis(500))
            .with_max_message_len(140);

        assert_eq!(config.endpoint, Some(endpoint));
        assert!(config.is_configured());
        assert_eq!(config.base_delay, Duration::from_millis(50));
        assert_eq!(config.max_attempts, 2);
        assert_eq!(config.heartbeat_interval, Duration::from_secs(5));
        assert_eq!(config.typing_window, Duration::from_millis(500));
        assert_eq!(config.max_message_len, 140);
    }

    #[test]
    fn test_reconnect_policy_derivation() {
        let config = SessionConfig::new()
            .with_base_delay(Duration::from_millis(10))
            .with_max_attempts(3);

        let policy = config.reconnect_policy();
        assert_eq!(policy.base_delay, Duration::from_millis(10));
        assert_eq!(policy.max_attempts, 3);
    }

    #[test]
    fn test_from_env_unset_is_unconfigured() {
        // The test binary never sets SCHAT_RELAY_URL, so an unset variable
        // must resolve to a valid, unconfigured config.
        if std::env::var(ENDPOINT_ENV).is_err() {
            let config = SessionConfig::from_env().expect("unset env is not an error");
            assert!(!config.is_configured());
        }
    }

    #[test]
    fn test_endpoint_parse_rejects_garbage() {
        let err = Url::parse("not a url");
        assert!(err.is_err());
    }
}
