//! Connection lifecycle states.
//!
//! One [`ConnectionState`] instance exists per session; it is the single
//! source of truth for whether outbound sends are permitted. All transitions
//! happen inside the session actor, so observers only ever see a consistent
//! snapshot.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

// ============================================================================
// ConnectionState
// ============================================================================

/// State of the session's relay connection.
///
/// # Transitions
///
/// ```text
/// Disconnected ──start()──► Connecting ──open──► Connected
///      ▲                        │  ▲                 │
///      │                     fail│  │timer       close/error
///      │                        ▼  │                 ▼
///      │                      Reconnecting ◄─────────┘
///      │                        │
///      │            attempts exhausted
///   stop()                      ▼
///      └────────────────────  Failed
/// ```
///
/// `Unconfigured` is entered directly from `start()` when no relay endpoint
/// is configured. `Failed` and `Unconfigured` are terminal: only `stop()`
/// (returning to `Disconnected`) followed by a fresh `start()` recovers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// No session running. The initial state, and the state `stop()`
    /// returns to.
    Disconnected,

    /// A connection attempt is in flight.
    Connecting,

    /// The relay connection is open; sends are permitted.
    Connected,

    /// Connection lost; a retry is scheduled.
    Reconnecting {
        /// Reconnect attempt number, starting at 1.
        attempt: u32,
        /// Delay before the attempt is made.
        delay: Duration,
    },

    /// Reconnect attempts exhausted. Terminal for the session.
    Failed,

    /// No relay endpoint configured. Terminal for the session.
    Unconfigured,
}

// ============================================================================
// Predicates
// ============================================================================

impl ConnectionState {
    /// Returns `true` if outbound sends are permitted in this state.
    #[inline]
    #[must_use]
    pub fn allows_send(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Returns `true` if this state is terminal.
    ///
    /// Terminal states are only left via `stop()`; the session never
    /// schedules further work from them.
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Failed | Self::Unconfigured)
    }

    /// Returns `true` if a reconnect is pending.
    #[inline]
    #[must_use]
    pub fn is_reconnecting(&self) -> bool {
        matches!(self, Self::Reconnecting { .. })
    }
}

// ============================================================================
// Display
// ============================================================================

impl fmt::Display for ConnectionState {
    /// Renders the human-readable status string shown in a status bar.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting..."),
            Self::Connected => write!(f, "Connected"),
            Self::Reconnecting { .. } => write!(f, "Reconnecting..."),
            Self::Failed => write!(f, "Connection failed"),
            Self::Unconfigured => write!(f, "No relay configured"),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
