//! Session notifications and the chat event model.
//!
//! The session manager is the sole producer of [`SessionEvent`]s; the
//! presentation layer consumes them from the receiver handed out by
//! [`SessionManager::new`](crate::SessionManager::new). There is no other
//! observable surface.

// ============================================================================
// Imports
// ============================================================================

use std::time::{SystemTime, UNIX_EPOCH};

use uuid::Uuid;

use crate::session::state::ConnectionState;

// ============================================================================
// ChatEvent
// ============================================================================

/// One observed chat message.
///
/// `id` is assigned by the sender at creation time, not by the relay, and is
/// the sole deduplication key: within a session's event stream every `id`
/// appears at most once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEvent {
    /// Opaque unique identifier, assigned by the sender.
    pub id: String,

    /// Display name of the author. Never empty.
    pub author: String,

    /// Message text.
    pub body: String,

    /// Client-observed timestamp: receipt time for inbound events, creation
    /// time for outbound ones. Display-only, never used for ordering.
    pub sent_at: SystemTime,
}

// ============================================================================
// Constructors
// ============================================================================

impl ChatEvent {
    /// Creates a locally originated event with a fresh unique id.
    #[must_use]
    pub fn outbound(author: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            author: author.into(),
            body: body.into(),
            sent_at: SystemTime::now(),
        }
    }

    /// Creates an event for an inbound chat payload, stamped with the
    /// receipt time.
    #[must_use]
    pub fn inbound(
        id: impl Into<String>,
        author: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            author: author.into(),
            body: body.into(),
            sent_at: SystemTime::now(),
        }
    }
}

// ============================================================================
// Display Helpers
// ============================================================================

impl ChatEvent {
    /// Returns `true` if the event was authored under the given name.
    #[inline]
    #[must_use]
    pub fn is_from(&self, name: &str) -> bool {
        self.author == name
    }

    /// Renders the age of this event relative to `now`.
    ///
    /// Under a minute renders as `"now"`, then `"{m}m ago"`, then
    /// `"{h}h ago"`, and past a day falls back to the UTC wall-clock time
    /// (`HH:MM`).
    #[must_use]
    pub fn relative_time(&self, now: SystemTime) -> String {
        let elapsed = now.duration_since(self.sent_at).unwrap_or_default();
        let minutes = elapsed.as_secs() / 60;

        if minutes < 1 {
            return "now".to_string();
        }
        if minutes < 60 {
            return format!("{minutes}m ago");
        }
        if minutes < 24 * 60 {
            return format!("{}h ago", minutes / 60);
        }

        let epoch_secs = self
            .sent_at
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let minute_of_day = (epoch_secs / 60) % (24 * 60);
        format!("{:02}:{:02}", minute_of_day / 60, minute_of_day % 60)
    }
}

// ============================================================================
// SessionEvent
// ============================================================================

/// A notification emitted by the session manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The connection state changed.
    StateChanged(ConnectionState),

    /// A chat message was accepted into the event stream (inbound, or the
    /// optimistic local echo of an own message).
    Chat(ChatEvent),

    /// A presence frame replaced the participant-count snapshot.
    PresenceChanged(u32),

    /// The derived typing indicator was raised (`true`) or cleared
    /// (`false`).
    TypingChanged(bool),
}

// ============================================================================
// Tests
// ============================================================================
