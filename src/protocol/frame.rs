//! Wire frame definition and payload classification.
//!
//! The relay speaks a single flat record type. Older relay builds used
//! `name`/`message` for the chat fields, so those are accepted as aliases on
//! input; this client always writes `author`/`body`.
//!
//! # Format
//!
//! Chat frame:
//!
//! ```json
//! { "id": "b1c2…", "author": "quick lynx", "body": "hello" }
//! ```
//!
//! Presence frame (may be combined with a chat frame):
//!
//! ```json
//! { "onlineUsers": 17 }
//! ```
//!
//! Heartbeat frame:
//!
//! ```json
//! { "type": "ping" }
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::error::Result;

// ============================================================================
// Constants
// ============================================================================

/// `type` value marking a heartbeat frame.
const PING_TYPE: &str = "ping";

// ============================================================================
// Frame
// ============================================================================

/// One frame on the relay connection.
///
/// All fields are optional; classification happens after deserialization via
/// [`Frame::chat_payload`] and [`Frame::presence`]. Unknown extra fields are
/// ignored on input, and absent fields are omitted on output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    /// Control frame discriminator (`"ping"` for heartbeats).
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub frame_type: Option<String>,

    /// Sender-assigned message identifier, the sole deduplication key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Display name of the message author.
    #[serde(default, alias = "name", skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    /// Message text.
    #[serde(default, alias = "message", skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,

    /// Count of currently connected participants.
    #[serde(
        rename = "onlineUsers",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub online_users: Option<u32>,
}

// ============================================================================
// Constructors
// ============================================================================

impl Frame {
    /// Creates an outbound chat frame.
    #[inline]
    #[must_use]
    pub fn chat(
        id: impl Into<String>,
        author: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            id: Some(id.into()),
            author: Some(author.into()),
            body: Some(body.into()),
            ..Self::default()
        }
    }

    /// Creates a heartbeat frame (`{"type":"ping"}`).
    #[inline]
    #[must_use]
    pub fn ping() -> Self {
        Self {
            frame_type: Some(PING_TYPE.to_string()),
            ..Self::default()
        }
    }
}

// ============================================================================
// Codec
// ============================================================================

impl Frame {
    /// Deserializes a frame from relay text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if the text is not a
    /// valid frame record.
    #[inline]
    pub fn decode(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Serializes the frame for transmission.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if serialization fails.
    #[inline]
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

// ============================================================================
// Classification
// ============================================================================

impl Frame {
    /// Returns the chat payload, if this frame carries a complete one.
    ///
    /// A chat payload requires `id`, `author`, and `body` all present and
    /// non-empty; a frame missing any of the three carries no chat payload
    /// and the partial fields are ignored.
    #[must_use]
    pub fn chat_payload(&self) -> Option<ChatPayload<'_>> {
        let id = self.id.as_deref().filter(|s| !s.is_empty())?;
        let author = self.author.as_deref().filter(|s| !s.is_empty())?;
        let body = self.body.as_deref().filter(|s| !s.is_empty())?;

        Some(ChatPayload { id, author, body })
    }

    /// Returns the presence payload, if present.
    ///
    /// Presence is always accepted as-is: the most recently received value
    /// wins, whether or not it is larger than the previous one.
    #[inline]
    #[must_use]
    pub fn presence(&self) -> Option<u32> {
        self.online_users
    }

    /// Returns `true` if this is a heartbeat frame.
    #[inline]
    #[must_use]
    pub fn is_ping(&self) -> bool {
        self.frame_type.as_deref() == Some(PING_TYPE)
    }
}

// ============================================================================
// ChatPayload
// ============================================================================

/// A complete chat payload borrowed from a [`Frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatPayload<'a> {
    /// Sender-assigned message identifier.
    pub id: &'a str,
    /// Display name of the author.
    pub author: &'a str,
    /// Message text.
    pub body: &'a str,
}

// ============================================================================
// Tests
// ============================================================================
