//! Relay wire protocol message types.
//!
//! This module defines the frame format exchanged with the SChat relay over
//! the persistent WebSocket connection.
//!
//! # Protocol Overview
//!
//! Every frame, in either direction, is one JSON record with optional
//! fields. A single inbound frame may carry a chat payload, a presence
//! payload, both, or neither:
//!
//! | Fields | Meaning |
//! |--------|---------|
//! | `id` + `author` + `body` | Chat message |
//! | `onlineUsers` | Presence snapshot |
//! | `type: "ping"` | Heartbeat / keepalive |
//!
//! A frame carrying none of the recognized fields is ignorable. Frames that
//! fail to deserialize are logged and dropped by the session manager; they
//! never affect connection state.

// ============================================================================
// Submodules
// ============================================================================

/// Wire frame definition and payload classification.
pub mod frame;

// ============================================================================
// Re-exports
// ============================================================================

pub use frame::{ChatPayload, Frame};
