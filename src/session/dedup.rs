//! Message deduplication log.
//!
//! The relay offers no delivery-once guarantee: it echoes the sender's own
//! frames back and may re-deliver a frame after a reconnect. Every observed
//! message id goes through one [`DedupLog`]; an id is accepted exactly once
//! per session, however many times it arrives.
//!
//! Locally originated ids are inserted at send time, so the relay's echo of
//! an own message is dropped by the same path as any other redelivery.

// ============================================================================
// Imports
// ============================================================================

use rustc_hash::FxHashSet;

// ============================================================================
// DedupLog
// ============================================================================

/// Set of message ids observed during the current session.
#[derive(Debug, Default)]
pub(crate) struct DedupLog {
    seen: FxHashSet<String>,
}

impl DedupLog {
    /// Creates an empty log.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an id, returning `true` if it was not seen before.
    ///
    /// A `false` return means the message is a duplicate and must be
    /// discarded without emitting an event.
    #[inline]
    pub fn insert(&mut self, id: &str) -> bool {
        self.seen.insert(id.to_string())
    }

    /// Returns `true` if the id has already been observed.
    #[inline]
    pub fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    /// Forgets all observed ids. Called when a fresh session starts.
    #[inline]
    pub fn clear(&mut self) {
        self.seen.clear();
    }
}

// ============================================================================
// Tests
// ============================================================================
