//! Typing-indicator derivation.
//!
//! The relay has no typing protocol. The indicator is derived locally: an
//! accepted inbound chat event from another participant raises it, and it
//! clears on its own a fixed window later unless re-triggered. It is a
//! presentation affordance only and never blocks or reorders the chat
//! stream.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tokio::time::Instant;

// ============================================================================
// TypingWindow
// ============================================================================

/// Tracks the armed/cleared state of the derived typing indicator.
///
/// The owner is responsible for emitting notifications on the edges: raise
/// when [`trigger`](Self::trigger) returns `true`, clear when
/// [`clear`](Self::clear) returns `true` after the deadline elapses (or on
/// disconnect).
#[derive(Debug)]
pub(crate) struct TypingWindow {
    /// How long the indicator stays raised after the last trigger.
    window: Duration,
    /// When the indicator should clear; `None` while not armed.
    deadline: Option<Instant>,
}

impl TypingWindow {
    /// Creates an unarmed window.
    #[inline]
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    /// Arms the indicator (or extends an armed one) from `now`.
    ///
    /// Returns `true` on the rising edge, i.e. when the indicator was not
    /// already raised. Extensions return `false` so the owner does not emit
    /// duplicate raise notifications.
    pub fn trigger(&mut self, now: Instant) -> bool {
        let was_armed = self.deadline.is_some();
        self.deadline = Some(now + self.window);
        !was_armed
    }

    /// Returns the instant at which the indicator should clear.
    #[inline]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Disarms the indicator, returning `true` if it was raised.
    pub fn clear(&mut self) -> bool {
        self.deadline.take().is_some()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(2);

    #[test]
    fn test_trigger_rising_edge() {
        let mut typing = TypingWindow::new(WINDOW);
        let now = Instant::now();

        assert!(typing.trigger(now));
        assert_eq!(typing.deadline(), Some(now + WINDOW));
    }

    #[test]
    fn test_retrigger_extends_silently() {
        let mut typing = TypingWindow::new(WINDOW);
        let now = Instant::now();

        assert!(typing.trigger(now));
        let later = now + Duration::from_secs(1);
        assert!(!typing.trigger(later));
        assert_eq!(typing.deadline(), Some(later + WINDOW));
    }

    #[test]
    fn test_clear_reports_armed_state() {
        let mut typing = TypingWindow::new(WINDOW);

        assert!(!typing.clear());

        typing.trigger(Instant::now());
        assert!(typing.clear());
        assert!(typing.deadline().is_none());

        // Idempotent.
        assert!(!typing.clear());
    }

    #[test]
    fn test_rearm_after_clear() {
        let mut typing = TypingWindow::new(WINDOW);

        typing.trigger(Instant::now());
        typing.clear();

        assert!(typing.trigger(Instant::now()));
    }
}
