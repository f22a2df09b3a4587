//! Session identity helpers.
//!
//! A session's display name comes from an external identity provider when
//! one is present. When it is not, the session gets a randomly generated
//! two-word pseudonym ("adjective animal"), chosen once per session.
//!
//! The name is only a label: it is carried on outbound chat frames and used
//! locally to tell own messages apart from peer messages. It is never an
//! authentication credential.

// ============================================================================
// Imports
// ============================================================================

use rand::Rng;

// ============================================================================
// Word Lists
// ============================================================================

/// Adjectives for generated pseudonyms.
const ADJECTIVES: &[&str] = &[
    "amber", "bold", "brave", "bright", "calm", "clever", "curious", "eager",
    "fierce", "gentle", "hidden", "keen", "lively", "lucky", "mellow", "nimble",
    "patient", "quick", "quiet", "rapid", "silent", "subtle", "swift", "wild",
];

/// Animals for generated pseudonyms.
const ANIMALS: &[&str] = &[
    "badger", "bison", "crane", "falcon", "ferret", "fox", "gecko", "heron",
    "ibis", "jackal", "lemur", "lynx", "marmot", "marten", "otter", "owl",
    "panther", "puffin", "raven", "stoat", "swallow", "tapir", "viper", "wren",
];

// ============================================================================
// Pseudonym Generation
// ============================================================================

/// Generates a random two-word pseudonym, e.g. `"quick lynx"`.
///
/// Useful when no authenticated identity is available. The result is always
/// non-empty, satisfying the author invariant on
/// [`ChatEvent`](crate::ChatEvent).
#[must_use]
pub fn pseudonym() -> String {
    let mut rng = rand::rng();
    let adjective = ADJECTIVES[rng.random_range(0..ADJECTIVES.len())];
    let animal = ANIMALS[rng.random_range(0..ANIMALS.len())];
    format!("{adjective} {animal}")
}

/// Resolves the display name a session will use.
///
/// Returns the trimmed requested name, or a generated pseudonym when the
/// requested name is empty or whitespace-only.
pub(crate) fn resolve_display_name(requested: &str) -> String {
    let trimmed = requested.trim();
    if trimmed.is_empty() {
        pseudonym()
    } else {
        trimmed.to_string()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pseudonym_is_two_known_words() {
        let name = pseudonym();
        let words: Vec<&str> = name.split(' ').collect();

        assert_eq!(words.len(), 2);
        assert!(ADJECTIVES.contains(&words[0]));
        assert!(ANIMALS.contains(&words[1]));
    }

    #[test]
    fn test_pseudonym_never_empty() {
        for _ in 0..32 {
            assert!(!pseudonym().is_empty());
        }
    }

    #[test]
    fn test_resolve_keeps_requested_name() {
        assert_eq!(resolve_display_name("ada"), "ada");
        assert_eq!(resolve_display_name("  ada  "), "ada");
    }

    #[test]
    fn test_resolve_falls_back_to_pseudonym() {
        let name = resolve_display_name("   ");
        assert!(!name.is_empty());
        assert_eq!(name.split(' ').count(), 2);
    }
}
