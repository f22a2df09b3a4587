//! SChat relay client - self-healing realtime session manager.
//!
//! This library maintains a single persistent bidirectional connection to an
//! SChat relay and presents the embedding application with a simple,
//! consistent stream of deduplicated chat events and a reliable
//! connectivity status.
//!
//! # Architecture
//!
//! One [`SessionManager`] owns the socket lifecycle, the backoff timer, the
//! heartbeat timer, and the deduplicated event stream:
//!
//! - At most one live relay connection per session; on loss the manager
//!   heals itself with bounded exponential backoff and nobody outside needs
//!   to intervene.
//! - Inbound frames are classified into chat and presence payloads; chat
//!   ids are deduplicated per session, presence always overwrites.
//! - Outbound messages get a fresh sender-assigned id and an immediate
//!   optimistic local echo; the relay's echo is dropped by the same dedup
//!   path as any redelivery.
//! - All effects are observed through one [`SessionEvent`] stream; none of
//!   the public calls block or throw.
//!
//! The design is intentionally ephemeral: no persistence, no delivery
//! guarantee across a disconnect, a fresh identity per session.
//!
//! # Quick Start
//!
//! ```no_run
//! use schat_client::{SessionConfig, SessionEvent, SessionManager};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = SessionConfig::from_env()?;
//!     let (session, mut events) = SessionManager::new(config);
//!
//!     session.start("ada");
//!     session.send("hello, void");
//!
//!     while let Some(event) = events.recv().await {
//!         match event {
//!             SessionEvent::Chat(msg) => println!("<{}> {}", msg.author, msg.body),
//!             SessionEvent::StateChanged(state) => println!("[{state}]"),
//!             SessionEvent::PresenceChanged(n) => println!("{n} online"),
//!             SessionEvent::TypingChanged(active) => {
//!                 if active {
//!                     println!("someone is typing...");
//!                 }
//!             }
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identity`] | Display names and pseudonym generation |
//! | [`protocol`] | Relay wire frames (internal format, public types) |
//! | [`session`] | Session manager, lifecycle states, configuration |

// ============================================================================
// Modules
// ============================================================================

/// Error types and result aliases.
///
/// Internal plumbing only: transport failures reach the caller as state
/// changes, never as returned errors.
pub mod error;

/// Session identity helpers.
///
/// Two-word pseudonyms for sessions without an authenticated identity.
pub mod identity;

/// Relay wire protocol message types.
pub mod protocol;

/// Relay session layer.
///
/// Lifecycle state machine, reconnect policy, dedup, typing derivation.
pub mod session;

// ============================================================================
// Re-exports
// ============================================================================

// Error types
pub use error::{Error, Result};

// Identity helpers
pub use identity::pseudonym;

// Protocol types
pub use protocol::{ChatPayload, Frame};

// Session types
pub use session::{
    ChatEvent, ConnectionState, ReconnectPolicy, SessionConfig, SessionEvent, SessionManager,
};
