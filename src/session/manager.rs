//! Session manager: connection lifecycle, healing, and event multiplexing.
//!
//! The [`SessionManager`] owns at most one live relay connection per
//! session, together with the heartbeat timer, the reconnect timer, and the
//! deduplicated event stream. It is the sole producer of
//! [`SessionEvent`] notifications.
//!
//! # Event Loop
//!
//! `SessionManager::new` spawns one actor task that owns every piece of
//! mutable session state: the connection, both timers, the dedup log, the
//! typing window. Public calls (`start`, `send`, `stop`) never block; they
//! enqueue commands that the actor consumes, and effects are observed
//! through the notification stream.
//!
//! Every `select!` in the actor polls the command channel first (`biased`),
//! so a queued `stop` always wins against a concurrently expired reconnect
//! or heartbeat timer. Because the timers are futures owned by the one
//! loop, processing `stop` drops them before they can act: a reconnect
//! scheduled by a previous attempt can never resurrect a stopped session.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{self, Instant};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::identity::resolve_display_name;
use crate::protocol::Frame;
use crate::session::backoff::ReconnectPolicy;
use crate::session::config::SessionConfig;
use crate::session::dedup::DedupLog;
use crate::session::event::{ChatEvent, SessionEvent};
use crate::session::state::ConnectionState;
use crate::session::typing::TypingWindow;

// ============================================================================
// Types
// ============================================================================

/// WebSocket stream to the relay.
type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Write half of the relay connection.
type WsSink = SplitSink<WsStream, Message>;

// ============================================================================
// SessionCommand
// ============================================================================

/// Commands from the public handle to the actor.
enum SessionCommand {
    /// Begin a session under the given display name.
    Start {
        /// Requested display name; blank falls back to a pseudonym.
        display_name: String,
    },
    /// Transmit a chat message (pre-validated by the handle).
    Send {
        /// Message text.
        text: String,
    },
    /// Tear the session down.
    Stop,
}

// ============================================================================
// SharedState
// ============================================================================

/// State snapshots shared between the handle and the actor.
struct SharedState {
    /// Current connection state.
    state: Mutex<ConnectionState>,
    /// Last received participant count.
    presence: Mutex<u32>,
}

// ============================================================================
// SessionManager
// ============================================================================

/// Handle to a relay session.
///
/// Cheap to clone; all clones drive the same session. Dropping the last
/// handle closes the command channel, which shuts the actor down and closes
/// the transport.
///
/// # Thread Safety
///
/// `SessionManager` is `Send + Sync`. None of its methods block: effects
/// are observed through the [`SessionEvent`] receiver returned by
/// [`SessionManager::new`].
#[derive(Clone)]
pub struct SessionManager {
    /// Channel for sending commands to the actor.
    command_tx: mpsc::UnboundedSender<SessionCommand>,
    /// Snapshots shared with the actor.
    shared: Arc<SharedState>,
    /// Maximum outbound message length, in characters.
    max_message_len: usize,
}

impl SessionManager {
    /// Creates a session manager and spawns its actor task.
    ///
    /// Returns the handle together with the notification stream. The
    /// session starts in [`ConnectionState::Disconnected`]; nothing touches
    /// the network until [`start`](Self::start).
    #[must_use]
    pub fn new(config: SessionConfig) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let shared = Arc::new(SharedState {
            state: Mutex::new(ConnectionState::Disconnected),
            presence: Mutex::new(0),
        });

        let max_message_len = config.max_message_len;
        let actor = SessionActor {
            policy: config.reconnect_policy(),
            typing: TypingWindow::new(config.typing_window),
            config,
            shared: Arc::clone(&shared),
            command_rx,
            event_tx,
            dedup: DedupLog::new(),
            display_name: String::new(),
        };
        tokio::spawn(actor.run());

        (
            Self {
                command_tx,
                shared,
                max_message_len,
            },
            event_rx,
        )
    }

    /// Starts the session under the given display name.
    ///
    /// A blank name falls back to a generated pseudonym. Without a
    /// configured endpoint the session lands in
    /// [`ConnectionState::Unconfigured`] and no connection attempt is made.
    /// Calling `start` while a session is already running (or in a terminal
    /// state) is a no-op; recover from a terminal state with
    /// [`stop`](Self::stop) first.
    pub fn start(&self, display_name: &str) {
        let _ = self.command_tx.send(SessionCommand::Start {
            display_name: display_name.to_string(),
        });
    }

    /// Submits a chat message for transmission.
    ///
    /// Returns `true` if the message was accepted. Rejection is a silent
    /// no-op (never an error): whitespace-only text, text over the
    /// configured length limit, or any state other than
    /// [`ConnectionState::Connected`] rejects without side effect.
    ///
    /// On acceptance the message is assigned a fresh unique id, emitted
    /// immediately as a local [`SessionEvent::Chat`] echo, and transmitted
    /// to the relay. Messages are not queued across a disconnect.
    pub fn send(&self, text: &str) -> bool {
        if text.trim().is_empty() {
            debug!("send rejected: empty message");
            return false;
        }
        if text.chars().count() > self.max_message_len {
            debug!(
                limit = self.max_message_len,
                "send rejected: message too long"
            );
            return false;
        }
        if !self.shared.state.lock().allows_send() {
            debug!("send rejected: not connected");
            return false;
        }

        self.command_tx
            .send(SessionCommand::Send {
                text: text.to_string(),
            })
            .is_ok()
    }

    /// Stops the session.
    ///
    /// Cancels any pending reconnect or heartbeat timer, closes the
    /// transport if open, and returns the session to
    /// [`ConnectionState::Disconnected`], from which `start` works again.
    /// Idempotent.
    pub fn stop(&self) {
        let _ = self.command_tx.send(SessionCommand::Stop);
    }

    /// Returns the current connection state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.shared.state.lock().clone()
    }

    /// Returns the last received participant count.
    ///
    /// Zero until the first presence frame of the session arrives.
    #[inline]
    #[must_use]
    pub fn presence(&self) -> u32 {
        *self.shared.presence.lock()
    }
}

// ============================================================================
// SessionActor
// ============================================================================

/// Owner of all mutable session state. Runs on one spawned task.
struct SessionActor {
    /// Session configuration.
    config: SessionConfig,
    /// Reconnect backoff policy.
    policy: ReconnectPolicy,
    /// Snapshots shared with the handle.
    shared: Arc<SharedState>,
    /// Commands from the handle.
    command_rx: mpsc::UnboundedReceiver<SessionCommand>,
    /// Notification stream to the presentation layer.
    event_tx: mpsc::UnboundedSender<SessionEvent>,
    /// Message ids observed during the current session.
    dedup: DedupLog,
    /// Derived typing indicator.
    typing: TypingWindow,
    /// Display name chosen at session start.
    display_name: String,
}

/// How a connection attempt resolved.
enum ConnectOutcome {
    /// Transport open.
    Open(WsStream),
    /// Attempt failed; the reconnect policy decides what happens next.
    Failed(Error),
    /// Stop requested while the attempt was in flight.
    Stopped,
}

/// Why the connected phase ended.
enum DriveOutcome {
    /// Stop requested; the session is over.
    Stopped,
    /// Transport lost; the reconnect policy decides what happens next.
    Lost,
}

impl SessionActor {
    /// Top-level actor loop: idle until a session starts, then run it to
    /// completion, repeat.
    async fn run(mut self) {
        while let Some(command) = self.command_rx.recv().await {
            match command {
                SessionCommand::Start { display_name } => {
                    if self.state() != ConnectionState::Disconnected {
                        debug!("start ignored: session already started");
                        continue;
                    }
                    self.display_name = resolve_display_name(&display_name);
                    info!(display_name = %self.display_name, "session starting");

                    match self.config.endpoint.clone() {
                        None => {
                            info!("no relay endpoint configured");
                            self.set_state(ConnectionState::Unconfigured);
                        }
                        Some(endpoint) => self.run_session(endpoint).await,
                    }
                }

                SessionCommand::Send { .. } => {
                    debug!("send dropped: no active session");
                }

                SessionCommand::Stop => {
                    // Leaves Failed/Unconfigured; silent when already idle.
                    self.set_state(ConnectionState::Disconnected);
                }
            }
        }

        debug!("session handle dropped; actor terminated");
    }

    /// Runs one session: connect, drive, heal, until stopped or exhausted.
    async fn run_session(&mut self, endpoint: Url) {
        self.dedup.clear();
        *self.shared.presence.lock() = 0;

        let mut attempt: u32 = 0;

        loop {
            self.set_state(ConnectionState::Connecting);

            match self.connect(&endpoint).await {
                ConnectOutcome::Open(stream) => {
                    attempt = 0;
                    info!(endpoint = %endpoint, "relay connection established");

                    match self.drive(stream).await {
                        DriveOutcome::Stopped => return,
                        DriveOutcome::Lost => {}
                    }
                }

                ConnectOutcome::Failed(error) => {
                    warn!(%error, "relay connection attempt failed");
                }

                ConnectOutcome::Stopped => {
                    self.set_state(ConnectionState::Disconnected);
                    return;
                }
            }

            attempt += 1;
            let Some(delay) = self.policy.delay_for(attempt) else {
                warn!(
                    max_attempts = self.policy.max_attempts,
                    "reconnect attempts exhausted; giving up"
                );
                self.set_state(ConnectionState::Failed);
                return;
            };

            debug!(attempt, ?delay, "reconnect scheduled");
            self.set_state(ConnectionState::Reconnecting { attempt, delay });

            if !self.backoff_wait(delay).await {
                return;
            }
        }
    }

    /// Opens the transport, racing the attempt against incoming commands.
    async fn connect(&mut self, endpoint: &Url) -> ConnectOutcome {
        let attempt = connect_async(endpoint.as_str());
        tokio::pin!(attempt);

        loop {
            tokio::select! {
                biased;

                command = self.command_rx.recv() => match command {
                    Some(SessionCommand::Stop) | None => return ConnectOutcome::Stopped,
                    Some(SessionCommand::Start { .. }) => {
                        debug!("start ignored: already connecting");
                    }
                    Some(SessionCommand::Send { .. }) => {
                        debug!("send dropped: not connected");
                    }
                },

                result = &mut attempt => return match result {
                    Ok((stream, _response)) => ConnectOutcome::Open(stream),
                    Err(error) => ConnectOutcome::Failed(error.into()),
                },
            }
        }
    }

    /// The connected phase: pump frames, heartbeat, and outbound sends
    /// until the transport drops or a stop arrives.
    async fn drive(&mut self, stream: WsStream) -> DriveOutcome {
        self.set_state(ConnectionState::Connected);

        let (mut sink, mut source) = stream.split();
        let mut heartbeat = time::interval_at(
            Instant::now() + self.config.heartbeat_interval,
            self.config.heartbeat_interval,
        );

        loop {
            let typing_deadline = self.typing.deadline();

            tokio::select! {
                biased;

                command = self.command_rx.recv() => match command {
                    Some(SessionCommand::Stop) | None => {
                        let _ = sink.close().await;
                        self.end_typing();
                        self.set_state(ConnectionState::Disconnected);
                        return DriveOutcome::Stopped;
                    }
                    Some(SessionCommand::Start { .. }) => {
                        debug!("start ignored: already connected");
                    }
                    Some(SessionCommand::Send { text }) => {
                        if let Err(error) = self.transmit(&mut sink, &text).await {
                            warn!(%error, "outbound send failed; dropping connection");
                            self.end_typing();
                            return DriveOutcome::Lost;
                        }
                    }
                },

                message = source.next() => match message {
                    Some(Ok(Message::Text(text))) => self.handle_frame(&text),

                    Some(Ok(Message::Close(_))) => {
                        debug!("relay closed the connection");
                        self.end_typing();
                        return DriveOutcome::Lost;
                    }

                    Some(Err(error)) => {
                        warn!(%error, "relay connection error");
                        self.end_typing();
                        return DriveOutcome::Lost;
                    }

                    None => {
                        debug!("relay stream ended");
                        self.end_typing();
                        return DriveOutcome::Lost;
                    }

                    // Binary, Ping, Pong are transport noise here.
                    Some(Ok(_)) => {}
                },

                _ = heartbeat.tick() => {
                    if let Err(error) = self.send_ping(&mut sink).await {
                        warn!(%error, "heartbeat failed; dropping connection");
                        self.end_typing();
                        return DriveOutcome::Lost;
                    }
                }

                () = time::sleep_until(
                    typing_deadline.unwrap_or_else(|| Instant::now() + Duration::from_secs(60))
                ), if typing_deadline.is_some() => {
                    self.end_typing();
                }
            }
        }
    }

    /// Waits out a backoff delay. Returns `false` if stop arrived first.
    async fn backoff_wait(&mut self, delay: Duration) -> bool {
        let timer = time::sleep(delay);
        tokio::pin!(timer);

        loop {
            tokio::select! {
                biased;

                command = self.command_rx.recv() => match command {
                    Some(SessionCommand::Stop) | None => {
                        self.set_state(ConnectionState::Disconnected);
                        return false;
                    }
                    Some(SessionCommand::Start { .. }) => {
                        debug!("start ignored: reconnect pending");
                    }
                    Some(SessionCommand::Send { .. }) => {
                        debug!("send dropped: not connected");
                    }
                },

                () = &mut timer => return true,
            }
        }
    }

    /// Classifies and applies one inbound frame.
    ///
    /// A frame may carry a chat payload, a presence payload, both, or
    /// neither; the effects apply independently. Malformed frames are
    /// logged and dropped without touching connection state.
    fn handle_frame(&mut self, text: &str) {
        let frame = match Frame::decode(text) {
            Ok(frame) => frame,
            Err(error) => {
                warn!(%error, "discarding malformed frame");
                return;
            }
        };

        if let Some(chat) = frame.chat_payload() {
            if self.dedup.contains(chat.id) {
                debug!(id = chat.id, "duplicate message dropped");
            } else {
                self.dedup.insert(chat.id);
                let event = ChatEvent::inbound(chat.id, chat.author, chat.body);
                let from_peer = !event.is_from(&self.display_name);
                self.emit(SessionEvent::Chat(event));

                if from_peer && self.typing.trigger(Instant::now()) {
                    self.emit(SessionEvent::TypingChanged(true));
                }
            }
        }

        if let Some(count) = frame.presence() {
            *self.shared.presence.lock() = count;
            self.emit(SessionEvent::PresenceChanged(count));
        }
    }

    /// Builds, echoes, and transmits one outbound chat message.
    async fn transmit(&mut self, sink: &mut WsSink, text: &str) -> Result<()> {
        let event = ChatEvent::outbound(self.display_name.clone(), text);

        // The own id enters the dedup log now, so the relay's echo of this
        // message is dropped by the same path as any other redelivery.
        self.dedup.insert(&event.id);

        let json = Frame::chat(&event.id, &event.author, &event.body).encode()?;

        debug!(id = %event.id, "chat message sent");
        self.emit(SessionEvent::Chat(event));

        sink.send(Message::Text(json.into())).await?;
        Ok(())
    }

    /// Sends one heartbeat frame.
    async fn send_ping(&mut self, sink: &mut WsSink) -> Result<()> {
        let json = Frame::ping().encode()?;
        trace!("heartbeat ping");
        sink.send(Message::Text(json.into())).await?;
        Ok(())
    }

    /// Returns the current connection state.
    fn state(&self) -> ConnectionState {
        self.shared.state.lock().clone()
    }

    /// Transitions the connection state, notifying on actual change.
    fn set_state(&mut self, next: ConnectionState) {
        {
            let mut state = self.shared.state.lock();
            if *state == next {
                return;
            }
            *state = next.clone();
        }

        debug!(state = %next, "connection state changed");
        self.emit(SessionEvent::StateChanged(next));
    }

    /// Clears the typing indicator, notifying if it was raised.
    fn end_typing(&mut self) {
        if self.typing.clear() {
            self.emit(SessionEvent::TypingChanged(false));
        }
    }

    /// Emits a notification. A dropped receiver is not an error.
    fn emit(&self, event: SessionEvent) {
        let _ = self.event_tx.send(event);
    }
}

// ============================================================================
// Tests
// ============================================================================
