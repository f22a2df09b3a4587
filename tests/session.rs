//! Integration tests for the session manager against an in-process relay.
//!
//! Each test spins up a real WebSocket endpoint on a loopback port, so the
//! full path is exercised: transport handshake, frame codec, dedup,
//! presence, heartbeat, typing derivation, and the reconnect state machine.
//! Timers are shortened through `SessionConfig` so backoff and heartbeat
//! tests complete in milliseconds.

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use schat_client::{ChatEvent, ConnectionState, SessionConfig, SessionEvent, SessionManager};

// ============================================================================
// Relay Harness
// ============================================================================

/// Handle to an in-process relay bound to a loopback port.
///
/// The relay accepts connections one at a time (each new connection replaces
/// the previous one), forwards every text frame the client sends to
/// `inbound`, and transmits every frame pushed into `outbound` to the
/// client.
struct Relay {
    addr: SocketAddr,
    inbound: mpsc::UnboundedReceiver<String>,
    outbound: mpsc::UnboundedSender<String>,
}

async fn spawn_relay() -> Relay {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind relay");
    let addr = listener.local_addr().expect("relay addr");

    let (in_tx, in_rx) = mpsc::unbounded_channel();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            let Ok(mut ws) = accept_async(stream).await else {
                continue;
            };

            loop {
                tokio::select! {
                    message = ws.next() => match message {
                        Some(Ok(Message::Text(text))) => {
                            let _ = in_tx.send(text.to_string());
                        }
                        Some(Ok(_)) => {}
                        _ => break,
                    },
                    frame = out_rx.recv() => match frame {
                        Some(text) => {
                            if ws.send(Message::Text(text.into())).await.is_err() {
                                break;
                            }
                        }
                        None => return,
                    },
                }
            }
        }
    });

    Relay {
        addr,
        inbound: in_rx,
        outbound: out_tx,
    }
}

/// Binds and immediately drops a listener, yielding an address that refuses
/// connections.
async fn refused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    listener.local_addr().expect("addr")
}

fn config_for(addr: SocketAddr) -> SessionConfig {
    SessionConfig::new()
        .with_endpoint(Url::parse(&format!("ws://{addr}")).expect("valid url"))
        .with_base_delay(Duration::from_millis(25))
        .with_max_attempts(3)
        .with_heartbeat_interval(Duration::from_secs(60))
        .with_typing_window(Duration::from_millis(100))
}

fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}

// ============================================================================
// Event Helpers
// ============================================================================

async fn recv_event(events: &mut mpsc::UnboundedReceiver<SessionEvent>) -> SessionEvent {
    timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event stream closed")
}

/// Next state-change notification, skipping unrelated events.
async fn next_state(events: &mut mpsc::UnboundedReceiver<SessionEvent>) -> ConnectionState {
    loop {
        if let SessionEvent::StateChanged(state) = recv_event(events).await {
            return state;
        }
    }
}

/// Next chat notification, skipping unrelated events.
async fn next_chat(events: &mut mpsc::UnboundedReceiver<SessionEvent>) -> ChatEvent {
    loop {
        if let SessionEvent::Chat(event) = recv_event(events).await {
            return event;
        }
    }
}

/// Asserts that nothing is emitted for `grace` milliseconds.
async fn assert_silent(events: &mut mpsc::UnboundedReceiver<SessionEvent>, grace: u64) {
    let outcome = timeout(Duration::from_millis(grace), events.recv()).await;
    assert!(outcome.is_err(), "unexpected event: {:?}", outcome.unwrap());
}

/// Starts a session against the relay and waits until it is connected.
async fn connect(relay: &Relay, name: &str) -> (SessionManager, mpsc::UnboundedReceiver<SessionEvent>) {
    let (manager, mut events) = SessionManager::new(config_for(relay.addr));
    manager.start(name);

    assert_eq!(next_state(&mut events).await, ConnectionState::Connecting);
    assert_eq!(next_state(&mut events).await, ConnectionState::Connected);

    (manager, events)
}

// ============================================================================
// Connection Lifecycle
// ============================================================================

#[tokio::test]
async fn connects_and_reports_connected() {
    init_logging();
    let relay = spawn_relay().await;

    let (manager, _events) = connect(&relay, "ada").await;
    assert_eq!(manager.state(), ConnectionState::Connected);
}

#[tokio::test]
async fn reconnects_after_relay_drop() {
    init_logging();

    // First connection is closed by the relay immediately; the second is
    // kept open.
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept #1");
        drop(accept_async(stream).await.expect("handshake #1"));

        let (stream, _) = listener.accept().await.expect("accept #2");
        let mut ws = accept_async(stream).await.expect("handshake #2");
        while let Some(Ok(_)) = ws.next().await {}
    });

    let (manager, mut events) = SessionManager::new(config_for(addr));
    manager.start("ada");

    assert_eq!(next_state(&mut events).await, ConnectionState::Connecting);
    assert_eq!(next_state(&mut events).await, ConnectionState::Connected);
    assert_eq!(
        next_state(&mut events).await,
        ConnectionState::Reconnecting {
            attempt: 1,
            delay: Duration::from_millis(25),
        }
    );
    assert_eq!(next_state(&mut events).await, ConnectionState::Connecting);
    assert_eq!(next_state(&mut events).await, ConnectionState::Connected);
}

#[tokio::test]
async fn backoff_doubles_until_failed() {
    init_logging();
    let addr = refused_addr().await;

    let (manager, mut events) = SessionManager::new(config_for(addr));
    manager.start("ada");

    let base = Duration::from_millis(25);
    for attempt in 1..=3u32 {
        assert_eq!(next_state(&mut events).await, ConnectionState::Connecting);
        assert_eq!(
            next_state(&mut events).await,
            ConnectionState::Reconnecting {
                attempt,
                delay: base * 2u32.pow(attempt - 1),
            }
        );
    }
    assert_eq!(next_state(&mut events).await, ConnectionState::Connecting);
    assert_eq!(next_state(&mut events).await, ConnectionState::Failed);

    // Terminal: nothing further is scheduled.
    assert_silent(&mut events, 300).await;
    assert_eq!(manager.state(), ConnectionState::Failed);
}

#[tokio::test]
async fn stop_mid_backoff_cancels_the_pending_retry() {
    init_logging();
    let addr = refused_addr().await;

    let config = SessionConfig::new()
        .with_endpoint(Url::parse(&format!("ws://{addr}")).expect("valid url"))
        .with_base_delay(Duration::from_millis(300))
        .with_max_attempts(5);
    let (manager, mut events) = SessionManager::new(config);
    manager.start("ada");

    assert_eq!(next_state(&mut events).await, ConnectionState::Connecting);
    assert!(next_state(&mut events).await.is_reconnecting());

    manager.stop();
    assert_eq!(next_state(&mut events).await, ConnectionState::Disconnected);

    // The reconnect timer was in flight; it must not fire after stop.
    assert_silent(&mut events, 500).await;
    assert_eq!(manager.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn stop_then_start_recovers_from_failed() {
    init_logging();
    let addr = refused_addr().await;

    let config = SessionConfig::new()
        .with_endpoint(Url::parse(&format!("ws://{addr}")).expect("valid url"))
        .with_base_delay(Duration::from_millis(10))
        .with_max_attempts(1);
    let (manager, mut events) = SessionManager::new(config);
    manager.start("ada");

    assert_eq!(next_state(&mut events).await, ConnectionState::Connecting);
    assert!(next_state(&mut events).await.is_reconnecting());
    assert_eq!(next_state(&mut events).await, ConnectionState::Connecting);
    assert_eq!(next_state(&mut events).await, ConnectionState::Failed);

    // start without stop is a no-op in a terminal state.
    manager.start("ada");
    assert_silent(&mut events, 150).await;

    manager.stop();
    assert_eq!(next_state(&mut events).await, ConnectionState::Disconnected);

    manager.start("ada");
    assert_eq!(next_state(&mut events).await, ConnectionState::Connecting);
}

// ============================================================================
// Inbound Frames
// ============================================================================

#[tokio::test]
async fn duplicate_ids_are_emitted_once() {
    init_logging();
    let relay = spawn_relay().await;
    let (_manager, mut events) = connect(&relay, "ada").await;

    let frame = r#"{"id":"m1","author":"grace","body":"first"}"#;
    relay.outbound.send(frame.to_string()).expect("push");
    relay.outbound.send(frame.to_string()).expect("push");
    relay
        .outbound
        .send(r#"{"id":"m2","author":"grace","body":"second"}"#.to_string())
        .expect("push");

    assert_eq!(next_chat(&mut events).await.id, "m1");
    // The re-delivered m1 is dropped: the next chat event is m2.
    assert_eq!(next_chat(&mut events).await.id, "m2");
}

#[tokio::test]
async fn legacy_field_names_are_accepted() {
    init_logging();
    let relay = spawn_relay().await;
    let (_manager, mut events) = connect(&relay, "ada").await;

    relay
        .outbound
        .send(r#"{"id":"m1","name":"grace","message":"old wire"}"#.to_string())
        .expect("push");

    let chat = next_chat(&mut events).await;
    assert_eq!(chat.author, "grace");
    assert_eq!(chat.body, "old wire");
}

#[tokio::test]
async fn incomplete_and_malformed_frames_are_dropped() {
    init_logging();
    let relay = spawn_relay().await;
    let (manager, mut events) = connect(&relay, "ada").await;

    relay.outbound.send("garbage".to_string()).expect("push");
    relay
        .outbound
        .send(r#"{"author":"grace","body":"no id"}"#.to_string())
        .expect("push");
    relay
        .outbound
        .send(r#"{"id":"m1","body":"no author"}"#.to_string())
        .expect("push");

    // None of the above produced an event or hurt the connection.
    assert_silent(&mut events, 200).await;
    assert_eq!(manager.state(), ConnectionState::Connected);

    relay
        .outbound
        .send(r#"{"id":"ok","author":"grace","body":"fine"}"#.to_string())
        .expect("push");
    assert_eq!(next_chat(&mut events).await.id, "ok");
}

#[tokio::test]
async fn presence_always_overwrites() {
    init_logging();
    let relay = spawn_relay().await;
    let (manager, mut events) = connect(&relay, "ada").await;

    relay
        .outbound
        .send(r#"{"onlineUsers":5}"#.to_string())
        .expect("push");
    assert_eq!(
        recv_event(&mut events).await,
        SessionEvent::PresenceChanged(5)
    );

    // A lower value still overwrites: the snapshot is most-recent, not max.
    relay
        .outbound
        .send(r#"{"onlineUsers":2}"#.to_string())
        .expect("push");
    assert_eq!(
        recv_event(&mut events).await,
        SessionEvent::PresenceChanged(2)
    );
    assert_eq!(manager.presence(), 2);
}

#[tokio::test]
async fn combined_frame_applies_both_payloads() {
    init_logging();
    let relay = spawn_relay().await;
    let (_manager, mut events) = connect(&relay, "ada").await;

    relay
        .outbound
        .send(r#"{"id":"m1","author":"grace","body":"hey","onlineUsers":7}"#.to_string())
        .expect("push");

    let mut saw_chat = false;
    let mut saw_presence = false;
    for _ in 0..3 {
        match recv_event(&mut events).await {
            SessionEvent::Chat(event) => {
                assert_eq!(event.id, "m1");
                saw_chat = true;
            }
            SessionEvent::PresenceChanged(count) => {
                assert_eq!(count, 7);
                saw_presence = true;
            }
            SessionEvent::TypingChanged(_) => {}
            other => panic!("unexpected event: {other:?}"),
        }
        if saw_chat && saw_presence {
            break;
        }
    }
    assert!(saw_chat && saw_presence);
}

// ============================================================================
// Outbound Sends
// ============================================================================

#[tokio::test]
async fn send_assigns_id_and_transmits_frame() {
    init_logging();
    let mut relay = spawn_relay().await;
    let (manager, mut events) = connect(&relay, "ada").await;

    assert!(manager.send("hello, void"));

    // Local echo arrives without waiting for the relay.
    let echo = next_chat(&mut events).await;
    assert_eq!(echo.author, "ada");
    assert_eq!(echo.body, "hello, void");
    assert!(!echo.id.is_empty());

    // The wire frame carries exactly the sender-assigned identity.
    let wire = timeout(Duration::from_secs(5), relay.inbound.recv())
        .await
        .expect("timed out waiting for frame")
        .expect("relay closed");
    let frame: Value = serde_json::from_str(&wire).expect("valid json");
    assert_eq!(frame["id"].as_str(), Some(echo.id.as_str()));
    assert_eq!(frame["author"].as_str(), Some("ada"));
    assert_eq!(frame["body"].as_str(), Some("hello, void"));

    // The relay's echo of the same id is dropped by dedup.
    relay.outbound.send(wire).expect("push");
    relay
        .outbound
        .send(r#"{"id":"probe","author":"grace","body":"after"}"#.to_string())
        .expect("push");
    assert_eq!(next_chat(&mut events).await.id, "probe");
}

#[tokio::test]
async fn rejected_sends_reach_neither_relay_nor_stream() {
    init_logging();
    let mut relay = spawn_relay().await;
    let (manager, mut events) = connect(&relay, "ada").await;

    assert!(!manager.send("   "));
    assert!(!manager.send(&"x".repeat(281)));

    assert_silent(&mut events, 200).await;
    let outcome = timeout(Duration::from_millis(100), relay.inbound.recv()).await;
    assert!(outcome.is_err(), "unexpected frame: {:?}", outcome.unwrap());
}

#[tokio::test]
async fn boundary_length_message_is_accepted() {
    init_logging();
    let mut relay = spawn_relay().await;
    let (manager, _events) = connect(&relay, "ada").await;

    assert!(manager.send(&"x".repeat(280)));

    let wire = timeout(Duration::from_secs(5), relay.inbound.recv())
        .await
        .expect("timed out")
        .expect("relay closed");
    let frame: Value = serde_json::from_str(&wire).expect("valid json");
    assert_eq!(frame["body"].as_str().map(str::len), Some(280));
}

// ============================================================================
// Heartbeat
// ============================================================================

#[tokio::test]
async fn heartbeat_pings_while_connected() {
    init_logging();
    let mut relay = spawn_relay().await;

    let config = config_for(relay.addr).with_heartbeat_interval(Duration::from_millis(50));
    let (manager, mut events) = SessionManager::new(config);
    manager.start("ada");
    assert_eq!(next_state(&mut events).await, ConnectionState::Connecting);
    assert_eq!(next_state(&mut events).await, ConnectionState::Connected);

    for _ in 0..2 {
        let wire = timeout(Duration::from_secs(5), relay.inbound.recv())
            .await
            .expect("timed out waiting for ping")
            .expect("relay closed");
        let frame: Value = serde_json::from_str(&wire).expect("valid json");
        assert_eq!(frame["type"].as_str(), Some("ping"));
    }
}

// ============================================================================
// Typing Indicator
// ============================================================================

#[tokio::test]
async fn typing_raises_on_peer_message_and_clears() {
    init_logging();
    let relay = spawn_relay().await;
    let (_manager, mut events) = connect(&relay, "ada").await;

    relay
        .outbound
        .send(r#"{"id":"m1","author":"grace","body":"hey"}"#.to_string())
        .expect("push");

    assert!(matches!(recv_event(&mut events).await, SessionEvent::Chat(_)));
    assert_eq!(
        recv_event(&mut events).await,
        SessionEvent::TypingChanged(true)
    );
    // Clears on its own once the window (100ms) elapses.
    assert_eq!(
        recv_event(&mut events).await,
        SessionEvent::TypingChanged(false)
    );
}

#[tokio::test]
async fn own_messages_do_not_raise_typing() {
    init_logging();
    let relay = spawn_relay().await;
    let (_manager, mut events) = connect(&relay, "ada").await;

    // A frame authored under the session's own name (e.g. an echo from
    // another device) yields a chat event but no typing indicator.
    relay
        .outbound
        .send(r#"{"id":"m1","author":"ada","body":"self"}"#.to_string())
        .expect("push");

    assert!(matches!(recv_event(&mut events).await, SessionEvent::Chat(_)));
    assert_silent(&mut events, 250).await;
}

// ============================================================================
// Stop Semantics
// ============================================================================

#[tokio::test]
async fn stop_while_connected_closes_and_silences() {
    init_logging();
    let relay = spawn_relay().await;
    let (manager, mut events) = connect(&relay, "ada").await;

    manager.stop();
    assert_eq!(next_state(&mut events).await, ConnectionState::Disconnected);

    // Frames pushed after stop never surface.
    relay
        .outbound
        .send(r#"{"id":"late","author":"grace","body":"too late"}"#.to_string())
        .expect("push");
    assert_silent(&mut events, 300).await;
    assert!(!manager.send("hello"));
}
