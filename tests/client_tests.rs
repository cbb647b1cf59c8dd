#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! Integration-style client tests for the BrawlNet Client.
//!
//! Uses the shared `MockTransport` from `tests/common` to script server
//! messages and verify that `BrawlNetClient` processes them correctly:
//! connection lifecycle, the authentication handshake, room view updates,
//! error history, and event delivery.

mod common;

use std::time::Duration;

use brawlnet_client::protocol::{
    CharacterType, ClientMessage, MatchResultMessage, RoomState, ServerMessage, StageType,
};
use brawlnet_client::{
    BrawlNetClient, BrawlNetConfig, BrawlNetError, BrawlNetEvent, ConnectionState, ErrorCode,
    ErrorKind,
};

use common::{
    authenticated_json, authentication_failed_json, error_json, game_started_json,
    match_found_json, player_joined_json, player_left_json, player_ready_changed_json,
    queue_joined_json, room_error_json, room_joined_json, MockTransport,
};

// ════════════════════════════════════════════════════════════════════
// Helpers
// ════════════════════════════════════════════════════════════════════

fn test_config() -> BrawlNetConfig {
    BrawlNetConfig::new()
        .with_auth_timeout(Duration::from_millis(250))
        .with_shutdown_timeout(Duration::from_millis(250))
}

/// Connect a client over a mock transport scripted with `incoming`.
#[allow(clippy::type_complexity)]
fn connect_client(
    incoming: Vec<common::Scripted>,
) -> (
    BrawlNetClient,
    tokio::sync::mpsc::Receiver<BrawlNetEvent>,
    std::sync::Arc<std::sync::Mutex<Vec<String>>>,
    std::sync::Arc<std::sync::atomic::AtomicBool>,
) {
    let (transport, sent, closed) = MockTransport::scripted(incoming);
    let (mut client, events) = BrawlNetClient::new(test_config());
    client.connect_with(transport).expect("connect_with");
    (client, events, sent, closed)
}

/// Receive the next event, failing the test if none arrives in time.
async fn next_event(rx: &mut tokio::sync::mpsc::Receiver<BrawlNetEvent>) -> BrawlNetEvent {
    tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

/// Consume the synthetic `Connected` event.
async fn drain_connected(rx: &mut tokio::sync::mpsc::Receiver<BrawlNetEvent>) {
    let ev = next_event(rx).await;
    assert!(
        matches!(ev, BrawlNetEvent::Connected),
        "first event should be Connected, got {ev:?}"
    );
}

// ════════════════════════════════════════════════════════════════════
// Connection lifecycle
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn connect_then_authenticate_full_scenario() {
    // Scenario from the protocol contract: connect, authenticate "tok-1",
    // server confirms user "u1".
    let (mut client, mut events, sent, _closed) =
        connect_client(vec![(1, Some(Ok(authenticated_json("u1"))))]);

    assert_eq!(client.state(), ConnectionState::Connected);
    assert_eq!(client.reconnect_attempts(), 0);
    drain_connected(&mut events).await;

    let user_id = client.authenticate("tok-1").await.unwrap();
    assert_eq!(user_id, "u1");
    assert_eq!(client.state(), ConnectionState::Authenticated);
    assert!(client.is_authenticated());

    let session = client.session();
    assert_eq!(session.auth_token.as_deref(), Some("tok-1"));
    assert_eq!(session.user_id.as_deref(), Some("u1"));

    let ev = next_event(&mut events).await;
    assert!(matches!(ev, BrawlNetEvent::Authenticated { user_id } if user_id == "u1"));

    // The first wire message was the authenticate envelope.
    {
        let messages = sent.lock().unwrap();
        let first: ClientMessage = serde_json::from_str(&messages[0]).unwrap();
        assert!(matches!(first, ClientMessage::Authenticate { token } if token == "tok-1"));
    }

    client.shutdown().await;
}

#[tokio::test]
async fn authentication_rejection_surfaces_server_reason() {
    let (mut client, mut events, _sent, _closed) = connect_client(vec![(
        1,
        Some(Ok(authentication_failed_json(
            "token expired",
            Some(ErrorCode::TokenExpired),
        ))),
    )]);
    drain_connected(&mut events).await;

    let err = client.authenticate("tok-stale").await.unwrap_err();
    let BrawlNetError::AuthenticationFailed { reason, .. } = err else {
        panic!("expected AuthenticationFailed, got {err:?}");
    };
    assert_eq!(reason, "token expired");

    // Rejection is critical and visible in lastError immediately.
    let last = client.last_error().unwrap();
    assert_eq!(last.kind, ErrorKind::Authentication);
    assert!(last.critical);
    assert_eq!(last.code, Some(ErrorCode::TokenExpired));

    // The channel stays open: the caller decides whether to retry.
    assert_eq!(client.state(), ConnectionState::Connected);

    client.shutdown().await;
}

#[tokio::test]
async fn authentication_timeout_leaves_no_listener_behind() {
    // The scripted success is withheld until a second message is sent,
    // i.e. until after the handshake has timed out.
    let (transport, _sent, _closed) =
        MockTransport::scripted(vec![(2, Some(Ok(authenticated_json("u-late"))))]);
    let config = BrawlNetConfig::new().with_auth_timeout(Duration::from_millis(60));
    let (mut client, mut events) = BrawlNetClient::new(config);
    client.connect_with(transport).unwrap();
    drain_connected(&mut events).await;

    let err = client.authenticate("tok-slow").await.unwrap_err();
    assert!(matches!(err, BrawlNetError::Timeout));

    // Release the late success and let the loop see it.
    client.ping().unwrap();
    tokio::time::sleep(Duration::from_millis(60)).await;

    // The late event must not mutate the session or the state machine.
    assert!(!client.is_authenticated());
    assert_eq!(client.state(), ConnectionState::Connected);
    assert!(client.session().auth_token.is_none());
    assert!(client.session().user_id.is_none());

    client.shutdown().await;
}

#[tokio::test]
async fn authenticate_requires_open_channel() {
    let (mut client, _events) = BrawlNetClient::new(test_config());
    let err = client.authenticate("tok").await.unwrap_err();
    // Precondition failure: nothing was sent, and it is not a timeout.
    assert!(matches!(err, BrawlNetError::NotConnected));
}

#[tokio::test]
async fn connect_while_connected_is_noop() {
    let (mut client, mut events, _sent, _closed) = connect_client(vec![]);
    drain_connected(&mut events).await;

    let (second, _sent2, closed2) = MockTransport::new(vec![]);
    client.connect_with(second).unwrap();

    // State unchanged, no second channel spun up (its transport is untouched).
    assert_eq!(client.state(), ConnectionState::Connected);
    assert!(!closed2.load(std::sync::atomic::Ordering::Relaxed));

    client.shutdown().await;
}

#[tokio::test]
async fn disconnect_clears_everything_and_is_idempotent() {
    let (mut client, mut events, _sent, _closed) = connect_client(vec![
        (1, Some(Ok(authenticated_json("u1")))),
        (1, Some(Ok(room_joined_json("r1")))),
    ]);
    drain_connected(&mut events).await;

    client.authenticate("tok-1").await.unwrap();
    let _ = next_event(&mut events).await; // Authenticated
    let _ = next_event(&mut events).await; // RoomJoined
    assert!(client.current_room().is_some());

    client.disconnect();
    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert!(client.session().auth_token.is_none());
    assert!(client.session().user_id.is_none());
    assert!(!client.is_authenticated());
    assert!(client.current_room().is_none());

    // Idempotence: calling twice has the same effect as once.
    client.disconnect();
    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert!(client.current_room().is_none());
}

#[tokio::test]
async fn transport_close_emits_final_disconnected() {
    let (mut client, mut events, _sent, _closed) = connect_client(vec![
        (0, Some(Ok(authenticated_json("u1")))),
        (0, None), // clean server-side close
    ]);
    drain_connected(&mut events).await;

    // Drain until Disconnected; it must be the last event.
    let mut saw_disconnected = false;
    while let Ok(Some(ev)) =
        tokio::time::timeout(Duration::from_secs(1), events.recv()).await
    {
        if matches!(ev, BrawlNetEvent::Disconnected { .. }) {
            saw_disconnected = true;
            break;
        }
    }
    assert!(saw_disconnected);
    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert!(!client.is_authenticated());

    client.disconnect();
}

// ════════════════════════════════════════════════════════════════════
// Queue and room flow
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn queue_flow_emits_queue_joined_and_match_found() {
    let (client, mut events, sent, _closed) = connect_client(vec![
        (1, Some(Ok(queue_joined_json()))),
        (1, Some(Ok(match_found_json("r9")))),
    ]);
    drain_connected(&mut events).await;

    client.join_queue().unwrap();

    let ev = next_event(&mut events).await;
    assert!(matches!(ev, BrawlNetEvent::QueueJoined));
    let ev = next_event(&mut events).await;
    assert!(matches!(ev, BrawlNetEvent::MatchFound { room_id } if room_id == "r9"));

    {
        let messages = sent.lock().unwrap();
        let first: ClientMessage = serde_json::from_str(&messages[0]).unwrap();
        assert!(matches!(first, ClientMessage::JoinQueue));
    }

    drop(client);
}

#[tokio::test]
async fn room_scenario_join_player_ready() {
    // roomJoined(r1, empty) → playerJoined(p1) → playerReadyChanged(p1, true)
    let (client, mut events, _sent, _closed) = connect_client(vec![
        (0, Some(Ok(room_joined_json("r1")))),
        (0, Some(Ok(player_joined_json("p1")))),
        (0, Some(Ok(player_ready_changed_json("p1", true)))),
    ]);
    drain_connected(&mut events).await;

    let _ = next_event(&mut events).await; // RoomJoined
    let _ = next_event(&mut events).await; // PlayerJoined
    let ev = next_event(&mut events).await; // PlayerReadyChanged
    assert!(matches!(ev, BrawlNetEvent::PlayerReadyChanged { ready: true, .. }));

    let room = client.current_room().unwrap();
    assert_eq!(room.id, "r1");
    assert_eq!(room.players.len(), 1);
    assert_eq!(room.players[0].id, "p1");
    assert!(room.players[0].ready);
    assert_eq!(room.state, RoomState::Waiting);

    drop(client);
}

#[tokio::test]
async fn joins_and_leaves_keep_player_set_consistent() {
    let (client, mut events, _sent, _closed) = connect_client(vec![
        (0, Some(Ok(room_joined_json("r1")))),
        (0, Some(Ok(player_joined_json("p1")))),
        (0, Some(Ok(player_joined_json("p2")))),
        (0, Some(Ok(player_joined_json("p1")))), // duplicate join: update, not append
        (0, Some(Ok(player_left_json("p1")))),
        (0, Some(Ok(player_left_json("nobody")))), // unknown leave: no-op
    ]);
    drain_connected(&mut events).await;
    for _ in 0..6 {
        let _ = next_event(&mut events).await;
    }

    let room = client.current_room().unwrap();
    let ids: Vec<String> = room.players.iter().map(|p| p.id.clone()).collect();
    assert_eq!(ids, vec!["p2"]);

    drop(client);
}

#[tokio::test]
async fn character_select_for_unknown_player_is_tolerated() {
    // characterSelected("ghost", TITAN) before any join: no panic, room
    // unchanged, no error recorded.
    let (client, mut events, _sent, _closed) = connect_client(vec![
        (0, Some(Ok(room_joined_json("r1")))),
        (
            0,
            Some(Ok(serde_json::to_string(&ServerMessage::CharacterSelected {
                player_id: "ghost".into(),
                character: CharacterType::Titan,
            })
            .unwrap())),
        ),
    ]);
    drain_connected(&mut events).await;
    let _ = next_event(&mut events).await; // RoomJoined
    let _ = next_event(&mut events).await; // CharacterSelected (still forwarded)

    let room = client.current_room().unwrap();
    assert!(room.players.is_empty());
    assert!(client.last_error().is_none());

    drop(client);
}

#[tokio::test]
async fn match_end_freezes_room_against_later_events() {
    let result = MatchResultMessage {
        winner_id: Some("p1".into()),
        scores: vec![],
        duration_ms: 120_000,
    };
    let (client, mut events, _sent, _closed) = connect_client(vec![
        (0, Some(Ok(room_joined_json("r1")))),
        (0, Some(Ok(player_joined_json("p1")))),
        (0, Some(Ok(game_started_json()))),
        (
            0,
            Some(Ok(
                serde_json::to_string(&ServerMessage::MatchEnded(result)).unwrap()
            )),
        ),
        // After matchEnded, per-player events are ignored.
        (0, Some(Ok(player_joined_json("p2")))),
        (0, Some(Ok(player_ready_changed_json("p1", true)))),
    ]);
    drain_connected(&mut events).await;
    for _ in 0..6 {
        let _ = next_event(&mut events).await;
    }

    let room = client.current_room().unwrap();
    assert_eq!(room.state, RoomState::Finished);
    assert_eq!(room.players.len(), 1);
    assert!(!room.players[0].ready);

    let result = client.match_result().unwrap();
    assert_eq!(result.winner_id.as_deref(), Some("p1"));
    assert_eq!(result.duration_ms, 120_000);

    drop(client);
}

#[tokio::test]
async fn selection_messages_reach_the_wire() {
    let (client, mut events, sent, _closed) = connect_client(vec![]);
    drain_connected(&mut events).await;

    client.select_character(CharacterType::Nova).unwrap();
    client.select_stage(StageType::Skyline).unwrap();
    client.set_ready(true).unwrap();
    client.send_chat("glhf").unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;

    let messages = sent.lock().unwrap();
    assert_eq!(messages.len(), 4);
    let parsed: Vec<ClientMessage> = messages
        .iter()
        .map(|m| serde_json::from_str(m).unwrap())
        .collect();
    assert!(matches!(
        parsed[0],
        ClientMessage::SelectCharacter {
            character: CharacterType::Nova
        }
    ));
    assert!(matches!(
        parsed[1],
        ClientMessage::SelectStage {
            stage: StageType::Skyline
        }
    ));
    assert!(matches!(parsed[2], ClientMessage::PlayerReady { ready: true }));
    assert!(matches!(parsed[3], ClientMessage::ChatMessage { ref message } if message == "glhf"));

    drop(client);
}

// ════════════════════════════════════════════════════════════════════
// Error tracking
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn error_history_caps_at_ten_with_last_error_newest() {
    // Push 12 server errors; exactly the last 10 must remain.
    let incoming = (0..12)
        .map(|i| (0, Some(Ok(error_json(&format!("error {i}"), None)))))
        .collect();
    let (client, mut events, _sent, _closed) = connect_client(incoming);
    drain_connected(&mut events).await;
    for _ in 0..12 {
        let _ = next_event(&mut events).await;
    }

    let history = client.error_history();
    assert_eq!(history.len(), 10);
    assert_eq!(history[0].message, "error 2");
    assert_eq!(history[9].message, "error 11");
    assert_eq!(client.last_error().unwrap().message, "error 11");

    client.clear_errors();
    assert!(client.error_history().is_empty());
    assert!(client.last_error().is_none());

    drop(client);
}

#[tokio::test]
async fn room_error_is_recorded_non_critical_without_state_change() {
    let (client, mut events, _sent, _closed) = connect_client(vec![
        (0, Some(Ok(room_joined_json("r1")))),
        (0, Some(Ok(room_error_json("stage vote conflict")))),
    ]);
    drain_connected(&mut events).await;
    let _ = next_event(&mut events).await; // RoomJoined
    let ev = next_event(&mut events).await;
    assert!(matches!(ev, BrawlNetEvent::RoomError { .. }));

    let last = client.last_error().unwrap();
    assert_eq!(last.kind, ErrorKind::Room);
    assert!(!last.critical);

    // Neither the connection state nor the room view is disturbed.
    assert_eq!(client.state(), ConnectionState::Connected);
    assert!(client.current_room().is_some());

    drop(client);
}

// ════════════════════════════════════════════════════════════════════
// Reconnection policy
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn reconnect_counters_reset_on_successful_connect() {
    let (mut client, mut events) = BrawlNetClient::new(test_config());
    assert!(client.can_reconnect());
    assert_eq!(client.max_reconnect_attempts(), 5);

    let (transport, _sent, _closed) = MockTransport::new(vec![]);
    client.connect_with(transport).unwrap();
    assert_eq!(client.reconnect_attempts(), 0);
    drain_connected(&mut events).await;

    // Drop the channel, reconnect over a fresh transport: the counter is
    // reset again and the event receiver keeps working.
    client.disconnect();
    let _ = next_event(&mut events).await; // Disconnected

    let (transport, _sent, _closed) = MockTransport::new(vec![]);
    client.connect_with(transport).unwrap();
    assert_eq!(client.reconnect_attempts(), 0);
    drain_connected(&mut events).await;

    client.shutdown().await;
}

#[cfg(feature = "transport-websocket")]
#[tokio::test]
async fn failed_connect_enters_error_state_and_records() {
    let config = test_config()
        .with_connect_timeout(Duration::from_secs(2))
        .with_transport_retry(1, Duration::from_millis(10));
    let (mut client, _events) = BrawlNetClient::new(config);

    let err = client.connect("ws://127.0.0.1:1").await.unwrap_err();
    assert!(matches!(err, BrawlNetError::Io(_)));
    assert_eq!(client.state(), ConnectionState::Error);
    assert_eq!(client.reconnect_attempts(), 1);
    assert!(client.can_reconnect());

    let last = client.last_error().unwrap();
    assert_eq!(last.kind, ErrorKind::Connection);
    assert!(last.critical);

    // Error is not terminal: a fresh connect re-enters the cycle.
    let err = client.connect("ws://127.0.0.1:1").await.unwrap_err();
    assert!(matches!(err, BrawlNetError::Io(_)));
    assert_eq!(client.reconnect_attempts(), 2);
}
