#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! Shared test utilities for BrawlNet Client integration tests.
//!
//! Provides a scriptable [`MockTransport`] and helper functions for
//! constructing common server message JSON strings.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use brawlnet_client::protocol::{
    NetworkPlayer, PlayerStats, RoomData, RoomState, ServerMessage,
};
use brawlnet_client::{BrawlNetError, ErrorCode, Transport};

// ── MockTransport ───────────────────────────────────────────────────

/// One scripted server response: released only once `gate` messages have
/// been sent by the client. A gate of 0 is released immediately.
pub type Scripted = (usize, Option<Result<String, BrawlNetError>>);

/// A scriptable mock transport for integration testing.
///
/// Scripted server responses are consumed in order by `recv()`, each held
/// back until its send-count gate is met — which lets request/response
/// exchanges (like the authentication handshake) be scripted without races.
/// All messages sent by the client are recorded in `sent`.
pub struct MockTransport {
    incoming: VecDeque<Scripted>,
    /// Recorded outgoing messages from the client.
    pub sent: Arc<StdMutex<Vec<String>>>,
    /// Whether `close()` has been called.
    pub closed: Arc<AtomicBool>,
}

impl MockTransport {
    /// Create a mock transport whose scripted items are all released
    /// immediately.
    pub fn new(
        incoming: Vec<Option<Result<String, BrawlNetError>>>,
    ) -> (Self, Arc<StdMutex<Vec<String>>>, Arc<AtomicBool>) {
        Self::scripted(incoming.into_iter().map(|item| (0, item)).collect())
    }

    /// Create a mock transport with per-item send-count gates.
    pub fn scripted(
        incoming: Vec<Scripted>,
    ) -> (Self, Arc<StdMutex<Vec<String>>>, Arc<AtomicBool>) {
        let sent = Arc::new(StdMutex::new(Vec::new()));
        let closed = Arc::new(AtomicBool::new(false));
        let transport = Self {
            incoming: VecDeque::from(incoming),
            sent: Arc::clone(&sent),
            closed: Arc::clone(&closed),
        };
        (transport, sent, closed)
    }

    fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, message: String) -> Result<(), BrawlNetError> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String, BrawlNetError>> {
        loop {
            match self.incoming.front() {
                Some((gate, _)) if self.sent_count() >= *gate => {
                    // An explicit `None` item signals a clean transport close;
                    // `Some(result)` delivers the scripted message or error.
                    return self.incoming.pop_front().and_then(|(_, item)| item);
                }
                Some(_) => tokio::time::sleep(Duration::from_millis(2)).await,
                // No more scripted messages — hang forever so the transport
                // loop stays alive until shutdown is called.
                None => std::future::pending().await,
            }
        }
    }

    async fn close(&mut self) -> Result<(), BrawlNetError> {
        self.closed.store(true, Ordering::Relaxed);
        Ok(())
    }
}

// ── JSON helper functions ───────────────────────────────────────────

fn to_json(msg: &ServerMessage) -> String {
    serde_json::to_string(msg).expect("server message serialization")
}

/// JSON for a successful `authenticated` server message.
pub fn authenticated_json(user_id: &str) -> String {
    to_json(&ServerMessage::Authenticated {
        user_id: user_id.into(),
    })
}

/// JSON for an `authenticationFailed` server message.
pub fn authentication_failed_json(reason: &str, error_code: Option<ErrorCode>) -> String {
    to_json(&ServerMessage::AuthenticationFailed {
        reason: reason.into(),
        error_code,
    })
}

/// A bare `NetworkPlayer` with the given id, not ready, no character.
pub fn player(id: &str) -> NetworkPlayer {
    NetworkPlayer {
        id: id.into(),
        name: format!("Player {id}"),
        character: None,
        ready: false,
        connected: true,
        stats: PlayerStats::default(),
    }
}

/// An empty waiting room with the given id and room for four players.
pub fn waiting_room(id: &str) -> RoomData {
    RoomData {
        id: id.into(),
        players: vec![],
        max_players: 4,
        stage: None,
        state: RoomState::Waiting,
    }
}

/// JSON for a `roomJoined` server message with an empty waiting room.
pub fn room_joined_json(room_id: &str) -> String {
    to_json(&ServerMessage::RoomJoined(Box::new(waiting_room(room_id))))
}

/// JSON for a `queueJoined` server message.
pub fn queue_joined_json() -> String {
    to_json(&ServerMessage::QueueJoined)
}

/// JSON for a `matchFound` server message.
pub fn match_found_json(room_id: &str) -> String {
    to_json(&ServerMessage::MatchFound {
        room_id: room_id.into(),
    })
}

/// JSON for a `playerJoined` server message.
pub fn player_joined_json(id: &str) -> String {
    to_json(&ServerMessage::PlayerJoined { player: player(id) })
}

/// JSON for a `playerLeft` server message.
pub fn player_left_json(player_id: &str) -> String {
    to_json(&ServerMessage::PlayerLeft {
        player_id: player_id.into(),
    })
}

/// JSON for a `playerReadyChanged` server message.
pub fn player_ready_changed_json(player_id: &str, ready: bool) -> String {
    to_json(&ServerMessage::PlayerReadyChanged {
        player_id: player_id.into(),
        ready,
    })
}

/// JSON for a `gameStarted` server message.
pub fn game_started_json() -> String {
    to_json(&ServerMessage::GameStarted)
}

/// JSON for a server `error` message.
pub fn error_json(message: &str, error_code: Option<ErrorCode>) -> String {
    to_json(&ServerMessage::Error {
        message: message.into(),
        error_code,
    })
}

/// JSON for a server `roomError` message.
pub fn room_error_json(message: &str) -> String {
    to_json(&ServerMessage::RoomError {
        message: message.into(),
        error_code: None,
    })
}

/// JSON for a `pong` server message.
pub fn pong_json() -> String {
    to_json(&ServerMessage::Pong)
}
