//! Consumer-facing events emitted by the client.
//!
//! [`BrawlNetEvent`] is the typed stream delivered on the event channel
//! returned by `BrawlNetClient::new`. Most variants are direct translations
//! of [`ServerMessage`]s; `Connected` and `Disconnected` are synthetic,
//! emitted by the transport loop itself.

use crate::error_codes::ErrorCode;
use crate::protocol::{
    CharacterType, GameStateMessage, MatchResultMessage, NetworkPlayer, PlayerId,
    PlayerUpdateMessage, RoomData, RoomId, ServerMessage, StageType, UserId, Vec2,
};

/// Events delivered to the client consumer.
#[derive(Debug, Clone)]
pub enum BrawlNetEvent {
    /// The transport is connected and the loop is running (synthetic).
    Connected,
    /// The transport closed or the client shut down (synthetic).
    ///
    /// Always the final event on the channel for a given connection.
    Disconnected {
        /// Human-readable reason, if one is known.
        reason: Option<String>,
    },

    /// Authentication succeeded.
    Authenticated { user_id: UserId },
    /// Authentication was rejected by the server.
    AuthenticationFailed {
        reason: String,
        error_code: Option<ErrorCode>,
    },

    /// Matchmaking queue entry confirmed.
    QueueJoined,
    /// Matchmaking found a room.
    MatchFound { room_id: RoomId },

    /// Joined a room.
    RoomJoined { room: RoomData },
    /// Full room snapshot refresh.
    RoomStateSync { room: RoomData },
    /// Another player joined the room.
    PlayerJoined { player: NetworkPlayer },
    /// A player left the room.
    PlayerLeft { player_id: PlayerId },
    /// A player picked a character.
    CharacterSelected {
        player_id: PlayerId,
        character: CharacterType,
    },
    /// The stage was picked.
    StageSelected { stage: StageType },
    /// A player's readiness changed.
    PlayerReadyChanged { player_id: PlayerId, ready: bool },

    /// Match is about to start.
    GameStarting { countdown_ms: Option<u64> },
    /// All clients finished loading.
    GameReady,
    /// Match started.
    GameStarted,
    /// Full game-state snapshot (sync reply).
    GameStateSync { state: GameStateMessage },
    /// Periodic authoritative game-state snapshot.
    GameStateUpdate { state: GameStateMessage },
    /// Incremental update for a single player.
    PlayerUpdate {
        player_id: PlayerId,
        update: PlayerUpdateMessage,
    },
    /// Match over; the room view is frozen.
    MatchEnded { result: MatchResultMessage },
    /// Room chat from another player.
    ChatMessage { player_id: PlayerId, message: String },

    /// A player landed a hit.
    PlayerHit {
        attacker_id: PlayerId,
        target_id: PlayerId,
        damage: f32,
        knockback: Vec2,
    },
    /// A player was knocked out.
    PlayerKO {
        player_id: PlayerId,
        by: Option<PlayerId>,
    },
    /// A player respawned.
    PlayerRespawn {
        player_id: PlayerId,
        stocks_remaining: u32,
    },
    /// A stage hazard activated.
    StageHazard { hazard: String, position: Vec2 },
    /// A powerup appeared.
    PowerupSpawn {
        powerup_id: String,
        kind: String,
        position: Vec2,
    },
    /// A powerup was collected.
    PowerupCollected {
        powerup_id: String,
        player_id: PlayerId,
    },
    /// The match was paused.
    MatchPaused { by_player: Option<PlayerId> },
    /// The match resumed.
    MatchResumed,
    /// The match timer expired.
    MatchTimeout,

    /// Generic gameplay-layer error from the server.
    Error {
        message: String,
        error_code: Option<ErrorCode>,
    },
    /// Room-level error from the server.
    RoomError {
        message: String,
        error_code: Option<ErrorCode>,
    },
    /// Reply to a latency probe arrived.
    Pong,
}

impl From<ServerMessage> for BrawlNetEvent {
    fn from(msg: ServerMessage) -> Self {
        match msg {
            ServerMessage::Authenticated { user_id } => Self::Authenticated { user_id },
            ServerMessage::AuthenticationFailed { reason, error_code } => {
                Self::AuthenticationFailed { reason, error_code }
            }
            ServerMessage::QueueJoined => Self::QueueJoined,
            ServerMessage::MatchFound { room_id } => Self::MatchFound { room_id },
            ServerMessage::RoomJoined(room) => Self::RoomJoined { room: *room },
            ServerMessage::RoomStateSync(room) => Self::RoomStateSync { room: *room },
            ServerMessage::PlayerJoined { player } => Self::PlayerJoined { player },
            ServerMessage::PlayerLeft { player_id } => Self::PlayerLeft { player_id },
            ServerMessage::CharacterSelected {
                player_id,
                character,
            } => Self::CharacterSelected {
                player_id,
                character,
            },
            ServerMessage::StageSelected { stage } => Self::StageSelected { stage },
            ServerMessage::PlayerReadyChanged { player_id, ready } => {
                Self::PlayerReadyChanged { player_id, ready }
            }
            ServerMessage::GameStarting { countdown_ms } => Self::GameStarting { countdown_ms },
            ServerMessage::GameReady => Self::GameReady,
            ServerMessage::GameStarted => Self::GameStarted,
            ServerMessage::GameStateSync(state) => Self::GameStateSync { state: *state },
            ServerMessage::GameStateUpdate(state) => Self::GameStateUpdate { state: *state },
            ServerMessage::PlayerUpdate { player_id, update } => {
                Self::PlayerUpdate { player_id, update }
            }
            ServerMessage::MatchEnded(result) => Self::MatchEnded { result },
            ServerMessage::ChatMessage { player_id, message } => {
                Self::ChatMessage { player_id, message }
            }
            ServerMessage::PlayerHit {
                attacker_id,
                target_id,
                damage,
                knockback,
            } => Self::PlayerHit {
                attacker_id,
                target_id,
                damage,
                knockback,
            },
            ServerMessage::PlayerKO { player_id, by } => Self::PlayerKO { player_id, by },
            ServerMessage::PlayerRespawn {
                player_id,
                stocks_remaining,
            } => Self::PlayerRespawn {
                player_id,
                stocks_remaining,
            },
            ServerMessage::StageHazard { hazard, position } => {
                Self::StageHazard { hazard, position }
            }
            ServerMessage::PowerupSpawn {
                powerup_id,
                kind,
                position,
            } => Self::PowerupSpawn {
                powerup_id,
                kind,
                position,
            },
            ServerMessage::PowerupCollected {
                powerup_id,
                player_id,
            } => Self::PowerupCollected {
                powerup_id,
                player_id,
            },
            ServerMessage::MatchPaused { by_player } => Self::MatchPaused { by_player },
            ServerMessage::MatchResumed => Self::MatchResumed,
            ServerMessage::MatchTimeout => Self::MatchTimeout,
            ServerMessage::Error {
                message,
                error_code,
            } => Self::Error {
                message,
                error_code,
            },
            ServerMessage::RoomError {
                message,
                error_code,
            } => Self::RoomError {
                message,
                error_code,
            },
            // Server keepalive pings are answered inside the transport loop
            // and surface only as a Pong-shaped non-event for symmetry.
            ServerMessage::Ping | ServerMessage::Pong => Self::Pong,
        }
    }
}
