//! Wire-compatible protocol types for the BrawlNet match protocol.
//!
//! Every type in this module produces identical JSON to the server's protocol
//! layer. Messages travel as tagged envelopes (`{"type": ..., "data": ...}`)
//! with camelCase event names and camelCase payload fields.
//!
//! Identifiers (`PlayerId`, `RoomId`, `UserId`) are opaque server-issued
//! strings; the client never mints or interprets them.

use serde::{Deserialize, Serialize};

use crate::error_codes::ErrorCode;

// ── Type aliases ────────────────────────────────────────────────────

/// Unique identifier for players (scoped to a room).
pub type PlayerId = String;

/// Unique identifier for rooms.
pub type RoomId = String;

/// Unique identifier for authenticated users.
pub type UserId = String;

// ── Enums ───────────────────────────────────────────────────────────

/// Playable character roster.
///
/// Serialized as `SCREAMING_SNAKE_CASE` strings (e.g., `"TITAN"`) to match
/// the server's roster table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CharacterType {
    /// Heavy grappler. Slow, high knockback.
    Titan,
    /// Fast rushdown fighter.
    Viper,
    /// Zoner with projectile specials.
    Nova,
    /// Trickster with teleport recovery.
    Wraith,
    /// All-rounder, recommended for new players.
    Ember,
}

/// Selectable stage roster.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageType {
    /// Flat stage, no hazards. Tournament default.
    Foundry,
    /// Moving platforms over a bottomless pit.
    Skyline,
    /// Walk-off edges with periodic hazards.
    Ruins,
    /// Small stage, fast matches.
    Nexus,
}

/// Phase of a room's match lifecycle.
///
/// Server-authoritative; the client never transitions this locally.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RoomState {
    /// Waiting for players to join.
    #[default]
    Waiting,
    /// Players are picking characters and a stage.
    CharacterSelect,
    /// Match assets are loading on all clients.
    Loading,
    /// Match in progress.
    Playing,
    /// Match over; the room view is frozen.
    Finished,
}

// ── Structs ─────────────────────────────────────────────────────────

/// A 2D vector used for positions, velocities, and knockback.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

/// Per-player running match statistics.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStats {
    /// Remaining stocks (lives).
    pub stocks: u32,
    /// Accumulated damage percent.
    pub damage: f32,
    /// Knockouts scored against other players.
    pub kos: u32,
    /// Times this player fell off the stage.
    pub falls: u32,
}

/// Information about a player in a room.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NetworkPlayer {
    pub id: PlayerId,
    pub name: String,
    /// Selected character; `None` until the player picks one.
    pub character: Option<CharacterType>,
    pub ready: bool,
    /// `false` while the server is holding the slot for a dropped player.
    pub connected: bool,
    #[serde(default)]
    pub stats: PlayerStats,
}

/// Snapshot of a room, as pushed by the server.
///
/// Replaced wholesale on `roomJoined` and `roomStateSync`; updated
/// incrementally by the per-player events in between.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoomData {
    pub id: RoomId,
    pub players: Vec<NetworkPlayer>,
    pub max_players: u8,
    /// Selected stage; `None` until one is picked.
    pub stage: Option<StageType>,
    pub state: RoomState,
}

// ── Gameplay message payloads ───────────────────────────────────────

/// One frame of player input, sent at the client's input rate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInputMessage {
    /// Client-side input sequence number.
    pub seq: u32,
    /// Horizontal movement axis in `[-1.0, 1.0]`.
    pub move_x: f32,
    pub jump: bool,
    pub attack: bool,
    pub special: bool,
    pub shield: bool,
}

/// Client-reported position sample, used for interpolation on peers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PlayerPositionMessage {
    pub seq: u32,
    pub position: Vec2,
    pub velocity: Vec2,
    pub facing_right: bool,
    pub on_ground: bool,
}

/// Incremental per-player update pushed during a match.
///
/// Every field is optional; absent fields are unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PlayerUpdateMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Vec2>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub velocity: Option<Vec2>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub damage: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stocks: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub animation: Option<String>,
}

/// Per-player entry inside a full game-state snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    pub id: PlayerId,
    pub position: Vec2,
    pub velocity: Vec2,
    pub damage: f32,
    pub stocks: u32,
    pub facing_right: bool,
}

/// Full authoritative game-state snapshot.
/// Boxed in [`ServerMessage`] to reduce enum size.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GameStateMessage {
    /// Server simulation tick this snapshot was taken at.
    pub tick: u64,
    pub players: Vec<PlayerSnapshot>,
    /// Remaining match time, if the match is timed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_ms: Option<u64>,
}

/// Per-player scoreboard entry in a match result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerScore {
    pub player_id: PlayerId,
    pub kos: u32,
    pub falls: u32,
    pub damage_dealt: f32,
}

/// Final match result, delivered with `matchEnded`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MatchResultMessage {
    /// Winning player, or `None` on a draw.
    pub winner_id: Option<PlayerId>,
    pub scores: Vec<PlayerScore>,
    pub duration_ms: u64,
}

// ── Messages ────────────────────────────────────────────────────────

/// Message types sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ClientMessage {
    /// Authenticate with an opaque bearer token (MUST be the first message).
    Authenticate { token: String },
    /// Enter the matchmaking queue.
    JoinQueue,
    /// Leave the matchmaking queue.
    LeaveQueue,
    /// Join a specific room by id (e.g. one announced via `matchFound`).
    JoinRoom { room_id: RoomId },
    /// Leave the current room.
    LeaveRoom,
    /// Create a private or public room.
    CreateRoom {
        #[serde(skip_serializing_if = "Option::is_none")]
        max_players: Option<u8>,
        #[serde(skip_serializing_if = "Option::is_none")]
        stage: Option<StageType>,
        #[serde(skip_serializing_if = "Option::is_none")]
        private: Option<bool>,
    },
    /// Pick a character during character select.
    SelectCharacter { character: CharacterType },
    /// Pick a stage during character select.
    SelectStage { stage: StageType },
    /// Set or clear readiness. The local view is only updated when the
    /// server echoes `playerReadyChanged`.
    PlayerReady { ready: bool },
    /// One frame of input.
    PlayerInput(PlayerInputMessage),
    /// Position sample for peer interpolation.
    PlayerPosition(PlayerPositionMessage),
    /// Room chat.
    ChatMessage { message: String },
    /// Ask the server for a full game-state snapshot (`gameStateSync`).
    RequestGameStateSync,
    /// Ask the server for a full room snapshot (`roomStateSync`).
    RequestRoomState,
    /// Request match start (host only; all players must be ready).
    StartGame,
    /// Latency probe.
    Ping,
    /// Reply to a server `ping`.
    Pong,
}

/// Message types sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ServerMessage {
    /// Authentication succeeded.
    Authenticated { user_id: UserId },
    /// Authentication failed.
    AuthenticationFailed {
        reason: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        error_code: Option<ErrorCode>,
    },
    /// Matchmaking queue entry confirmed.
    QueueJoined,
    /// Matchmaking found a room; join it with `joinRoom`.
    MatchFound { room_id: RoomId },
    /// Joined a room; full snapshot (boxed to reduce enum size).
    RoomJoined(Box<RoomData>),
    /// Full room snapshot, e.g. in reply to `requestRoomState`.
    /// Same replace-wholesale semantics as `roomJoined`.
    RoomStateSync(Box<RoomData>),
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
    GameStarting {
        #[serde(skip_serializing_if = "Option::is_none")]
        countdown_ms: Option<u64>,
    },
    /// All clients finished loading; gameplay may begin.
    GameReady,
    /// Match started; the room is now in the `playing` phase.
    GameStarted,
    /// Full game-state snapshot in reply to `requestGameStateSync`.
    GameStateSync(Box<GameStateMessage>),
    /// Periodic authoritative game-state snapshot.
    GameStateUpdate(Box<GameStateMessage>),
    /// Incremental update for a single player.
    PlayerUpdate {
        player_id: PlayerId,
        update: PlayerUpdateMessage,
    },
    /// Match over; final result. Freezes the room view.
    MatchEnded(MatchResultMessage),
    /// Room chat from another player.
    ChatMessage { player_id: PlayerId, message: String },

    // ── Combat/event passthrough ────────────────────────────────────
    /// A player landed a hit.
    PlayerHit {
        attacker_id: PlayerId,
        target_id: PlayerId,
        damage: f32,
        knockback: Vec2,
    },
    /// A player was knocked out.
    #[serde(rename = "playerKO")]
    PlayerKO {
        player_id: PlayerId,
        /// Player credited with the KO, if any.
        #[serde(skip_serializing_if = "Option::is_none")]
        by: Option<PlayerId>,
    },
    /// A player respawned on the stage.
    PlayerRespawn {
        player_id: PlayerId,
        stocks_remaining: u32,
    },
    /// A stage hazard activated.
    StageHazard { hazard: String, position: Vec2 },
    /// A powerup appeared on the stage.
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
    MatchPaused {
        #[serde(skip_serializing_if = "Option::is_none")]
        by_player: Option<PlayerId>,
    },
    /// The match resumed.
    MatchResumed,
    /// The match timer expired.
    MatchTimeout,

    // ── Errors and connection maintenance ───────────────────────────
    /// Generic gameplay-layer error, opaque to the connection core.
    Error {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        error_code: Option<ErrorCode>,
    },
    /// Room-level error (non-fatal; recorded for observability).
    RoomError {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        error_code: Option<ErrorCode>,
    },
    /// Server-initiated keepalive; the client replies with `pong`.
    Ping,
    /// Reply to a client `ping` probe.
    Pong,
}
