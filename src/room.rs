//! Materialized room view over the server-pushed event stream.
//!
//! [`RoomView`] tracks room membership, match phase, and per-player
//! selection/readiness state. It is strictly server-authoritative: it never
//! flips a field on its own initiative (e.g. local readiness changes wait for
//! the server's `playerReadyChanged` echo), and it never surfaces per-event
//! errors — an event referencing a player it has not seen yet is a silent
//! no-op, because the event may have raced the corresponding join.
//!
//! The view relies on the transport delivering events for a room in
//! server-emission order; it does not reorder or buffer.

use tracing::debug;

use crate::protocol::{
    CharacterType, MatchResultMessage, NetworkPlayer, RoomData, RoomState, StageType,
};

/// Client-side materialized view of the current room, if any.
///
/// Single writer: the transport loop applies events; everything else reads
/// snapshots.
#[derive(Debug, Default)]
pub struct RoomView {
    room: Option<RoomData>,
    result: Option<MatchResultMessage>,
}

impl RoomView {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current room snapshot, if the client is in a room.
    pub fn room(&self) -> Option<&RoomData> {
        self.room.as_ref()
    }

    /// The final result of the last match, once `matchEnded` has arrived.
    pub fn result(&self) -> Option<&MatchResultMessage> {
        self.result.as_ref()
    }

    /// `true` once the room has reached the `finished` phase.
    ///
    /// A finished room is frozen: per-player events no longer apply.
    pub fn is_finished(&self) -> bool {
        self.room
            .as_ref()
            .is_some_and(|r| r.state == RoomState::Finished)
    }

    /// Full replace of the room snapshot (`roomJoined` / `roomStateSync`).
    pub fn replace(&mut self, data: RoomData) {
        debug!(room_id = %data.id, players = data.players.len(), "room snapshot replaced");
        self.room = Some(data);
        self.result = None;
    }

    /// `playerJoined`: append if the id is absent, update in place otherwise.
    pub fn player_joined(&mut self, player: NetworkPlayer) {
        let Some(room) = self.mutable_room() else {
            return;
        };
        match room.players.iter_mut().find(|p| p.id == player.id) {
            Some(existing) => *existing = player,
            None => room.players.push(player),
        }
    }

    /// `playerLeft`: remove the matching entry; no-op if absent.
    pub fn player_left(&mut self, player_id: &str) {
        let Some(room) = self.mutable_room() else {
            return;
        };
        let before = room.players.len();
        room.players.retain(|p| p.id != player_id);
        if room.players.len() == before {
            debug!(player_id, "playerLeft for unknown player, ignoring");
        }
    }

    /// `characterSelected`: targeted update; no-op if the player is unknown.
    pub fn character_selected(&mut self, player_id: &str, character: CharacterType) {
        self.with_player(player_id, |p| p.character = Some(character));
    }

    /// `stageSelected`.
    pub fn stage_selected(&mut self, stage: StageType) {
        if let Some(room) = self.mutable_room() {
            room.stage = Some(stage);
        }
    }

    /// `playerReadyChanged`: targeted update; no-op if the player is unknown.
    pub fn player_ready_changed(&mut self, player_id: &str, ready: bool) {
        self.with_player(player_id, |p| p.ready = ready);
    }

    /// `gameStarted`: the room enters the `playing` phase.
    pub fn game_started(&mut self) {
        if let Some(room) = self.mutable_room() {
            room.state = RoomState::Playing;
        }
    }

    /// `matchEnded`: record the result and freeze the room.
    pub fn match_ended(&mut self, result: MatchResultMessage) {
        if let Some(room) = self.room.as_mut() {
            room.state = RoomState::Finished;
        }
        self.result = Some(result);
    }

    /// Drop the room view entirely (leave room / disconnect).
    pub fn clear(&mut self) {
        self.room = None;
        self.result = None;
    }

    /// The room, unless it is absent or frozen by `matchEnded`.
    fn mutable_room(&mut self) -> Option<&mut RoomData> {
        self.room
            .as_mut()
            .filter(|r| r.state != RoomState::Finished)
    }

    fn with_player(&mut self, player_id: &str, f: impl FnOnce(&mut NetworkPlayer)) {
        let Some(room) = self.mutable_room() else {
            return;
        };
        match room.players.iter_mut().find(|p| p.id == player_id) {
            Some(player) => f(player),
            // Tolerated: the event may have arrived before the join resolved.
            None => debug!(player_id, "event for unknown player, ignoring"),
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use crate::protocol::PlayerStats;

    fn player(id: &str) -> NetworkPlayer {
        NetworkPlayer {
            id: id.into(),
            name: format!("Player {id}"),
            character: None,
            ready: false,
            connected: true,
            stats: PlayerStats::default(),
        }
    }

    fn waiting_room(id: &str) -> RoomData {
        RoomData {
            id: id.into(),
            players: vec![],
            max_players: 4,
            stage: None,
            state: RoomState::Waiting,
        }
    }

    fn view_with_room() -> RoomView {
        let mut view = RoomView::new();
        view.replace(waiting_room("r1"));
        view
    }

    #[test]
    fn replace_installs_snapshot() {
        let view = view_with_room();
        let room = view.room().unwrap();
        assert_eq!(room.id, "r1");
        assert_eq!(room.state, RoomState::Waiting);
        assert!(room.players.is_empty());
    }

    #[test]
    fn join_then_ready_yields_one_ready_player() {
        let mut view = view_with_room();
        view.player_joined(player("p1"));
        view.player_ready_changed("p1", true);

        let room = view.room().unwrap();
        assert_eq!(room.players.len(), 1);
        assert!(room.players[0].ready);
        assert_eq!(room.state, RoomState::Waiting);
    }

    #[test]
    fn duplicate_join_updates_in_place() {
        let mut view = view_with_room();
        view.player_joined(player("p1"));
        let mut renamed = player("p1");
        renamed.name = "Renamed".into();
        view.player_joined(renamed);

        let room = view.room().unwrap();
        assert_eq!(room.players.len(), 1);
        assert_eq!(room.players[0].name, "Renamed");
    }

    #[test]
    fn joins_minus_leaves_with_interleaved_events() {
        let mut view = view_with_room();
        view.player_joined(player("p1"));
        view.player_joined(player("p2"));
        view.stage_selected(StageType::Foundry);
        view.player_left("p1");
        view.player_joined(player("p3"));
        view.player_left("ghost"); // unrelated, must be a no-op

        let room = view.room().unwrap();
        let ids: Vec<&str> = room.players.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p2", "p3"]);
    }

    #[test]
    fn character_select_for_unknown_player_is_noop() {
        let mut view = view_with_room();
        view.character_selected("ghost", CharacterType::Titan);
        assert!(view.room().unwrap().players.is_empty());
    }

    #[test]
    fn ready_change_for_unknown_player_is_noop() {
        let mut view = view_with_room();
        view.player_joined(player("p1"));
        view.player_ready_changed("ghost", true);
        assert!(!view.room().unwrap().players[0].ready);
    }

    #[test]
    fn player_left_when_absent_is_idempotent() {
        let mut view = view_with_room();
        view.player_joined(player("p1"));
        view.player_left("p1");
        view.player_left("p1");
        assert!(view.room().unwrap().players.is_empty());
    }

    #[test]
    fn game_started_moves_to_playing() {
        let mut view = view_with_room();
        view.game_started();
        assert_eq!(view.room().unwrap().state, RoomState::Playing);
    }

    #[test]
    fn match_ended_freezes_room() {
        let mut view = view_with_room();
        view.player_joined(player("p1"));
        view.game_started();
        view.match_ended(MatchResultMessage {
            winner_id: Some("p1".into()),
            scores: vec![],
            duration_ms: 90_000,
        });

        assert!(view.is_finished());
        assert_eq!(view.result().unwrap().winner_id.as_deref(), Some("p1"));

        // Further per-player events are ignored.
        view.player_joined(player("p2"));
        view.player_ready_changed("p1", true);
        view.character_selected("p1", CharacterType::Nova);

        let room = view.room().unwrap();
        assert_eq!(room.players.len(), 1);
        assert!(!room.players[0].ready);
        assert!(room.players[0].character.is_none());
    }

    #[test]
    fn replace_unfreezes_after_match_end() {
        let mut view = view_with_room();
        view.match_ended(MatchResultMessage {
            winner_id: None,
            scores: vec![],
            duration_ms: 0,
        });
        view.replace(waiting_room("r2"));
        assert!(!view.is_finished());
        assert!(view.result().is_none());
        assert_eq!(view.room().unwrap().id, "r2");
    }

    #[test]
    fn events_without_room_are_noops() {
        let mut view = RoomView::new();
        view.player_joined(player("p1"));
        view.player_left("p1");
        view.stage_selected(StageType::Nexus);
        view.game_started();
        assert!(view.room().is_none());
    }

    #[test]
    fn clear_drops_room_and_result() {
        let mut view = view_with_room();
        view.match_ended(MatchResultMessage {
            winner_id: None,
            scores: vec![],
            duration_ms: 10,
        });
        view.clear();
        assert!(view.room().is_none());
        assert!(view.result().is_none());
    }
}
