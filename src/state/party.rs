//! Generic session state for phase-driven party games.
//!
//! The orchestrator treats [`SessionState`] as an envelope: it loads it,
//! hands it to the plugin resolved from the room's game type, persists what
//! comes back, and broadcasts it. Only the plugin matching the [`PartyData`]
//! variant ever looks inside the data.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::plugins::liar_game::LiarData;
use crate::state::room::Player;

/// Phase a freshly created session starts in, before the first `start-game`.
pub const PHASE_LOBBY: &str = "lobby";

/// One participant as tracked inside a party session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyPlayer {
    /// Stable participant id, shared with the room's player map.
    pub id: Uuid,
    /// Display name.
    pub nickname: String,
}

impl From<&Player> for PartyPlayer {
    fn from(player: &Player) -> Self {
        Self {
            id: player.id,
            nickname: player.nickname.clone(),
        }
    }
}

/// Game-specific session payload, tagged by game type.
///
/// Modeled as a closed enum rather than an opaque map so each plugin works
/// with its own typed struct and the orchestrator never inspects the shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "game", rename_all = "kebab-case")]
pub enum PartyData {
    /// No game-specific data yet (before the first `start-game`).
    #[default]
    Unset,
    /// Liar-game round data.
    LiarGame(LiarData),
}

/// Envelope state for one party-game session, keyed by room pin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    /// Round counter, incremented by the plugin on each `start-game`.
    pub round: u32,
    /// Plugin-defined phase string.
    pub phase: String,
    /// Participants in the session.
    pub players: Vec<PartyPlayer>,
    /// Plugin-owned payload.
    pub data: PartyData,
}

impl SessionState {
    /// Fresh lobby session for the given players.
    pub fn new(players: Vec<PartyPlayer>) -> Self {
        Self {
            round: 0,
            phase: PHASE_LOBBY.into(),
            players,
            data: PartyData::default(),
        }
    }
}

/// Inbound party action normalized by the orchestrator before plugin dispatch.
#[derive(Debug, Clone)]
pub struct GameAction {
    /// Action type string, e.g. `give-hint`.
    pub action_type: String,
    /// Acting participant, absent for organizer-driven actions.
    pub player_id: Option<Uuid>,
    /// Server-side receipt time.
    pub timestamp: OffsetDateTime,
    /// Action-specific payload, deserialized by the plugin.
    pub payload: serde_json::Value,
}

impl GameAction {
    /// Normalize an action received from a client.
    pub fn new(
        action_type: impl Into<String>,
        player_id: Option<Uuid>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            action_type: action_type.into(),
            player_id,
            timestamp: OffsetDateTime::now_utc(),
            payload,
        }
    }
}
