use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::plugins::question::QuestionData;

/// Durable room record authored by the external CRUD service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomRecord {
    /// Primary key of the room.
    pub room_id: Uuid,
    /// 6-digit join code.
    pub pin: String,
    /// Game definition played in this room.
    pub game_id: Uuid,
    /// Authenticated owner of the room.
    pub organizer_id: Uuid,
    /// Game type string; decides quiz-flow vs party-flow handling.
    pub game_type: String,
    /// Wall-clock expiry after which joins are refused.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

/// One authored question of a game, in play order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionRecord {
    /// Type-tagged question payload.
    pub data: QuestionData,
    /// Allowed answering time.
    pub duration_secs: u32,
}

/// Final per-player ranking entry persisted when a game ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalRanking {
    /// Leaderboard position, starting at 1.
    pub rank: u32,
    /// Stable participant id.
    pub participant_id: Uuid,
    /// Display name at game end.
    pub nickname: String,
    /// Final score.
    pub score: u32,
}

/// Result record handed to the durable store when a room finishes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameResultRecord {
    /// Room the result belongs to.
    pub room_id: Uuid,
    /// Game definition that was played.
    pub game_id: Uuid,
    /// Join code, for correlation in the authoring service.
    pub pin: String,
    /// Top-10 final leaderboard.
    pub leaderboard: Vec<FinalRanking>,
    /// When the room reached `finished`.
    #[serde(with = "time::serde::rfc3339")]
    pub finished_at: OffsetDateTime,
}
