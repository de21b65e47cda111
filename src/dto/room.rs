use serde::Serialize;
use serde_with::skip_serializing_none;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dao::models::QuestionRecord,
    dto::unix_ms,
    state::room::{Player, RoomState, RoomStatus},
};

/// Public view of one tracked player.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PlayerSummary {
    /// Stable participant id.
    pub id: Uuid,
    /// Display name.
    pub nickname: String,
    /// Current score.
    pub score: u32,
    /// How many questions this player has answered.
    pub answered_count: usize,
}

impl From<&Player> for PlayerSummary {
    fn from(player: &Player) -> Self {
        Self {
            id: player.id,
            nickname: player.nickname.clone(),
            score: player.score,
            answered_count: player.answers.len(),
        }
    }
}

/// Aggregate room view broadcast to every subscriber.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RoomSnapshot {
    /// 6-digit join code.
    pub pin: String,
    /// Lifecycle phase.
    pub status: RoomStatus,
    /// Players in join order.
    pub players: Vec<PlayerSummary>,
    /// Index of the question in play, -1 before start.
    pub current_question_index: i32,
    /// When the current question opened (unix ms).
    pub current_question_started_at_ms: Option<i64>,
    /// When the game started (unix ms).
    pub started_at_ms: Option<i64>,
    /// When the game ended (unix ms).
    pub ended_at_ms: Option<i64>,
}

impl From<&RoomState> for RoomSnapshot {
    fn from(room: &RoomState) -> Self {
        Self {
            pin: room.pin.clone(),
            status: room.status,
            players: room.players.values().map(PlayerSummary::from).collect(),
            current_question_index: room.current_question_index,
            current_question_started_at_ms: room.current_question_started_at.map(unix_ms),
            started_at_ms: room.started_at.map(unix_ms),
            ended_at_ms: room.ended_at.map(unix_ms),
        }
    }
}

/// Question view sent to participants. Never carries the correct answer.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QuestionSnapshot {
    /// Game type string of the question.
    #[serde(rename = "type")]
    pub question_type: String,
    /// Question text.
    pub text: String,
    /// Choices offered, where the type uses them.
    pub options: Vec<String>,
    /// Allowed answering time.
    pub duration_secs: u32,
}

impl From<&QuestionRecord> for QuestionSnapshot {
    fn from(record: &QuestionRecord) -> Self {
        Self {
            question_type: record.data.question_type.clone(),
            text: record.data.text.clone(),
            options: record.data.options.clone(),
            duration_secs: record.duration_secs,
        }
    }
}

/// One row of a ranked leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct LeaderboardEntry {
    /// Position, starting at 1.
    pub rank: u32,
    /// Stable participant id.
    pub participant_id: Uuid,
    /// Display name.
    pub nickname: String,
    /// Score at ranking time.
    pub score: u32,
}

/// Build a ranked leaderboard from the room's players, capped at `limit`.
///
/// Ranking is score descending; ties keep join (encounter) order.
pub fn leaderboard(room: &RoomState, limit: usize) -> Vec<LeaderboardEntry> {
    room.ranked_players()
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(position, player)| LeaderboardEntry {
            rank: position as u32 + 1,
            participant_id: player.id,
            nickname: player.nickname.clone(),
            score: player.score,
        })
        .collect()
}

/// Per-player outcome for an ended question.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PlayerResult {
    /// Stable participant id.
    pub participant_id: Uuid,
    /// Display name.
    pub nickname: String,
    /// Whether the player answered at all.
    pub answered: bool,
    /// Whether the answer was judged correct.
    pub is_correct: bool,
    /// Points awarded for this question.
    pub points: u32,
    /// Response time, when the player answered.
    pub response_time_ms: Option<u64>,
}

/// Aggregate statistics for an ended question.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QuestionStats {
    /// How many answers were submitted.
    pub total_answers: usize,
    /// How many of them were correct.
    pub correct_answers: usize,
    /// Mean response time across submitted answers.
    pub average_response_time_ms: Option<u64>,
}

impl QuestionStats {
    /// Compute statistics over the answers recorded for `question_index`.
    pub fn for_question(room: &RoomState, question_index: u32) -> Self {
        let records: Vec<_> = room
            .players
            .values()
            .filter_map(|player| player.answers.get(&question_index))
            .collect();

        let total_answers = records.len();
        let correct_answers = records.iter().filter(|record| record.is_correct).count();
        let average_response_time_ms = if total_answers > 0 {
            let sum: u64 = records.iter().map(|record| record.response_time_ms).sum();
            Some(sum / total_answers as u64)
        } else {
            None
        };

        Self {
            total_answers,
            correct_answers,
            average_response_time_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{plugins::question::AnswerValue, state::room::AnswerRecord};
    use time::OffsetDateTime;

    fn room_with_scores(scores: &[(&str, u32)]) -> RoomState {
        let mut room = RoomState::new(
            Uuid::new_v4(),
            "123456",
            Uuid::new_v4(),
            "true-false",
            Uuid::new_v4(),
            OffsetDateTime::now_utc() + time::Duration::hours(1),
        );
        for (nickname, score) in scores {
            let id = Uuid::new_v4();
            let mut player = Player::new(id, *nickname, Uuid::new_v4());
            player.score = *score;
            room.players.insert(id, player);
        }
        room
    }

    #[test]
    fn leaderboard_ranks_by_score_with_stable_ties() {
        let room = room_with_scores(&[("a", 100), ("b", 300), ("c", 100)]);
        let board = leaderboard(&room, 10);
        let names: Vec<&str> = board.iter().map(|entry| entry.nickname.as_str()).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
        assert_eq!(board[0].rank, 1);
        assert_eq!(board[2].rank, 3);
    }

    #[test]
    fn leaderboard_is_capped() {
        let scores: Vec<(String, u32)> = (0..12).map(|n| (format!("p{n}"), n)).collect();
        let refs: Vec<(&str, u32)> = scores.iter().map(|(n, s)| (n.as_str(), *s)).collect();
        let room = room_with_scores(&refs);
        assert_eq!(leaderboard(&room, 10).len(), 10);
    }

    #[test]
    fn stats_average_ignores_non_answerers() {
        let mut room = room_with_scores(&[("a", 0), ("b", 0), ("c", 0)]);
        let ids: Vec<Uuid> = room.players.keys().copied().collect();
        for (id, (correct, ms)) in ids.iter().zip([(true, 1000u64), (false, 3000u64)]) {
            room.players[id].answers.insert(
                0,
                AnswerRecord {
                    answer: AnswerValue::Text("O".into()),
                    is_correct: correct,
                    points: 0,
                    response_time_ms: ms,
                    submitted_at: OffsetDateTime::now_utc(),
                },
            );
        }

        let stats = QuestionStats::for_question(&room, 0);
        assert_eq!(stats.total_answers, 2);
        assert_eq!(stats.correct_answers, 1);
        assert_eq!(stats.average_response_time_ms, Some(2000));
    }
}
