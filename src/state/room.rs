//! Runtime room state: the per-pin record every room-scoped action mutates.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::plugins::question::AnswerValue;

/// Index of the "no question yet" state, before the first advance.
pub const QUESTION_INDEX_NONE: i32 = -1;

/// Lifecycle phase of a room. Transitions are one-way:
/// `waiting -> playing -> finished`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    /// Room is open for joins, game not started.
    Waiting,
    /// Questions are being played.
    Playing,
    /// Game over; room lingers for a grace period so late clients can read
    /// the final state.
    Finished,
}

impl RoomStatus {
    fn rank(self) -> u8 {
        match self {
            RoomStatus::Waiting => 0,
            RoomStatus::Playing => 1,
            RoomStatus::Finished => 2,
        }
    }
}

/// Error returned when attempting an invalid status transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid status transition: {from:?} -> {to:?}")]
pub struct InvalidTransition {
    /// Status the room was in.
    pub from: RoomStatus,
    /// Status that was requested.
    pub to: RoomStatus,
}

/// One submitted answer. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerRecord {
    /// The submitted answer payload.
    pub answer: AnswerValue,
    /// Whether the answer was judged correct.
    pub is_correct: bool,
    /// Points awarded.
    pub points: u32,
    /// Time between `question-started` and the submission.
    pub response_time_ms: u64,
    /// Server-side receipt time.
    #[serde(with = "time::serde::rfc3339")]
    pub submitted_at: OffsetDateTime,
}

/// One participant currently tracked in a room.
///
/// `id` is the stable participant id, not the transient socket id; the
/// socket binding is rebound on reconnect while everything else survives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    /// Stable participant id.
    pub id: Uuid,
    /// Display name, unique within the room.
    pub nickname: String,
    /// Current connection, rebound on reconnect.
    pub socket_id: Uuid,
    /// Accumulated score.
    pub score: u32,
    /// Answers keyed by question index; keys only ever grow, each written once.
    pub answers: BTreeMap<u32, AnswerRecord>,
    /// When the participant first joined.
    #[serde(with = "time::serde::rfc3339")]
    pub joined_at: OffsetDateTime,
}

impl Player {
    /// Fresh player with zero score and no answers.
    pub fn new(id: Uuid, nickname: impl Into<String>, socket_id: Uuid) -> Self {
        Self {
            id,
            nickname: nickname.into(),
            socket_id,
            score: 0,
            answers: BTreeMap::new(),
            joined_at: OffsetDateTime::now_utc(),
        }
    }
}

/// State of one live room, keyed by pin. Exactly one organizer controls the
/// room, identified by [`RoomState::organizer_id`] and never stored as a
/// player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomState {
    /// Durable room record id.
    pub room_id: Uuid,
    /// 6-digit join code, unique while the room is live.
    pub pin: String,
    /// Game definition backing this room.
    pub game_id: Uuid,
    /// Game type string from the durable record; decides quiz-flow vs
    /// party-flow handling and party plugin dispatch.
    pub game_type: String,
    /// The authenticated user who owns the room.
    pub organizer_id: Uuid,
    /// Lifecycle phase.
    pub status: RoomStatus,
    /// Tracked participants in join order (join order decides leaderboard ties).
    pub players: IndexMap<Uuid, Player>,
    /// Index of the question in play, [`QUESTION_INDEX_NONE`] before start.
    pub current_question_index: i32,
    /// When the current question was opened.
    #[serde(with = "time::serde::rfc3339::option")]
    pub current_question_started_at: Option<OffsetDateTime>,
    /// Stamped once, on the first transition into `playing`.
    #[serde(with = "time::serde::rfc3339::option")]
    pub started_at: Option<OffsetDateTime>,
    /// Stamped once, on the first transition into `finished`.
    #[serde(with = "time::serde::rfc3339::option")]
    pub ended_at: Option<OffsetDateTime>,
    /// Wall-clock expiry inherited from the durable room record.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl RoomState {
    /// Build the initial waiting-state room from its durable record fields.
    pub fn new(
        room_id: Uuid,
        pin: impl Into<String>,
        game_id: Uuid,
        game_type: impl Into<String>,
        organizer_id: Uuid,
        expires_at: OffsetDateTime,
    ) -> Self {
        Self {
            room_id,
            pin: pin.into(),
            game_id,
            game_type: game_type.into(),
            organizer_id,
            status: RoomStatus::Waiting,
            players: IndexMap::new(),
            current_question_index: QUESTION_INDEX_NONE,
            current_question_started_at: None,
            started_at: None,
            ended_at: None,
            expires_at,
        }
    }

    /// Move the room forward in its lifecycle, stamping `started_at` /
    /// `ended_at` exactly once. Backwards and same-state transitions are
    /// rejected.
    pub fn transition(&mut self, to: RoomStatus) -> Result<(), InvalidTransition> {
        if to.rank() <= self.status.rank() {
            return Err(InvalidTransition {
                from: self.status,
                to,
            });
        }

        let now = OffsetDateTime::now_utc();
        if to == RoomStatus::Playing && self.started_at.is_none() {
            self.started_at = Some(now);
        }
        if to == RoomStatus::Finished && self.ended_at.is_none() {
            self.ended_at = Some(now);
        }
        self.status = to;
        Ok(())
    }

    /// Advance to the next question and stamp its start time.
    pub fn advance_question(&mut self) -> u32 {
        self.current_question_index += 1;
        self.current_question_started_at = Some(OffsetDateTime::now_utc());
        self.current_question_index as u32
    }

    /// Players ranked by score descending; ties keep join (encounter) order.
    pub fn ranked_players(&self) -> Vec<&Player> {
        let mut players: Vec<&Player> = self.players.values().collect();
        // Stable sort preserves the IndexMap insertion order among equals.
        players.sort_by(|a, b| b.score.cmp(&a.score));
        players
    }

    /// Whether every currently tracked player has answered the given index.
    pub fn all_answered(&self, question_index: u32) -> bool {
        !self.players.is_empty()
            && self
                .players
                .values()
                .all(|player| player.answers.contains_key(&question_index))
    }

    /// Whether the durable record behind this room is past its expiry.
    pub fn is_expired(&self) -> bool {
        OffsetDateTime::now_utc() > self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn room() -> RoomState {
        RoomState::new(
            Uuid::new_v4(),
            "123456",
            Uuid::new_v4(),
            "true-false",
            Uuid::new_v4(),
            OffsetDateTime::now_utc() + Duration::hours(2),
        )
    }

    fn add_player(room: &mut RoomState, nickname: &str) -> Uuid {
        let id = Uuid::new_v4();
        room.players
            .insert(id, Player::new(id, nickname, Uuid::new_v4()));
        id
    }

    #[test]
    fn lifecycle_moves_forward_only() {
        let mut room = room();
        assert!(room.transition(RoomStatus::Playing).is_ok());
        assert!(room.started_at.is_some());

        let err = room.transition(RoomStatus::Waiting).unwrap_err();
        assert_eq!(err.from, RoomStatus::Playing);
        assert_eq!(err.to, RoomStatus::Waiting);

        assert!(room.transition(RoomStatus::Finished).is_ok());
        assert!(room.ended_at.is_some());
        assert!(room.transition(RoomStatus::Playing).is_err());
        assert!(room.transition(RoomStatus::Finished).is_err());
    }

    #[test]
    fn started_at_is_stamped_once() {
        let mut room = room();
        room.transition(RoomStatus::Playing).unwrap();
        let first = room.started_at;
        room.transition(RoomStatus::Finished).unwrap();
        assert_eq!(room.started_at, first);
    }

    #[test]
    fn advance_question_increments_from_sentinel() {
        let mut room = room();
        assert_eq!(room.current_question_index, QUESTION_INDEX_NONE);
        assert_eq!(room.advance_question(), 0);
        assert_eq!(room.advance_question(), 1);
        assert!(room.current_question_started_at.is_some());
    }

    #[test]
    fn ranking_is_score_desc_with_join_order_ties() {
        let mut room = room();
        let p1 = add_player(&mut room, "first");
        let p2 = add_player(&mut room, "second");
        let p3 = add_player(&mut room, "third");

        room.players[&p2].score = 500;
        // p1 and p3 tie at 0; p1 joined earlier so ranks ahead.
        let ranked: Vec<Uuid> = room.ranked_players().iter().map(|p| p.id).collect();
        assert_eq!(ranked, vec![p2, p1, p3]);
    }

    #[test]
    fn all_answered_requires_at_least_one_player() {
        let mut room = room();
        assert!(!room.all_answered(0));

        let p1 = add_player(&mut room, "solo");
        assert!(!room.all_answered(0));

        room.players[&p1].answers.insert(
            0,
            AnswerRecord {
                answer: AnswerValue::Text("O".into()),
                is_correct: true,
                points: 1000,
                response_time_ms: 1200,
                submitted_at: OffsetDateTime::now_utc(),
            },
        );
        assert!(room.all_answered(0));
        assert!(!room.all_answered(1));
    }
}
