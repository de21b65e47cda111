//! WebSocket message contract.
//!
//! Inbound and outbound messages are internally tagged on `type` with
//! kebab-case names, so a frame reads like `{"type":"join-room","pin":...}`.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dto::{
        party::{GameActionRequest, SessionSnapshot},
        room::{LeaderboardEntry, PlayerResult, QuestionSnapshot, QuestionStats, RoomSnapshot},
    },
    plugins::{
        question::{AnswerKey, AnswerValue},
        scoring::ScoreBreakdown,
    },
};

/// Messages a client may send over the socket.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// Identify on a room: fresh join, session restore, or organizer attach.
    JoinRoom {
        /// 6-digit room pin.
        pin: String,
        /// Display name; required for a fresh participant join.
        nickname: Option<String>,
        /// Previous participant id, for session restore.
        participant_id: Option<Uuid>,
        /// Organizer credential; its subject must match the room organizer.
        token: Option<String>,
    },
    /// Organizer starts the game.
    StartGame {
        /// Target room pin.
        pin: String,
    },
    /// Organizer advances to the next question.
    NextQuestion {
        /// Target room pin.
        pin: String,
    },
    /// Participant submits an answer for the current question.
    SubmitAnswer {
        /// Target room pin.
        pin: String,
        /// Index of the question being answered.
        question_index: u32,
        /// The answer payload, interpreted by the question's plugin.
        answer: AnswerValue,
        /// Client-measured time from question start to submission.
        response_time_ms: u64,
    },
    /// Organizer closes the current question early.
    EndQuestion {
        /// Target room pin.
        pin: String,
        /// Index of the question to close.
        question_index: u32,
    },
    /// Organizer finishes the game immediately.
    EndGame {
        /// Target room pin.
        pin: String,
    },
    /// Party-game action routed to the room's plugin.
    GameAction {
        /// Target room pin.
        pin: String,
        /// The action to process.
        action: GameActionRequest,
    },
    /// Organizer forces the party session into its next phase.
    NextPhase {
        /// Target room pin.
        pin: String,
    },
}

/// Caller's relationship to the room, echoed back on join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ParticipantRole {
    /// The room's organizer.
    Organizer,
    /// A regular participant.
    Player,
}

/// Messages the server sends to clients.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// Private acknowledgement of a successful join.
    JoinedRoom {
        /// Current room view.
        room: RoomSnapshot,
        /// Id assigned to (or confirmed for) the caller.
        participant_id: Uuid,
        /// Caller's role in the room.
        role: ParticipantRole,
        /// Question in play, when joining mid-game.
        current_question: Option<QuestionSnapshot>,
    },
    /// Private acknowledgement of a restored session.
    SessionRestored {
        /// Current room view.
        room: RoomSnapshot,
        /// The restored participant id.
        participant_id: Uuid,
        /// Score carried over from the previous connection.
        score: u32,
        /// Index of the question in play, -1 before start.
        current_question_index: i32,
        /// Question in play, when rejoining mid-game.
        current_question: Option<QuestionSnapshot>,
    },
    /// Broadcast when a participant joins the room.
    ParticipantJoined {
        /// Who joined.
        participant_id: Uuid,
        /// Their display name.
        nickname: String,
        /// Player count after the join.
        player_count: usize,
    },
    /// Broadcast when a participant disconnects.
    ParticipantLeft {
        /// Who left.
        participant_id: Uuid,
        /// Their display name.
        nickname: String,
        /// Player count after the departure.
        player_count: usize,
    },
    /// Broadcast when the organizer starts the game.
    GameStarted {
        /// Room pin.
        pin: String,
        /// Start timestamp (unix ms).
        started_at_ms: i64,
        /// Total number of questions in the set.
        question_count: usize,
    },
    /// Broadcast when a question opens.
    QuestionStarted {
        /// Index of the opened question.
        question_index: u32,
        /// The question, without its correct answer.
        question: QuestionSnapshot,
        /// When the question opened (unix ms).
        started_at_ms: i64,
        /// Submission deadline (unix ms).
        deadline_ms: i64,
    },
    /// Private scoring result for the submitting participant.
    AnswerReceived {
        /// Index of the answered question.
        question_index: u32,
        /// How the answer was scored.
        breakdown: ScoreBreakdown,
        /// Participant's running total after this answer.
        total_score: u32,
    },
    /// Broadcast progress marker after each submission. Carries no verdict.
    AnswerSubmitted {
        /// Who answered.
        participant_id: Uuid,
        /// Their display name.
        nickname: String,
        /// Index of the answered question.
        question_index: u32,
        /// Players who have answered this question so far.
        answered_count: usize,
        /// Players currently in the room.
        player_count: usize,
    },
    /// Broadcast when a question closes.
    QuestionEnded {
        /// Index of the closed question.
        question_index: u32,
        /// The correct answer, revealed now.
        correct_answer: Option<AnswerKey>,
        /// Per-player outcomes.
        results: Vec<PlayerResult>,
        /// Standings after this question.
        leaderboard: Vec<LeaderboardEntry>,
        /// Aggregate answer statistics.
        stats: QuestionStats,
    },
    /// Broadcast when the game finishes.
    GameEnded {
        /// Room pin.
        pin: String,
        /// Final standings, capped to the top ten.
        leaderboard: Vec<LeaderboardEntry>,
        /// Finish timestamp (unix ms).
        ended_at_ms: i64,
    },
    /// Full room view, sent to late joiners and after reconnects.
    StateSynced {
        /// Current room view.
        room: RoomSnapshot,
    },
    /// Broadcast after every processed party-game action.
    SessionUpdated {
        /// Current party-session view.
        session: SessionSnapshot,
    },
    /// Private failure notice for the offending client.
    Error {
        /// Stable kebab-case error code.
        code: String,
        /// Human-readable description.
        message: String,
    },
}

impl ServerMessage {
    /// Build an error event from any service failure.
    pub fn from_error(err: &crate::error::ServiceError) -> Self {
        ServerMessage::Error {
            code: err.code().to_string(),
            message: err.client_message(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_room_parses_with_optional_fields() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"join-room","pin":"123456","nickname":"kim"}"#)
                .unwrap();
        match msg {
            ClientMessage::JoinRoom {
                pin,
                nickname,
                participant_id,
                token,
            } => {
                assert_eq!(pin, "123456");
                assert_eq!(nickname.as_deref(), Some("kim"));
                assert!(participant_id.is_none());
                assert!(token.is_none());
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn submit_answer_accepts_text_and_selection() {
        let text: ClientMessage = serde_json::from_str(
            r#"{"type":"submit-answer","pin":"123456","question_index":0,"answer":"O","response_time_ms":1200}"#,
        )
        .unwrap();
        match text {
            ClientMessage::SubmitAnswer { answer, .. } => {
                assert_eq!(answer.as_text(), Some("O"));
            }
            other => panic!("unexpected message: {other:?}"),
        }

        let selection: ClientMessage = serde_json::from_str(
            r#"{"type":"submit-answer","pin":"123456","question_index":1,"answer":["red","blue"],"response_time_ms":900}"#,
        )
        .unwrap();
        match selection {
            ClientMessage::SubmitAnswer { answer, .. } => {
                assert_eq!(
                    answer.as_selection(),
                    Some(&["red".to_string(), "blue".to_string()][..])
                );
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn unknown_type_is_a_parse_error() {
        let result: Result<ClientMessage, _> =
            serde_json::from_str(r#"{"type":"format-disk","pin":"123456"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn outbound_events_are_kebab_tagged() {
        let event = ServerMessage::Error {
            code: "room-not-found".into(),
            message: "room `999999` not found".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["code"], "room-not-found");
    }

    #[test]
    fn error_event_carries_service_code() {
        let event =
            ServerMessage::from_error(&crate::error::ServiceError::RoomNotFound("999999".into()));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["code"], "room-not-found");
        assert_eq!(json["type"], "error");
    }
}
