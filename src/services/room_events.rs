//! Event fan-out helpers: build one [`ServerMessage`] and push it to a
//! room's broadcast hub, or privately to a single participant's sockets.

use uuid::Uuid;

use crate::{
    dto::{
        party::SessionSnapshot,
        room::{LeaderboardEntry, PlayerResult, QuestionSnapshot, QuestionStats, RoomSnapshot},
        unix_ms,
    },
    dto::ws::ServerMessage,
    plugins::{question::AnswerKey, scoring::ScoreBreakdown},
    state::{SharedState, party::SessionState, room::RoomState},
};

/// Broadcast that a participant joined `room`.
pub fn broadcast_participant_joined(state: &SharedState, room: &RoomState, participant_id: Uuid) {
    let Some(player) = room.players.get(&participant_id) else {
        return;
    };
    state.broadcast_to_room(
        &room.pin,
        ServerMessage::ParticipantJoined {
            participant_id,
            nickname: player.nickname.clone(),
            player_count: room.players.len(),
        },
    );
}

/// Broadcast that a participant disconnected from `room`.
pub fn broadcast_participant_left(
    state: &SharedState,
    pin: &str,
    participant_id: Uuid,
    nickname: String,
    player_count: usize,
) {
    state.broadcast_to_room(
        pin,
        ServerMessage::ParticipantLeft {
            participant_id,
            nickname,
            player_count,
        },
    );
}

/// Broadcast the game start.
pub fn broadcast_game_started(state: &SharedState, room: &RoomState, question_count: usize) {
    let Some(started_at) = room.started_at else {
        return;
    };
    state.broadcast_to_room(
        &room.pin,
        ServerMessage::GameStarted {
            pin: room.pin.clone(),
            started_at_ms: unix_ms(started_at),
            question_count,
        },
    );
}

/// Broadcast a freshly opened question with its submission deadline.
pub fn broadcast_question_started(
    state: &SharedState,
    pin: &str,
    question_index: u32,
    question: QuestionSnapshot,
    started_at_ms: i64,
    deadline_ms: i64,
) {
    state.broadcast_to_room(
        pin,
        ServerMessage::QuestionStarted {
            question_index,
            question,
            started_at_ms,
            deadline_ms,
        },
    );
}

/// Privately tell one participant how their answer was scored.
pub fn send_answer_received(
    state: &SharedState,
    pin: &str,
    participant_id: Uuid,
    question_index: u32,
    breakdown: ScoreBreakdown,
    total_score: u32,
) {
    state.send_to_participant(
        pin,
        participant_id,
        &ServerMessage::AnswerReceived {
            question_index,
            breakdown,
            total_score,
        },
    );
}

/// Broadcast an answer-progress marker. Carries no verdict.
pub fn broadcast_answer_submitted(
    state: &SharedState,
    room: &RoomState,
    participant_id: Uuid,
    question_index: u32,
) {
    let Some(player) = room.players.get(&participant_id) else {
        return;
    };
    let answered_count = room
        .players
        .values()
        .filter(|player| player.answers.contains_key(&question_index))
        .count();
    state.broadcast_to_room(
        &room.pin,
        ServerMessage::AnswerSubmitted {
            participant_id,
            nickname: player.nickname.clone(),
            question_index,
            answered_count,
            player_count: room.players.len(),
        },
    );
}

/// Broadcast the reveal for a closed question.
pub fn broadcast_question_ended(
    state: &SharedState,
    pin: &str,
    question_index: u32,
    correct_answer: Option<AnswerKey>,
    results: Vec<PlayerResult>,
    leaderboard: Vec<LeaderboardEntry>,
    stats: QuestionStats,
) {
    state.broadcast_to_room(
        pin,
        ServerMessage::QuestionEnded {
            question_index,
            correct_answer,
            results,
            leaderboard,
            stats,
        },
    );
}

/// Broadcast the final standings.
pub fn broadcast_game_ended(state: &SharedState, room: &RoomState, leaderboard: Vec<LeaderboardEntry>) {
    let Some(ended_at) = room.ended_at else {
        return;
    };
    state.broadcast_to_room(
        &room.pin,
        ServerMessage::GameEnded {
            pin: room.pin.clone(),
            leaderboard,
            ended_at_ms: unix_ms(ended_at),
        },
    );
}

/// Broadcast a full room view, used after membership or lifecycle changes.
pub fn broadcast_state_synced(state: &SharedState, room: &RoomState) {
    state.broadcast_to_room(
        &room.pin,
        ServerMessage::StateSynced {
            room: RoomSnapshot::from(room),
        },
    );
}

/// Broadcast the party-session view after a processed action.
pub fn broadcast_session_updated(state: &SharedState, pin: &str, session: &SessionState) {
    state.broadcast_to_room(
        pin,
        ServerMessage::SessionUpdated {
            session: SessionSnapshot::from(session),
        },
    );
}
