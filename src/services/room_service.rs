//! Quiz-flow orchestration: joins, game lifecycle, answer intake, and the
//! timed question loop.
//!
//! Every mutation of room state goes through [`RoomStore::update`] so
//! concurrent submissions and timer callbacks serialize per pin. Timer
//! callbacks revalidate the room before acting; a deadline firing against a
//! question that already closed is a no-op.

use futures::future::BoxFuture;
use time::OffsetDateTime;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dao::models::{FinalRanking, GameResultRecord, QuestionRecord},
    dto::{
        room::{PlayerResult, QuestionSnapshot, QuestionStats, RoomSnapshot, leaderboard},
        unix_ms,
        validation,
        ws::{ParticipantRole, ServerMessage},
    },
    error::ServiceError,
    plugins::{
        balance_game::BalanceGamePlugin,
        question::{AnswerValue, BalanceScoring},
        scoring::ScoreBreakdown,
    },
    services::{
        room_events,
        timer_service::TimerKind,
    },
    state::{
        SharedState,
        room::{AnswerRecord, Player, RoomState, RoomStatus},
    },
    store::session_store::ParticipantSession,
};

/// Entries shown on intermediate and final leaderboards.
const LEADERBOARD_LIMIT: usize = 10;

/// Why a question is being closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionEndTrigger {
    /// Deadline elapsed or every player answered.
    Completion,
    /// The organizer closed it early.
    Organizer,
}

/// Result of a successful identification on a room.
#[derive(Debug)]
pub struct JoinOutcome {
    /// Private reply for the joining socket.
    pub reply: ServerMessage,
    /// Participant bound to the socket (the organizer's user id for organizers).
    pub participant_id: Uuid,
    /// Role established for this connection.
    pub role: ParticipantRole,
    /// Room pin, echoed for the connection registry.
    pub pin: String,
}

/// Handle a `join-room` identification: organizer attach, session restore,
/// or fresh participant join, in that precedence order.
pub async fn join_room(
    state: &SharedState,
    socket_id: Uuid,
    pin: &str,
    nickname: Option<&str>,
    participant_id: Option<Uuid>,
    token: Option<&str>,
) -> Result<JoinOutcome, ServiceError> {
    validation::validate_pin(pin)?;

    let room = load_or_create_room(state, pin).await?;

    if let Some(user_id) = state.auth.resolve(token).await {
        if user_id == room.organizer_id {
            let current_question = current_question_snapshot(state, &room).await?;
            info!(pin, %user_id, "organizer attached");
            return Ok(JoinOutcome {
                reply: ServerMessage::JoinedRoom {
                    room: RoomSnapshot::from(&room),
                    participant_id: user_id,
                    role: ParticipantRole::Organizer,
                    current_question,
                },
                participant_id: user_id,
                role: ParticipantRole::Organizer,
                pin: pin.to_string(),
            });
        }
    }

    if let Some(claimed) = participant_id {
        let validation = state.sessions.validate(claimed, pin).await?;
        if validation.is_valid {
            let session = validation.session.ok_or(ServiceError::InvalidSession)?;
            return restore_session(state, socket_id, &room, session).await;
        }
        debug!(pin, %claimed, "stale session claim, treating as fresh join");
    }

    fresh_join(state, socket_id, &room, nickname).await
}

/// Rebuild the room's player entry from a validated session and rebind it to
/// the new socket.
async fn restore_session(
    state: &SharedState,
    socket_id: Uuid,
    room: &RoomState,
    session: ParticipantSession,
) -> Result<JoinOutcome, ServiceError> {
    let participant_id = session.participant_id;
    let player = Player {
        id: participant_id,
        nickname: session.nickname.clone(),
        socket_id,
        score: session.score,
        answers: session.answers.clone(),
        joined_at: session.joined_at,
    };

    let room = state
        .rooms
        .update(&room.pin, |room| {
            room.players.insert(participant_id, player);
            Ok(room.clone())
        })
        .await?;
    state.sessions.refresh(participant_id).await?;

    let current_question = current_question_snapshot(state, &room).await?;
    info!(pin = %room.pin, %participant_id, "session restored");
    Ok(JoinOutcome {
        reply: ServerMessage::SessionRestored {
            room: RoomSnapshot::from(&room),
            participant_id,
            score: session.score,
            current_question_index: session.current_question_index,
            current_question,
        },
        participant_id,
        role: ParticipantRole::Player,
        pin: room.pin.clone(),
    })
}

/// Admit a brand-new participant under a unique nickname.
async fn fresh_join(
    state: &SharedState,
    socket_id: Uuid,
    room: &RoomState,
    nickname: Option<&str>,
) -> Result<JoinOutcome, ServiceError> {
    let nickname = nickname.ok_or(ServiceError::NicknameRequired)?;
    validation::validate_nickname(nickname)?;
    let nickname = nickname.trim().to_string();

    let participant_id = Uuid::new_v4();
    let player = Player::new(participant_id, nickname.clone(), socket_id);

    let room = state
        .rooms
        .update(&room.pin, |room| {
            if room.status == RoomStatus::Finished {
                return Err(ServiceError::InvalidState(
                    "the game is already over".into(),
                ));
            }
            let taken = room.players.values().any(|existing| {
                existing.id != participant_id
                    && existing.nickname.eq_ignore_ascii_case(&nickname)
            });
            if taken {
                return Err(ServiceError::DuplicateNickname(nickname.clone()));
            }
            room.players.insert(participant_id, player);
            Ok(room.clone())
        })
        .await?;
    state.sessions.create(participant_id, &room.pin, &nickname).await?;

    let current_question = current_question_snapshot(state, &room).await?;
    info!(pin = %room.pin, %participant_id, nickname, "participant joined");
    Ok(JoinOutcome {
        reply: ServerMessage::JoinedRoom {
            room: RoomSnapshot::from(&room),
            participant_id,
            role: ParticipantRole::Player,
            current_question,
        },
        participant_id,
        role: ParticipantRole::Player,
        pin: room.pin.clone(),
    })
}

/// Announce a processed join to the rest of the room.
pub async fn announce_join(state: &SharedState, pin: &str, participant_id: Uuid) {
    match state.rooms.get(pin).await {
        Ok(Some(room)) => {
            room_events::broadcast_participant_joined(state, &room, participant_id);
            room_events::broadcast_state_synced(state, &room);
        }
        Ok(None) => {}
        Err(err) => warn!(pin, error = %err, "failed to load room for join announcement"),
    }
}

/// Handle a socket disconnect for an identified participant.
///
/// Waiting rooms drop the player entirely; once the game is running the
/// player entry stays so a session restore can pick the score back up.
/// A close from a socket the participant no longer owns is ignored, so a
/// reconnect racing the old connection's teardown never evicts the player.
pub async fn handle_disconnect(
    state: &SharedState,
    pin: &str,
    participant_id: Uuid,
    socket_id: Uuid,
) {
    let outcome = state
        .rooms
        .update(pin, |room| {
            let player = match room.players.get(&participant_id) {
                Some(player) => player,
                None => return Ok(None),
            };
            if player.socket_id != socket_id {
                debug!(pin, %participant_id, "ignoring disconnect from a superseded socket");
                return Ok(None);
            }
            let nickname = player.nickname.clone();
            if room.status == RoomStatus::Waiting {
                room.players.shift_remove(&participant_id);
            }
            Ok(Some((nickname, room.players.len())))
        })
        .await;

    match outcome {
        Ok(Some((nickname, player_count))) => {
            room_events::broadcast_participant_left(
                state,
                pin,
                participant_id,
                nickname,
                player_count,
            );
        }
        Ok(None) => {}
        Err(err) => debug!(pin, error = %err, "disconnect against a gone room"),
    }
}

/// Organizer command: start the game and open the first question.
pub async fn start_game(state: &SharedState, pin: &str, actor: Uuid) -> Result<(), ServiceError> {
    let room = require_room(state, pin).await?;
    ensure_organizer(&room, actor)?;

    let questions = state.repository.load_questions(room.game_id).await?;
    if questions.is_empty() {
        return Err(ServiceError::InvalidState(
            "the game has no questions".into(),
        ));
    }

    let room = state.rooms.update_status(pin, RoomStatus::Playing).await?;
    info!(pin, questions = questions.len(), "game started");
    room_events::broadcast_game_started(state, &room, questions.len());

    start_next_question(state, pin).await
}

/// Organizer command: advance to the next question, skipping any pending
/// auto-advance delay.
pub async fn next_question(state: &SharedState, pin: &str, actor: Uuid) -> Result<(), ServiceError> {
    let room = require_room(state, pin).await?;
    ensure_organizer(&room, actor)?;
    require_status(&room, RoomStatus::Playing)?;

    state.timers.cancel(pin, TimerKind::AdvanceDelay);
    start_next_question(state, pin).await
}

/// Open the question after the current one and arm its deadline.
async fn start_next_question(state: &SharedState, pin: &str) -> Result<(), ServiceError> {
    let room = require_room(state, pin).await?;
    require_status(&room, RoomStatus::Playing)?;

    let questions = state.repository.load_questions(room.game_id).await?;
    let next_index = (room.current_question_index + 1) as usize;
    let record = questions.get(next_index).ok_or(ServiceError::NoMoreQuestions)?;

    let plugin = state
        .registry
        .get(&record.data.question_type)
        .ok_or_else(|| {
            ServiceError::InvalidQuestionData(format!(
                "unknown question type `{}`",
                record.data.question_type
            ))
        })?;
    if !plugin.validate_question_data(&record.data) {
        return Err(ServiceError::InvalidQuestionData(format!(
            "question {next_index} failed `{}` validation",
            record.data.question_type
        )));
    }

    let (question_index, started_at) = state.rooms.advance_question(pin).await?;
    let started_at_ms = unix_ms(started_at);
    let deadline_ms = started_at_ms + i64::from(record.duration_secs) * 1000;
    info!(pin, question_index, duration_secs = record.duration_secs, "question started");
    room_events::broadcast_question_started(
        state,
        pin,
        question_index,
        QuestionSnapshot::from(record),
        started_at_ms,
        deadline_ms,
    );

    let deadline_state = state.clone();
    let deadline_pin = pin.to_string();
    state.timers.schedule(
        pin,
        TimerKind::QuestionDeadline,
        std::time::Duration::from_secs(u64::from(record.duration_secs)),
        async move {
            if let Err(err) = finish_question(
                &deadline_state,
                &deadline_pin,
                question_index,
                QuestionEndTrigger::Completion,
            )
            .await
            {
                debug!(pin = %deadline_pin, question_index, error = %err, "deadline fired against a closed question");
            }
        },
    );
    Ok(())
}

/// Handle an answer submission for the question in play.
pub async fn submit_answer(
    state: &SharedState,
    pin: &str,
    participant_id: Uuid,
    question_index: u32,
    answer: AnswerValue,
    response_time_ms: u64,
) -> Result<(), ServiceError> {
    let room = require_room(state, pin).await?;
    require_status(&room, RoomStatus::Playing)?;
    if room.current_question_index != question_index as i32 {
        return Err(ServiceError::QuestionNotFound(question_index));
    }

    let record = load_question(state, &room, question_index).await?;
    let breakdown = judge_answer(state, &record, &answer, response_time_ms)?;

    let answer_record = AnswerRecord {
        answer,
        is_correct: breakdown.is_correct,
        points: breakdown.total,
        response_time_ms,
        submitted_at: OffsetDateTime::now_utc(),
    };

    let (room, all_answered) = state
        .rooms
        .update(pin, |room| {
            require_status(room, RoomStatus::Playing)?;
            if room.current_question_index != question_index as i32 {
                return Err(ServiceError::QuestionNotFound(question_index));
            }
            if room.current_question_started_at.is_none() {
                return Err(ServiceError::InvalidState(
                    "the question is already closed".into(),
                ));
            }
            let player = room
                .players
                .get_mut(&participant_id)
                .ok_or(ServiceError::PlayerNotFound)?;
            if player.answers.contains_key(&question_index) {
                return Err(ServiceError::AlreadyAnswered(question_index));
            }
            player.score += answer_record.points;
            player.answers.insert(question_index, answer_record.clone());
            Ok((room.clone(), room.all_answered(question_index)))
        })
        .await?;

    let session = state
        .sessions
        .add_answer(participant_id, question_index, answer_record)
        .await?;

    room_events::send_answer_received(
        state,
        pin,
        participant_id,
        question_index,
        breakdown,
        session.score,
    );
    room_events::broadcast_answer_submitted(state, &room, participant_id, question_index);

    if all_answered {
        debug!(pin, question_index, "every player answered, closing early");
        finish_question(state, pin, question_index, QuestionEndTrigger::Completion).await?;
    }
    Ok(())
}

/// Judge an answer and produce its point breakdown.
///
/// Balance-game votes bypass the correctness formula: `none` scoring hands
/// out the flat participation award immediately, `majority` records a
/// provisional zero that [`finish_question`] settles after the room-wide
/// tally.
fn judge_answer(
    state: &SharedState,
    record: &QuestionRecord,
    answer: &AnswerValue,
    response_time_ms: u64,
) -> Result<ScoreBreakdown, ServiceError> {
    if record.data.question_type == "balance-game" {
        if !state.scoring.check_answer(&record.data, answer) {
            return Err(ServiceError::InvalidState(
                "vote is not one of the listed choices".into(),
            ));
        }
        return Ok(match BalanceGamePlugin::scoring_mode(&record.data) {
            BalanceScoring::None => BalanceGamePlugin::participation_breakdown(&record.data),
            BalanceScoring::Majority => ScoreBreakdown::incorrect(),
        });
    }

    Ok(state
        .scoring
        .score(&record.data, answer, response_time_ms, record.duration_secs))
}

/// Organizer command: close the question in play ahead of its deadline.
pub async fn end_question(
    state: &SharedState,
    pin: &str,
    actor: Uuid,
    question_index: u32,
) -> Result<(), ServiceError> {
    let room = require_room(state, pin).await?;
    ensure_organizer(&room, actor)?;
    finish_question(state, pin, question_index, QuestionEndTrigger::Organizer).await
}

/// Close a question: settle deferred scoring, reveal the answer, broadcast
/// results, and arm the auto-advance.
///
/// Idempotent under races between the deadline timer, an all-answered early
/// close, and the organizer: the first caller clears the question's start
/// stamp and every later one fails the closed-question check.
///
/// Returns a boxed future: the question loop recurses through this function
/// (deadline and advance callbacks), so it needs a concrete future type.
pub fn finish_question<'a>(
    state: &'a SharedState,
    pin: &'a str,
    question_index: u32,
    trigger: QuestionEndTrigger,
) -> BoxFuture<'a, Result<(), ServiceError>> {
    Box::pin(finish_question_inner(state, pin, question_index, trigger))
}

async fn finish_question_inner(
    state: &SharedState,
    pin: &str,
    question_index: u32,
    trigger: QuestionEndTrigger,
) -> Result<(), ServiceError> {
    let room_before = require_room(state, pin).await?;
    let record = load_question(state, &room_before, question_index).await?;
    let majority = record.data.question_type == "balance-game"
        && BalanceGamePlugin::scoring_mode(&record.data) == BalanceScoring::Majority;

    let (room, settled) = state
        .rooms
        .update(pin, |room| {
            require_status(room, RoomStatus::Playing)?;
            if room.current_question_index != question_index as i32 {
                return Err(ServiceError::QuestionNotFound(question_index));
            }
            if room.current_question_started_at.take().is_none() {
                return Err(ServiceError::InvalidState(
                    "the question is already closed".into(),
                ));
            }

            let settled = if majority {
                settle_balance_majority(state, room, &record, question_index)
            } else {
                Vec::new()
            };
            Ok((room.clone(), settled))
        })
        .await?;

    state.timers.cancel(pin, TimerKind::QuestionDeadline);
    for (participant_id, answer_record) in settled {
        if let Err(err) = state
            .sessions
            .settle_answer(participant_id, question_index, answer_record)
            .await
        {
            warn!(pin, %participant_id, error = %err, "failed to mirror majority settlement");
        }
    }

    let results = player_results(&room, question_index);
    info!(pin, question_index, ?trigger, "question ended");
    room_events::broadcast_question_ended(
        state,
        pin,
        question_index,
        record.data.correct_answer.clone(),
        results,
        leaderboard(&room, LEADERBOARD_LIMIT),
        QuestionStats::for_question(&room, question_index),
    );

    let advance_state = state.clone();
    let advance_pin = pin.to_string();
    state.timers.schedule(
        pin,
        TimerKind::AdvanceDelay,
        state.config.question_advance_delay,
        async move {
            advance_or_finish(&advance_state, &advance_pin).await;
        },
    );
    Ok(())
}

/// Auto-advance callback: open the next question, or finish the game when
/// the set is exhausted.
async fn advance_or_finish(state: &SharedState, pin: &str) {
    match start_next_question(state, pin).await {
        Ok(()) => {}
        Err(ServiceError::NoMoreQuestions) => {
            if let Err(err) = finalize_game(state, pin).await {
                warn!(pin, error = %err, "failed to finalize game");
            }
        }
        Err(err) => debug!(pin, error = %err, "auto-advance skipped"),
    }
}

/// Organizer command: finish the game immediately.
pub async fn end_game(state: &SharedState, pin: &str, actor: Uuid) -> Result<(), ServiceError> {
    let room = require_room(state, pin).await?;
    ensure_organizer(&room, actor)?;
    finalize_game(state, pin).await
}

/// Move the room to `finished`, broadcast and persist the final standings,
/// and schedule the grace-period cleanup.
async fn finalize_game(state: &SharedState, pin: &str) -> Result<(), ServiceError> {
    let room = state.rooms.update_status(pin, RoomStatus::Finished).await?;
    state.timers.cancel_room(pin);

    let standings = leaderboard(&room, LEADERBOARD_LIMIT);
    info!(pin, players = room.players.len(), "game ended");
    room_events::broadcast_game_ended(state, &room, standings.clone());

    let result = GameResultRecord {
        room_id: room.room_id,
        game_id: room.game_id,
        pin: room.pin.clone(),
        leaderboard: standings
            .into_iter()
            .map(|entry| FinalRanking {
                rank: entry.rank,
                participant_id: entry.participant_id,
                nickname: entry.nickname,
                score: entry.score,
            })
            .collect(),
        finished_at: room.ended_at.unwrap_or_else(OffsetDateTime::now_utc),
    };
    if let Err(err) = state.repository.save_result(result).await {
        // The live flow already completed; losing the durable copy is
        // an operator problem, not a client error.
        warn!(pin, error = %err, "failed to persist game result");
    }

    let cleanup_state = state.clone();
    let cleanup_pin = pin.to_string();
    state.timers.schedule(
        pin,
        TimerKind::Cleanup,
        state.config.finished_room_grace,
        async move {
            cleanup_room(&cleanup_state, &cleanup_pin).await;
        },
    );
    Ok(())
}

/// Drop everything held for a finished room after its grace period: the
/// room itself, its party session, and the hub. Participant sessions are
/// left to their own TTL so they never vanish mid-restore attempt.
async fn cleanup_room(state: &SharedState, pin: &str) {
    if let Err(err) = state.rooms.delete(pin).await {
        warn!(pin, error = %err, "failed to drop finished room");
    }
    if let Err(err) = state.party.delete(pin).await {
        warn!(pin, error = %err, "failed to drop party session");
    }
    state.remove_room_hub(pin);
    debug!(pin, "finished room cleaned up");
}

/// Tally a majority-mode balance question and re-score the winning side.
///
/// A strict plurality of votes decides the winning choice; on a tie nobody's
/// provisional zero changes. Returns the replacement records to mirror into
/// the session store.
fn settle_balance_majority(
    state: &SharedState,
    room: &mut RoomState,
    record: &QuestionRecord,
    question_index: u32,
) -> Vec<(Uuid, AnswerRecord)> {
    let mut counts: Vec<(String, usize)> = record
        .data
        .options
        .iter()
        .map(|option| (option.clone(), 0))
        .collect();
    for player in room.players.values() {
        if let Some(vote) = player
            .answers
            .get(&question_index)
            .and_then(|answer| answer.answer.as_text())
        {
            if let Some(slot) = counts.iter_mut().find(|(option, _)| option == vote) {
                slot.1 += 1;
            }
        }
    }

    let max = counts.iter().map(|(_, count)| *count).max().unwrap_or(0);
    let mut leaders = counts.iter().filter(|(_, count)| *count == max && max > 0);
    let winning = match (leaders.next(), leaders.next()) {
        (Some((option, _)), None) => option.clone(),
        _ => return Vec::new(),
    };

    let mut settled = Vec::new();
    for player in room.players.values_mut() {
        let Some(existing) = player.answers.get(&question_index) else {
            continue;
        };
        if existing.answer.as_text() != Some(winning.as_str()) {
            continue;
        }
        let breakdown = state.scoring.score_with_verdict(
            &record.data,
            true,
            existing.response_time_ms,
            record.duration_secs,
        );
        let mut replacement = existing.clone();
        replacement.is_correct = true;
        replacement.points = breakdown.total;
        player.score = player.score - existing.points + breakdown.total;
        player.answers.insert(question_index, replacement.clone());
        settled.push((player.id, replacement));
    }
    settled
}

/// Per-player outcome rows for a closed question, in join order.
fn player_results(room: &RoomState, question_index: u32) -> Vec<PlayerResult> {
    room.players
        .values()
        .map(|player| match player.answers.get(&question_index) {
            Some(record) => PlayerResult {
                participant_id: player.id,
                nickname: player.nickname.clone(),
                answered: true,
                is_correct: record.is_correct,
                points: record.points,
                response_time_ms: Some(record.response_time_ms),
            },
            None => PlayerResult {
                participant_id: player.id,
                nickname: player.nickname.clone(),
                answered: false,
                is_correct: false,
                points: 0,
                response_time_ms: None,
            },
        })
        .collect()
}

/// Load a live room, refusing expired ones.
pub(crate) async fn require_room(state: &SharedState, pin: &str) -> Result<RoomState, ServiceError> {
    let room = state
        .rooms
        .get(pin)
        .await?
        .ok_or_else(|| ServiceError::RoomNotFound(pin.to_string()))?;
    if room.is_expired() {
        return Err(ServiceError::RoomExpired(pin.to_string()));
    }
    Ok(room)
}

/// Materialize live room state from the durable record on first contact.
async fn load_or_create_room(state: &SharedState, pin: &str) -> Result<RoomState, ServiceError> {
    if let Some(room) = state.rooms.get(pin).await? {
        if room.is_expired() {
            return Err(ServiceError::RoomExpired(pin.to_string()));
        }
        return Ok(room);
    }

    let record = state
        .repository
        .find_room_by_pin(pin)
        .await?
        .ok_or_else(|| ServiceError::RoomNotFound(pin.to_string()))?;
    if OffsetDateTime::now_utc() > record.expires_at {
        return Err(ServiceError::RoomExpired(pin.to_string()));
    }

    let room = RoomState::new(
        record.room_id,
        record.pin,
        record.game_id,
        record.game_type,
        record.organizer_id,
        record.expires_at,
    );
    debug!(pin, room_id = %room.room_id, "room materialized from durable record");
    Ok(state.rooms.insert_if_absent(room).await?)
}

/// The question currently in play, for mid-game joiners. `None` while no
/// question is open.
async fn current_question_snapshot(
    state: &SharedState,
    room: &RoomState,
) -> Result<Option<QuestionSnapshot>, ServiceError> {
    if room.status != RoomStatus::Playing
        || room.current_question_index < 0
        || room.current_question_started_at.is_none()
    {
        return Ok(None);
    }
    let record = load_question(state, room, room.current_question_index as u32).await?;
    Ok(Some(QuestionSnapshot::from(&record)))
}

async fn load_question(
    state: &SharedState,
    room: &RoomState,
    question_index: u32,
) -> Result<QuestionRecord, ServiceError> {
    let questions = state.repository.load_questions(room.game_id).await?;
    questions
        .into_iter()
        .nth(question_index as usize)
        .ok_or(ServiceError::QuestionNotFound(question_index))
}

fn ensure_organizer(room: &RoomState, actor: Uuid) -> Result<(), ServiceError> {
    if room.organizer_id != actor {
        return Err(ServiceError::NotOrganizer);
    }
    Ok(())
}

fn require_status(room: &RoomState, expected: RoomStatus) -> Result<(), ServiceError> {
    if room.status != expected {
        return Err(ServiceError::InvalidState(format!(
            "action requires a {expected:?} room, status is {:?}",
            room.status
        )));
    }
    Ok(())
}
