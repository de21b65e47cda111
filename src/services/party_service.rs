//! Party-flow orchestration: load the session envelope, dispatch the action
//! to the room's game-type plugin, persist whatever comes back, broadcast.
//!
//! The orchestrator knows nothing about phases or round data. The one piece
//! of game-agnostic work it does is membership: while a session is still in
//! the lobby its player list follows the room, so late joiners are picked up
//! before the first round starts.

use tracing::info;
use uuid::Uuid;

use crate::{
    dto::party::GameActionRequest,
    error::ServiceError,
    services::{room_events, room_service},
    state::{
        SharedState,
        party::{GameAction, PHASE_LOBBY, SessionState},
    },
};

/// Actions only the room's organizer may trigger.
const ORGANIZER_ACTIONS: &[&str] = &["start-game", "next-phase"];

/// Handle a `game-action` message on a party room.
pub async fn handle_game_action(
    state: &SharedState,
    pin: &str,
    actor: Uuid,
    request: GameActionRequest,
) -> Result<(), ServiceError> {
    let room = room_service::require_room(state, pin).await?;
    let plugin = state.registry.get(&room.game_type).ok_or_else(|| {
        ServiceError::InvalidState(format!(
            "game type `{}` does not support party actions",
            room.game_type
        ))
    })?;

    let organizer_action = ORGANIZER_ACTIONS.contains(&request.action_type.as_str());
    if organizer_action && room.organizer_id != actor {
        return Err(ServiceError::NotOrganizer);
    }
    let player_id = if organizer_action { None } else { Some(actor) };
    let action = GameAction::new(request.action_type, player_id, request.payload);

    let session = state
        .party
        .update(pin, |existing| {
            let mut session = existing
                .unwrap_or_else(|| SessionState::new(room.players.values().map(Into::into).collect()));
            if session.phase == PHASE_LOBBY {
                session.players = room.players.values().map(Into::into).collect();
            }
            plugin.process_action(session, &action)
        })
        .await?;

    info!(
        pin,
        action = %action.action_type,
        round = session.round,
        phase = %session.phase,
        "party action processed"
    );
    room_events::broadcast_session_updated(state, pin, &session);
    Ok(())
}

/// Handle the dedicated `next-phase` organizer message.
pub async fn next_phase(state: &SharedState, pin: &str, actor: Uuid) -> Result<(), ServiceError> {
    handle_game_action(
        state,
        pin,
        actor,
        GameActionRequest {
            action_type: "next-phase".into(),
            payload: serde_json::Value::Null,
        },
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use time::{Duration as TimeDuration, OffsetDateTime};

    use crate::{
        config::AppConfig,
        dao::{auth::TokenIsUserId, models::RoomRecord, repository::InMemoryRepository},
        plugins::liar_game::{PHASE_REVEAL, PHASE_VOTE},
        services::room_service,
        state::AppState,
    };

    const PIN: &str = "123456";

    async fn party_room() -> (crate::state::SharedState, Uuid, Vec<Uuid>) {
        let repo = Arc::new(InMemoryRepository::new());
        let organizer_id = Uuid::new_v4();
        repo.put_room(RoomRecord {
            room_id: Uuid::new_v4(),
            pin: PIN.into(),
            game_id: Uuid::new_v4(),
            organizer_id,
            game_type: "liar-game".into(),
            expires_at: OffsetDateTime::now_utc() + TimeDuration::hours(2),
        });
        let state = AppState::new(AppConfig::default(), repo, Arc::new(TokenIsUserId));

        let mut players = Vec::new();
        for nickname in ["ara", "bin", "chan", "dae"] {
            let outcome =
                room_service::join_room(&state, Uuid::new_v4(), PIN, Some(nickname), None, None)
                    .await
                    .unwrap();
            players.push(outcome.participant_id);
        }
        (state, organizer_id, players)
    }

    fn start_request() -> GameActionRequest {
        GameActionRequest {
            action_type: "start-game".into(),
            payload: serde_json::Value::Null,
        }
    }

    #[tokio::test]
    async fn organizer_starts_a_round_with_the_room_roster() {
        let (state, organizer, players) = party_room().await;

        handle_game_action(&state, PIN, organizer, start_request())
            .await
            .unwrap();

        let session = state.party.get(PIN).await.unwrap().unwrap();
        assert_eq!(session.phase, PHASE_REVEAL);
        assert_eq!(session.round, 1);
        assert_eq!(session.players.len(), players.len());
        for id in &players {
            assert!(session.players.iter().any(|player| player.id == *id));
        }
    }

    #[tokio::test]
    async fn lifecycle_actions_are_organizer_only() {
        let (state, _organizer, players) = party_room().await;

        let err = handle_game_action(&state, PIN, players[0], start_request())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "not-organizer");
        assert!(state.party.get(PIN).await.unwrap().is_none());

        let err = next_phase(&state, PIN, players[0]).await.unwrap_err();
        assert_eq!(err.code(), "not-organizer");
    }

    #[tokio::test]
    async fn player_actions_carry_their_identity_to_the_plugin() {
        let (state, organizer, players) = party_room().await;
        handle_game_action(&state, PIN, organizer, start_request())
            .await
            .unwrap();

        handle_game_action(
            &state,
            PIN,
            players[0],
            GameActionRequest {
                action_type: "give-hint".into(),
                payload: serde_json::json!({"hint": "round and yellow"}),
            },
        )
        .await
        .unwrap();

        let session = state.party.get(PIN).await.unwrap().unwrap();
        match &session.data {
            crate::state::party::PartyData::LiarGame(data) => {
                assert_eq!(
                    data.hints.get(&players[0]).map(String::as_str),
                    Some("round and yellow")
                );
            }
            other => panic!("expected liar-game data, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn next_phase_force_advances_a_stalled_round() {
        let (state, organizer, _players) = party_room().await;
        handle_game_action(&state, PIN, organizer, start_request())
            .await
            .unwrap();

        next_phase(&state, PIN, organizer).await.unwrap();
        let session = state.party.get(PIN).await.unwrap().unwrap();
        assert_eq!(session.phase, PHASE_VOTE);
    }

    #[tokio::test]
    async fn quiz_rooms_do_not_accept_party_actions() {
        let repo = Arc::new(InMemoryRepository::new());
        let organizer = Uuid::new_v4();
        repo.put_room(RoomRecord {
            room_id: Uuid::new_v4(),
            pin: PIN.into(),
            game_id: Uuid::new_v4(),
            organizer_id: organizer,
            game_type: "mystery-game".into(),
            expires_at: OffsetDateTime::now_utc() + TimeDuration::hours(2),
        });
        let state = AppState::new(AppConfig::default(), repo, Arc::new(TokenIsUserId));
        room_service::join_room(&state, Uuid::new_v4(), PIN, Some("ara"), None, None)
            .await
            .unwrap();

        let err = handle_game_action(&state, PIN, organizer, start_request())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "invalid-state");
    }
}
