//! WebSocket connection lifecycle: identification, event fan-in, fan-out.
//!
//! Each socket must identify with a `join-room` message within
//! [`IDENT_TIMEOUT`]. After that the connection is bound to one participant
//! in one room: a writer task drains the outbound channel, a forward task
//! relays the room hub's broadcasts into it, and the read loop dispatches
//! commands to the room and party services.

use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dto::ws::{ClientMessage, ParticipantRole, ServerMessage},
    error::ServiceError,
    services::{party_service, room_service},
    state::{ClientConnection, SharedState, send_event},
};

/// How long a fresh socket may stay silent before it is dropped.
const IDENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Handle the full lifecycle of one client WebSocket connection.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let socket_id = Uuid::new_v4();
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps outbound messages flowing even while we
    // await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let initial_message = match tokio::time::timeout(IDENT_TIMEOUT, receiver.next()).await {
        Ok(Some(Ok(Message::Text(text)))) => text,
        Ok(Some(Ok(Message::Close(_)))) => {
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(Some(Ok(_))) => {
            let _ = outbound_tx.send(Message::Close(None));
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(Some(Err(err))) => {
            warn!(error = %err, "websocket receive error");
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(None) | Err(_) => {
            debug!("websocket identification timed out");
            finalize(writer_task, outbound_tx).await;
            return;
        }
    };

    let (pin, nickname, participant_id, token) =
        match serde_json::from_str::<ClientMessage>(&initial_message) {
            Ok(ClientMessage::JoinRoom {
                pin,
                nickname,
                participant_id,
                token,
            }) => (pin, nickname, participant_id, token),
            Ok(_) => {
                send_event(
                    &outbound_tx,
                    &ServerMessage::from_error(&ServiceError::InvalidState(
                        "first message must be join-room".into(),
                    )),
                );
                let _ = outbound_tx.send(Message::Close(None));
                finalize(writer_task, outbound_tx).await;
                return;
            }
            Err(err) => {
                warn!(error = %err, "failed to parse identification message");
                let _ = outbound_tx.send(Message::Close(None));
                finalize(writer_task, outbound_tx).await;
                return;
            }
        };

    let outcome = match room_service::join_room(
        &state,
        socket_id,
        &pin,
        nickname.as_deref(),
        participant_id,
        token.as_deref(),
    )
    .await
    {
        Ok(outcome) => outcome,
        Err(err) => {
            send_event(&outbound_tx, &ServerMessage::from_error(&err));
            let _ = outbound_tx.send(Message::Close(None));
            finalize(writer_task, outbound_tx).await;
            return;
        }
    };

    // Subscribe before announcing the join so this socket sees every event
    // from its own join onward.
    let mut hub_rx = state.room_hub(&outcome.pin).subscribe();
    let forward_tx = outbound_tx.clone();
    let forward_task = tokio::spawn(async move {
        loop {
            match hub_rx.recv().await {
                Ok(event) => {
                    if let Ok(json) = serde_json::to_string(&event) {
                        if forward_tx.send(Message::Text(json.into())).is_err() {
                            break;
                        }
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "room broadcast receiver lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let bound_pin = outcome.pin.clone();
    let bound_participant = outcome.participant_id;
    let role = outcome.role;
    state.connections().insert(
        socket_id,
        ClientConnection {
            socket_id,
            pin: bound_pin.clone(),
            participant_id: bound_participant,
            role,
            tx: outbound_tx.clone(),
        },
    );

    let fresh_player_join = matches!(outcome.reply, ServerMessage::JoinedRoom { .. })
        && role == ParticipantRole::Player;
    send_event(&outbound_tx, &outcome.reply);
    if fresh_player_join {
        room_service::announce_join(&state, &bound_pin, bound_participant).await;
    }
    info!(%socket_id, pin = %bound_pin, participant_id = %bound_participant, ?role, "client identified");

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(inbound) => {
                    if let Err(err) = dispatch(&state, &bound_pin, bound_participant, inbound).await
                    {
                        if matches!(err, ServiceError::Internal(_)) {
                            warn!(pin = %bound_pin, error = ?err, "internal error handling client message");
                        } else {
                            debug!(pin = %bound_pin, error = %err, "client message rejected");
                        }
                        send_event(&outbound_tx, &ServerMessage::from_error(&err));
                    }
                }
                Err(err) => {
                    debug!(error = %err, "failed to parse client message");
                    send_event(
                        &outbound_tx,
                        &ServerMessage::from_error(&ServiceError::InvalidState(
                            "malformed message".into(),
                        )),
                    );
                }
            },
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            Ok(Message::Binary(_)) => {}
            Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(pin = %bound_pin, error = %err, "websocket error");
                break;
            }
        }
    }

    state.connections().remove(&socket_id);
    if role == ParticipantRole::Player {
        room_service::handle_disconnect(&state, &bound_pin, bound_participant, socket_id).await;
    }
    info!(%socket_id, pin = %bound_pin, "client disconnected");

    forward_task.abort();
    finalize(writer_task, outbound_tx).await;
}

/// Route one parsed client message to the owning service.
///
/// The room pin inside the message must match the pin the socket identified
/// on; cross-room commands over an established connection are refused.
async fn dispatch(
    state: &SharedState,
    bound_pin: &str,
    participant_id: Uuid,
    message: ClientMessage,
) -> Result<(), ServiceError> {
    let pin = match &message {
        ClientMessage::JoinRoom { .. } => {
            return Err(ServiceError::InvalidState(
                "connection is already identified".into(),
            ));
        }
        ClientMessage::StartGame { pin }
        | ClientMessage::NextQuestion { pin }
        | ClientMessage::SubmitAnswer { pin, .. }
        | ClientMessage::EndQuestion { pin, .. }
        | ClientMessage::EndGame { pin }
        | ClientMessage::GameAction { pin, .. }
        | ClientMessage::NextPhase { pin } => pin.clone(),
    };
    if pin != bound_pin {
        return Err(ServiceError::InvalidState(
            "message pin does not match the joined room".into(),
        ));
    }

    match message {
        ClientMessage::JoinRoom { .. } => unreachable!("handled above"),
        ClientMessage::StartGame { pin } => {
            room_service::start_game(state, &pin, participant_id).await
        }
        ClientMessage::NextQuestion { pin } => {
            room_service::next_question(state, &pin, participant_id).await
        }
        ClientMessage::SubmitAnswer {
            pin,
            question_index,
            answer,
            response_time_ms,
        } => {
            room_service::submit_answer(
                state,
                &pin,
                participant_id,
                question_index,
                answer,
                response_time_ms,
            )
            .await
        }
        ClientMessage::EndQuestion {
            pin,
            question_index,
        } => room_service::end_question(state, &pin, participant_id, question_index).await,
        ClientMessage::EndGame { pin } => room_service::end_game(state, &pin, participant_id).await,
        ClientMessage::GameAction { pin, action } => {
            party_service::handle_game_action(state, &pin, participant_id, action).await
        }
        ClientMessage::NextPhase { pin } => {
            party_service::next_phase(state, &pin, participant_id).await
        }
    }
}

/// Close out the writer task once nothing can feed it anymore.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}
