//! Shared application state: connection registry, per-room broadcast hubs,
//! stores, and the plugin machinery.

/// Party-session state owned by game-type plugins.
pub mod party;
/// Live room state and its lifecycle machine.
pub mod room;

use std::sync::Arc;

use axum::extract::ws::Message;
use dashmap::DashMap;
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    dao::{auth::AuthResolver, repository::GameRepository},
    dto::ws::{ParticipantRole, ServerMessage},
    plugins::{PluginRegistry, scoring::ScoreCalculator},
    services::timer_service::TimerRegistry,
    store::{
        memory::InMemoryKvStore, party_store::PartyStore, room_store::RoomStore,
        session_store::SessionStore,
    },
};

/// Cheaply cloneable handle to the whole application state.
pub type SharedState = Arc<AppState>;

/// Per-room fan-out channel capacity.
const ROOM_HUB_CAPACITY: usize = 64;

/// Handle used to push frames to one connected socket.
#[derive(Clone)]
pub struct ClientConnection {
    /// Socket identifier, assigned at accept time.
    pub socket_id: Uuid,
    /// Pin of the room this socket identified on.
    pub pin: String,
    /// Participant bound to this socket.
    pub participant_id: Uuid,
    /// Role established at identification.
    pub role: ParticipantRole,
    /// Outbound frame channel, drained by the socket's writer task.
    pub tx: mpsc::UnboundedSender<Message>,
}

/// Broadcast hub fanning out events to every subscriber of one room.
pub struct RoomHub {
    sender: broadcast::Sender<ServerMessage>,
}

impl RoomHub {
    fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerMessage> {
        self.sender.subscribe()
    }

    /// Send an event to all current subscribers, ignoring delivery errors.
    pub fn broadcast(&self, event: ServerMessage) {
        let _ = self.sender.send(event);
    }
}

/// Central application state shared across routes, services, and timers.
pub struct AppState {
    /// Resolved runtime configuration.
    pub config: AppConfig,
    /// Registered game-type plugins.
    pub registry: Arc<PluginRegistry>,
    /// Answer checking and scoring front-end over the registry.
    pub scoring: ScoreCalculator,
    /// Live room state keyed by pin.
    pub rooms: RoomStore,
    /// Participant sessions keyed by participant id.
    pub sessions: SessionStore,
    /// Party-game sessions keyed by pin.
    pub party: PartyStore,
    /// Durable game definitions and results.
    pub repository: Arc<dyn GameRepository>,
    /// Organizer credential resolution.
    pub auth: Arc<dyn AuthResolver>,
    /// Scheduled deadlines and delayed advances.
    pub timers: TimerRegistry,
    kv: InMemoryKvStore,
    hubs: DashMap<String, RoomHub>,
    connections: DashMap<Uuid, ClientConnection>,
}

impl AppState {
    /// Construct the state tree wrapped in an [`Arc`] so it can be cloned cheaply.
    pub fn new(
        config: AppConfig,
        repository: Arc<dyn GameRepository>,
        auth: Arc<dyn AuthResolver>,
    ) -> SharedState {
        let kv = InMemoryKvStore::new();
        let registry = Arc::new(PluginRegistry::with_builtins());
        let scoring = ScoreCalculator::new(
            registry.clone(),
            config.base_points,
            config.speed_bonus_multiplier,
        );
        let rooms = RoomStore::new(Arc::new(kv.clone()), config.room_ttl);
        let sessions = SessionStore::new(Arc::new(kv.clone()), config.session_ttl);
        let party = PartyStore::new(Arc::new(kv.clone()), config.room_ttl);

        Arc::new(Self {
            config,
            registry,
            scoring,
            rooms,
            sessions,
            party,
            repository,
            auth,
            timers: TimerRegistry::new(),
            kv,
            hubs: DashMap::new(),
            connections: DashMap::new(),
        })
    }

    /// Broadcast hub for one room, created on first use.
    pub fn room_hub(&self, pin: &str) -> dashmap::mapref::one::Ref<'_, String, RoomHub> {
        self.hubs
            .entry(pin.to_string())
            .or_insert_with(|| RoomHub::new(ROOM_HUB_CAPACITY))
            .downgrade()
    }

    /// Broadcast an event to every subscriber of `pin`'s hub.
    pub fn broadcast_to_room(&self, pin: &str, event: ServerMessage) {
        self.room_hub(pin).broadcast(event);
    }

    /// Drop the hub for a room that no longer exists.
    pub fn remove_room_hub(&self, pin: &str) {
        self.hubs.remove(pin);
    }

    /// Registry of identified sockets keyed by socket id.
    pub fn connections(&self) -> &DashMap<Uuid, ClientConnection> {
        &self.connections
    }

    /// Sockets currently identified on `pin`.
    pub fn connections_in_room(&self, pin: &str) -> Vec<ClientConnection> {
        self.connections
            .iter()
            .filter(|entry| entry.value().pin == pin)
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Push a private frame to one participant's live sockets, if any.
    pub fn send_to_participant(&self, pin: &str, participant_id: Uuid, event: &ServerMessage) {
        for entry in self.connections.iter() {
            let conn = entry.value();
            if conn.pin == pin && conn.participant_id == participant_id {
                send_event(&conn.tx, event);
            }
        }
    }

    /// Drop expired entries from the backing store. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        self.kv.sweep()
    }
}

/// Serialize and enqueue one event on a socket's outbound channel.
///
/// A closed channel means the writer task is gone and the socket is being
/// torn down, so delivery errors are ignored.
pub fn send_event(tx: &mpsc::UnboundedSender<Message>, event: &ServerMessage) {
    if let Ok(json) = serde_json::to_string(event) {
        let _ = tx.send(Message::Text(json.into()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::{auth::TokenIsUserId, repository::InMemoryRepository};

    fn state() -> SharedState {
        AppState::new(
            AppConfig::default(),
            Arc::new(InMemoryRepository::new()),
            Arc::new(TokenIsUserId),
        )
    }

    #[tokio::test]
    async fn hub_delivers_to_subscribers() {
        let state = state();
        let mut rx = state.room_hub("123456").subscribe();

        state.broadcast_to_room(
            "123456",
            ServerMessage::Error {
                code: "invalid-state".into(),
                message: "nope".into(),
            },
        );

        let event = rx.recv().await.unwrap();
        match event {
            ServerMessage::Error { code, .. } => assert_eq!(code, "invalid-state"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn connections_filter_by_room() {
        let state = state();
        let (tx, _rx) = mpsc::unbounded_channel();
        let socket = Uuid::new_v4();
        state.connections().insert(
            socket,
            ClientConnection {
                socket_id: socket,
                pin: "123456".into(),
                participant_id: Uuid::new_v4(),
                role: ParticipantRole::Player,
                tx,
            },
        );

        assert_eq!(state.connections_in_room("123456").len(), 1);
        assert!(state.connections_in_room("654321").is_empty());
    }
}
