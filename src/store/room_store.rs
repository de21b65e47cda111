use std::{sync::Arc, time::Duration};

use dashmap::DashMap;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    error::ServiceError,
    state::room::{Player, RoomState, RoomStatus},
    store::{KvStore, StoreError, StoreResult},
};

const KEY_PREFIX: &str = "room:";

/// Pin-keyed store for live [`RoomState`].
///
/// Every mutation is a read-modify-write serialized by a per-pin async mutex,
/// so two concurrent actions on the same room can never clobber each other's
/// sibling-field updates. Each write refreshes the room's TTL.
pub struct RoomStore {
    kv: Arc<dyn KvStore>,
    locks: DashMap<String, Arc<Mutex<()>>>,
    ttl: Duration,
}

impl RoomStore {
    /// Wrap a key/value backend with the configured room TTL.
    pub fn new(kv: Arc<dyn KvStore>, ttl: Duration) -> Self {
        Self {
            kv,
            locks: DashMap::new(),
            ttl,
        }
    }

    fn key(pin: &str) -> String {
        format!("{KEY_PREFIX}{pin}")
    }

    fn lock_for(&self, pin: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(pin.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Fetch a room by pin, `None` when absent or expired from the store.
    pub async fn get(&self, pin: &str) -> StoreResult<Option<RoomState>> {
        let key = Self::key(pin);
        match self.kv.get(&key).await? {
            Some(raw) => {
                let room = serde_json::from_str(&raw).map_err(|err| StoreError::codec(&key, err))?;
                Ok(Some(room))
            }
            None => Ok(None),
        }
    }

    /// Write a room, refreshing its TTL.
    pub async fn set(&self, room: &RoomState) -> StoreResult<()> {
        let key = Self::key(&room.pin);
        let raw = serde_json::to_string(room).map_err(|err| StoreError::codec(&key, err))?;
        self.kv.set(&key, raw, self.ttl).await
    }

    /// Remove a room and its writer lock.
    pub async fn delete(&self, pin: &str) -> StoreResult<()> {
        self.kv.delete(&Self::key(pin)).await?;
        self.locks.remove(pin);
        Ok(())
    }

    /// Insert a freshly created room under the pin's writer lock, keeping an
    /// already-present room intact (two clients may race the lazy creation).
    pub async fn insert_if_absent(&self, room: RoomState) -> StoreResult<RoomState> {
        let lock = self.lock_for(&room.pin);
        let _guard = lock.lock().await;
        if let Some(existing) = self.get(&room.pin).await? {
            return Ok(existing);
        }
        self.set(&room).await?;
        Ok(room)
    }

    /// Run a read-modify-write mutation for the room under its writer lock.
    ///
    /// The closure's error aborts the write; nothing is persisted.
    pub async fn update<F, T>(&self, pin: &str, mutate: F) -> Result<T, ServiceError>
    where
        F: FnOnce(&mut RoomState) -> Result<T, ServiceError>,
    {
        let lock = self.lock_for(pin);
        let _guard = lock.lock().await;

        let mut room = self
            .get(pin)
            .await?
            .ok_or_else(|| ServiceError::RoomNotFound(pin.to_string()))?;
        let value = mutate(&mut room)?;
        self.set(&room).await?;
        Ok(value)
    }

    /// Add or replace a player entry.
    pub async fn add_player(&self, pin: &str, player: Player) -> Result<(), ServiceError> {
        self.update(pin, |room| {
            room.players.insert(player.id, player);
            Ok(())
        })
        .await
    }

    /// Remove a player entry, returning it when present.
    pub async fn remove_player(
        &self,
        pin: &str,
        participant_id: Uuid,
    ) -> Result<Option<Player>, ServiceError> {
        self.update(pin, |room| Ok(room.players.shift_remove(&participant_id)))
            .await
    }

    /// Apply a partial update to one player.
    pub async fn update_player<F>(
        &self,
        pin: &str,
        participant_id: Uuid,
        apply: F,
    ) -> Result<Player, ServiceError>
    where
        F: FnOnce(&mut Player),
    {
        self.update(pin, |room| {
            let player = room
                .players
                .get_mut(&participant_id)
                .ok_or(ServiceError::PlayerNotFound)?;
            apply(player);
            Ok(player.clone())
        })
        .await
    }

    /// Move the room lifecycle forward, stamping timestamps exactly once.
    pub async fn update_status(&self, pin: &str, status: RoomStatus) -> Result<RoomState, ServiceError> {
        self.update(pin, |room| {
            room.transition(status)
                .map_err(|err| ServiceError::InvalidState(err.to_string()))?;
            Ok(room.clone())
        })
        .await
    }

    /// Advance the question index and stamp the question start time.
    pub async fn advance_question(&self, pin: &str) -> Result<(u32, OffsetDateTime), ServiceError> {
        self.update(pin, |room| {
            let index = room.advance_question();
            let started_at = room
                .current_question_started_at
                .unwrap_or_else(OffsetDateTime::now_utc);
            Ok((index, started_at))
        })
        .await
    }
}
