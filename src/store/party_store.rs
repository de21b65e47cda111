use std::{sync::Arc, time::Duration};

use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::{
    error::ServiceError,
    state::party::SessionState,
    store::{KvStore, StoreError, StoreResult},
};

const KEY_PREFIX: &str = "party:";

/// Pin-keyed store for party [`SessionState`].
///
/// Mirrors the room store's concurrency shape: read-modify-write under a
/// per-pin mutex so two actions arriving together never drop each other's
/// phase change.
pub struct PartyStore {
    kv: Arc<dyn KvStore>,
    locks: DashMap<String, Arc<Mutex<()>>>,
    ttl: Duration,
}

impl PartyStore {
    /// Wrap a key/value backend with the configured TTL (shared with rooms).
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

    /// Fetch the session for a pin, `None` when absent or expired.
    pub async fn get(&self, pin: &str) -> StoreResult<Option<SessionState>> {
        let key = Self::key(pin);
        match self.kv.get(&key).await? {
            Some(raw) => {
                let session =
                    serde_json::from_str(&raw).map_err(|err| StoreError::codec(&key, err))?;
                Ok(Some(session))
            }
            None => Ok(None),
        }
    }

    /// Remove a session and its writer lock.
    pub async fn delete(&self, pin: &str) -> StoreResult<()> {
        self.kv.delete(&Self::key(pin)).await?;
        self.locks.remove(pin);
        Ok(())
    }

    /// Run a read-modify-write mutation under the pin's writer lock.
    ///
    /// The closure receives the stored session (or `None` on first contact)
    /// and returns the state to persist. Its error aborts the write.
    pub async fn update<F>(&self, pin: &str, mutate: F) -> Result<SessionState, ServiceError>
    where
        F: FnOnce(Option<SessionState>) -> Result<SessionState, ServiceError>,
    {
        let lock = self.lock_for(pin);
        let _guard = lock.lock().await;

        let existing = self.get(pin).await?;
        let session = mutate(existing)?;

        let key = Self::key(pin);
        let raw = serde_json::to_string(&session).map_err(|err| StoreError::codec(&key, err))?;
        self.kv.set(&key, raw, self.ttl).await?;
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{state::party::PartyPlayer, store::memory::InMemoryKvStore};
    use uuid::Uuid;

    fn store() -> PartyStore {
        PartyStore::new(Arc::new(InMemoryKvStore::new()), Duration::from_secs(60))
    }

    #[tokio::test]
    async fn update_creates_on_first_contact() {
        let store = store();
        assert_eq!(store.get("123456").await.unwrap(), None);

        let session = store
            .update("123456", |existing| {
                assert!(existing.is_none());
                Ok(SessionState::new(vec![PartyPlayer {
                    id: Uuid::new_v4(),
                    nickname: "kim".into(),
                }]))
            })
            .await
            .unwrap();
        assert_eq!(session.round, 0);
        assert_eq!(store.get("123456").await.unwrap(), Some(session));
    }

    #[tokio::test]
    async fn failed_mutation_is_not_persisted() {
        let store = store();
        store
            .update("123456", |_| Ok(SessionState::new(Vec::new())))
            .await
            .unwrap();

        let result = store
            .update("123456", |_| {
                Err(ServiceError::InvalidState("rejected".into()))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(
            store.get("123456").await.unwrap(),
            Some(SessionState::new(Vec::new()))
        );
    }

    #[tokio::test]
    async fn delete_removes_the_session() {
        let store = store();
        store
            .update("123456", |_| Ok(SessionState::new(Vec::new())))
            .await
            .unwrap();
        store.delete("123456").await.unwrap();
        assert_eq!(store.get("123456").await.unwrap(), None);
    }
}
