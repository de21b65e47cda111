use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use dashmap::DashMap;
use futures::future::BoxFuture;
use tracing::debug;

use crate::store::{KvStore, StoreResult};

#[derive(Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

/// Process-local [`KvStore`] backend with per-key expiry.
///
/// Expiry is enforced lazily on read and by a periodic sweep so abandoned
/// rooms do not pin memory. Suitable for single-process deployments and
/// tests; a multi-process deployment swaps in a shared backend behind the
/// same trait.
#[derive(Clone, Default)]
pub struct InMemoryKvStore {
    entries: Arc<DashMap<String, Entry>>,
}

impl InMemoryKvStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every expired entry, returning how many were removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        let removed = before - self.entries.len();
        if removed > 0 {
            debug!(removed, "swept expired store entries");
        }
        removed
    }

    /// Number of live (non-expired) entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .iter()
            .filter(|entry| entry.expires_at > now)
            .count()
    }

    /// Whether no live entries remain.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KvStore for InMemoryKvStore {
    fn get(&self, key: &str) -> BoxFuture<'static, StoreResult<Option<String>>> {
        let entries = Arc::clone(&self.entries);
        let key = key.to_string();
        Box::pin(async move {
            let Some(entry) = entries.get(&key).map(|entry| entry.clone()) else {
                return Ok(None);
            };
            if entry.expires_at <= Instant::now() {
                entries.remove(&key);
                return Ok(None);
            }
            Ok(Some(entry.value))
        })
    }

    fn set(&self, key: &str, value: String, ttl: Duration) -> BoxFuture<'static, StoreResult<()>> {
        let entries = Arc::clone(&self.entries);
        let key = key.to_string();
        Box::pin(async move {
            entries.insert(
                key,
                Entry {
                    value,
                    expires_at: Instant::now() + ttl,
                },
            );
            Ok(())
        })
    }

    fn delete(&self, key: &str) -> BoxFuture<'static, StoreResult<()>> {
        let entries = Arc::clone(&self.entries);
        let key = key.to_string();
        Box::pin(async move {
            entries.remove(&key);
            Ok(())
        })
    }

    fn expire(&self, key: &str, ttl: Duration) -> BoxFuture<'static, StoreResult<bool>> {
        let entries = Arc::clone(&self.entries);
        let key = key.to_string();
        Box::pin(async move {
            let now = Instant::now();
            let mut stale = false;
            let refreshed = match entries.get_mut(&key) {
                Some(mut entry) => {
                    if entry.expires_at > now {
                        entry.expires_at = now + ttl;
                        true
                    } else {
                        stale = true;
                        false
                    }
                }
                None => false,
            };
            if stale {
                entries.remove(&key);
            }
            Ok(refreshed)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn set_get_delete_round_trip() {
        let store = InMemoryKvStore::new();
        store.set("k", "v".into(), TTL).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some("v".into()));

        store.delete("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn expired_entries_read_as_absent() {
        let store = InMemoryKvStore::new();
        store
            .set("k", "v".into(), Duration::from_millis(0))
            .await
            .unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn expire_refreshes_only_live_keys() {
        let store = InMemoryKvStore::new();
        store.set("live", "v".into(), TTL).await.unwrap();
        assert!(store.expire("live", TTL).await.unwrap());
        assert!(!store.expire("missing", TTL).await.unwrap());
    }

    #[tokio::test]
    async fn sweep_drops_expired_entries() {
        let store = InMemoryKvStore::new();
        store
            .set("dead", "v".into(), Duration::from_millis(0))
            .await
            .unwrap();
        store.set("live", "v".into(), TTL).await.unwrap();

        assert_eq!(store.sweep(), 1);
        assert_eq!(store.len(), 1);
    }
}
