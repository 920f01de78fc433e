use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{RevocationStore, StoreError};

/// Process-local revocation list, used by tests and single-node setups
#[derive(Debug, Default)]
pub struct InMemoryRevocationStore {
    entries: RwLock<HashMap<String, (String, Instant)>>,
}

impl InMemoryRevocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn active_entries(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|(_, expires_at)| *expires_at > now)
            .count()
    }
}

#[async_trait]
impl RevocationStore for InMemoryRevocationStore {
    async fn put(&self, key: &str, marker: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        entries.retain(|_, (_, expires_at)| *expires_at > now);
        entries.insert(key.to_string(), (marker.to_string(), now + ttl));
        Ok(())
    }

    async fn put_if_absent(&self, key: &str, marker: &str, ttl: Duration) -> Result<bool, StoreError> {
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        entries.retain(|_, (_, expires_at)| *expires_at > now);
        if entries.contains_key(key) {
            return Ok(false);
        }
        entries.insert(key.to_string(), (marker.to_string(), now + ttl));
        Ok(true)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|(_, expires_at)| *expires_at > Instant::now())
            .map(|(marker, _)| marker.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_then_get() {
        let store = InMemoryRevocationStore::new();
        assert_eq!(store.get("token").await.unwrap(), None);

        store.put("token", "1", Duration::from_secs(60)).await.unwrap();
        assert_eq!(store.get("token").await.unwrap(), Some("1".to_string()));
        assert_eq!(store.active_entries().await, 1);
    }

    #[tokio::test]
    async fn test_put_is_idempotent() {
        let store = InMemoryRevocationStore::new();
        store.put("token", "1", Duration::from_secs(60)).await.unwrap();
        store.put("token", "1", Duration::from_secs(60)).await.unwrap();

        assert_eq!(store.active_entries().await, 1);
    }

    #[tokio::test]
    async fn test_put_if_absent_writes_once() {
        let store = InMemoryRevocationStore::new();

        assert!(store.put_if_absent("token", "1", Duration::from_secs(60)).await.unwrap());
        assert!(!store.put_if_absent("token", "1", Duration::from_secs(60)).await.unwrap());
        assert_eq!(store.active_entries().await, 1);
    }

    #[tokio::test]
    async fn test_put_if_absent_reclaims_expired_key() {
        let store = InMemoryRevocationStore::new();
        store.put("token", "1", Duration::from_millis(20)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(store.put_if_absent("token", "1", Duration::from_secs(60)).await.unwrap());
    }

    #[tokio::test]
    async fn test_entries_expire() {
        let store = InMemoryRevocationStore::new();
        store.put("token", "1", Duration::from_millis(20)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(store.get("token").await.unwrap(), None);
    }
}
