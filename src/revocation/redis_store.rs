use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;

use super::{RevocationStore, StoreError};
use crate::configuration::RedisSettings;

/// Redis-backed revocation list
///
/// `ConnectionManager` is cheap to clone and reconnects on its own, so each
/// call works on its own clone.
#[derive(Clone)]
pub struct RedisRevocationStore {
    manager: ConnectionManager,
}

impl RedisRevocationStore {
    pub async fn connect(settings: &RedisSettings) -> Result<Self, StoreError> {
        let client = redis::Client::open(settings.connection_url())
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let manager = ConnectionManager::new(client)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        tracing::info!(host = %settings.host, port = settings.port, "Connected to Redis");
        Ok(Self { manager })
    }
}

#[async_trait]
impl RevocationStore for RedisRevocationStore {
    async fn put(&self, key: &str, marker: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.manager.clone();
        let seconds = ttl.as_secs().max(1);

        redis::cmd("SET")
            .arg(key)
            .arg(marker)
            .arg("EX")
            .arg(seconds)
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    async fn put_if_absent(&self, key: &str, marker: &str, ttl: Duration) -> Result<bool, StoreError> {
        let mut conn = self.manager.clone();
        let seconds = ttl.as_secs().max(1);

        // SET NX replies OK when it wrote and nil when the key already existed.
        let reply = redis::cmd("SET")
            .arg(key)
            .arg(marker)
            .arg("NX")
            .arg("EX")
            .arg(seconds)
            .query_async::<_, Option<String>>(&mut conn)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(reply.is_some())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.manager.clone();

        redis::cmd("GET")
            .arg(key)
            .query_async::<_, Option<String>>(&mut conn)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))
    }
}
