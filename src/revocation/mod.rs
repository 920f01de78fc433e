/// Token revocation list
///
/// A key/value store used purely as set membership: the presence of a
/// token string means the token must be rejected, whatever the value.

mod memory;
mod redis_store;

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

pub use self::memory::InMemoryRevocationStore;
pub use self::redis_store::RedisRevocationStore;

/// Value written for every revoked token
pub const REVOKED_MARKER: &str = "1";

/// How a failed revocation read is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevocationPolicy {
    /// Treat the token as not revoked
    #[default]
    FailOpen,
    /// Treat the token as revoked
    FailClosed,
}

impl RevocationPolicy {
    pub fn revoked_on_failure(&self) -> bool {
        matches!(self, RevocationPolicy::FailClosed)
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("revocation store error: {0}")]
    Backend(String),
    #[error("revocation store did not answer within {0:?}")]
    Timeout(Duration),
}

#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Write `key`; it disappears on its own after `ttl`
    async fn put(&self, key: &str, marker: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Write `key` only if no live entry exists. Returns `true` when this
    /// call created the entry. The check and the write are one atomic step.
    async fn put_if_absent(&self, key: &str, marker: &str, ttl: Duration) -> Result<bool, StoreError>;

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_deserializes_from_snake_case() {
        let policy: RevocationPolicy = serde_json::from_str("\"fail_closed\"").unwrap();
        assert_eq!(policy, RevocationPolicy::FailClosed);
        assert!(policy.revoked_on_failure());
        assert!(!RevocationPolicy::default().revoked_on_failure());
    }
}
