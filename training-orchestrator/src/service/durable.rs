//! Durability layer.
//!
//! The core depends only on `{put(key, value, ttl), get(key) -> Option<Value>}`.
//! Redis is the production implementation; an in-memory null implementation
//! is used in tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::warn;

#[derive(Debug, thiserror::Error)]
pub enum DurableStoreError {
    #[error("durable store transport error: {0}")]
    Transport(String),
}

#[async_trait]
pub trait DurableStore: Send + Sync {
    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<(), DurableStoreError>;
    async fn get(&self, key: &str) -> Result<Option<String>, DurableStoreError>;
}

/// Writes are best-effort: the caller logs and swallows the error rather
/// than failing the RPC.
pub async fn put_best_effort(store: &dyn DurableStore, key: &str, value: String, ttl: Duration) {
    if let Err(error) = store.put(key, value, ttl).await {
        warn!(key, %error, "durable snapshot write failed, continuing (in-memory is authoritative)");
    }
}

pub struct RedisDurableStore {
    client: redis::Client,
}

impl RedisDurableStore {
    pub fn connect(addr: &str) -> Result<Self, DurableStoreError> {
        let url = if addr.starts_with("redis://") {
            addr.to_string()
        } else {
            format!("redis://{addr}")
        };
        let client = redis::Client::open(url).map_err(|e| DurableStoreError::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl DurableStore for RedisDurableStore {
    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<(), DurableStoreError> {
        use redis::AsyncCommands;
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| DurableStoreError::Transport(e.to_string()))?;
        let _: () = conn
            .set_ex(key, value, ttl.as_secs().max(1))
            .await
            .map_err(|e| DurableStoreError::Transport(e.to_string()))?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, DurableStoreError> {
        use redis::AsyncCommands;
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| DurableStoreError::Transport(e.to_string()))?;
        let value: Option<String> = conn
            .get(key)
            .await
            .map_err(|e| DurableStoreError::Transport(e.to_string()))?;
        Ok(value)
    }
}

/// In-memory null implementation for tests.
#[derive(Default)]
pub struct InMemoryDurableStore {
    values: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl DurableStore for InMemoryDurableStore {
    async fn put(&self, key: &str, value: String, _ttl: Duration) -> Result<(), DurableStoreError> {
        self.values.lock().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, DurableStoreError> {
        Ok(self.values.lock().await.get(key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_store_round_trips() {
        let store = InMemoryDurableStore::default();
        assert!(store.get("job:missing").await.unwrap().is_none());
        store
            .put("job:j1", "{}".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(store.get("job:j1").await.unwrap(), Some("{}".to_string()));
    }
}
