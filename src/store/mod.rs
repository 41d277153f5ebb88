use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store worker unavailable: {0}")]
    Worker(String),
}

/// Asynchronous string key-value store. Writes are last-writer-wins with no
/// transactional guarantee; concurrent writers can overwrite each other.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn put(&self, key: &str, value: String) -> Result<(), StoreError>;

    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Reads a JSON record under `key`; `None` when the key is absent.
pub async fn get_json<T: DeserializeOwned>(
    store: &dyn KvStore,
    key: &str,
) -> Result<Option<T>, StoreError> {
    match store.get(key).await? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Writes `value` under `key` as JSON.
pub async fn put_json<T: Serialize>(
    store: &dyn KvStore,
    key: &str,
    value: &T,
) -> Result<(), StoreError> {
    let raw = serde_json::to_string(value)?;
    store.put(key, raw).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn json_roundtrip() {
        let store = MemoryStore::new();
        put_json(&store, "numbers", &vec![1u64, 2, 3]).await.unwrap();

        let loaded: Option<Vec<u64>> = get_json(&store, "numbers").await.unwrap();
        assert_eq!(loaded, Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn json_missing_key_is_none() {
        let store = MemoryStore::new();
        let loaded: Option<u64> = get_json(&store, "absent").await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn json_unreadable_value_is_error() {
        let store = MemoryStore::new();
        store.put("bad", "not json".to_string()).await.unwrap();

        let result: Result<Option<u64>, _> = get_json(&store, "bad").await;
        assert!(matches!(result, Err(StoreError::Serialization(_))));
    }
}
