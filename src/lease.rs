use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use log::debug;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::{self, KvStore};

pub const DEFAULT_LEASE_TTL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct LeaseRecord {
    owner: String,
    acquired_at_ms: i64,
}

/// Best-effort suppression of duplicate scheduled-trigger firings. Each
/// instance holds a random owner token; `acquire` renews for the holder,
/// denies other owners until the TTL lapses, and `release` only removes a
/// record the caller owns. The backing store is last-writer-wins, so two
/// processes racing on `acquire` can both succeed; callers must tolerate the
/// occasional double trigger.
pub struct TriggerLease {
    store: Arc<dyn KvStore>,
    owner: String,
    ttl: Duration,
}

impl TriggerLease {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self::with_ttl(store, DEFAULT_LEASE_TTL)
    }

    pub fn with_ttl(store: Arc<dyn KvStore>, ttl: Duration) -> Self {
        Self {
            store,
            owner: Uuid::new_v4().to_string(),
            ttl,
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    fn key(name: &str) -> String {
        format!("lease-{name}")
    }

    pub async fn acquire(&self, name: &str) -> Result<bool> {
        self.acquire_at(name, Utc::now().timestamp_millis()).await
    }

    pub async fn acquire_at(&self, name: &str, now_ms: i64) -> Result<bool> {
        let key = Self::key(name);
        let existing: Option<LeaseRecord> = store::get_json(self.store.as_ref(), &key).await?;

        if let Some(record) = existing {
            let age_ms = now_ms.saturating_sub(record.acquired_at_ms);
            if record.owner != self.owner && age_ms < self.ttl.as_millis() as i64 {
                debug!("Lease {name} held by another owner, denying");
                return Ok(false);
            }
        }

        let record = LeaseRecord {
            owner: self.owner.clone(),
            acquired_at_ms: now_ms,
        };
        store::put_json(self.store.as_ref(), &key, &record).await?;
        Ok(true)
    }

    pub async fn release(&self, name: &str) -> Result<()> {
        let key = Self::key(name);
        let existing: Option<LeaseRecord> = store::get_json(self.store.as_ref(), &key).await?;

        if matches!(existing, Some(record) if record.owner == self.owner) {
            self.store.remove(&key).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn second_owner_denied_within_ttl() {
        let store = Arc::new(MemoryStore::new());
        let first = TriggerLease::new(store.clone());
        let second = TriggerLease::new(store);
        assert_ne!(first.owner(), second.owner());

        assert!(first.acquire_at("post-1", 1_000).await.unwrap());
        assert!(!second.acquire_at("post-1", 30_000).await.unwrap());
    }

    #[tokio::test]
    async fn expired_lease_can_be_taken_over() {
        let store = Arc::new(MemoryStore::new());
        let first = TriggerLease::new(store.clone());
        let second = TriggerLease::new(store);

        assert!(first.acquire_at("post-1", 1_000).await.unwrap());
        assert!(second.acquire_at("post-1", 1_000 + 60_001).await.unwrap());
        // Ownership changed hands: the original holder is now the stranger.
        assert!(!first.acquire_at("post-1", 1_000 + 60_500).await.unwrap());
    }

    #[tokio::test]
    async fn holder_renews_its_own_lease() {
        let store = Arc::new(MemoryStore::new());
        let lease = TriggerLease::new(store);

        assert!(lease.acquire_at("post-1", 1_000).await.unwrap());
        assert!(lease.acquire_at("post-1", 30_000).await.unwrap());
    }

    #[tokio::test]
    async fn release_is_owner_checked() {
        let store = Arc::new(MemoryStore::new());
        let first = TriggerLease::new(store.clone());
        let second = TriggerLease::new(store);

        assert!(first.acquire_at("post-1", 1_000).await.unwrap());

        // A stranger's release leaves the lease in place.
        second.release("post-1").await.unwrap();
        assert!(!second.acquire_at("post-1", 2_000).await.unwrap());

        // The holder's release frees it.
        first.release("post-1").await.unwrap();
        assert!(second.acquire_at("post-1", 3_000).await.unwrap());
    }

    #[tokio::test]
    async fn leases_are_independent_per_name() {
        let store = Arc::new(MemoryStore::new());
        let first = TriggerLease::new(store.clone());
        let second = TriggerLease::new(store);

        assert!(first.acquire_at("post-1", 1_000).await.unwrap());
        assert!(second.acquire_at("post-2", 1_000).await.unwrap());
    }
}
