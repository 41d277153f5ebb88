use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::store::{self, KvStore};

pub const MATCH_LOG_KEY: &str = "scout-matched-posts";
pub const MATCH_LOG_CAP: usize = 50;

/// A candidate that passed the filters, frozen at first sighting. Removal by
/// id is the only mutation afterward.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MatchedPost {
    pub id: String,
    pub author: Option<String>,
    pub excerpt: Option<String>,
    pub age_minutes: Option<f64>,
    pub age_label: Option<String>,
    pub view_count: Option<u64>,
    pub first_seen_at: DateTime<Utc>,
}

/// Persisted match history, newest first, capped at [`MATCH_LOG_CAP`].
#[derive(Clone)]
pub struct MatchLog {
    store: Arc<dyn KvStore>,
}

impl MatchLog {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Returns `false` when the id is already logged.
    pub async fn record(&self, post: &MatchedPost) -> Result<bool> {
        let mut posts: Vec<MatchedPost> = store::get_json(self.store.as_ref(), MATCH_LOG_KEY)
            .await?
            .unwrap_or_default();

        if posts.iter().any(|existing| existing.id == post.id) {
            return Ok(false);
        }

        posts.insert(0, post.clone());
        if posts.len() > MATCH_LOG_CAP {
            posts.pop();
        }

        store::put_json(self.store.as_ref(), MATCH_LOG_KEY, &posts).await?;
        debug!("Recorded matched post {}", post.id);
        Ok(true)
    }

    pub async fn list(&self) -> Result<Vec<MatchedPost>> {
        Ok(store::get_json(self.store.as_ref(), MATCH_LOG_KEY)
            .await?
            .unwrap_or_default())
    }

    /// Drops one entry by id; used when the operator dismisses a match.
    pub async fn remove(&self, id: &str) -> Result<()> {
        let mut posts: Vec<MatchedPost> = store::get_json(self.store.as_ref(), MATCH_LOG_KEY)
            .await?
            .unwrap_or_default();

        posts.retain(|post| post.id != id);
        store::put_json(self.store.as_ref(), MATCH_LOG_KEY, &posts).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::TimeZone;

    fn post(id: &str) -> MatchedPost {
        MatchedPost {
            id: id.to_string(),
            author: Some("someone".to_string()),
            excerpt: None,
            age_minutes: Some(120.0),
            age_label: Some("2.0h".to_string()),
            view_count: Some(300_000),
            first_seen_at: Utc.with_ymd_and_hms(2026, 8, 7, 12, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn records_newest_first() {
        let log = MatchLog::new(Arc::new(MemoryStore::new()));

        assert!(log.record(&post("a")).await.unwrap());
        assert!(log.record(&post("b")).await.unwrap());

        let posts = log.list().await.unwrap();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].id, "b");
        assert_eq!(posts[1].id, "a");
    }

    #[tokio::test]
    async fn duplicate_ids_are_rejected() {
        let log = MatchLog::new(Arc::new(MemoryStore::new()));

        assert!(log.record(&post("a")).await.unwrap());
        assert!(!log.record(&post("a")).await.unwrap());
        assert_eq!(log.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn cap_evicts_oldest() {
        let log = MatchLog::new(Arc::new(MemoryStore::new()));

        for i in 0..=MATCH_LOG_CAP {
            log.record(&post(&format!("post-{i}"))).await.unwrap();
        }

        let posts = log.list().await.unwrap();
        assert_eq!(posts.len(), MATCH_LOG_CAP);
        assert_eq!(posts[0].id, format!("post-{MATCH_LOG_CAP}"));
        assert!(posts.iter().all(|p| p.id != "post-0"));
    }

    #[tokio::test]
    async fn remove_drops_entry() {
        let log = MatchLog::new(Arc::new(MemoryStore::new()));

        log.record(&post("a")).await.unwrap();
        log.record(&post("b")).await.unwrap();
        log.remove("a").await.unwrap();

        let posts = log.list().await.unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].id, "b");
    }
}
