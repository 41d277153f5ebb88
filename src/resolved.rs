use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use anyhow::Result;
use chrono::{DateTime, Local};
use log::{debug, info};

use crate::stats::logical_date_key;
use crate::store::{self, KvStore};

pub const RESOLVED_IDS_KEY: &str = "scout-resolved-posts";
pub const RESOLVED_DATE_KEY: &str = "scout-resolved-date";
pub const RESOLVED_CAP: usize = 100;

#[derive(Default)]
struct ResolvedIds {
    order: Vec<String>,
    lookup: HashSet<String>,
}

/// Posts already acted on (replied to), kept so the scan loop never offers
/// them again within the same logical day. Persisted as a FIFO list capped at
/// [`RESOLVED_CAP`]; the stored list is discarded once the logical day rolls.
pub struct ResolvedSet {
    store: Arc<dyn KvStore>,
    ids: RwLock<ResolvedIds>,
}

impl ResolvedSet {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            store,
            ids: RwLock::new(ResolvedIds::default()),
        }
    }

    pub async fn load(&self, reset_hour: u32) -> Result<usize> {
        self.load_at(reset_hour, Local::now()).await
    }

    pub async fn load_at(&self, reset_hour: u32, now: DateTime<Local>) -> Result<usize> {
        let current_key = logical_date_key(now, reset_hour);
        let stored_key: Option<String> =
            store::get_json(self.store.as_ref(), RESOLVED_DATE_KEY).await?;

        if stored_key.as_deref() != Some(current_key.as_str()) {
            info!(
                "New logical day ({} -> {current_key}), resetting resolved posts",
                stored_key.as_deref().unwrap_or("none")
            );
            store::put_json(self.store.as_ref(), RESOLVED_IDS_KEY, &Vec::<String>::new()).await?;
            store::put_json(self.store.as_ref(), RESOLVED_DATE_KEY, &current_key).await?;

            let mut guard = self.ids.write().unwrap();
            guard.order.clear();
            guard.lookup.clear();
            return Ok(0);
        }

        let stored: Vec<String> = store::get_json(self.store.as_ref(), RESOLVED_IDS_KEY)
            .await?
            .unwrap_or_default();

        let mut guard = self.ids.write().unwrap();
        guard.lookup = stored.iter().cloned().collect();
        guard.order = stored;
        debug!("Loaded {} resolved posts from the store", guard.order.len());
        Ok(guard.order.len())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.read().unwrap().lookup.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.read().unwrap().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub async fn mark(&self, id: &str, reset_hour: u32) -> Result<()> {
        self.mark_at(id, reset_hour, Local::now()).await
    }

    pub async fn mark_at(&self, id: &str, reset_hour: u32, now: DateTime<Local>) -> Result<()> {
        if id.is_empty() {
            return Ok(());
        }

        let snapshot = {
            let mut guard = self.ids.write().unwrap();
            if !guard.lookup.insert(id.to_string()) {
                return Ok(());
            }
            guard.order.push(id.to_string());
            if guard.order.len() > RESOLVED_CAP {
                let evicted = guard.order.remove(0);
                guard.lookup.remove(&evicted);
            }
            guard.order.clone()
        };

        store::put_json(self.store.as_ref(), RESOLVED_IDS_KEY, &snapshot).await?;
        store::put_json(
            self.store.as_ref(),
            RESOLVED_DATE_KEY,
            &logical_date_key(now, reset_hour),
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::TimeZone;

    fn local(day: u32, hour: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 8, day, hour, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn mark_and_contains() {
        let resolved = ResolvedSet::new(Arc::new(MemoryStore::new()));

        assert!(!resolved.contains("p1"));
        resolved.mark_at("p1", 0, local(7, 12)).await.unwrap();
        assert!(resolved.contains("p1"));
        assert_eq!(resolved.len(), 1);

        // Marking twice is a no-op.
        resolved.mark_at("p1", 0, local(7, 12)).await.unwrap();
        assert_eq!(resolved.len(), 1);
    }

    #[tokio::test]
    async fn cap_evicts_oldest_first() {
        let resolved = ResolvedSet::new(Arc::new(MemoryStore::new()));

        for i in 0..=RESOLVED_CAP {
            resolved
                .mark_at(&format!("id-{i}"), 0, local(7, 12))
                .await
                .unwrap();
        }

        assert_eq!(resolved.len(), RESOLVED_CAP);
        assert!(!resolved.contains("id-0"));
        assert!(resolved.contains("id-1"));
        assert!(resolved.contains(&format!("id-{RESOLVED_CAP}")));
    }

    #[tokio::test]
    async fn load_restores_same_day_entries() {
        let store = Arc::new(MemoryStore::new());

        {
            let resolved = ResolvedSet::new(store.clone());
            resolved.mark_at("p1", 0, local(7, 12)).await.unwrap();
            resolved.mark_at("p2", 0, local(7, 13)).await.unwrap();
        }

        let reloaded = ResolvedSet::new(store);
        let count = reloaded.load_at(0, local(7, 18)).await.unwrap();
        assert_eq!(count, 2);
        assert!(reloaded.contains("p1"));
        assert!(reloaded.contains("p2"));
    }

    #[tokio::test]
    async fn load_resets_when_day_rolls() {
        let store = Arc::new(MemoryStore::new());

        {
            let resolved = ResolvedSet::new(store.clone());
            resolved.mark_at("p1", 0, local(7, 12)).await.unwrap();
        }

        let reloaded = ResolvedSet::new(store.clone());
        let count = reloaded.load_at(0, local(8, 9)).await.unwrap();
        assert_eq!(count, 0);
        assert!(!reloaded.contains("p1"));

        // The stored list was rewritten empty under the fresh key.
        let ids: Vec<String> = store::get_json(store.as_ref(), RESOLVED_IDS_KEY)
            .await
            .unwrap()
            .unwrap();
        assert!(ids.is_empty());
        let date: String = store::get_json(store.as_ref(), RESOLVED_DATE_KEY)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(date, "2026-08-08_0");
    }

    #[tokio::test]
    async fn empty_id_is_ignored() {
        let resolved = ResolvedSet::new(Arc::new(MemoryStore::new()));
        resolved.mark_at("", 0, local(7, 12)).await.unwrap();
        assert!(resolved.is_empty());
    }
}
