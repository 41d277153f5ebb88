use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Local, Timelike};
use serde::{Deserialize, Serialize};

use crate::store::{self, KvStore};

pub const DAILY_STATS_KEY: &str = "daily-stats";

/// Reply counter record for one logical day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyStats {
    pub date: String,
    pub count: u64,
}

/// Key for the logical day containing `now`: the local calendar date, shifted
/// back one day while the wall clock is still before the reset hour, suffixed
/// with the reset hour itself so edits to the hour start a fresh key.
pub fn logical_date_key(now: DateTime<Local>, reset_hour: u32) -> String {
    let mut day = now.date_naive();
    if now.hour() < reset_hour {
        day = day.pred_opt().unwrap_or(day);
    }
    format!("{}_{}", day.format("%Y-%m-%d"), reset_hour)
}

/// Daily reply counter with a configurable rollover hour. Rollover is lazy: a
/// stale record is masked on read and only overwritten by the next increment.
pub struct DailyCounter {
    store: Arc<dyn KvStore>,
}

impl DailyCounter {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    pub async fn increment(&self, reset_hour: u32) -> Result<u64> {
        self.increment_at(reset_hour, Local::now()).await
    }

    pub async fn increment_at(&self, reset_hour: u32, now: DateTime<Local>) -> Result<u64> {
        let key = logical_date_key(now, reset_hour);
        let stored: Option<DailyStats> =
            store::get_json(self.store.as_ref(), DAILY_STATS_KEY).await?;

        let stats = match stored {
            Some(mut stats) if stats.date == key => {
                stats.count += 1;
                stats
            }
            // A mismatched record means the day rolled over (or the reset
            // hour changed); this increment is the first event of the new day.
            _ => DailyStats { date: key, count: 1 },
        };

        store::put_json(self.store.as_ref(), DAILY_STATS_KEY, &stats).await?;
        Ok(stats.count)
    }

    pub async fn current_count(&self, reset_hour: u32) -> Result<u64> {
        self.count_at(reset_hour, Local::now()).await
    }

    pub async fn count_at(&self, reset_hour: u32, now: DateTime<Local>) -> Result<u64> {
        let key = logical_date_key(now, reset_hour);
        let stored: Option<DailyStats> =
            store::get_json(self.store.as_ref(), DAILY_STATS_KEY).await?;

        Ok(stored
            .filter(|stats| stats.date == key)
            .map(|stats| stats.count)
            .unwrap_or(0))
    }
}
