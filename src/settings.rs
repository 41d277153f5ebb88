use std::sync::{Arc, RwLock};
use std::time::Duration;

use anyhow::Result;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::store::{self, KvStore};

pub const SETTINGS_KEY: &str = "scout-settings";
pub const RESET_HOUR_KEY: &str = "stats-reset-hour";

/// How aggressively the caller walks its feed between passes; also sets the
/// scan tick interval.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ScrollSpeed {
    Slow,
    Medium,
    Fast,
}

impl ScrollSpeed {
    pub fn tick_interval(&self) -> Duration {
        match self {
            ScrollSpeed::Slow => Duration::from_millis(3000),
            ScrollSpeed::Medium => Duration::from_millis(1500),
            ScrollSpeed::Fast => Duration::from_millis(800),
        }
    }
}

impl Default for ScrollSpeed {
    fn default() -> Self {
        ScrollSpeed::Medium
    }
}

/// Scouting thresholds and toggles. `min_age_hours <= max_age_hours` is the
/// caller's responsibility; the filter does not enforce it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ScoutSettings {
    pub min_age_hours: f64,
    pub max_age_hours: f64,
    pub min_views: u64,
    pub scroll_speed: ScrollSpeed,
    pub pause_on_match: bool,
    pub auto_generate: bool,
    pub highlight_matches: bool,
    pub sound_notification: bool,
}

impl Default for ScoutSettings {
    fn default() -> Self {
        Self {
            min_age_hours: 1.0,
            max_age_hours: 18.0,
            min_views: 250_000,
            scroll_speed: ScrollSpeed::Medium,
            pause_on_match: true,
            auto_generate: false,
            highlight_matches: true,
            sound_notification: false,
        }
    }
}

/// Typed load/save boundary for the settings record: one JSON value in the
/// store, cached behind a lock for synchronous reads.
pub struct SettingsStore {
    store: Arc<dyn KvStore>,
    data: RwLock<ScoutSettings>,
}

impl SettingsStore {
    pub async fn load(store: Arc<dyn KvStore>) -> Result<Self> {
        let data = read_settings(store.as_ref()).await?;
        Ok(Self {
            store,
            data: RwLock::new(data),
        })
    }

    pub fn current(&self) -> ScoutSettings {
        self.data.read().unwrap().clone()
    }

    pub async fn update(&self, settings: ScoutSettings) -> Result<()> {
        store::put_json(self.store.as_ref(), SETTINGS_KEY, &settings).await?;
        *self.data.write().unwrap() = settings;
        Ok(())
    }

    /// Re-reads the record from the store, picking up writes made by other
    /// surfaces sharing it.
    pub async fn reload(&self) -> Result<()> {
        let data = read_settings(self.store.as_ref()).await?;
        *self.data.write().unwrap() = data;
        Ok(())
    }

    /// Hour of day at which the daily stats roll over. Read fresh on every
    /// call rather than cached; other surfaces may edit it at any time.
    pub async fn reset_hour(&self) -> Result<u32> {
        Ok(store::get_json::<u32>(self.store.as_ref(), RESET_HOUR_KEY)
            .await?
            .unwrap_or(0))
    }

    pub async fn set_reset_hour(&self, hour: i64) -> Result<u32> {
        let clamped = hour.clamp(0, 23) as u32;
        store::put_json(self.store.as_ref(), RESET_HOUR_KEY, &clamped).await?;
        Ok(clamped)
    }
}

async fn read_settings(store: &dyn KvStore) -> Result<ScoutSettings> {
    let data = match store.get(SETTINGS_KEY).await? {
        Some(raw) => serde_json::from_str(&raw).unwrap_or_else(|err| {
            warn!("Stored settings unreadable, falling back to defaults: {err}");
            ScoutSettings::default()
        }),
        None => ScoutSettings::default(),
    };
    Ok(data)
}
