use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{bail, Context, Result};
use log::info;

use postscout::scout::{Candidate, CandidateSource, LogEffects, ScoutController, ScoutStatus};
use postscout::settings::SettingsStore;
use postscout::stats::DailyCounter;
use postscout::store::SqliteStore;

const POLL_CHUNK: usize = 8;

/// Replays a fixture file of candidates, one chunk per poll, standing in for
/// a live page scrape.
struct ReplaySource {
    pending: Mutex<Vec<Candidate>>,
}

impl ReplaySource {
    fn new(candidates: Vec<Candidate>) -> Self {
        Self {
            pending: Mutex::new(candidates),
        }
    }

    fn remaining(&self) -> usize {
        self.pending.lock().unwrap().len()
    }
}

impl CandidateSource for ReplaySource {
    fn poll(&self) -> Vec<Candidate> {
        let mut pending = self.pending.lock().unwrap();
        let take = pending.len().min(POLL_CHUNK);
        pending.drain(..take).collect()
    }
}

fn store_path() -> PathBuf {
    if let Ok(path) = std::env::var("POSTSCOUT_DB") {
        return PathBuf::from(path);
    }
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("postscout")
        .join("postscout.sqlite3")
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let mut args = std::env::args().skip(1);
    let Some(candidates_path) = args.next() else {
        bail!("usage: postscout <candidates.json> [batch-target]");
    };
    let batch_target: Option<u64> = args
        .next()
        .map(|raw| raw.parse())
        .transpose()
        .context("batch target must be a positive integer")?;

    let raw = std::fs::read_to_string(&candidates_path)
        .with_context(|| format!("failed to read {candidates_path}"))?;
    let candidates: Vec<Candidate> = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse candidates from {candidates_path}"))?;
    info!("Loaded {} candidates from {candidates_path}", candidates.len());

    let store = Arc::new(SqliteStore::new(store_path())?);
    let settings = Arc::new(SettingsStore::load(store.clone()).await?);
    let source = Arc::new(ReplaySource::new(candidates));
    let controller = ScoutController::new(
        store.clone(),
        settings.clone(),
        source.clone(),
        Arc::new(LogEffects),
    );

    match batch_target {
        Some(target) => controller.start_batch(target).await?,
        None => controller.start().await?,
    };

    let tick = settings.current().scroll_speed.tick_interval();
    loop {
        tokio::time::sleep(tick).await;

        let snapshot = controller.snapshot().await;
        if snapshot.status != ScoutStatus::Scanning {
            info!("Scouting finished: {}", snapshot.status.as_str());
            break;
        }
        if source.remaining() == 0 {
            // Let the in-flight tick drain the last chunk, then stop: the
            // replay has nothing more to offer.
            tokio::time::sleep(tick).await;
            controller.stop().await?;
            break;
        }
    }

    let snapshot = controller.snapshot().await;
    println!("status: {}", snapshot.status.as_str());
    println!(
        "scanned: {}  matches: {}",
        snapshot.scanned_count, snapshot.match_count
    );
    for post in controller.match_log().list().await? {
        println!(
            "  {}  {}  {}  {} views",
            post.id,
            post.author.as_deref().unwrap_or("-"),
            post.age_label.as_deref().unwrap_or("-"),
            post.view_count
                .map(|views| views.to_string())
                .unwrap_or_else(|| "?".into()),
        );
    }

    let counter = DailyCounter::new(store.clone());
    let reset_hour = settings.reset_hour().await?;
    println!("replies today: {}", counter.current_count(reset_hour).await?);

    Ok(())
}
