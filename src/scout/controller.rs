use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use log::{debug, error, info};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::matches::MatchLog;
use crate::resolved::ResolvedSet;
use crate::settings::SettingsStore;
use crate::store::KvStore;

use super::effects::MatchEffects;
use super::scan::{scan_candidates, Candidate, Halt};
use super::state::{ScoutState, ScoutStatus};

pub const STATUS_KEY: &str = "scout-status";
pub const MATCH_COUNT_KEY: &str = "scout-match-count";

/// External supplier of candidate posts (a page scrape, a fixture file, a
/// test stub). Polled once per tick; returns whatever is currently visible.
pub trait CandidateSource: Send + Sync {
    fn poll(&self) -> Vec<Candidate>;
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoutSnapshot {
    pub status: ScoutStatus,
    pub session_id: Option<String>,
    pub match_count: u64,
    pub scanned_count: usize,
    pub batch_collected: Option<u64>,
    pub batch_target: Option<u64>,
}

/// Drives the scan loop: one synchronous pass per tick, never overlapping
/// itself. Status and match count are mirrored to the store so other surfaces
/// can display them.
#[derive(Clone)]
pub struct ScoutController {
    state: Arc<Mutex<ScoutState>>,
    store: Arc<dyn KvStore>,
    settings: Arc<SettingsStore>,
    resolved: Arc<ResolvedSet>,
    match_log: MatchLog,
    source: Arc<dyn CandidateSource>,
    effects: Arc<dyn MatchEffects>,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
    cancel: Arc<Mutex<Option<CancellationToken>>>,
}

impl ScoutController {
    pub fn new(
        store: Arc<dyn KvStore>,
        settings: Arc<SettingsStore>,
        source: Arc<dyn CandidateSource>,
        effects: Arc<dyn MatchEffects>,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(ScoutState::new())),
            resolved: Arc::new(ResolvedSet::new(store.clone())),
            match_log: MatchLog::new(store.clone()),
            store,
            settings,
            source,
            effects,
            ticker: Arc::new(Mutex::new(None)),
            cancel: Arc::new(Mutex::new(None)),
        }
    }

    pub fn match_log(&self) -> &MatchLog {
        &self.match_log
    }

    /// Starts (or resumes) scanning. Restarting from Paused or Completed
    /// re-enters Scanning with the scanned set intact.
    pub async fn start(&self) -> Result<ScoutSnapshot> {
        self.begin(None).await?;
        self.spawn_ticker().await;
        Ok(self.snapshot().await)
    }

    /// Starts a batch run that collects matches without pausing until
    /// `target` of them are found.
    pub async fn start_batch(&self, target: u64) -> Result<ScoutSnapshot> {
        if target == 0 {
            bail!("batch target must be greater than zero");
        }
        self.begin(Some(target)).await?;
        self.spawn_ticker().await;
        Ok(self.snapshot().await)
    }

    async fn begin(&self, batch_target: Option<u64>) -> Result<()> {
        {
            let state = self.state.lock().await;
            if state.status == ScoutStatus::Scanning {
                bail!("scouting already active");
            }
        }

        // Pick up settings and resolved posts written by other surfaces
        // before the first pass.
        self.settings.reload().await?;
        let reset_hour = self.settings.reset_hour().await?;
        self.resolved
            .load(reset_hour)
            .await
            .context("failed to load resolved posts")?;

        let session_id = Uuid::new_v4().to_string();
        info!("Scouting session {session_id} starting");

        {
            let mut state = self.state.lock().await;
            state.begin(session_id, Utc::now(), batch_target);
        }
        self.persist_status(ScoutStatus::Scanning).await;
        Ok(())
    }

    /// One scan pass over whatever the source currently offers. The ticker
    /// calls this; embedders driving the loop themselves may too.
    pub async fn run_pass(&self) -> Result<Option<Halt>> {
        let candidates = self.source.poll();
        let now = Utc::now();

        let mut settings = self.settings.current();
        let report = {
            let mut state = self.state.lock().await;
            if state.status != ScoutStatus::Scanning {
                return Ok(None);
            }
            if state.batch.is_some() {
                // Batch runs collect without pausing and always highlight.
                settings.pause_on_match = false;
                settings.highlight_matches = true;
            }
            scan_candidates(
                &candidates,
                now,
                &settings,
                &mut state,
                self.resolved.as_ref(),
                self.effects.as_ref(),
            )
        };

        for post in &report.matches {
            self.match_log.record(post).await?;
        }
        if !report.matches.is_empty() {
            self.persist_match_count().await;
        }

        match report.halt {
            Some(Halt::PauseOnMatch) => self.halt_with(ScoutStatus::Paused).await,
            Some(Halt::BatchComplete) => self.halt_with(ScoutStatus::Completed).await,
            None => {}
        }
        Ok(report.halt)
    }

    pub async fn stop(&self) -> Result<()> {
        self.cancel_ticker().await;
        {
            let mut state = self.state.lock().await;
            if state.status == ScoutStatus::Idle {
                return Ok(());
            }
            state.stop();
        }
        self.persist_status(ScoutStatus::Idle).await;
        info!("Scouting stopped");
        Ok(())
    }

    /// Clears the process-lifetime scanned set and zeroes the match counter.
    /// Resolved posts are left untouched.
    pub async fn reset(&self) -> Result<()> {
        self.cancel_ticker().await;
        {
            let mut state = self.state.lock().await;
            state.reset();
        }
        self.persist_status(ScoutStatus::Idle).await;
        self.persist_match_count().await;
        info!("Scout state reset");
        Ok(())
    }

    /// Records a post as acted on so later passes skip it.
    pub async fn mark_resolved(&self, id: &str) -> Result<()> {
        let reset_hour = self.settings.reset_hour().await?;
        self.resolved.mark(id, reset_hour).await
    }

    pub async fn snapshot(&self) -> ScoutSnapshot {
        let state = self.state.lock().await;
        ScoutSnapshot {
            status: state.status,
            session_id: state.session_id.clone(),
            match_count: state.match_count,
            scanned_count: state.scanned.len(),
            batch_collected: state.batch.map(|batch| batch.collected),
            batch_target: state.batch.map(|batch| batch.target),
        }
    }

    async fn halt_with(&self, status: ScoutStatus) {
        {
            let mut state = self.state.lock().await;
            match status {
                ScoutStatus::Paused => state.pause(),
                ScoutStatus::Completed => state.complete(),
                _ => {}
            }
        }
        // The ticker exits on its own once the status leaves Scanning; the
        // token is cancelled for embedders driving the loop externally.
        if let Some(token) = self.cancel.lock().await.take() {
            token.cancel();
        }
        self.persist_status(status).await;
        info!("Scouting halted: {}", status.as_str());
    }

    async fn spawn_ticker(&self) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(handle) = ticker_guard.take() {
            handle.abort();
        }

        let token = CancellationToken::new();
        *self.cancel.lock().await = Some(token.clone());

        let controller = self.clone();
        let tick_interval = self.settings.current().scroll_speed.tick_interval();

        let handle = tokio::spawn(async move {
            let mut ticker = time::interval(tick_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        {
                            let state = controller.state.lock().await;
                            if state.status != ScoutStatus::Scanning {
                                break;
                            }
                        }
                        match controller.run_pass().await {
                            Ok(Some(_)) => break,
                            Ok(None) => {}
                            Err(err) => error!("scan pass failed: {err:?}"),
                        }
                    }
                    _ = token.cancelled() => {
                        debug!("scan ticker shutting down");
                        break;
                    }
                }
            }
        });

        *ticker_guard = Some(handle);
    }

    async fn cancel_ticker(&self) {
        if let Some(token) = self.cancel.lock().await.take() {
            token.cancel();
        }
        if let Some(handle) = self.ticker.lock().await.take() {
            if let Err(err) = handle.await {
                if !err.is_cancelled() {
                    error!("scan ticker task failed to join: {err}");
                }
            }
        }
    }

    async fn persist_status(&self, status: ScoutStatus) {
        if let Err(err) = self.store.put(STATUS_KEY, status.as_str().to_string()).await {
            error!("failed to persist scout status: {err}");
        }
    }

    async fn persist_match_count(&self) {
        let count = self.state.lock().await.match_count;
        if let Err(err) = self.store.put(MATCH_COUNT_KEY, count.to_string()).await {
            error!("failed to persist match count: {err}");
        }
    }
}
