use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ScoutStatus {
    Idle,
    Scanning,
    Paused,
    Completed,
}

impl ScoutStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoutStatus::Idle => "Idle",
            ScoutStatus::Scanning => "Scanning",
            ScoutStatus::Paused => "Paused",
            ScoutStatus::Completed => "Completed",
        }
    }
}

impl Default for ScoutStatus {
    fn default() -> Self {
        ScoutStatus::Idle
    }
}

/// Progress toward a batch run's target count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchTarget {
    pub target: u64,
    pub collected: u64,
}

#[derive(Debug, Default)]
pub struct ScoutState {
    pub status: ScoutStatus,
    pub session_id: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    /// Ids visited at least once. Process-lifetime; survives pause/resume and
    /// is cleared only by `reset`.
    pub scanned: HashSet<String>,
    pub match_count: u64,
    pub batch: Option<BatchTarget>,
}

impl ScoutState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(
        &mut self,
        session_id: String,
        started_at: DateTime<Utc>,
        batch_target: Option<u64>,
    ) {
        self.status = ScoutStatus::Scanning;
        self.session_id = Some(session_id);
        self.started_at = Some(started_at);
        self.batch = batch_target.map(|target| BatchTarget {
            target,
            collected: 0,
        });
    }

    pub fn pause(&mut self) {
        self.status = ScoutStatus::Paused;
    }

    pub fn complete(&mut self) {
        self.status = ScoutStatus::Completed;
        self.batch = None;
    }

    pub fn stop(&mut self) {
        self.status = ScoutStatus::Idle;
        self.session_id = None;
        self.batch = None;
    }

    pub fn reset(&mut self) {
        self.stop();
        self.scanned.clear();
        self.match_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_enters_scanning_and_keeps_scanned_set() {
        let mut state = ScoutState::new();
        state.scanned.insert("p1".to_string());
        state.match_count = 3;

        state.begin("session".to_string(), Utc::now(), None);
        assert_eq!(state.status, ScoutStatus::Scanning);
        assert!(state.scanned.contains("p1"));
        assert_eq!(state.match_count, 3);
    }

    #[test]
    fn reset_clears_scanned_and_count() {
        let mut state = ScoutState::new();
        state.begin("session".to_string(), Utc::now(), Some(5));
        state.scanned.insert("p1".to_string());
        state.match_count = 2;

        state.reset();
        assert_eq!(state.status, ScoutStatus::Idle);
        assert!(state.scanned.is_empty());
        assert_eq!(state.match_count, 0);
        assert!(state.batch.is_none());
        assert!(state.session_id.is_none());
    }

    #[test]
    fn pause_and_complete_transitions() {
        let mut state = ScoutState::new();
        state.begin("session".to_string(), Utc::now(), Some(2));

        state.pause();
        assert_eq!(state.status, ScoutStatus::Paused);

        state.begin("session-2".to_string(), Utc::now(), Some(2));
        state.complete();
        assert_eq!(state.status, ScoutStatus::Completed);
        assert!(state.batch.is_none());
    }
}
