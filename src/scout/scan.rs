use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::matches::MatchedPost;
use crate::parse;
use crate::resolved::ResolvedSet;
use crate::settings::ScoutSettings;

use super::effects::MatchEffects;
use super::filter;
use super::state::ScoutState;

pub const EXCERPT_MAX_CHARS: usize = 500;

/// One post as delivered by the external candidate source. `fragments` holds
/// the free-form text pieces that may carry a view-count phrase, in document
/// order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub id: String,
    pub timestamp: Option<String>,
    pub author: Option<String>,
    pub text: Option<String>,
    #[serde(default)]
    pub fragments: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Halt {
    /// Pause-on-match hit: the caller should stop ticking but stay resumable.
    PauseOnMatch,
    /// The batch run collected its target count.
    BatchComplete,
}

#[derive(Debug, Default)]
pub struct ScanReport {
    pub matches: Vec<MatchedPost>,
    pub halt: Option<Halt>,
}

/// One synchronous pass over the currently visible candidates. Each id is
/// visited once per process lifetime; resolved ids are skipped without being
/// re-logged on later passes because the scanned set already holds them.
pub fn scan_candidates(
    candidates: &[Candidate],
    now: DateTime<Utc>,
    settings: &ScoutSettings,
    state: &mut ScoutState,
    resolved: &ResolvedSet,
    effects: &dyn MatchEffects,
) -> ScanReport {
    let mut report = ScanReport::default();

    for candidate in candidates {
        if candidate.id.is_empty() || state.scanned.contains(&candidate.id) {
            continue;
        }
        state.scanned.insert(candidate.id.clone());

        if resolved.contains(&candidate.id) {
            debug!("Skipping already-resolved post {}", candidate.id);
            continue;
        }

        let age = parse::age_minutes(candidate.timestamp.as_deref(), now);
        let views = parse::extract_view_count(&candidate.fragments);

        if !filter::matches(age, views, settings) {
            continue;
        }

        info!(
            "Match: post {} age {:.2}h views {}",
            candidate.id,
            age.map(|a| a / 60.0).unwrap_or_default(),
            views.map(|v| v.to_string()).unwrap_or_else(|| "n/a".into()),
        );

        let post = matched_post(candidate, age, views, now);
        state.match_count += 1;

        if settings.highlight_matches {
            effects.highlight(&post);
        }
        if settings.sound_notification {
            effects.play_sound();
        }

        let in_batch = state.batch.is_some();

        if settings.pause_on_match && !in_batch {
            report.matches.push(post);
            report.halt = Some(Halt::PauseOnMatch);
            return report;
        }

        if let Some(batch) = state.batch.as_mut() {
            batch.collected += 1;
            debug!("Batch progress: {}/{}", batch.collected, batch.target);
            if batch.collected >= batch.target {
                report.matches.push(post);
                report.halt = Some(Halt::BatchComplete);
                return report;
            }
        }

        if settings.auto_generate {
            effects.request_generation(&post);
        }

        report.matches.push(post);
    }

    report
}

fn matched_post(
    candidate: &Candidate,
    age: Option<f64>,
    views: Option<u64>,
    now: DateTime<Utc>,
) -> MatchedPost {
    let excerpt = candidate
        .text
        .as_ref()
        .map(|text| text.chars().take(EXCERPT_MAX_CHARS).collect());

    MatchedPost {
        id: candidate.id.clone(),
        author: candidate.author.clone(),
        excerpt,
        age_minutes: age,
        age_label: age.map(parse::format_age),
        view_count: views,
        first_seen_at: now,
    }
}
