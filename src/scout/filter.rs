use log::debug;

use crate::settings::ScoutSettings;

/// Slack added past the configured max age, compensating for the coarse
/// relative-time display the timestamps are scraped from.
pub const MAX_AGE_TOLERANCE_MINUTES: f64 = 10.0;

/// Pure threshold check: age is mandatory, views become mandatory once a
/// positive view threshold is configured. Identical inputs always produce the
/// identical answer.
pub fn matches(
    age_minutes: Option<f64>,
    view_count: Option<u64>,
    settings: &ScoutSettings,
) -> bool {
    let min_age_minutes = settings.min_age_hours * 60.0;
    let max_age_minutes = settings.max_age_hours * 60.0;

    let age = match age_minutes {
        Some(age) => age,
        None => {
            debug!("Rejected: could not determine post age");
            return false;
        }
    };

    if age < min_age_minutes {
        debug!(
            "Rejected: age {:.2}h is below the {}h minimum",
            age / 60.0,
            settings.min_age_hours
        );
        return false;
    }
    if age > max_age_minutes + MAX_AGE_TOLERANCE_MINUTES {
        debug!(
            "Rejected: age {:.2}h exceeds the {}h maximum (+{}min tolerance)",
            age / 60.0,
            settings.max_age_hours,
            MAX_AGE_TOLERANCE_MINUTES
        );
        return false;
    }

    if settings.min_views > 0 {
        match view_count {
            None => {
                debug!("Rejected: could not determine view count");
                return false;
            }
            Some(views) if views < settings.min_views => {
                debug!(
                    "Rejected: views {views} below the required {}",
                    settings.min_views
                );
                return false;
            }
            Some(_) => {}
        }
    }

    true
}
