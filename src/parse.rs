use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;

// Count phrase like "67K views", "1.2M", "67,000 views" or a bare "500".
// Suffix and the "views" word are both optional.
fn view_pattern() -> &'static Regex {
    static VIEW_RE: OnceLock<Regex> = OnceLock::new();
    VIEW_RE.get_or_init(|| {
        Regex::new(r"(?i)(\d[\d,]*(?:\.\d+)?)\s*([KMB])?(?:\s*views?)?")
            .expect("view count pattern is valid")
    })
}

/// Minutes elapsed between the candidate's timestamp and `now`. `None` when
/// the timestamp is missing or unparseable; the caller treats that as
/// indeterminate rather than an error.
pub fn age_minutes(timestamp: Option<&str>, now: DateTime<Utc>) -> Option<f64> {
    let raw = timestamp?.trim();
    if raw.is_empty() {
        return None;
    }

    let posted = DateTime::parse_from_rfc3339(raw).ok()?.with_timezone(&Utc);
    Some((now - posted).num_milliseconds() as f64 / 60_000.0)
}

/// Pulls a view count out of free-form text. Thousand separators are
/// stripped, K/M/B suffixes multiply, and the result is rounded to the
/// nearest integer. When the text carries several count phrases the last one
/// wins; counts usually sit in the footer.
pub fn parse_view_count(text: &str) -> Option<u64> {
    let mut result = None;

    for caps in view_pattern().captures_iter(text) {
        let digits = caps[1].replace(',', "");
        let number: f64 = match digits.parse() {
            Ok(value) => value,
            Err(_) => continue,
        };

        let multiplier = match caps.get(2).map(|m| m.as_str().to_ascii_uppercase()) {
            Some(suffix) if suffix == "K" => 1_000.0,
            Some(suffix) if suffix == "M" => 1_000_000.0,
            Some(suffix) if suffix == "B" => 1_000_000_000.0,
            _ => 1.0,
        };

        result = Some((number * multiplier).round() as u64);
    }

    result
}

/// Scans candidate fragments in document order; the last fragment that yields
/// a count wins.
pub fn extract_view_count(fragments: &[String]) -> Option<u64> {
    let mut result = None;
    for fragment in fragments {
        if let Some(count) = parse_view_count(fragment) {
            result = Some(count);
        }
    }
    result
}

/// Display form of an age: rounded minutes under an hour, tenths of an hour
/// above.
pub fn format_age(age_minutes: f64) -> String {
    if age_minutes < 60.0 {
        format!("{}m", age_minutes.round() as i64)
    } else {
        format!("{:.1}h", age_minutes / 60.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 7, 12, 0, 0).unwrap()
    }

    #[test]
    fn age_from_rfc3339_timestamp() {
        let age = age_minutes(Some("2026-08-07T10:00:00Z"), noon());
        assert_eq!(age, Some(120.0));
    }

    #[test]
    fn age_handles_offset_timestamps() {
        let age = age_minutes(Some("2026-08-07T13:30:00+02:00"), noon());
        assert_eq!(age, Some(30.0));
    }

    #[test]
    fn age_missing_or_garbage_is_none() {
        assert_eq!(age_minutes(None, noon()), None);
        assert_eq!(age_minutes(Some(""), noon()), None);
        assert_eq!(age_minutes(Some("yesterday"), noon()), None);
    }

    #[test]
    fn view_count_suffixes() {
        assert_eq!(parse_view_count("67K views"), Some(67_000));
        assert_eq!(parse_view_count("1.2M"), Some(1_200_000));
        assert_eq!(parse_view_count("500"), Some(500));
        assert_eq!(parse_view_count("2.5B views"), Some(2_500_000_000));
    }

    #[test]
    fn view_count_garbage_is_none() {
        assert_eq!(parse_view_count("garbage"), None);
        assert_eq!(parse_view_count(""), None);
    }

    #[test]
    fn view_count_strips_thousand_separators() {
        assert_eq!(parse_view_count("67,000 views"), Some(67_000));
        assert_eq!(parse_view_count("1,234,567 views"), Some(1_234_567));
    }

    #[test]
    fn view_count_lowercase_suffix() {
        assert_eq!(parse_view_count("192k"), Some(192_000));
    }

    #[test]
    fn last_count_in_text_wins() {
        assert_eq!(parse_view_count("12 replies 340 reposts 67K views"), Some(67_000));
    }

    #[test]
    fn last_fragment_with_count_wins() {
        let fragments = vec![
            "no numbers here".to_string(),
            "1.5K views".to_string(),
            "still nothing".to_string(),
            "2M views".to_string(),
        ];
        assert_eq!(extract_view_count(&fragments), Some(2_000_000));
        assert_eq!(extract_view_count(&[]), None);
    }

    #[test]
    fn fractional_suffix_rounds() {
        assert_eq!(parse_view_count("1.2345K"), Some(1_235));
    }

    #[test]
    fn age_label_formats() {
        assert_eq!(format_age(34.4), "34m");
        assert_eq!(format_age(59.6), "60m");
        assert_eq!(format_age(72.0), "1.2h");
        assert_eq!(format_age(125.0), "2.1h");
    }
}
