//! Parsing and formatting helpers for durations and timestamps.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

static ISO_DURATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"PT(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?").expect("valid regex"));

/// Parse an ISO-8601 video duration (`PT1H2M3S`) into seconds.
///
/// Strings without a `PT` component parse to 0.
pub fn parse_iso_duration(duration: &str) -> u32 {
    let Some(caps) = ISO_DURATION.captures(duration) else {
        return 0;
    };

    let part = |i: usize| -> u32 {
        caps.get(i)
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .unwrap_or(0)
    };

    part(1)
        .saturating_mul(3600)
        .saturating_add(part(2).saturating_mul(60))
        .saturating_add(part(3))
}

/// Format seconds as `m:ss` (e.g. `9:05`).
pub fn format_watch_time(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// Format minutes for display (e.g. `1h 5m`, `42m`).
pub fn format_minutes(minutes: f64) -> String {
    let total = minutes.max(0.0).round() as i64;
    let hours = total / 60;
    let mins = total % 60;
    if hours > 0 {
        format!("{}h {}m", hours, mins)
    } else {
        format!("{}m", mins)
    }
}

/// Format a timestamp as relative time (e.g., "2m ago").
pub fn format_relative_time(ts: DateTime<Utc>) -> String {
    let now = Utc::now();
    let duration = now.signed_duration_since(ts);

    if duration.num_seconds() < 0 {
        "just now".to_string()
    } else if duration.num_seconds() < 60 {
        format!("{}s ago", duration.num_seconds())
    } else if duration.num_minutes() < 60 {
        format!("{}m ago", duration.num_minutes())
    } else if duration.num_hours() < 24 {
        format!("{}h ago", duration.num_hours())
    } else if duration.num_days() < 7 {
        format!("{}d ago", duration.num_days())
    } else {
        ts.format("%b %d").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_iso_duration() {
        assert_eq!(parse_iso_duration("PT4M13S"), 253);
        assert_eq!(parse_iso_duration("PT1H"), 3600);
        assert_eq!(parse_iso_duration("PT45S"), 45);
        assert_eq!(parse_iso_duration("PT2H0M30S"), 7230);
        assert_eq!(parse_iso_duration("4:13"), 0);
        assert_eq!(parse_iso_duration(""), 0);
    }

    #[test]
    fn test_format_watch_time() {
        assert_eq!(format_watch_time(545), "9:05");
        assert_eq!(format_watch_time(0), "0:00");
    }

    #[test]
    fn test_format_minutes() {
        assert_eq!(format_minutes(65.0), "1h 5m");
        assert_eq!(format_minutes(9.0), "9m");
        assert_eq!(format_minutes(-3.0), "0m");
    }
}
