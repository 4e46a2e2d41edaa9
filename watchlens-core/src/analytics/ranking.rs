//! Top channels and flagged-content extraction.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

use super::{check_days, AnalyticsContext};
use crate::db::WatchStore;
use crate::error::Result;
use crate::types::{ContentFlag, FlagRecord, FlagSeverity, ResolvedWatch, TimeWindow};

/// Number of channels returned by [`top_channels`].
pub const TOP_CHANNELS_LIMIT: usize = 10;

/// Longest look-back accepted by the ranker, in days.
pub const MAX_LOOKBACK_DAYS: u32 = 365;

/// Watch time on one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelStats {
    pub channel_id: String,
    /// Title of the first entry seen for the channel
    pub channel_title: String,
    pub total_watch_time_minutes: u32,
    /// Watch entries, not distinct videos
    pub video_count: usize,
}

/// Rank channels by total watch time. Pure.
///
/// Entries must be in `watched_at` order; unresolved entries are dropped.
pub(crate) fn rank_channels(entries: &[ResolvedWatch], limit: usize) -> Vec<ChannelStats> {
    struct Acc<'a> {
        title: &'a str,
        seconds: u64,
        count: usize,
    }

    let mut channels: HashMap<&str, Acc> = HashMap::new();
    for resolved in entries {
        let Some(video) = &resolved.video else {
            continue;
        };
        let acc = channels.entry(video.channel_id.as_str()).or_insert(Acc {
            title: video.channel_title.as_str(),
            seconds: 0,
            count: 0,
        });
        acc.seconds += resolved.entry.watch_duration as u64;
        acc.count += 1;
    }

    let mut ranked: Vec<(&str, Acc)> = channels.into_iter().collect();
    ranked.sort_by(|a, b| b.1.seconds.cmp(&a.1.seconds).then_with(|| a.0.cmp(b.0)));

    ranked
        .into_iter()
        .take(limit)
        .map(|(channel_id, acc)| ChannelStats {
            channel_id: channel_id.to_string(),
            channel_title: acc.title.to_string(),
            total_watch_time_minutes: (acc.seconds as f64 / 60.0).round() as u32,
            video_count: acc.count,
        })
        .collect()
}

/// Channels the user spent the most time on over the last `days` days.
pub fn top_channels<S: WatchStore + ?Sized>(
    ctx: &AnalyticsContext<'_, S>,
    user_id: &str,
    days: u32,
    now: DateTime<Utc>,
) -> Result<Vec<ChannelStats>> {
    check_days(days, MAX_LOOKBACK_DAYS)?;
    let window = TimeWindow::last_days(days, now);
    let entries = ctx.watch_entries(user_id, &window)?;
    let channels = rank_channels(&entries, TOP_CHANNELS_LIMIT);

    tracing::debug!(user_id, days, channels = channels.len(), "Ranked channels");
    Ok(channels)
}

/// A watched video that currently carries flags.
#[derive(Debug, Clone, Serialize)]
pub struct FlaggedContentItem {
    pub entry_id: String,
    pub video_id: String,
    pub title: String,
    pub channel_title: String,
    pub flags: Vec<ContentFlag>,
    /// Severity derived from `flags`
    pub severity: FlagSeverity,
    /// The video's flag records, each with the severity it was raised with
    pub records: Vec<FlagRecord>,
    pub watched_at: DateTime<Utc>,
}

/// Item counts by derived severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeveritySummary {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct FlaggedContentReport {
    /// Newest first
    pub items: Vec<FlaggedContentItem>,
    pub summary: SeveritySummary,
}

/// Extract flagged items from entries, newest first. Pure.
pub(crate) fn extract_flagged(entries: &[ResolvedWatch]) -> FlaggedContentReport {
    let mut items: Vec<FlaggedContentItem> = entries
        .iter()
        .filter_map(|resolved| {
            let video = resolved.video.as_ref()?;
            let c = &video.classification;
            if !c.is_flagged() {
                return None;
            }
            Some(FlaggedContentItem {
                entry_id: resolved.entry.id.clone(),
                video_id: video.video_id.clone(),
                title: video.title.clone(),
                channel_title: video.channel_title.clone(),
                flags: c.flags.iter().copied().collect(),
                severity: FlagSeverity::from_flags(&c.flags),
                records: c.flagged.clone(),
                watched_at: resolved.entry.watched_at,
            })
        })
        .collect();
    items.sort_by(|a, b| b.watched_at.cmp(&a.watched_at));

    let mut summary = SeveritySummary {
        total: items.len(),
        ..Default::default()
    };
    for item in &items {
        match item.severity {
            FlagSeverity::High => summary.high += 1,
            FlagSeverity::Medium => summary.medium += 1,
            FlagSeverity::Low => summary.low += 1,
        }
    }

    FlaggedContentReport { items, summary }
}

/// Flagged videos the user watched over the last `days` days.
pub fn flagged_content<S: WatchStore + ?Sized>(
    ctx: &AnalyticsContext<'_, S>,
    user_id: &str,
    days: u32,
    now: DateTime<Utc>,
) -> Result<FlaggedContentReport> {
    check_days(days, MAX_LOOKBACK_DAYS)?;
    let window = TimeWindow::last_days(days, now);
    let entries = ctx.watch_entries(user_id, &window)?;
    let report = extract_flagged(&entries);

    if report.summary.high > 0 {
        tracing::info!(
            user_id,
            days,
            high = report.summary.high,
            total = report.summary.total,
            "High-severity content in watch history"
        );
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        AgeRating, Category, Classification, FlagStatus, FlaggedBy, Video, WatchHistoryEntry,
    };
    use chrono::Duration;

    fn record(flag: ContentFlag, severity: FlagSeverity, status: FlagStatus) -> FlagRecord {
        FlagRecord {
            id: 1,
            flagged_by: FlaggedBy::User("parent".to_string()),
            flag,
            reason: "test".to_string(),
            severity,
            flagged_at: Utc::now(),
            status,
            resolved_at: None,
        }
    }

    fn video(id: i64, channel: &str, records: Vec<FlagRecord>) -> Video {
        Video {
            id,
            video_id: format!("video{:06}", id),
            title: format!("Video {}", id),
            description: String::new(),
            channel_id: channel.to_string(),
            channel_title: format!("{} title", channel),
            duration: "PT10M".to_string(),
            duration_seconds: 600,
            tags: Vec::new(),
            view_count: 0,
            published_at: None,
            classification: Classification::new(
                Category::Gaming,
                AgeRating::ThirteenPlus,
                0.5,
                records,
                Utc::now(),
            ),
            keywords_version: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn watch(video: Option<Video>, seconds: u32, minutes_ago: i64) -> ResolvedWatch {
        let video_ref = video.as_ref().map(|v| v.id).unwrap_or(404);
        ResolvedWatch {
            entry: WatchHistoryEntry::new(
                "u1",
                video_ref,
                "abcdefghijk",
                seconds,
                600,
                Utc::now() - Duration::minutes(minutes_ago),
            ),
            video,
        }
    }

    #[test]
    fn test_rank_channels_sums_and_orders() {
        let entries = vec![
            watch(Some(video(1, "UC-b", vec![])), 600, 50),
            watch(Some(video(2, "UC-a", vec![])), 300, 40),
            watch(Some(video(3, "UC-a", vec![])), 300, 30),
            watch(Some(video(4, "UC-c", vec![])), 90, 20),
            watch(None, 6000, 10),
        ];
        let ranked = rank_channels(&entries, TOP_CHANNELS_LIMIT);

        assert_eq!(ranked.len(), 3);
        // UC-a and UC-b tie at 10 minutes; channel id breaks the tie
        assert_eq!(ranked[0].channel_id, "UC-a");
        assert_eq!(ranked[0].video_count, 2);
        assert_eq!(ranked[0].total_watch_time_minutes, 10);
        assert_eq!(ranked[1].channel_id, "UC-b");
        assert_eq!(ranked[2].total_watch_time_minutes, 2);
    }

    #[test]
    fn test_rank_channels_keeps_first_title_and_limit() {
        let mut renamed = video(2, "UC-a", vec![]);
        renamed.channel_title = "Renamed".to_string();
        let entries = vec![
            watch(Some(video(1, "UC-a", vec![])), 60, 20),
            watch(Some(renamed), 60, 10),
        ];
        let ranked = rank_channels(&entries, 1);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].channel_title, "UC-a title");
    }

    #[test]
    fn test_extract_flagged_severity_and_order() {
        let entries = vec![
            watch(
                Some(video(
                    1,
                    "UC-a",
                    vec![record(ContentFlag::Language, FlagSeverity::Low, FlagStatus::Active)],
                )),
                60,
                30,
            ),
            watch(
                Some(video(
                    2,
                    "UC-a",
                    vec![record(ContentFlag::Violence, FlagSeverity::Low, FlagStatus::Active)],
                )),
                60,
                10,
            ),
            watch(
                Some(video(
                    3,
                    "UC-a",
                    vec![record(
                        ContentFlag::AdultContent,
                        FlagSeverity::High,
                        FlagStatus::Resolved,
                    )],
                )),
                60,
                5,
            ),
            watch(None, 60, 1),
        ];
        let report = extract_flagged(&entries);

        assert_eq!(report.items.len(), 2);
        assert_eq!(report.items[0].video_id, "video000002");
        assert_eq!(report.items[0].severity, FlagSeverity::High);
        // derived and stored severities are reported side by side
        assert_eq!(report.items[0].records[0].severity, FlagSeverity::Low);
        assert_eq!(report.items[1].severity, FlagSeverity::Medium);
        assert_eq!(
            report.summary,
            SeveritySummary {
                high: 1,
                medium: 1,
                low: 0,
                total: 2
            }
        );
    }

    #[test]
    fn test_days_must_be_positive() {
        let db = crate::db::Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        let ctx = AnalyticsContext::new(&db);
        assert!(top_channels(&ctx, "u1", 0, Utc::now()).is_err());
        assert!(flagged_content(&ctx, "u1", 0, Utc::now()).is_err());
        assert!(top_channels(&ctx, "u1", 30, Utc::now()).unwrap().is_empty());
    }
}
