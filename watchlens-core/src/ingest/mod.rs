//! Ingestion layer for videos, watch events and flag reports
//!
//! This module is the write side of watchlens. It turns video metadata
//! delivered by a fetch collaborator into classified, stored videos and
//! records watch events and user reports against them.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────────┐     ┌─────────────────┐
//! │  VideoDetails   │ ──► │     Ingestor     │ ──► │    Database     │
//! │  watch events   │     │ (KeywordTables)  │     │ (videos, etc)   │
//! └─────────────────┘     └──────────────────┘     └─────────────────┘
//! ```
//!
//! A video is classified exactly once, when it is first stored. Later
//! ingestion of the same id returns the stored video untouched; an
//! explicit [`Ingestor::reclassify_video`] is the only corrective path.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use watchlens_core::{Config, Database};
//! use watchlens_core::classifier::KeywordTables;
//! use watchlens_core::ingest::Ingestor;
//!
//! let db = Database::open(&Config::database_path())?;
//! let tables = KeywordTables::builtin();
//! let ingestor = Ingestor::new(&db, &tables);
//!
//! let outcome = ingestor.ingest_video(&details)?;
//! println!("{} -> {}", outcome.video.video_id, outcome.video.classification.category);
//! ```

mod video_id;

pub use video_id::{extract_video_id, is_valid_video_id};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::classifier::{ClassificationResult, KeywordTables};
use crate::db::{Database, HistoryQuery, Page, WatchStore};
use crate::error::{Error, Result};
use crate::types::{
    FlagRecord, FlagSeverity, NewFlagRecord, ResolvedWatch, Video, VideoDetails,
    WatchHistoryEntry, WatchSource,
};

/// Most videos accepted by one [`Ingestor::batch_classify`] call.
pub const MAX_BATCH_SIZE: usize = 10;

/// Largest page size for listings.
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Result of ingesting one video.
#[derive(Debug, Clone, Serialize)]
pub struct IngestOutcome {
    pub video: Video,
    /// False when the video was already stored and was not reclassified
    pub created: bool,
}

/// A watch event as reported by a client, before validation.
#[derive(Debug, Clone)]
pub struct NewWatch {
    pub user_id: String,
    /// External video id
    pub video_id: String,
    /// Seconds watched; negative values clamp to zero
    pub watch_duration: f64,
    /// Seconds; values below one clamp to one
    pub video_duration: f64,
    /// Defaults to now
    pub watched_at: Option<DateTime<Utc>>,
    pub source: WatchSource,
    /// Metadata used to ingest the video when it is not stored yet
    pub details: Option<VideoDetails>,
}

impl NewWatch {
    pub fn new(user_id: &str, video_id: &str, watch_duration: f64, video_duration: f64) -> Self {
        Self {
            user_id: user_id.to_string(),
            video_id: video_id.to_string(),
            watch_duration,
            video_duration,
            watched_at: None,
            source: WatchSource::default(),
            details: None,
        }
    }
}

/// Per-item outcome of a batch classification.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchItem {
    Classified {
        video_id: String,
        classification: ClassificationResult,
        created: bool,
    },
    Failed {
        video_id: String,
        error: String,
    },
}

impl BatchItem {
    pub fn is_success(&self) -> bool {
        matches!(self, BatchItem::Classified { .. })
    }

    pub fn video_id(&self) -> &str {
        match self {
            BatchItem::Classified { video_id, .. } | BatchItem::Failed { video_id, .. } => {
                video_id
            }
        }
    }
}

/// A flagged video with its most recent record.
#[derive(Debug, Clone, Serialize)]
pub struct FlaggedVideo {
    pub video: Video,
    pub latest_record: Option<FlagRecord>,
    /// Severity stored on the latest record
    pub severity: Option<FlagSeverity>,
}

/// Write-side entry point over a database and a set of keyword tables.
pub struct Ingestor<'a> {
    db: &'a Database,
    tables: &'a KeywordTables,
}

impl<'a> Ingestor<'a> {
    pub fn new(db: &'a Database, tables: &'a KeywordTables) -> Self {
        Self { db, tables }
    }

    // ============================================
    // Videos
    // ============================================

    /// Store a video, classifying it if it is new.
    ///
    /// An already stored video is returned as is.
    pub fn ingest_video(&self, details: &VideoDetails) -> Result<IngestOutcome> {
        if !is_valid_video_id(&details.video_id) {
            return Err(Error::Validation(format!(
                "invalid video id: {:?}",
                details.video_id
            )));
        }

        if let Some(video) = self.db.find_video_by_external_id(&details.video_id)? {
            tracing::debug!(video_id = %video.video_id, "Video already stored");
            return Ok(IngestOutcome {
                video,
                created: false,
            });
        }

        let result = self
            .tables
            .classify(&details.title, &details.description, &details.tags);
        let video = self.db.insert_video(details, &result)?;

        tracing::info!(
            video_id = %video.video_id,
            category = %result.category,
            age_rating = %result.age_rating,
            confidence = result.confidence,
            "Ingested video"
        );
        Ok(IngestOutcome {
            video,
            created: true,
        })
    }

    /// Run the classifier again on a stored video and overwrite its result.
    pub fn reclassify_video(&self, video_id: &str) -> Result<Video> {
        let video = self
            .db
            .find_video_by_external_id(video_id)?
            .ok_or_else(|| Error::VideoNotFound(video_id.to_string()))?;
        let result = self
            .tables
            .classify(&video.title, &video.description, &video.tags);
        self.db.upsert_video_classification(video_id, &result)
    }

    /// Ingest up to [`MAX_BATCH_SIZE`] videos, reporting each one separately.
    ///
    /// Only an empty or oversized batch fails as a whole.
    pub fn batch_classify(&self, videos: &[VideoDetails]) -> Result<Vec<BatchItem>> {
        if videos.is_empty() {
            return Err(Error::Validation("batch must not be empty".to_string()));
        }
        if videos.len() > MAX_BATCH_SIZE {
            return Err(Error::Validation(format!(
                "batch holds {} videos, at most {} allowed",
                videos.len(),
                MAX_BATCH_SIZE
            )));
        }

        let items: Vec<BatchItem> = videos
            .iter()
            .map(|details| match self.ingest_video(details) {
                Ok(outcome) => BatchItem::Classified {
                    video_id: outcome.video.video_id.clone(),
                    classification: stored_result(&outcome.video),
                    created: outcome.created,
                },
                Err(e) => {
                    tracing::warn!(video_id = %details.video_id, error = %e, "Batch item failed");
                    BatchItem::Failed {
                        video_id: details.video_id.clone(),
                        error: e.to_string(),
                    }
                }
            })
            .collect();

        tracing::info!(
            total = items.len(),
            failed = items.iter().filter(|i| !i.is_success()).count(),
            "Batch classification finished"
        );
        Ok(items)
    }

    // ============================================
    // Watch events
    // ============================================

    /// Validate, clamp and record one watch event.
    ///
    /// An unknown video is ingested from `watch.details` when present and
    /// reported as not found otherwise.
    pub fn log_watch(&self, watch: &NewWatch) -> Result<WatchHistoryEntry> {
        if watch.user_id.trim().is_empty() {
            return Err(Error::Validation("user id must not be empty".to_string()));
        }
        let (watch_duration, video_duration) =
            clamp_durations(watch.watch_duration, watch.video_duration)?;

        let video = match self.db.find_video_by_external_id(&watch.video_id)? {
            Some(video) => video,
            None => match &watch.details {
                Some(details) if details.video_id == watch.video_id => {
                    self.ingest_video(details)?.video
                }
                _ => return Err(Error::VideoNotFound(watch.video_id.clone())),
            },
        };

        let entry = WatchHistoryEntry::new(
            &watch.user_id,
            video.id,
            &video.video_id,
            watch_duration,
            video_duration,
            watch.watched_at.unwrap_or_else(Utc::now),
        )
        .with_source(watch.source);
        self.db.append_watch_entry(&entry)?;

        tracing::debug!(
            user_id = %entry.user_id,
            video_id = %entry.youtube_video_id,
            watch_duration,
            completion = entry.completion_percentage,
            "Logged watch"
        );
        Ok(entry)
    }

    /// Record several already-built entries in one transaction.
    pub fn import_watch_entries(&self, entries: &[WatchHistoryEntry]) -> Result<usize> {
        let inserted = self.db.insert_watch_entries_batch(entries)?;
        tracing::info!(inserted, "Imported watch entries");
        Ok(inserted)
    }

    /// Paginated watch history, newest first.
    pub fn watch_history(&self, user_id: &str, query: &HistoryQuery) -> Result<Page<ResolvedWatch>> {
        check_page(query.page, query.limit)?;
        if let (Some(start), Some(end)) = (query.start, query.end) {
            if end < start {
                return Err(Error::Validation(format!(
                    "history range ends ({}) before it starts ({})",
                    end, start
                )));
            }
        }
        self.db.watch_history(user_id, query)
    }

    // ============================================
    // Flags
    // ============================================

    /// Report a video as inappropriate on behalf of `user_id`.
    pub fn flag_video(
        &self,
        user_id: &str,
        video_id: &str,
        reason: &str,
        severity: FlagSeverity,
    ) -> Result<FlagRecord> {
        if reason.trim().is_empty() {
            return Err(Error::Validation("flag reason must not be empty".to_string()));
        }
        let record = self
            .db
            .append_flag_record(video_id, &NewFlagRecord::user_report(user_id, reason, severity))?;

        tracing::info!(user_id, video_id, severity = %severity, "Video flagged");
        Ok(record)
    }

    /// Resolve the active reports `user_id` raised against a video.
    ///
    /// Reports from other users and classifier records stay active.
    pub fn unflag_video(&self, user_id: &str, video_id: &str) -> Result<usize> {
        let resolved = self.db.resolve_flag_records(video_id, &|record: &FlagRecord| {
            record.flagged_by.user_id() == Some(user_id)
        })?;

        tracing::info!(user_id, video_id, resolved, "Video unflagged");
        Ok(resolved)
    }

    /// Videos with active flag records, most recently flagged first.
    pub fn list_flagged_videos(
        &self,
        severity: Option<FlagSeverity>,
        page: u32,
        limit: u32,
    ) -> Result<Page<FlaggedVideo>> {
        check_page(page, limit)?;
        let videos = self.db.list_flagged_videos(severity, page, limit)?;

        Ok(Page {
            items: videos
                .items
                .into_iter()
                .map(|video| {
                    let latest_record = video.classification.latest_record().cloned();
                    FlaggedVideo {
                        severity: latest_record.as_ref().map(|r| r.severity),
                        latest_record,
                        video,
                    }
                })
                .collect(),
            page: videos.page,
            limit: videos.limit,
            total: videos.total,
        })
    }
}

/// The classification stored on a video, as a classifier result.
fn stored_result(video: &Video) -> ClassificationResult {
    let c = &video.classification;
    ClassificationResult {
        category: c.category,
        age_rating: c.age_rating,
        confidence: c.confidence,
        flags: c.flags.iter().copied().collect(),
        keywords_version: video.keywords_version,
    }
}

/// Reject non-finite durations, then clamp watch to >= 0 and video to >= 1.
fn clamp_durations(watch: f64, video: f64) -> Result<(u32, u32)> {
    if !watch.is_finite() || !video.is_finite() {
        return Err(Error::Validation(format!(
            "durations must be finite numbers, got watch={} video={}",
            watch, video
        )));
    }
    let watch = watch.max(0.0).round().min(u32::MAX as f64) as u32;
    let video = video.max(1.0).round().min(u32::MAX as f64) as u32;
    Ok((watch, video))
}

fn check_page(page: u32, limit: u32) -> Result<()> {
    if page == 0 {
        return Err(Error::Validation("page must be at least 1".to_string()));
    }
    if limit == 0 || limit > MAX_PAGE_LIMIT {
        return Err(Error::Validation(format!(
            "limit must be between 1 and {}, got {}",
            MAX_PAGE_LIMIT, limit
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Category, ContentFlag, FlagStatus};

    fn test_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        db
    }

    fn details(video_id: &str, title: &str) -> VideoDetails {
        VideoDetails {
            video_id: video_id.to_string(),
            title: title.to_string(),
            channel_id: "UC-test".to_string(),
            channel_title: "Test Channel".to_string(),
            duration: "PT10M".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_ingest_classifies_once() {
        let db = test_db();
        let tables = KeywordTables::builtin();
        let ingestor = Ingestor::new(&db, &tables);

        let first = ingestor
            .ingest_video(&details("abcdefghijk", "Python programming tutorial"))
            .unwrap();
        assert!(first.created);
        assert_eq!(first.video.classification.category, Category::Educational);
        assert_eq!(first.video.duration_seconds, 600);

        // Same id with different metadata keeps the stored classification
        let second = ingestor
            .ingest_video(&details("abcdefghijk", "Music video official"))
            .unwrap();
        assert!(!second.created);
        assert_eq!(second.video.id, first.video.id);
        assert_eq!(second.video.classification.category, Category::Educational);
        assert_eq!(db.count_videos().unwrap(), 1);
    }

    #[test]
    fn test_ingest_rejects_bad_id() {
        let db = test_db();
        let tables = KeywordTables::builtin();
        let ingestor = Ingestor::new(&db, &tables);
        assert!(matches!(
            ingestor.ingest_video(&details("too-short", "x")),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_reclassify_uses_current_tables() {
        let db = test_db();
        let builtin = KeywordTables::builtin();
        Ingestor::new(&db, &builtin)
            .ingest_video(&details("abcdefghijk", "Weekly zorbling session"))
            .unwrap();

        let mut custom = KeywordTables::builtin();
        custom.categories.gaming.push("zorbling".to_string());
        let video = Ingestor::new(&db, &custom)
            .reclassify_video("abcdefghijk")
            .unwrap();
        assert_eq!(video.classification.category, Category::Gaming);

        assert!(matches!(
            Ingestor::new(&db, &custom).reclassify_video("zzzzzzzzzzz"),
            Err(Error::VideoNotFound(_))
        ));
    }

    #[test]
    fn test_batch_classify_reports_each_item() {
        let db = test_db();
        let tables = KeywordTables::builtin();
        let ingestor = Ingestor::new(&db, &tables);

        let items = ingestor
            .batch_classify(&[
                details("aaaaaaaaaaa", "Gaming stream highlights"),
                details("bad", "Broken"),
                details("bbbbbbbbbbb", "Breaking news report"),
            ])
            .unwrap();

        assert_eq!(items.len(), 3);
        assert!(items[0].is_success());
        assert!(!items[1].is_success());
        assert_eq!(items[1].video_id(), "bad");
        match &items[2] {
            BatchItem::Classified {
                classification,
                created,
                ..
            } => {
                assert_eq!(classification.category, Category::News);
                assert!(*created);
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[test]
    fn test_batch_size_limits() {
        let db = test_db();
        let tables = KeywordTables::builtin();
        let ingestor = Ingestor::new(&db, &tables);

        assert!(ingestor.batch_classify(&[]).is_err());
        let too_many: Vec<VideoDetails> = (0..=MAX_BATCH_SIZE)
            .map(|i| details(&format!("video{:06}", i), "x"))
            .collect();
        assert!(matches!(
            ingestor.batch_classify(&too_many),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_log_watch_clamps_durations() {
        let db = test_db();
        let tables = KeywordTables::builtin();
        let ingestor = Ingestor::new(&db, &tables);
        ingestor
            .ingest_video(&details("abcdefghijk", "Lecture"))
            .unwrap();

        let entry = ingestor
            .log_watch(&NewWatch::new("u1", "abcdefghijk", -30.0, 0.0))
            .unwrap();
        assert_eq!(entry.watch_duration, 0);
        assert_eq!(entry.video_duration, 1);
        assert_eq!(entry.completion_percentage, 0);

        let entry = ingestor
            .log_watch(&NewWatch::new("u1", "abcdefghijk", 540.4, 600.0))
            .unwrap();
        assert_eq!(entry.watch_duration, 540);
        assert_eq!(entry.completion_percentage, 90);

        assert!(matches!(
            ingestor.log_watch(&NewWatch::new("u1", "abcdefghijk", f64::NAN, 600.0)),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            ingestor.log_watch(&NewWatch::new("u1", "abcdefghijk", 10.0, f64::INFINITY)),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_log_watch_unknown_video() {
        let db = test_db();
        let tables = KeywordTables::builtin();
        let ingestor = Ingestor::new(&db, &tables);

        assert!(matches!(
            ingestor.log_watch(&NewWatch::new("u1", "zzzzzzzzzzz", 10.0, 60.0)),
            Err(Error::VideoNotFound(_))
        ));

        let mut watch = NewWatch::new("u1", "zzzzzzzzzzz", 10.0, 60.0);
        watch.details = Some(details("zzzzzzzzzzz", "Cooking vlog"));
        let entry = ingestor.log_watch(&watch).unwrap();
        assert_eq!(entry.youtube_video_id, "zzzzzzzzzzz");
        assert_eq!(db.count_videos().unwrap(), 1);
    }

    #[test]
    fn test_flag_and_unflag_only_own_reports() {
        let db = test_db();
        let tables = KeywordTables::builtin();
        let ingestor = Ingestor::new(&db, &tables);
        ingestor
            .ingest_video(&details("abcdefghijk", "Street fight caught on camera"))
            .unwrap();

        let record = ingestor
            .flag_video("mom", "abcdefghijk", "not for kids", FlagSeverity::Medium)
            .unwrap();
        assert_eq!(record.flag, ContentFlag::Inappropriate);
        ingestor
            .flag_video("dad", "abcdefghijk", "too scary", FlagSeverity::High)
            .unwrap();

        assert_eq!(ingestor.unflag_video("mom", "abcdefghijk").unwrap(), 1);
        assert_eq!(ingestor.unflag_video("mom", "abcdefghijk").unwrap(), 0);

        let video = db.find_video_by_external_id("abcdefghijk").unwrap().unwrap();
        // Classifier violence record and dad's report stay active
        assert!(video.classification.flags.contains(&ContentFlag::Violence));
        assert!(video.classification.flags.contains(&ContentFlag::Inappropriate));
        let resolved: Vec<_> = video
            .classification
            .flagged
            .iter()
            .filter(|r| r.status == FlagStatus::Resolved)
            .collect();
        assert_eq!(resolved.len(), 1);
        assert!(resolved[0].resolved_at.is_some());

        assert!(matches!(
            ingestor.flag_video("mom", "zzzzzzzzzzz", "reason", FlagSeverity::Low),
            Err(Error::VideoNotFound(_))
        ));
        assert!(ingestor
            .flag_video("mom", "abcdefghijk", "  ", FlagSeverity::Low)
            .is_err());
    }

    #[test]
    fn test_list_flagged_videos_reports_latest_record() {
        let db = test_db();
        let tables = KeywordTables::builtin();
        let ingestor = Ingestor::new(&db, &tables);
        ingestor
            .ingest_video(&details("abcdefghijk", "Calm piano music"))
            .unwrap();
        ingestor
            .flag_video("mom", "abcdefghijk", "first", FlagSeverity::Low)
            .unwrap();
        ingestor
            .flag_video("dad", "abcdefghijk", "second", FlagSeverity::High)
            .unwrap();

        let page = ingestor.list_flagged_videos(None, 1, 20).unwrap();
        assert_eq!(page.total, 1);
        let item = &page.items[0];
        assert_eq!(item.severity, Some(FlagSeverity::High));
        assert_eq!(item.latest_record.as_ref().unwrap().reason, "second");

        assert!(ingestor.list_flagged_videos(None, 0, 20).is_err());
        assert!(ingestor.list_flagged_videos(None, 1, 101).is_err());
    }

    #[test]
    fn test_watch_history_validates_query() {
        let db = test_db();
        let tables = KeywordTables::builtin();
        let ingestor = Ingestor::new(&db, &tables);

        let query = HistoryQuery {
            page: 0,
            ..Default::default()
        };
        assert!(ingestor.watch_history("u1", &query).is_err());

        let now = Utc::now();
        let query = HistoryQuery {
            start: Some(now),
            end: Some(now - chrono::Duration::days(1)),
            ..Default::default()
        };
        assert!(ingestor.watch_history("u1", &query).is_err());

        let page = ingestor
            .watch_history("u1", &HistoryQuery::default())
            .unwrap();
        assert_eq!(page.total, 0);
    }

    #[test]
    fn test_clamp_durations_rounds() {
        assert_eq!(clamp_durations(59.6, 0.4).unwrap(), (60, 1));
    }
}
