//! Database layer for watchlens
//!
//! This module provides the storage layer using SQLite with:
//! - Schema migrations
//! - Repository pattern for queries
//! - The [`WatchStore`] contract the analytics engine reads through

pub mod repo;
pub mod schema;

pub use repo::{Database, HistoryQuery, Page};

use crate::classifier::ClassificationResult;
use crate::error::Result;
use crate::types::{FlagRecord, NewFlagRecord, ResolvedWatch, TimeWindow, User, Video, WatchHistoryEntry};

/// Storage operations the analytics and ingestion layers depend on.
///
/// Implementations must return watch entries joined with their video when
/// the reference still resolves, and must derive `Classification::flags`
/// from the active flag records on every read.
pub trait WatchStore {
    /// Look up a video by its external id.
    fn find_video_by_external_id(&self, video_id: &str) -> Result<Option<Video>>;

    /// Entries of `user_id` with `watched_at` inside `window`, oldest first.
    fn find_watch_entries(&self, user_id: &str, window: &TimeWindow)
        -> Result<Vec<ResolvedWatch>>;

    /// Most recent entries of `user_id`, newest first.
    fn recent_watch_entries(&self, user_id: &str, limit: usize) -> Result<Vec<ResolvedWatch>>;

    /// Overwrite a stored video's category, age rating and confidence.
    ///
    /// Detected flags without an active record get a new classifier record.
    /// Active classifier records for flags no longer detected are resolved;
    /// user reports are untouched.
    fn upsert_video_classification(
        &self,
        video_id: &str,
        result: &ClassificationResult,
    ) -> Result<Video>;

    fn append_watch_entry(&self, entry: &WatchHistoryEntry) -> Result<()>;

    /// Insert all entries atomically; returns the number inserted.
    fn insert_watch_entries_batch(&self, entries: &[WatchHistoryEntry]) -> Result<usize>;

    /// Append one flag record to a video's history.
    fn append_flag_record(&self, video_id: &str, record: &NewFlagRecord) -> Result<FlagRecord>;

    /// Resolve every active record of a video matching `predicate`.
    ///
    /// Returns the number of records resolved.
    fn resolve_flag_records(
        &self,
        video_id: &str,
        predicate: &dyn Fn(&FlagRecord) -> bool,
    ) -> Result<usize>;

    fn get_user(&self, user_id: &str) -> Result<Option<User>>;

    /// Users whose `parent_id` is `parent_id`.
    fn list_children(&self, parent_id: &str) -> Result<Vec<User>>;
}
