//! Database repository layer
//!
//! Provides query and insert operations for all entity types.

use crate::classifier::ClassificationResult;
use crate::error::{Error, Result};
use crate::types::*;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, InterruptHandle, OptionalExtension, Row};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// One page of a paginated listing.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page number
    pub page: u32,
    pub limit: u32,
    /// Matching rows across all pages
    pub total: u64,
}

impl<T> Page<T> {
    /// Number of pages needed for `total` rows.
    pub fn pages(&self) -> u64 {
        if self.limit == 0 {
            return 0;
        }
        let limit = self.limit as u64;
        (self.total + limit - 1) / limit
    }
}

/// Filters for the paginated watch history.
#[derive(Debug, Clone)]
pub struct HistoryQuery {
    /// 1-based page number
    pub page: u32,
    pub limit: u32,
    /// Only entries whose video resolves to this category
    pub category: Option<Category>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl Default for HistoryQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 20,
            category: None,
            start: None,
            end: None,
        }
    }
}

impl HistoryQuery {
    fn offset(&self) -> i64 {
        (self.page.max(1) as i64 - 1) * self.limit as i64
    }
}

/// Fixed-width UTC timestamp so stored values compare correctly as text.
fn ts(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

/// Database handle with connection pooling (single connection for now)
pub struct Database {
    conn: Mutex<Connection>,
    interrupt: Arc<InterruptHandle>,
}

impl Database {
    /// Open or create a database at the given path
    pub fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA cache_size = -64000;  -- 64MB cache
            ",
        )?;

        Ok(Self::from_connection(conn))
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        let interrupt = Arc::new(conn.get_interrupt_handle());
        Self {
            conn: Mutex::new(conn),
            interrupt,
        }
    }

    /// Run migrations on this database
    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        super::schema::run_migrations(&conn)
    }

    /// Handle that aborts the query currently running on this connection.
    ///
    /// Safe to use from another thread; the interrupted call returns
    /// [`Error::Cancelled`].
    pub fn interrupt_handle(&self) -> Arc<InterruptHandle> {
        Arc::clone(&self.interrupt)
    }

    // ============================================
    // User operations
    // ============================================

    /// Insert or update a user
    pub fn upsert_user(&self, user: &User) -> Result<()> {
        user.daily_goals.validate()?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO users (id, name, email, role, parent_id,
                               goal_educational, goal_entertainment, goal_total, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                email = excluded.email,
                role = excluded.role,
                parent_id = excluded.parent_id,
                goal_educational = excluded.goal_educational,
                goal_entertainment = excluded.goal_entertainment,
                goal_total = excluded.goal_total
            "#,
            params![
                user.id,
                user.name,
                user.email,
                user.role.as_str(),
                user.parent_id,
                user.daily_goals.educational,
                user.daily_goals.entertainment,
                user.daily_goals.total,
                ts(&user.created_at),
            ],
        )?;
        Ok(())
    }

    /// Replace a user's daily goals
    pub fn set_daily_goals(&self, user_id: &str, goals: &DailyGoals) -> Result<()> {
        goals.validate()?;
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            "UPDATE users SET goal_educational = ?2, goal_entertainment = ?3, goal_total = ?4 WHERE id = ?1",
            params![user_id, goals.educational, goals.entertainment, goals.total],
        )?;
        if updated == 0 {
            return Err(Error::UserNotFound(user_id.to_string()));
        }
        Ok(())
    }

    fn row_to_user(row: &Row) -> rusqlite::Result<User> {
        let role_str: String = row.get("role")?;
        let created_at_str: String = row.get("created_at")?;

        Ok(User {
            id: row.get("id")?,
            name: row.get("name")?,
            email: row.get("email")?,
            role: role_str.parse().unwrap_or_default(),
            parent_id: row.get("parent_id")?,
            daily_goals: DailyGoals {
                educational: row.get("goal_educational")?,
                entertainment: row.get("goal_entertainment")?,
                total: row.get("goal_total")?,
            },
            created_at: parse_ts(&created_at_str),
        })
    }

    // ============================================
    // Video operations
    // ============================================

    /// Store a new video with its classification.
    ///
    /// Every flag the classifier detected is recorded as an active classifier
    /// flag record in the same transaction.
    pub fn insert_video(
        &self,
        details: &VideoDetails,
        classification: &ClassificationResult,
    ) -> Result<Video> {
        let tags = serde_json::to_string(&details.tags)?;
        let now = Utc::now();

        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        tx.execute(
            r#"
            INSERT INTO videos (video_id, title, description, channel_id, channel_title,
                                duration, duration_seconds, tags, view_count, published_at,
                                category, age_rating, confidence, keywords_version, processed_at,
                                created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?16)
            "#,
            params![
                details.video_id,
                details.title,
                details.description,
                details.channel_id,
                details.channel_title,
                details.duration,
                details.resolved_duration_seconds(),
                tags,
                details.view_count as i64,
                details.published_at.as_ref().map(ts),
                classification.category.as_str(),
                classification.age_rating.as_str(),
                classification.confidence,
                classification.keywords_version,
                ts(&now),
                ts(&now),
            ],
        )?;
        let video_ref = tx.last_insert_rowid();

        for flag in &classification.flags {
            Self::insert_flag_record(&tx, video_ref, &NewFlagRecord::detected(*flag))?;
        }

        let video = Self::video_by_ref(&tx, video_ref)?
            .ok_or_else(|| Error::VideoNotFound(details.video_id.clone()))?;
        tx.commit()?;

        tracing::debug!(
            video_id = %video.video_id,
            category = %video.classification.category,
            flags = video.classification.flags.len(),
            "Stored video"
        );
        Ok(video)
    }

    /// Count stored videos
    pub fn count_videos(&self) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM videos", [], |r| r.get(0))?;
        Ok(count)
    }

    fn video_by_ref(conn: &Connection, video_ref: i64) -> Result<Option<Video>> {
        let video = conn
            .query_row(
                "SELECT * FROM videos WHERE id = ?",
                [video_ref],
                Self::row_to_video,
            )
            .optional()?;
        video
            .map(|v| Self::attach_flag_records(conn, v))
            .transpose()
    }

    fn video_by_external_id(conn: &Connection, video_id: &str) -> Result<Option<Video>> {
        let video = conn
            .query_row(
                "SELECT * FROM videos WHERE video_id = ?",
                [video_id],
                Self::row_to_video,
            )
            .optional()?;
        video
            .map(|v| Self::attach_flag_records(conn, v))
            .transpose()
    }

    fn video_ref_for(conn: &Connection, video_id: &str) -> Result<i64> {
        conn.query_row(
            "SELECT id FROM videos WHERE video_id = ?",
            [video_id],
            |r| r.get(0),
        )
        .optional()?
        .ok_or_else(|| Error::VideoNotFound(video_id.to_string()))
    }

    /// Load a video's flag history and rebuild its classification from it.
    fn attach_flag_records(conn: &Connection, mut video: Video) -> Result<Video> {
        let records = Self::flag_records_for(conn, video.id)?;
        let c = &video.classification;
        video.classification = Classification::new(
            c.category,
            c.age_rating,
            c.confidence,
            records,
            c.processed_at,
        );
        Ok(video)
    }

    /// Build a video from its row. Flag records are attached separately.
    fn row_to_video(row: &Row) -> rusqlite::Result<Video> {
        let category_str: String = row.get("category")?;
        let age_rating_str: String = row.get("age_rating")?;
        let duration: String = row.get("duration")?;
        let duration_seconds: i64 = row.get("duration_seconds")?;
        let tags_str: String = row.get("tags")?;
        let view_count: i64 = row.get("view_count")?;
        let published_at_str: Option<String> = row.get("published_at")?;
        let processed_at_str: String = row.get("processed_at")?;
        let created_at_str: String = row.get("created_at")?;
        let updated_at_str: String = row.get("updated_at")?;
        let keywords_version: i64 = row.get("keywords_version")?;

        let duration_seconds = match duration_seconds {
            secs if secs > 0 => secs.min(u32::MAX as i64) as u32,
            _ => crate::format::parse_iso_duration(&duration),
        };

        Ok(Video {
            id: row.get("id")?,
            video_id: row.get("video_id")?,
            title: row.get("title")?,
            description: row.get("description")?,
            channel_id: row.get("channel_id")?,
            channel_title: row.get("channel_title")?,
            duration,
            duration_seconds,
            tags: serde_json::from_str(&tags_str).unwrap_or_default(),
            view_count: view_count.max(0) as u64,
            published_at: published_at_str.as_deref().map(parse_ts),
            classification: Classification::new(
                category_str.parse().unwrap_or(Category::Entertainment),
                age_rating_str.parse().unwrap_or(AgeRating::AllAges),
                row.get("confidence")?,
                Vec::new(),
                parse_ts(&processed_at_str),
            ),
            keywords_version: keywords_version.max(0) as u32,
            created_at: parse_ts(&created_at_str),
            updated_at: parse_ts(&updated_at_str),
        })
    }

    // ============================================
    // Flag record operations
    // ============================================

    fn insert_flag_record(
        conn: &Connection,
        video_ref: i64,
        record: &NewFlagRecord,
    ) -> Result<FlagRecord> {
        conn.execute(
            r#"
            INSERT INTO flag_records (video_ref, flagged_by_user, flag, reason, severity,
                                      flagged_at, status)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'active')
            "#,
            params![
                video_ref,
                record.flagged_by.user_id(),
                record.flag.as_str(),
                record.reason,
                record.severity.as_str(),
                ts(&record.flagged_at),
            ],
        )?;

        Ok(FlagRecord {
            id: conn.last_insert_rowid(),
            flagged_by: record.flagged_by.clone(),
            flag: record.flag,
            reason: record.reason.clone(),
            severity: record.severity,
            flagged_at: record.flagged_at,
            status: FlagStatus::Active,
            resolved_at: None,
        })
    }

    /// Flag records of a video, oldest first
    fn flag_records_for(conn: &Connection, video_ref: i64) -> Result<Vec<FlagRecord>> {
        let mut stmt =
            conn.prepare("SELECT * FROM flag_records WHERE video_ref = ? ORDER BY id ASC")?;
        let records = stmt
            .query_map([video_ref], Self::row_to_flag_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    fn row_to_flag_record(row: &Row) -> rusqlite::Result<FlagRecord> {
        let flagged_by_user: Option<String> = row.get("flagged_by_user")?;
        let flag_str: String = row.get("flag")?;
        let severity_str: String = row.get("severity")?;
        let status_str: String = row.get("status")?;
        let flagged_at_str: String = row.get("flagged_at")?;
        let resolved_at_str: Option<String> = row.get("resolved_at")?;

        Ok(FlagRecord {
            id: row.get("id")?,
            flagged_by: match flagged_by_user {
                Some(user_id) => FlaggedBy::User(user_id),
                None => FlaggedBy::Classifier,
            },
            flag: flag_str.parse().unwrap_or(ContentFlag::Inappropriate),
            reason: row.get("reason")?,
            severity: severity_str.parse().unwrap_or_default(),
            flagged_at: parse_ts(&flagged_at_str),
            status: status_str.parse().unwrap_or(FlagStatus::Active),
            resolved_at: resolved_at_str.as_deref().map(parse_ts),
        })
    }

    /// Videos with at least one active flag record, most recently flagged first.
    ///
    /// With `severity`, only active records of that stored severity count.
    pub fn list_flagged_videos(
        &self,
        severity: Option<FlagSeverity>,
        page: u32,
        limit: u32,
    ) -> Result<Page<Video>> {
        let conn = self.conn.lock().unwrap();
        let severity = severity.map(|s| s.as_str());
        let offset = (page.max(1) as i64 - 1) * limit as i64;

        let total: i64 = conn.query_row(
            r#"
            SELECT COUNT(DISTINCT video_ref) FROM flag_records
            WHERE status = 'active' AND (?1 IS NULL OR severity = ?1)
            "#,
            params![severity],
            |r| r.get(0),
        )?;

        let mut stmt = conn.prepare(
            r#"
            SELECT video_ref, MAX(flagged_at) AS last_flagged_at
            FROM flag_records
            WHERE status = 'active' AND (?1 IS NULL OR severity = ?1)
            GROUP BY video_ref
            ORDER BY last_flagged_at DESC, video_ref DESC
            LIMIT ?2 OFFSET ?3
            "#,
        )?;
        let refs = stmt
            .query_map(params![severity, limit as i64, offset], |r| r.get::<_, i64>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut videos = Vec::with_capacity(refs.len());
        for video_ref in refs {
            if let Some(video) = Self::video_by_ref(&conn, video_ref)? {
                videos.push(video);
            }
        }

        Ok(Page {
            items: videos,
            page: page.max(1),
            limit,
            total: total.max(0) as u64,
        })
    }

    // ============================================
    // Watch history operations
    // ============================================

    fn insert_watch_entry(conn: &Connection, entry: &WatchHistoryEntry) -> Result<()> {
        conn.execute(
            r#"
            INSERT INTO watch_history (id, user_id, video_ref, youtube_video_id, watch_duration,
                                       video_duration, completion_percentage, watched_at,
                                       session_id, source)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                entry.id,
                entry.user_id,
                entry.video_ref,
                entry.youtube_video_id,
                entry.watch_duration,
                entry.video_duration,
                entry.completion_percentage,
                ts(&entry.watched_at),
                entry.session_id,
                entry.source.as_str(),
            ],
        )?;
        Ok(())
    }

    /// Paginated watch history, newest first.
    ///
    /// The category filter is applied in the query, so `total` and the page
    /// contents agree.
    pub fn watch_history(&self, user_id: &str, query: &HistoryQuery) -> Result<Page<ResolvedWatch>> {
        let conn = self.conn.lock().unwrap();
        let start = query.start.as_ref().map(ts);
        let end = query.end.as_ref().map(ts);
        let category = query.category.map(|c| c.as_str());

        let filter = r#"
            FROM watch_history w
            LEFT JOIN videos v ON v.id = w.video_ref
            WHERE w.user_id = ?1
              AND (?2 IS NULL OR w.watched_at >= ?2)
              AND (?3 IS NULL OR w.watched_at <= ?3)
              AND (?4 IS NULL OR v.category = ?4)
        "#;

        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) {}", filter),
            params![user_id, start, end, category],
            |r| r.get(0),
        )?;

        let mut stmt = conn.prepare(&format!(
            "SELECT w.* {} ORDER BY w.watched_at DESC, w.id ASC LIMIT ?5 OFFSET ?6",
            filter
        ))?;
        let entries = stmt
            .query_map(
                params![user_id, start, end, category, query.limit as i64, query.offset()],
                Self::row_to_watch_entry,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Page {
            items: Self::resolve_entries(&conn, entries)?,
            page: query.page.max(1),
            limit: query.limit,
            total: total.max(0) as u64,
        })
    }

    /// Join entries with their videos, loading each distinct video once.
    fn resolve_entries(
        conn: &Connection,
        entries: Vec<WatchHistoryEntry>,
    ) -> Result<Vec<ResolvedWatch>> {
        let mut videos: HashMap<i64, Option<Video>> = HashMap::new();
        let mut resolved = Vec::with_capacity(entries.len());

        for entry in entries {
            let video = match videos.get(&entry.video_ref) {
                Some(video) => video.clone(),
                None => {
                    let video = Self::video_by_ref(conn, entry.video_ref)?;
                    videos.insert(entry.video_ref, video.clone());
                    video
                }
            };
            resolved.push(ResolvedWatch { entry, video });
        }

        Ok(resolved)
    }

    /// Build a watch entry from its row, recomputing the completion percentage.
    fn row_to_watch_entry(row: &Row) -> rusqlite::Result<WatchHistoryEntry> {
        let watch_duration: i64 = row.get("watch_duration")?;
        let video_duration: i64 = row.get("video_duration")?;
        let watched_at_str: String = row.get("watched_at")?;
        let source_str: String = row.get("source")?;

        let mut entry = WatchHistoryEntry {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            video_ref: row.get("video_ref")?,
            youtube_video_id: row.get("youtube_video_id")?,
            watch_duration: 0,
            video_duration: 1,
            completion_percentage: 0,
            watched_at: parse_ts(&watched_at_str),
            session_id: row.get("session_id")?,
            source: source_str.parse().unwrap_or_default(),
        };
        entry.set_durations(
            watch_duration.clamp(0, u32::MAX as i64) as u32,
            video_duration.clamp(0, u32::MAX as i64) as u32,
        );
        Ok(entry)
    }
}

impl super::WatchStore for Database {
    fn find_video_by_external_id(&self, video_id: &str) -> Result<Option<Video>> {
        let conn = self.conn.lock().unwrap();
        Self::video_by_external_id(&conn, video_id)
    }

    fn find_watch_entries(
        &self,
        user_id: &str,
        window: &TimeWindow,
    ) -> Result<Vec<ResolvedWatch>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            r#"
            SELECT * FROM watch_history
            WHERE user_id = ?1 AND watched_at >= ?2 AND watched_at <= ?3
            ORDER BY watched_at ASC, id ASC
            "#,
        )?;
        let entries = stmt
            .query_map(
                params![user_id, ts(&window.start), ts(&window.end)],
                Self::row_to_watch_entry,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Self::resolve_entries(&conn, entries)
    }

    fn recent_watch_entries(&self, user_id: &str, limit: usize) -> Result<Vec<ResolvedWatch>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT * FROM watch_history WHERE user_id = ? ORDER BY watched_at DESC, id ASC LIMIT ?",
        )?;
        let entries = stmt
            .query_map(params![user_id, limit as i64], Self::row_to_watch_entry)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Self::resolve_entries(&conn, entries)
    }

    fn upsert_video_classification(
        &self,
        video_id: &str,
        result: &ClassificationResult,
    ) -> Result<Video> {
        let now = Utc::now();
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let video_ref = Self::video_ref_for(&tx, video_id)?;
        tx.execute(
            r#"
            UPDATE videos SET
                category = ?2,
                age_rating = ?3,
                confidence = ?4,
                keywords_version = ?5,
                processed_at = ?6,
                updated_at = ?6
            WHERE id = ?1
            "#,
            params![
                video_ref,
                result.category.as_str(),
                result.age_rating.as_str(),
                result.confidence,
                result.keywords_version,
                ts(&now),
            ],
        )?;

        // Classifier records the new result no longer detects are resolved;
        // user reports are left alone.
        let stamp = ts(&now);
        for record in Self::flag_records_for(&tx, video_ref)? {
            if record.is_active()
                && record.flagged_by == FlaggedBy::Classifier
                && !result.flags.contains(&record.flag)
            {
                tx.execute(
                    "UPDATE flag_records SET status = 'resolved', resolved_at = ?2 WHERE id = ?1",
                    params![record.id, stamp],
                )?;
            }
        }

        let active = Classification::active_flags(&Self::flag_records_for(&tx, video_ref)?);
        for flag in result.flags.iter().filter(|f| !active.contains(*f)) {
            Self::insert_flag_record(&tx, video_ref, &NewFlagRecord::detected(*flag))?;
        }

        let video = Self::video_by_ref(&tx, video_ref)?
            .ok_or_else(|| Error::VideoNotFound(video_id.to_string()))?;
        tx.commit()?;

        tracing::debug!(video_id, category = %result.category, "Updated classification");
        Ok(video)
    }

    fn append_watch_entry(&self, entry: &WatchHistoryEntry) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        Self::insert_watch_entry(&conn, entry)
    }

    fn insert_watch_entries_batch(&self, entries: &[WatchHistoryEntry]) -> Result<usize> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        for entry in entries {
            Self::insert_watch_entry(&tx, entry)?;
        }

        tx.commit()?;
        Ok(entries.len())
    }

    fn append_flag_record(&self, video_id: &str, record: &NewFlagRecord) -> Result<FlagRecord> {
        let conn = self.conn.lock().unwrap();
        let video_ref = Self::video_ref_for(&conn, video_id)?;
        Self::insert_flag_record(&conn, video_ref, record)
    }

    fn resolve_flag_records(
        &self,
        video_id: &str,
        predicate: &dyn Fn(&FlagRecord) -> bool,
    ) -> Result<usize> {
        let now = ts(&Utc::now());
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let video_ref = Self::video_ref_for(&tx, video_id)?;
        let mut resolved = 0;
        for record in Self::flag_records_for(&tx, video_ref)? {
            if record.is_active() && predicate(&record) {
                tx.execute(
                    "UPDATE flag_records SET status = 'resolved', resolved_at = ?2 WHERE id = ?1",
                    params![record.id, now],
                )?;
                resolved += 1;
            }
        }

        tx.commit()?;
        Ok(resolved)
    }

    fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT * FROM users WHERE id = ?",
            [user_id],
            Self::row_to_user,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_children(&self, parent_id: &str) -> Result<Vec<User>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT * FROM users WHERE parent_id = ? ORDER BY created_at ASC, id ASC")?;
        let users = stmt
            .query_map([parent_id], Self::row_to_user)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{classify, KeywordTables};
    use crate::db::WatchStore;
    use chrono::{Duration, TimeZone};

    fn test_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        db
    }

    fn create_test_details(video_id: &str, channel: &str, title: &str) -> VideoDetails {
        VideoDetails {
            video_id: video_id.to_string(),
            title: title.to_string(),
            description: String::new(),
            channel_id: format!("UC-{}", channel),
            channel_title: channel.to_string(),
            duration: "PT10M".to_string(),
            duration_seconds: None,
            tags: vec!["test".to_string()],
            view_count: 42,
            published_at: None,
        }
    }

    fn store_video(db: &Database, video_id: &str, title: &str) -> Video {
        let details = create_test_details(video_id, "chan", title);
        let result = classify(&details.title, &details.description, &details.tags);
        db.insert_video(&details, &result).unwrap()
    }

    fn create_test_user(id: &str, role: UserRole, parent_id: Option<&str>) -> User {
        User {
            id: id.to_string(),
            name: id.to_uppercase(),
            email: None,
            role,
            parent_id: parent_id.map(str::to_string),
            daily_goals: DailyGoals::default(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_insert_and_find_video() {
        let db = test_db();
        let video = store_video(&db, "abcdefghijk", "Python programming tutorial");

        assert_eq!(video.duration_seconds, 600);
        assert_eq!(video.classification.category, Category::Educational);
        assert!(video.classification.flagged.is_empty());

        let found = db.find_video_by_external_id("abcdefghijk").unwrap().unwrap();
        assert_eq!(found.id, video.id);
        assert_eq!(found.tags, vec!["test".to_string()]);
        assert_eq!(found.view_count, 42);
        assert!(db.find_video_by_external_id("missing").unwrap().is_none());
        assert_eq!(db.count_videos().unwrap(), 1);
    }

    #[test]
    fn test_detected_flags_become_classifier_records() {
        let db = test_db();
        let video = store_video(&db, "fightvideo1", "Epic fight with profanity");

        let c = &video.classification;
        assert!(c.flags.contains(&ContentFlag::Violence));
        assert!(c.flags.contains(&ContentFlag::Language));
        assert_eq!(c.flagged.len(), 2);
        assert!(c.flagged.iter().all(|r| r.flagged_by == FlaggedBy::Classifier));
        assert_eq!(c.flagged[0].severity, FlagSeverity::High);
    }

    #[test]
    fn test_corrective_upsert_does_not_duplicate_active_flags() {
        let db = test_db();
        store_video(&db, "fightvideo1", "Epic fight");

        let mut result = classify("Epic fight", "", &[]);
        result.category = Category::News;
        let video = db.upsert_video_classification("fightvideo1", &result).unwrap();

        assert_eq!(video.classification.category, Category::News);
        assert_eq!(video.classification.flagged.len(), 1);

        let err = db.upsert_video_classification("missing", &result).unwrap_err();
        assert!(matches!(err, Error::VideoNotFound(_)));
    }

    #[test]
    fn test_corrective_upsert_resolves_stale_classifier_flags() {
        let db = test_db();
        store_video(&db, "battlevid01", "Epic battle tutorial");
        db.append_flag_record(
            "battlevid01",
            &NewFlagRecord::user_report("parent-1", "too loud", FlagSeverity::Low),
        )
        .unwrap();

        let mut tables = KeywordTables::builtin();
        tables.flags.violence = vec!["zzz".to_string()];
        let result = tables.classify("Epic battle tutorial", "", &[]);
        assert!(result.flags.is_empty());

        let video = db.upsert_video_classification("battlevid01", &result).unwrap();
        let c = &video.classification;
        assert_eq!(c.flags.len(), 1);
        assert!(c.flags.contains(&ContentFlag::Inappropriate));
        assert_eq!(c.flagged.len(), 2);

        let classifier = c
            .flagged
            .iter()
            .find(|r| r.flagged_by == FlaggedBy::Classifier)
            .unwrap();
        assert_eq!(classifier.flag, ContentFlag::Violence);
        assert_eq!(classifier.status, FlagStatus::Resolved);
        assert!(classifier.resolved_at.is_some());

        let report = c
            .flagged
            .iter()
            .find(|r| r.flagged_by.user_id() == Some("parent-1"))
            .unwrap();
        assert!(report.is_active());

        // detecting it again raises a fresh classifier record
        let video = db
            .upsert_video_classification("battlevid01", &classify("Epic battle tutorial", "", &[]))
            .unwrap();
        assert!(video.classification.flags.contains(&ContentFlag::Violence));
        assert_eq!(video.classification.flagged.len(), 3);
    }

    #[test]
    fn test_flag_lifecycle() {
        let db = test_db();
        store_video(&db, "cleanvideo1", "Relaxing piano music");

        let record = NewFlagRecord::user_report("parent-1", "scary ending", FlagSeverity::High);
        let stored = db.append_flag_record("cleanvideo1", &record).unwrap();
        assert!(stored.is_active());

        let video = db.find_video_by_external_id("cleanvideo1").unwrap().unwrap();
        assert!(video.classification.flags.contains(&ContentFlag::Inappropriate));

        let resolved = db
            .resolve_flag_records("cleanvideo1", &|r| r.flagged_by.user_id() == Some("parent-1"))
            .unwrap();
        assert_eq!(resolved, 1);

        let video = db.find_video_by_external_id("cleanvideo1").unwrap().unwrap();
        assert!(video.classification.flags.is_empty());
        assert_eq!(video.classification.flagged.len(), 1);
        assert_eq!(video.classification.flagged[0].status, FlagStatus::Resolved);
        assert!(video.classification.flagged[0].resolved_at.is_some());

        // already resolved records are not counted again
        let resolved = db.resolve_flag_records("cleanvideo1", &|_| true).unwrap();
        assert_eq!(resolved, 0);
    }

    #[test]
    fn test_watch_entries_window_is_inclusive() {
        let db = test_db();
        let video = store_video(&db, "abcdefghijk", "Python programming tutorial");
        let start = Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap();
        let window = TimeWindow::new(start, start + Duration::days(1) - Duration::milliseconds(1))
            .unwrap();

        let inside = [window.start, window.end, start + Duration::hours(5)];
        let outside = [start - Duration::milliseconds(1), start + Duration::days(1)];
        let entries: Vec<_> = inside
            .iter()
            .chain(outside.iter())
            .map(|at| WatchHistoryEntry::new("u1", video.id, &video.video_id, 60, 600, *at))
            .collect();
        assert_eq!(db.insert_watch_entries_batch(&entries).unwrap(), 5);

        let found = db.find_watch_entries("u1", &window).unwrap();
        assert_eq!(found.len(), 3);
        assert!(found.windows(2).all(|w| w[0].entry.watched_at <= w[1].entry.watched_at));
        assert!(found.iter().all(|r| r.video.is_some()));
        assert!(db.find_watch_entries("u2", &window).unwrap().is_empty());
    }

    #[test]
    fn test_unresolved_video_is_tolerated() {
        let db = test_db();
        let entry = WatchHistoryEntry::new("u1", 9999, "gonegonegon", 120, 240, Utc::now());
        db.append_watch_entry(&entry).unwrap();

        let recent = db.recent_watch_entries("u1", 10).unwrap();
        assert_eq!(recent.len(), 1);
        assert!(recent[0].video.is_none());
        assert_eq!(recent[0].entry.completion_percentage, 50);
    }

    #[test]
    fn test_completion_recomputed_on_read() {
        let db = test_db();
        let entry = WatchHistoryEntry::new("u1", 1, "abcdefghijk", 540, 600, Utc::now());
        db.append_watch_entry(&entry).unwrap();
        {
            let conn = db.conn.lock().unwrap();
            conn.execute("UPDATE watch_history SET completion_percentage = 7", [])
                .unwrap();
        }
        let recent = db.recent_watch_entries("u1", 1).unwrap();
        assert_eq!(recent[0].entry.completion_percentage, 90);
    }

    #[test]
    fn test_watch_history_pagination_and_category_filter() {
        let db = test_db();
        let edu = store_video(&db, "eduvideo001", "Python programming tutorial");
        let fun = store_video(&db, "funvideo001", "Funny prank comedy");
        let base = Utc::now() - Duration::hours(10);

        let entries: Vec<_> = (0..5)
            .map(|i| {
                let video = if i % 2 == 0 { &edu } else { &fun };
                WatchHistoryEntry::new(
                    "u1",
                    video.id,
                    &video.video_id,
                    60,
                    600,
                    base + Duration::minutes(i),
                )
            })
            .collect();
        db.insert_watch_entries_batch(&entries).unwrap();

        let page = db
            .watch_history(
                "u1",
                &HistoryQuery {
                    limit: 2,
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.pages(), 3);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].entry.watched_at, entries[4].watched_at);

        let page = db
            .watch_history(
                "u1",
                &HistoryQuery {
                    category: Some(Category::Educational),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(page.total, 3);
        assert!(page.items.iter().all(|r| r.entry.video_ref == edu.id));

        let page = db
            .watch_history(
                "u1",
                &HistoryQuery {
                    start: Some(base + Duration::minutes(3)),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(page.total, 2);
    }

    #[test]
    fn test_list_flagged_videos_with_severity() {
        let db = test_db();
        store_video(&db, "cleanvideo1", "Relaxing piano music");
        store_video(&db, "cleanvideo2", "Morning routine vlog");
        store_video(&db, "cleanvideo3", "Cooking pasta");

        db.append_flag_record(
            "cleanvideo1",
            &NewFlagRecord::user_report("u1", "bad", FlagSeverity::Low),
        )
        .unwrap();
        db.append_flag_record(
            "cleanvideo2",
            &NewFlagRecord::user_report("u1", "worse", FlagSeverity::High),
        )
        .unwrap();

        let all = db.list_flagged_videos(None, 1, 20).unwrap();
        assert_eq!(all.total, 2);
        assert_eq!(all.items[0].video_id, "cleanvideo2");

        let high = db.list_flagged_videos(Some(FlagSeverity::High), 1, 20).unwrap();
        assert_eq!(high.total, 1);
        assert_eq!(high.items[0].video_id, "cleanvideo2");

        db.resolve_flag_records("cleanvideo2", &|_| true).unwrap();
        let all = db.list_flagged_videos(None, 1, 20).unwrap();
        assert_eq!(all.total, 1);
        assert_eq!(all.items[0].video_id, "cleanvideo1");
    }

    #[test]
    fn test_goals_rejected_when_negative_or_nan() {
        let db = test_db();
        db.upsert_user(&create_test_user("u1", UserRole::User, None)).unwrap();

        for bad in [
            DailyGoals {
                educational: -1.0,
                ..Default::default()
            },
            DailyGoals {
                total: f64::NAN,
                ..Default::default()
            },
            DailyGoals {
                entertainment: f64::INFINITY,
                ..Default::default()
            },
        ] {
            let err = db.set_daily_goals("u1", &bad).unwrap_err();
            assert!(matches!(err, Error::Validation(_)));
        }

        let mut user = create_test_user("u2", UserRole::User, None);
        user.daily_goals.educational = f64::NAN;
        assert!(matches!(db.upsert_user(&user), Err(Error::Validation(_))));
        assert!(db.get_user("u2").unwrap().is_none());

        let stored = db.get_user("u1").unwrap().unwrap();
        assert_eq!(stored.daily_goals, DailyGoals::default());

        let zero = DailyGoals {
            educational: 0.0,
            ..Default::default()
        };
        db.set_daily_goals("u1", &zero).unwrap();
        assert_eq!(db.get_user("u1").unwrap().unwrap().daily_goals, zero);
    }

    #[test]
    fn test_users_and_children() {
        let db = test_db();
        db.upsert_user(&create_test_user("parent", UserRole::Parent, None))
            .unwrap();
        db.upsert_user(&create_test_user("kid-a", UserRole::Child, Some("parent")))
            .unwrap();
        db.upsert_user(&create_test_user("kid-b", UserRole::Child, Some("parent")))
            .unwrap();

        let parent = db.get_user("parent").unwrap().unwrap();
        assert_eq!(parent.role, UserRole::Parent);
        assert_eq!(parent.daily_goals, DailyGoals::default());

        let children = db.list_children("parent").unwrap();
        assert_eq!(children.len(), 2);
        assert!(db.get_user("nobody").unwrap().is_none());

        let goals = DailyGoals {
            educational: 30.0,
            ..Default::default()
        };
        db.set_daily_goals("kid-a", &goals).unwrap();
        assert_eq!(db.get_user("kid-a").unwrap().unwrap().daily_goals, goals);
        assert!(matches!(
            db.set_daily_goals("nobody", &goals),
            Err(Error::UserNotFound(_))
        ));
    }
}
