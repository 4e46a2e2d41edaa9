//! Core domain types for watchlens
//!
//! These types represent the canonical data model shared by the classifier,
//! the storage layer and the analytics engine.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Video** | A YouTube video, identified by its external 11-character id |
//! | **Classification** | Category, age rating, confidence and flags assigned to a video |
//! | **FlagRecord** | One append-only report that a video contains concerning content |
//! | **WatchHistoryEntry** | One watch event by a user; `watched_at` partitions all aggregation |
//! | **User** | An account with daily watch-time goals, optionally linked to a parent |
//!
//! ### Flags vs flag records
//!
//! [`Classification::flags`] is never stored on its own. It is always the set of
//! [`ContentFlag`]s carried by the [`FlagRecord`]s whose status is
//! [`FlagStatus::Active`]. Resolving every active record therefore empties the
//! set while the records themselves stay in the history.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::{Error, Result};

// ============================================
// Category
// ============================================

/// Coarse content category of a video.
///
/// Declaration order matters: the classifier breaks score ties in favour of
/// the category declared first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Educational,
    Entertainment,
    Gaming,
    Music,
    News,
    Vlogs,
}

impl Category {
    /// Every category in declaration order.
    pub const ALL: [Category; 6] = [
        Category::Educational,
        Category::Entertainment,
        Category::Gaming,
        Category::Music,
        Category::News,
        Category::Vlogs,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Educational => "Educational",
            Category::Entertainment => "Entertainment",
            Category::Gaming => "Gaming",
            Category::Music => "Music",
            Category::News => "News",
            Category::Vlogs => "Vlogs",
        }
    }

    /// Whether minutes in this category count towards the productivity score.
    ///
    /// News is grouped with Educational here, while staying a separate
    /// category in raw per-category minutes.
    pub fn is_productive(&self) -> bool {
        matches!(self, Category::Educational | Category::News)
    }

    /// Position in declaration order, used for fixed-size buckets.
    pub fn index(&self) -> usize {
        match self {
            Category::Educational => 0,
            Category::Entertainment => 1,
            Category::Gaming => 2,
            Category::Music => 3,
            Category::News => 4,
            Category::Vlogs => 5,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown category: {}", s))
    }
}

// ============================================
// Age rating
// ============================================

/// Audience age rating assigned by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AgeRating {
    #[serde(rename = "All Ages")]
    AllAges,
    #[serde(rename = "7+")]
    SevenPlus,
    #[serde(rename = "13+")]
    ThirteenPlus,
    #[serde(rename = "18+")]
    EighteenPlus,
}

impl AgeRating {
    /// Every rating, mildest first.
    pub const ALL: [AgeRating; 4] = [
        AgeRating::AllAges,
        AgeRating::SevenPlus,
        AgeRating::ThirteenPlus,
        AgeRating::EighteenPlus,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgeRating::AllAges => "All Ages",
            AgeRating::SevenPlus => "7+",
            AgeRating::ThirteenPlus => "13+",
            AgeRating::EighteenPlus => "18+",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            AgeRating::AllAges => 0,
            AgeRating::SevenPlus => 1,
            AgeRating::ThirteenPlus => 2,
            AgeRating::EighteenPlus => 3,
        }
    }
}

impl std::fmt::Display for AgeRating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AgeRating {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "All Ages" | "all_ages" => Ok(AgeRating::AllAges),
            "7+" => Ok(AgeRating::SevenPlus),
            "13+" => Ok(AgeRating::ThirteenPlus),
            "18+" => Ok(AgeRating::EighteenPlus),
            _ => Err(format!("unknown age rating: {}", s)),
        }
    }
}

// ============================================
// Flags
// ============================================

/// Kind of concerning content a video may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentFlag {
    Violence,
    Language,
    AdultContent,
    Inappropriate,
}

impl ContentFlag {
    pub const ALL: [ContentFlag; 4] = [
        ContentFlag::Violence,
        ContentFlag::Language,
        ContentFlag::AdultContent,
        ContentFlag::Inappropriate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentFlag::Violence => "violence",
            ContentFlag::Language => "language",
            ContentFlag::AdultContent => "adult_content",
            ContentFlag::Inappropriate => "inappropriate",
        }
    }
}

impl std::fmt::Display for ContentFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ContentFlag {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        ContentFlag::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| format!("unknown content flag: {}", s))
    }
}

/// Severity of a flag record or of a derived flagged-content item.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum FlagSeverity {
    Low,
    #[default]
    Medium,
    High,
}

impl FlagSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlagSeverity::Low => "low",
            FlagSeverity::Medium => "medium",
            FlagSeverity::High => "high",
        }
    }

    /// Severity derived from a set of flags by keyword priority.
    ///
    /// Violence or adult content is high; language or inappropriate is
    /// medium; anything else is low.
    pub fn from_flags<'a>(flags: impl IntoIterator<Item = &'a ContentFlag>) -> Self {
        let mut severity = FlagSeverity::Low;
        for flag in flags {
            match flag {
                ContentFlag::Violence | ContentFlag::AdultContent => return FlagSeverity::High,
                ContentFlag::Language | ContentFlag::Inappropriate => {
                    severity = FlagSeverity::Medium
                }
            }
        }
        severity
    }
}

impl std::fmt::Display for FlagSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FlagSeverity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "low" => Ok(FlagSeverity::Low),
            "medium" => Ok(FlagSeverity::Medium),
            "high" => Ok(FlagSeverity::High),
            _ => Err(format!("unknown severity: {}", s)),
        }
    }
}

/// Lifecycle status of a flag record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagStatus {
    Active,
    Resolved,
}

impl FlagStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlagStatus::Active => "active",
            FlagStatus::Resolved => "resolved",
        }
    }
}

impl std::str::FromStr for FlagStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "active" => Ok(FlagStatus::Active),
            "resolved" => Ok(FlagStatus::Resolved),
            _ => Err(format!("unknown flag status: {}", s)),
        }
    }
}

/// Who raised a flag record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlaggedBy {
    /// A user report
    User(String),
    /// Keyword detection at ingestion time
    Classifier,
}

impl FlaggedBy {
    pub fn user_id(&self) -> Option<&str> {
        match self {
            FlaggedBy::User(id) => Some(id),
            FlaggedBy::Classifier => None,
        }
    }
}

/// One append-only report against a video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlagRecord {
    /// Row id
    pub id: i64,
    pub flagged_by: FlaggedBy,
    /// Content flag this record reports
    pub flag: ContentFlag,
    /// Free-text reason
    pub reason: String,
    /// Severity supplied when the record was created
    pub severity: FlagSeverity,
    pub flagged_at: DateTime<Utc>,
    pub status: FlagStatus,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl FlagRecord {
    pub fn is_active(&self) -> bool {
        self.status == FlagStatus::Active
    }
}

/// A flag record that has not been stored yet.
#[derive(Debug, Clone)]
pub struct NewFlagRecord {
    pub flagged_by: FlaggedBy,
    pub flag: ContentFlag,
    pub reason: String,
    pub severity: FlagSeverity,
    pub flagged_at: DateTime<Utc>,
}

impl NewFlagRecord {
    /// A user report. User reports always carry the `inappropriate` flag.
    pub fn user_report(user_id: &str, reason: &str, severity: FlagSeverity) -> Self {
        Self {
            flagged_by: FlaggedBy::User(user_id.to_string()),
            flag: ContentFlag::Inappropriate,
            reason: reason.to_string(),
            severity,
            flagged_at: Utc::now(),
        }
    }

    /// A record for a flag the keyword classifier detected.
    pub fn detected(flag: ContentFlag) -> Self {
        Self {
            flagged_by: FlaggedBy::Classifier,
            flag,
            reason: format!("keyword match: {}", flag),
            severity: FlagSeverity::from_flags([&flag]),
            flagged_at: Utc::now(),
        }
    }
}

// ============================================
// Classification
// ============================================

/// Classification embedded in a [`Video`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    pub category: Category,
    pub age_rating: AgeRating,
    /// Confidence in [0, 1]
    pub confidence: f64,
    /// Flags carried by active records (derived, see module docs)
    pub flags: BTreeSet<ContentFlag>,
    /// Full flag history, oldest first
    pub flagged: Vec<FlagRecord>,
    pub processed_at: DateTime<Utc>,
}

impl Classification {
    /// Build a classification, deriving `flags` from the active records.
    pub fn new(
        category: Category,
        age_rating: AgeRating,
        confidence: f64,
        flagged: Vec<FlagRecord>,
        processed_at: DateTime<Utc>,
    ) -> Self {
        let flags = Self::active_flags(&flagged);
        Self {
            category,
            age_rating,
            confidence: confidence.clamp(0.0, 1.0),
            flags,
            flagged,
            processed_at,
        }
    }

    /// Set of flags carried by active records.
    pub fn active_flags(records: &[FlagRecord]) -> BTreeSet<ContentFlag> {
        records
            .iter()
            .filter(|r| r.is_active())
            .map(|r| r.flag)
            .collect()
    }

    pub fn is_flagged(&self) -> bool {
        !self.flags.is_empty()
    }

    /// Most recently created record, if any.
    pub fn latest_record(&self) -> Option<&FlagRecord> {
        self.flagged.last()
    }
}

// ============================================
// Video
// ============================================

/// Video metadata as delivered by the fetch collaborator, before storage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoDetails {
    pub video_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub channel_id: String,
    pub channel_title: String,
    /// ISO-8601 duration (e.g. `PT4M13S`)
    pub duration: String,
    /// Seconds; recomputed from `duration` when absent
    #[serde(default)]
    pub duration_seconds: Option<u32>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub view_count: u64,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

impl VideoDetails {
    /// Duration in seconds, parsed from `duration` if not given or zero.
    pub fn resolved_duration_seconds(&self) -> u32 {
        match self.duration_seconds {
            Some(secs) if secs > 0 => secs,
            _ => crate::format::parse_iso_duration(&self.duration),
        }
    }
}

/// A stored video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Video {
    /// Internal row id
    pub id: i64,
    /// External YouTube id
    pub video_id: String,
    pub title: String,
    pub description: String,
    pub channel_id: String,
    pub channel_title: String,
    pub duration: String,
    pub duration_seconds: u32,
    pub tags: Vec<String>,
    pub view_count: u64,
    pub published_at: Option<DateTime<Utc>>,
    pub classification: Classification,
    /// Version of the keyword tables that produced `classification`
    pub keywords_version: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Video {
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.video_id)
    }
}

// ============================================
// Watch history
// ============================================

/// Where a watch event was logged from (informational only).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchSource {
    ChromeExtension,
    MobileApp,
    #[default]
    WebApp,
}

impl WatchSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            WatchSource::ChromeExtension => "chrome_extension",
            WatchSource::MobileApp => "mobile_app",
            WatchSource::WebApp => "web_app",
        }
    }
}

impl std::str::FromStr for WatchSource {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "chrome_extension" => Ok(WatchSource::ChromeExtension),
            "mobile_app" => Ok(WatchSource::MobileApp),
            "web_app" => Ok(WatchSource::WebApp),
            _ => Err(format!("unknown watch source: {}", s)),
        }
    }
}

/// Completion percentage: `clamp(round(watch / video * 100), 0, 100)`.
///
/// A zero `video_duration` is treated as one second.
pub fn completion_percentage(watch_duration: u32, video_duration: u32) -> u8 {
    let video = video_duration.max(1) as f64;
    let pct = (watch_duration as f64 / video * 100.0).round();
    pct.clamp(0.0, 100.0) as u8
}

/// One watch event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchHistoryEntry {
    /// Generated id (UUID v4)
    pub id: String,
    pub user_id: String,
    /// Internal video row id
    pub video_ref: i64,
    /// External video id, duplicated to avoid a join on lookups
    pub youtube_video_id: String,
    /// Seconds actually watched
    pub watch_duration: u32,
    /// Seconds, at least 1
    pub video_duration: u32,
    /// Derived, see [`completion_percentage`]
    pub completion_percentage: u8,
    pub watched_at: DateTime<Utc>,
    pub session_id: String,
    pub source: WatchSource,
}

impl WatchHistoryEntry {
    /// Create an entry with a fresh id and derived completion percentage.
    pub fn new(
        user_id: &str,
        video_ref: i64,
        youtube_video_id: &str,
        watch_duration: u32,
        video_duration: u32,
        watched_at: DateTime<Utc>,
    ) -> Self {
        let video_duration = video_duration.max(1);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            video_ref,
            youtube_video_id: youtube_video_id.to_string(),
            watch_duration,
            video_duration,
            completion_percentage: completion_percentage(watch_duration, video_duration),
            watched_at,
            session_id: uuid::Uuid::new_v4().to_string(),
            source: WatchSource::default(),
        }
    }

    pub fn with_source(mut self, source: WatchSource) -> Self {
        self.source = source;
        self
    }

    /// Update both durations and recompute the completion percentage.
    pub fn set_durations(&mut self, watch_duration: u32, video_duration: u32) {
        self.watch_duration = watch_duration;
        self.video_duration = video_duration.max(1);
        self.completion_percentage = completion_percentage(self.watch_duration, self.video_duration);
    }

    pub fn watch_minutes(&self) -> f64 {
        self.watch_duration as f64 / 60.0
    }

    /// Watch time as `m:ss`.
    pub fn formatted_watch_time(&self) -> String {
        crate::format::format_watch_time(self.watch_duration)
    }
}

/// A watch entry joined with its video, if the reference still resolves.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedWatch {
    pub entry: WatchHistoryEntry,
    pub video: Option<Video>,
}

// ============================================
// Users and goals
// ============================================

/// Account role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[default]
    User,
    Parent,
    Child,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Parent => "parent",
            UserRole::Child => "child",
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "user" => Ok(UserRole::User),
            "parent" => Ok(UserRole::Parent),
            "child" => Ok(UserRole::Child),
            _ => Err(format!("unknown role: {}", s)),
        }
    }
}

/// Daily watch-time goals, in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyGoals {
    #[serde(default = "default_educational_goal")]
    pub educational: f64,
    #[serde(default = "default_entertainment_goal")]
    pub entertainment: f64,
    #[serde(default = "default_total_goal")]
    pub total: f64,
}

impl Default for DailyGoals {
    fn default() -> Self {
        Self {
            educational: default_educational_goal(),
            entertainment: default_entertainment_goal(),
            total: default_total_goal(),
        }
    }
}

impl DailyGoals {
    /// Reject negative or non-finite targets.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("educational", self.educational),
            ("entertainment", self.entertainment),
            ("total", self.total),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::Validation(format!(
                    "{} goal must be a non-negative number of minutes, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

fn default_educational_goal() -> f64 {
    60.0
}

fn default_entertainment_goal() -> f64 {
    120.0
}

fn default_total_goal() -> f64 {
    180.0
}

/// A user account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub role: UserRole,
    pub parent_id: Option<String>,
    pub daily_goals: DailyGoals,
    pub created_at: DateTime<Utc>,
}

// ============================================
// Time windows
// ============================================

/// Inclusive time range `[start, end]` over `watched_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Create a window, rejecting an end before the start.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if end < start {
            return Err(Error::Validation(format!(
                "time window ends ({}) before it starts ({})",
                end.to_rfc3339(),
                start.to_rfc3339()
            )));
        }
        Ok(Self { start, end })
    }

    /// `[00:00:00.000, 23:59:59.999]` of a calendar day at a fixed offset.
    pub fn for_day(day: NaiveDate, offset: FixedOffset) -> Self {
        let local_midnight = day.and_time(NaiveTime::MIN);
        let start =
            (local_midnight - Duration::seconds(offset.local_minus_utc() as i64)).and_utc();
        let end = start + Duration::days(1) - Duration::milliseconds(1);
        Self { start, end }
    }

    /// The last `days` days ending at `now`.
    pub fn last_days(days: u32, now: DateTime<Utc>) -> Self {
        Self {
            start: now - Duration::days(days as i64),
            end: now,
        }
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts <= self.end
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{} .. {}]",
            self.start.to_rfc3339(),
            self.end.to_rfc3339()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_completion_percentage_invariant() {
        for (watch, video) in [(540, 600), (0, 600), (700, 600), (1, 3), (2, 3), (5, 0)] {
            let expected = ((watch as f64 / video.max(1) as f64) * 100.0)
                .round()
                .clamp(0.0, 100.0) as u8;
            assert_eq!(completion_percentage(watch, video), expected);
        }
        assert_eq!(completion_percentage(540, 600), 90);
        assert_eq!(completion_percentage(700, 600), 100);
    }

    #[test]
    fn test_set_durations_recomputes_completion() {
        let mut entry = WatchHistoryEntry::new("u1", 1, "dQw4w9WgXcQ", 60, 120, Utc::now());
        assert_eq!(entry.completion_percentage, 50);
        entry.set_durations(120, 0);
        assert_eq!(entry.video_duration, 1);
        assert_eq!(entry.completion_percentage, 100);
    }

    #[test]
    fn test_category_order_and_parse() {
        assert_eq!(Category::ALL[0], Category::Educational);
        assert_eq!("gaming".parse::<Category>().unwrap(), Category::Gaming);
        assert!(Category::News.is_productive());
        assert!(!Category::Vlogs.is_productive());
        for (i, c) in Category::ALL.iter().enumerate() {
            assert_eq!(c.index(), i);
        }
    }

    #[test]
    fn test_age_rating_serde_names() {
        let json = serde_json::to_string(&AgeRating::ThirteenPlus).unwrap();
        assert_eq!(json, "\"13+\"");
        let parsed: AgeRating = serde_json::from_str("\"All Ages\"").unwrap();
        assert_eq!(parsed, AgeRating::AllAges);
    }

    #[test]
    fn test_severity_from_flags() {
        assert_eq!(FlagSeverity::from_flags(&[] as &[ContentFlag]), FlagSeverity::Low);
        assert_eq!(
            FlagSeverity::from_flags(&[ContentFlag::Language]),
            FlagSeverity::Medium
        );
        assert_eq!(
            FlagSeverity::from_flags(&[ContentFlag::Inappropriate, ContentFlag::AdultContent]),
            FlagSeverity::High
        );
    }

    #[test]
    fn test_classification_flags_follow_active_records() {
        let record = |flag, status| FlagRecord {
            id: 0,
            flagged_by: FlaggedBy::Classifier,
            flag,
            reason: String::new(),
            severity: FlagSeverity::Medium,
            flagged_at: Utc::now(),
            status,
            resolved_at: None,
        };
        let c = Classification::new(
            Category::Gaming,
            AgeRating::ThirteenPlus,
            0.5,
            vec![
                record(ContentFlag::Violence, FlagStatus::Resolved),
                record(ContentFlag::Language, FlagStatus::Active),
            ],
            Utc::now(),
        );
        assert_eq!(c.flags.len(), 1);
        assert!(c.flags.contains(&ContentFlag::Language));
    }

    #[test]
    fn test_time_window_validation() {
        let now = Utc::now();
        assert!(TimeWindow::new(now, now - Duration::seconds(1)).is_err());
        assert!(TimeWindow::new(now, now).is_ok());
    }

    #[test]
    fn test_day_window_respects_offset() {
        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let window = TimeWindow::for_day(day, offset);
        assert_eq!(
            window.start,
            Utc.with_ymd_and_hms(2024, 3, 9, 22, 0, 0).unwrap()
        );
        assert_eq!(
            window.end,
            Utc.with_ymd_and_hms(2024, 3, 10, 21, 59, 59).unwrap() + Duration::milliseconds(999)
        );
    }

    #[test]
    fn test_video_details_duration_fallback() {
        let details = VideoDetails {
            duration: "PT1H2M3S".to_string(),
            ..Default::default()
        };
        assert_eq!(details.resolved_duration_seconds(), 3723);

        let details = VideoDetails {
            duration: "PT1H".to_string(),
            duration_seconds: Some(42),
            ..Default::default()
        };
        assert_eq!(details.resolved_duration_seconds(), 42);
    }
}
