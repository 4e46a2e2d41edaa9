//! Analytics module for watchlens
//!
//! Derives time-bucketed metrics from watch history joined with video
//! classifications:
//! - Daily and weekly rollups ([`daily`])
//! - Goal progress, productivity series and trend ([`scoring`])
//! - Top channels and flagged content ([`ranking`])
//! - Dashboard and family report ([`dashboard`])
//!
//! Every entry point is read-then-compute: it queries the store through an
//! [`AnalyticsContext`] and aggregates the result in memory. Nothing is
//! cached between calls.

pub mod daily;
pub mod dashboard;
pub mod ranking;
pub mod scoring;

pub use daily::{
    aggregate_day, daily_analytics, weekly_analytics, AgeRatingMinutes,
    CategoryMinutes, DailyAnalytics, WeekdayAnalytics, WeeklyAnalytics,
};
pub use dashboard::{
    dashboard, family_report, Dashboard, FamilyMember, FamilyReport, FamilySummary,
    FAMILY_FLAGGED_DAYS, RECENT_HISTORY_LIMIT,
};
pub use ranking::{
    flagged_content, top_channels, ChannelStats, FlaggedContentItem, FlaggedContentReport,
    SeveritySummary,
};
pub use scoring::{
    achievements, goal_progress, productivity_report, trend, Achievement, AchievementKind, Goal,
    GoalProgress, GoalStatus, ProductivityDay, ProductivityReport, ProductivitySummary, Trend,
};

use std::fmt::Display;
use std::time::{Duration, Instant};

use crate::db::WatchStore;
use crate::error::{Error, Result};
use crate::types::{DailyGoals, ResolvedWatch, TimeWindow, User};

/// Point in time after which an analytics call gives up.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    timeout: Duration,
}

impl Deadline {
    /// Deadline `timeout` from now.
    pub fn after(timeout: Duration) -> Self {
        Self {
            started: Instant::now(),
            timeout,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.started.elapsed() >= self.timeout
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }
}

/// Request-scoped access to the store.
///
/// Carries the optional deadline, which is checked before every store
/// query. Store failures come back wrapped with the user and window.
pub struct AnalyticsContext<'a, S: WatchStore + ?Sized> {
    /// Read access to videos, watch history and users
    pub store: &'a S,
    deadline: Option<Deadline>,
    default_goals: DailyGoals,
}

impl<'a, S: WatchStore + ?Sized> AnalyticsContext<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            deadline: None,
            default_goals: DailyGoals::default(),
        }
    }

    /// Goals used for users without a stored record.
    pub fn with_default_goals(mut self, goals: DailyGoals) -> Self {
        self.default_goals = goals;
        self
    }

    pub fn default_goals(&self) -> &DailyGoals {
        &self.default_goals
    }

    pub fn with_deadline(mut self, deadline: Deadline) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Start a deadline of `timeout` now, or run without one for `None`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.deadline = timeout.map(Deadline::after);
        self
    }

    pub fn deadline(&self) -> Option<&Deadline> {
        self.deadline.as_ref()
    }

    fn check_deadline(&self, user_id: &str, window: &dyn Display) -> Result<()> {
        match &self.deadline {
            Some(deadline) if deadline.is_expired() => {
                tracing::warn!(user_id, %window, timeout_ms = deadline.timeout_ms(), "Analytics deadline expired");
                Err(Error::Timeout {
                    user_id: user_id.to_string(),
                    window: window.to_string(),
                    timeout_ms: deadline.timeout_ms(),
                })
            }
            _ => Ok(()),
        }
    }

    pub(crate) fn watch_entries(
        &self,
        user_id: &str,
        window: &TimeWindow,
    ) -> Result<Vec<ResolvedWatch>> {
        self.check_deadline(user_id, window)?;
        self.store
            .find_watch_entries(user_id, window)
            .map_err(|e| e.in_window(user_id, window))
    }

    pub(crate) fn recent_entries(&self, user_id: &str, limit: usize) -> Result<Vec<ResolvedWatch>> {
        let scope = format!("latest {}", limit);
        self.check_deadline(user_id, &scope)?;
        self.store
            .recent_watch_entries(user_id, limit)
            .map_err(|e| e.in_window(user_id, &scope))
    }

    pub(crate) fn user(&self, user_id: &str) -> Result<Option<User>> {
        self.check_deadline(user_id, &"user record")?;
        self.store
            .get_user(user_id)
            .map_err(|e| e.in_window(user_id, "user record"))
    }

    pub(crate) fn children(&self, parent_id: &str) -> Result<Vec<User>> {
        self.check_deadline(parent_id, &"children")?;
        self.store
            .list_children(parent_id)
            .map_err(|e| e.in_window(parent_id, "children"))
    }
}

/// Validate a look-back length in days.
pub(crate) fn check_days(days: u32, max: u32) -> Result<()> {
    if days == 0 || days > max {
        return Err(Error::Validation(format!(
            "days must be between 1 and {}, got {}",
            max, days
        )));
    }
    Ok(())
}

/// Round to the nearest integer, halves away from zero.
pub(crate) fn round_pct(value: f64) -> u32 {
    if value.is_finite() && value > 0.0 {
        value.round() as u32
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    #[test]
    fn test_expired_deadline_times_out_before_query() {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        let ctx = AnalyticsContext::new(&db).with_deadline(Deadline::after(Duration::ZERO));

        let window = TimeWindow::last_days(1, chrono::Utc::now());
        match ctx.watch_entries("u1", &window) {
            Err(Error::Timeout {
                user_id,
                timeout_ms,
                ..
            }) => {
                assert_eq!(user_id, "u1");
                assert_eq!(timeout_ms, 0);
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[test]
    fn test_no_deadline_runs() {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        let ctx = AnalyticsContext::new(&db).with_timeout(None);
        assert!(ctx.deadline().is_none());
        assert!(ctx.recent_entries("u1", 5).unwrap().is_empty());
    }

    #[test]
    fn test_store_errors_carry_user_and_window() {
        // Without migrations the tables do not exist.
        let db = Database::open_in_memory().unwrap();
        let ctx = AnalyticsContext::new(&db);
        let window = TimeWindow::last_days(1, chrono::Utc::now());
        let err = ctx.watch_entries("u9", &window).unwrap_err();
        match err {
            Error::Query { user_id, window: w, .. } => {
                assert_eq!(user_id, "u9");
                assert_eq!(w, window.to_string());
            }
            other => panic!("expected query error, got {other:?}"),
        }
    }

    #[test]
    fn test_check_days_bounds() {
        assert!(check_days(0, 90).is_err());
        assert!(check_days(91, 90).is_err());
        assert!(check_days(90, 90).is_ok());
    }

    #[test]
    fn test_round_pct() {
        assert_eq!(round_pct(89.5), 90);
        assert_eq!(round_pct(0.0), 0);
        assert_eq!(round_pct(f64::NAN), 0);
    }
}
