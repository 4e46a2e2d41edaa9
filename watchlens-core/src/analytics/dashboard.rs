//! Dashboard payload and family report.
//!
//! Both are compositions of the daily, weekly, scoring and ranking
//! analytics; nothing here touches the store except through the context.

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;

use super::daily::{daily_analytics, weekly_analytics, DailyAnalytics, WeeklyAnalytics};
use super::ranking::{flagged_content, SeveritySummary};
use super::scoring::{achievements, goal_progress, Achievement, GoalProgress};
use super::AnalyticsContext;
use crate::db::WatchStore;
use crate::error::{Error, Result};
use crate::types::{DailyGoals, ResolvedWatch, User, UserRole};

/// Entries shown in the recent watch history.
pub const RECENT_HISTORY_LIMIT: usize = 10;

/// Entries scanned to fill the recent history when some videos no longer resolve.
const RECENT_HISTORY_SCAN: usize = RECENT_HISTORY_LIMIT * 5;

/// Look-back for flagged content in the family report, in days.
pub const FAMILY_FLAGGED_DAYS: u32 = 7;

/// Everything the dashboard shows for one user.
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub user_id: String,
    pub generated_at: DateTime<FixedOffset>,
    pub today: DailyAnalytics,
    pub weekly: WeeklyAnalytics,
    /// Newest first; only entries whose video resolves
    pub recent_watch_history: Vec<ResolvedWatch>,
    /// Goals in effect (stored, or the defaults when the user has no record)
    pub goals: DailyGoals,
    pub goal_progress: GoalProgress,
    pub achievements: Vec<Achievement>,
}

/// Dashboard for `user_id` as of `now`, in `now`'s offset.
pub fn dashboard<S: WatchStore + ?Sized>(
    ctx: &AnalyticsContext<'_, S>,
    user_id: &str,
    now: DateTime<FixedOffset>,
) -> Result<Dashboard> {
    let today = daily_analytics(ctx, user_id, now)?;
    let weekly = weekly_analytics(ctx, user_id, now)?;
    let recent_watch_history: Vec<ResolvedWatch> = ctx
        .recent_entries(user_id, RECENT_HISTORY_SCAN)?
        .into_iter()
        .filter(|r| r.video.is_some())
        .take(RECENT_HISTORY_LIMIT)
        .collect();

    let goals = match ctx.user(user_id)? {
        Some(user) => user.daily_goals,
        None => {
            tracing::debug!(user_id, "No user record; using default goals");
            *ctx.default_goals()
        }
    };
    let progress = goal_progress(&today, &goals);
    let earned = achievements(&today, &progress);

    Ok(Dashboard {
        user_id: user_id.to_string(),
        generated_at: now,
        today,
        weekly,
        recent_watch_history,
        goals,
        goal_progress: progress,
        achievements: earned,
    })
}

/// One child in a family report.
#[derive(Debug, Clone, Serialize)]
pub struct FamilyMember {
    pub user: User,
    pub analytics: Dashboard,
    /// Flagged items watched over the last [`FAMILY_FLAGGED_DAYS`] days
    pub flagged_content: SeveritySummary,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FamilySummary {
    pub total_members: usize,
    pub total_flagged_content: usize,
    pub high_risk_content: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct FamilyReport {
    pub parent_id: String,
    pub members: Vec<FamilyMember>,
    pub summary: FamilySummary,
}

/// Dashboards and flagged-content counts for every child of a parent.
pub fn family_report<S: WatchStore + ?Sized>(
    ctx: &AnalyticsContext<'_, S>,
    parent_id: &str,
    now: DateTime<FixedOffset>,
) -> Result<FamilyReport> {
    let parent = ctx
        .user(parent_id)?
        .ok_or_else(|| Error::UserNotFound(parent_id.to_string()))?;
    if parent.role != UserRole::Parent {
        return Err(Error::Validation(format!(
            "user {} is not a parent account",
            parent_id
        )));
    }

    let mut members = Vec::new();
    let mut summary = FamilySummary::default();
    for child in ctx.children(parent_id)? {
        let analytics = dashboard(ctx, &child.id, now)?;
        let flagged =
            flagged_content(ctx, &child.id, FAMILY_FLAGGED_DAYS, now.with_timezone(&Utc))?;

        summary.total_members += 1;
        summary.total_flagged_content += flagged.summary.total;
        summary.high_risk_content += flagged.summary.high;

        members.push(FamilyMember {
            user: child,
            analytics,
            flagged_content: flagged.summary,
        });
    }

    tracing::info!(
        parent_id,
        members = summary.total_members,
        flagged = summary.total_flagged_content,
        high = summary.high_risk_content,
        "Built family report"
    );

    Ok(FamilyReport {
        parent_id: parent_id.to_string(),
        members,
        summary,
    })
}
