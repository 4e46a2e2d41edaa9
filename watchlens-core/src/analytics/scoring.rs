//! Goal progress, productivity series and trend classification.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate};
use serde::Serialize;

use super::daily::{day_rollup, DailyAnalytics};
use super::{check_days, round_pct, AnalyticsContext};
use crate::db::WatchStore;
use crate::error::Result;
use crate::types::DailyGoals;

/// Longest productivity report, in days.
pub const MAX_REPORT_DAYS: u32 = 90;

/// Score difference that separates a trend from noise.
const TREND_BAND: f64 = 5.0;

/// Size of the recent slice in [`trend`].
const TREND_RECENT: usize = 3;

/// Score at or above which the day earns [`AchievementKind::HighProductivity`].
const HIGH_PRODUCTIVITY_SCORE: u32 = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    Completed,
    InProgress,
}

/// Progress towards one daily goal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Goal {
    /// Minutes
    pub target: f64,
    /// Minutes
    pub achieved: f64,
    pub percentage: u32,
    pub status: GoalStatus,
}

impl Goal {
    fn new(target: f64, achieved: f64) -> Self {
        let percentage = if target > 0.0 {
            round_pct(100.0 * achieved / target)
        } else if achieved > 0.0 {
            100
        } else {
            0
        };

        Self {
            target,
            achieved,
            percentage,
            status: if achieved >= target {
                GoalStatus::Completed
            } else {
                GoalStatus::InProgress
            },
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == GoalStatus::Completed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GoalProgress {
    /// Educational + News minutes
    pub educational: Goal,
    /// Entertainment + Gaming + Music + Vlogs minutes
    pub entertainment: Goal,
    /// All minutes
    pub total: Goal,
}

/// Progress of one day against a user's goals.
pub fn goal_progress(daily: &DailyAnalytics, goals: &DailyGoals) -> GoalProgress {
    GoalProgress {
        educational: Goal::new(goals.educational, daily.categories.productive()),
        entertainment: Goal::new(goals.entertainment, daily.categories.leisure()),
        total: Goal::new(goals.total, daily.total_watch_time),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    Declining,
    Stable,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Improving => "improving",
            Trend::Declining => "declining",
            Trend::Stable => "stable",
        }
    }
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a chronological series of scores.
///
/// The mean of the last (up to) three scores is compared with the scores
/// before them; the earlier sum is divided by `max(1, n - 3)`.
pub fn trend(scores: &[u32]) -> Trend {
    if scores.len() < 2 {
        return Trend::Stable;
    }

    let split = scores.len().saturating_sub(TREND_RECENT);
    let (earlier, recent) = scores.split_at(split);

    let recent_avg = recent.iter().map(|s| *s as f64).sum::<f64>() / recent.len() as f64;
    let earlier_avg = earlier.iter().map(|s| *s as f64).sum::<f64>()
        / scores.len().saturating_sub(TREND_RECENT).max(1) as f64;

    if recent_avg > earlier_avg + TREND_BAND {
        Trend::Improving
    } else if recent_avg < earlier_avg - TREND_BAND {
        Trend::Declining
    } else {
        Trend::Stable
    }
}

/// One row of a productivity report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductivityDay {
    pub date: NaiveDate,
    pub weekday: String,
    pub productivity_score: u32,
    pub total_watch_time: f64,
    pub productive_minutes: f64,
    pub leisure_minutes: f64,
}

impl From<&DailyAnalytics> for ProductivityDay {
    fn from(day: &DailyAnalytics) -> Self {
        Self {
            date: day.date,
            weekday: day.date.format("%a").to_string(),
            productivity_score: day.productivity_score,
            total_watch_time: day.total_watch_time,
            productive_minutes: day.productive_minutes,
            leisure_minutes: day.leisure_minutes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductivitySummary {
    /// Mean over every day in the report, idle days included
    pub average_score: u32,
    pub trend: Trend,
    pub days: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductivityReport {
    /// Oldest first
    pub daily: Vec<ProductivityDay>,
    pub summary: ProductivitySummary,
}

/// Build a report from daily rows. Pure.
pub(crate) fn summarize(daily: Vec<ProductivityDay>) -> ProductivityReport {
    let scores: Vec<u32> = daily.iter().map(|d| d.productivity_score).collect();
    let average_score = if scores.is_empty() {
        0
    } else {
        round_pct(scores.iter().sum::<u32>() as f64 / scores.len() as f64)
    };

    ProductivityReport {
        summary: ProductivitySummary {
            average_score,
            trend: trend(&scores),
            days: daily.len(),
        },
        daily,
    }
}

/// Per-day scores for the `days` days ending on `today`'s calendar day.
pub fn productivity_report<S: WatchStore + ?Sized>(
    ctx: &AnalyticsContext<'_, S>,
    user_id: &str,
    days: u32,
    today: DateTime<FixedOffset>,
) -> Result<ProductivityReport> {
    check_days(days, MAX_REPORT_DAYS)?;

    let offset = *today.offset();
    let end = today.date_naive();
    let mut daily = Vec::with_capacity(days as usize);
    for back in (0..days as i64).rev() {
        let date = end - Duration::days(back);
        let day = day_rollup(ctx, user_id, date, offset)?;
        daily.push(ProductivityDay::from(&day));
    }

    let report = summarize(daily);
    tracing::info!(
        user_id,
        days,
        average = report.summary.average_score,
        trend = %report.summary.trend,
        "Computed productivity report"
    );
    Ok(report)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementKind {
    DailyEducationalGoal,
    HighProductivity,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Achievement {
    pub kind: AchievementKind,
    pub title: String,
    pub description: String,
}

/// Achievements earned by one day.
pub fn achievements(daily: &DailyAnalytics, progress: &GoalProgress) -> Vec<Achievement> {
    let mut earned = Vec::new();

    if progress.educational.is_completed() {
        earned.push(Achievement {
            kind: AchievementKind::DailyEducationalGoal,
            title: "Educational Goal Achieved!".to_string(),
            description: format!(
                "You've reached your daily educational content goal of {} minutes.",
                progress.educational.target
            ),
        });
    }

    if daily.productivity_score >= HIGH_PRODUCTIVITY_SCORE {
        earned.push(Achievement {
            kind: AchievementKind::HighProductivity,
            title: "Productivity Master!".to_string(),
            description: format!(
                "You achieved a productivity score of {}%.",
                daily.productivity_score
            ),
        });
    }

    earned
}
