//! Daily and weekly rollups.
//!
//! A day is the calendar day of a `DateTime<FixedOffset>` in its own offset,
//! spanning `[00:00:00.000, 23:59:59.999]`. Entries whose video no longer
//! resolves still count towards total time and the video count, but not
//! towards the category or age-rating buckets.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate};
use serde::Serialize;

use super::{round_pct, AnalyticsContext};
use crate::db::WatchStore;
use crate::error::Result;
use crate::types::{AgeRating, Category, ResolvedWatch, TimeWindow};

/// Watch minutes per category. Every category is always present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CategoryMinutes {
    #[serde(rename = "Educational")]
    pub educational: f64,
    #[serde(rename = "Entertainment")]
    pub entertainment: f64,
    #[serde(rename = "Gaming")]
    pub gaming: f64,
    #[serde(rename = "Music")]
    pub music: f64,
    #[serde(rename = "News")]
    pub news: f64,
    #[serde(rename = "Vlogs")]
    pub vlogs: f64,
}

impl CategoryMinutes {
    pub fn get(&self, category: Category) -> f64 {
        match category {
            Category::Educational => self.educational,
            Category::Entertainment => self.entertainment,
            Category::Gaming => self.gaming,
            Category::Music => self.music,
            Category::News => self.news,
            Category::Vlogs => self.vlogs,
        }
    }

    pub fn add(&mut self, category: Category, minutes: f64) {
        let slot = match category {
            Category::Educational => &mut self.educational,
            Category::Entertainment => &mut self.entertainment,
            Category::Gaming => &mut self.gaming,
            Category::Music => &mut self.music,
            Category::News => &mut self.news,
            Category::Vlogs => &mut self.vlogs,
        };
        *slot += minutes;
    }

    /// Sum of all categories.
    pub fn total(&self) -> f64 {
        Category::ALL.iter().map(|c| self.get(*c)).sum()
    }

    /// Educational + News.
    pub fn productive(&self) -> f64 {
        Category::ALL
            .iter()
            .filter(|c| c.is_productive())
            .map(|c| self.get(*c))
            .sum()
    }

    /// Entertainment + Gaming + Music + Vlogs.
    pub fn leisure(&self) -> f64 {
        Category::ALL
            .iter()
            .filter(|c| !c.is_productive())
            .map(|c| self.get(*c))
            .sum()
    }

    fn merge(&mut self, other: &CategoryMinutes) {
        for category in Category::ALL {
            self.add(category, other.get(category));
        }
    }
}

/// Watch minutes per age rating. Every rating is always present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AgeRatingMinutes {
    #[serde(rename = "All Ages")]
    pub all_ages: f64,
    #[serde(rename = "7+")]
    pub seven_plus: f64,
    #[serde(rename = "13+")]
    pub thirteen_plus: f64,
    #[serde(rename = "18+")]
    pub eighteen_plus: f64,
}

impl AgeRatingMinutes {
    pub fn get(&self, rating: AgeRating) -> f64 {
        match rating {
            AgeRating::AllAges => self.all_ages,
            AgeRating::SevenPlus => self.seven_plus,
            AgeRating::ThirteenPlus => self.thirteen_plus,
            AgeRating::EighteenPlus => self.eighteen_plus,
        }
    }

    pub fn add(&mut self, rating: AgeRating, minutes: f64) {
        let slot = match rating {
            AgeRating::AllAges => &mut self.all_ages,
            AgeRating::SevenPlus => &mut self.seven_plus,
            AgeRating::ThirteenPlus => &mut self.thirteen_plus,
            AgeRating::EighteenPlus => &mut self.eighteen_plus,
        };
        *slot += minutes;
    }

    fn merge(&mut self, other: &AgeRatingMinutes) {
        for rating in AgeRating::ALL {
            self.add(rating, other.get(rating));
        }
    }
}

/// Rollup of one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyAnalytics {
    pub date: NaiveDate,
    /// Minutes watched, including entries whose video no longer resolves
    pub total_watch_time: f64,
    pub categories: CategoryMinutes,
    pub age_ratings: AgeRatingMinutes,
    pub videos_watched: usize,
    /// Percentage of minutes that were Educational or News
    pub productivity_score: u32,
    pub productive_minutes: f64,
    pub leisure_minutes: f64,
}

impl DailyAnalytics {
    fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            total_watch_time: 0.0,
            categories: CategoryMinutes::default(),
            age_ratings: AgeRatingMinutes::default(),
            videos_watched: 0,
            productivity_score: 0,
            productive_minutes: 0.0,
            leisure_minutes: 0.0,
        }
    }

    pub fn has_activity(&self) -> bool {
        self.total_watch_time > 0.0
    }
}

/// Productivity score for a set of category minutes and a total.
pub(crate) fn productivity_score(categories: &CategoryMinutes, total: f64) -> u32 {
    if total > 0.0 {
        round_pct(100.0 * categories.productive() / total)
    } else {
        0
    }
}

/// Aggregate the entries of one day. Pure.
pub fn aggregate_day(date: NaiveDate, entries: &[ResolvedWatch]) -> DailyAnalytics {
    let mut day = DailyAnalytics::empty(date);

    for resolved in entries {
        let minutes = resolved.entry.watch_minutes();
        day.total_watch_time += minutes;
        day.videos_watched += 1;

        match &resolved.video {
            Some(video) => {
                let c = &video.classification;
                day.categories.add(c.category, minutes);
                day.age_ratings.add(c.age_rating, minutes);
            }
            None => {
                tracing::debug!(
                    entry_id = %resolved.entry.id,
                    youtube_video_id = %resolved.entry.youtube_video_id,
                    "Watch entry references a missing video; skipped for category buckets"
                );
            }
        }
    }

    day.productivity_score = productivity_score(&day.categories, day.total_watch_time);
    day.productive_minutes = day.categories.productive();
    day.leisure_minutes = day.categories.leisure();
    day
}

/// Rollup for the calendar day of `day`, in `day`'s own offset.
pub fn daily_analytics<S: WatchStore + ?Sized>(
    ctx: &AnalyticsContext<'_, S>,
    user_id: &str,
    day: DateTime<FixedOffset>,
) -> Result<DailyAnalytics> {
    day_rollup(ctx, user_id, day.date_naive(), *day.offset())
}

pub(crate) fn day_rollup<S: WatchStore + ?Sized>(
    ctx: &AnalyticsContext<'_, S>,
    user_id: &str,
    date: NaiveDate,
    offset: FixedOffset,
) -> Result<DailyAnalytics> {
    let window = TimeWindow::for_day(date, offset);
    let entries = ctx.watch_entries(user_id, &window)?;
    let day = aggregate_day(date, &entries);

    tracing::debug!(
        user_id,
        %date,
        entries = entries.len(),
        total = day.total_watch_time,
        score = day.productivity_score,
        "Computed daily analytics"
    );
    Ok(day)
}

/// One day inside a weekly rollup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekdayAnalytics {
    /// Short weekday name (`Mon`, `Tue`, ...)
    pub weekday: String,
    #[serde(flatten)]
    pub analytics: DailyAnalytics,
}

/// Seven consecutive days ending on a reference day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyAnalytics {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Exact bounds covered, first instant to last instant
    pub period: TimeWindow,
    /// Oldest first
    pub days: Vec<WeekdayAnalytics>,
    pub total_watch_time: f64,
    pub categories: CategoryMinutes,
    pub age_ratings: AgeRatingMinutes,
    pub videos_watched: usize,
    pub productive_minutes: f64,
    pub leisure_minutes: f64,
    /// Mean score over days with any watch time; 0 when none had any
    pub average_productivity_score: u32,
    /// Days with any watch time
    pub active_days: usize,
}

/// Combine daily rollups. Pure.
pub(crate) fn combine_week(days: Vec<DailyAnalytics>, period: TimeWindow) -> WeeklyAnalytics {
    let start_date = days.first().map(|d| d.date).unwrap_or_default();
    let end_date = days.last().map(|d| d.date).unwrap_or_default();

    let mut categories = CategoryMinutes::default();
    let mut age_ratings = AgeRatingMinutes::default();
    let mut total_watch_time = 0.0;
    let mut videos_watched = 0;
    for day in &days {
        categories.merge(&day.categories);
        age_ratings.merge(&day.age_ratings);
        total_watch_time += day.total_watch_time;
        videos_watched += day.videos_watched;
    }

    let active: Vec<u32> = days
        .iter()
        .filter(|d| d.has_activity())
        .map(|d| d.productivity_score)
        .collect();
    let average_productivity_score = if active.is_empty() {
        0
    } else {
        round_pct(active.iter().sum::<u32>() as f64 / active.len() as f64)
    };

    WeeklyAnalytics {
        start_date,
        end_date,
        period,
        days: days
            .into_iter()
            .map(|d| WeekdayAnalytics {
                weekday: d.date.format("%a").to_string(),
                analytics: d,
            })
            .collect(),
        total_watch_time,
        productive_minutes: categories.productive(),
        leisure_minutes: categories.leisure(),
        categories,
        age_ratings,
        videos_watched,
        average_productivity_score,
        active_days: active.len(),
    }
}

/// Weekly rollup of the seven days ending on `reference`'s calendar day.
pub fn weekly_analytics<S: WatchStore + ?Sized>(
    ctx: &AnalyticsContext<'_, S>,
    user_id: &str,
    reference: DateTime<FixedOffset>,
) -> Result<WeeklyAnalytics> {
    let start_date = reference.date_naive() - Duration::days(6);
    week_from(ctx, user_id, start_date, *reference.offset())
}

fn week_from<S: WatchStore + ?Sized>(
    ctx: &AnalyticsContext<'_, S>,
    user_id: &str,
    start_date: NaiveDate,
    offset: FixedOffset,
) -> Result<WeeklyAnalytics> {
    let end_date = start_date + Duration::days(6);

    let mut days = Vec::with_capacity(7);
    for i in 0..7 {
        let date = start_date + Duration::days(i);
        days.push(day_rollup(ctx, user_id, date, offset)?);
    }

    let period = TimeWindow {
        start: TimeWindow::for_day(start_date, offset).start,
        end: TimeWindow::for_day(end_date, offset).end,
    };
    let week = combine_week(days, period);

    tracing::info!(
        user_id,
        start = %week.start_date,
        end = %week.end_date,
        total = week.total_watch_time,
        average = week.average_productivity_score,
        "Computed weekly analytics"
    );
    Ok(week)
}
