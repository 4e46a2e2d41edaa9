//! Text and JSON rendering for command results.

use anyhow::Result;
use serde::Serialize;
use watchlens_core::analytics::{
    ChannelStats, DailyAnalytics, Dashboard, FamilyReport, FlaggedContentReport, Goal,
    GoalProgress, ProductivityReport, WeeklyAnalytics,
};
use watchlens_core::format::{format_minutes, format_relative_time, format_watch_time};
use watchlens_core::ingest::{BatchItem, FlaggedVideo, IngestOutcome};
use watchlens_core::{
    Category, ClassificationResult, DailyGoals, FlagRecord, Page, ResolvedWatch, User, Video,
    WatchHistoryEntry,
};

pub struct Output {
    json: bool,
}

impl Output {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    /// Print `value` as JSON in JSON mode, otherwise run `text`.
    fn emit<T: Serialize>(&self, value: &T, text: impl FnOnce()) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            text();
        }
        Ok(())
    }

    pub fn classification(&self, result: &ClassificationResult) -> Result<()> {
        self.emit(result, || {
            println!("Category:    {}", result.category);
            println!("Age rating:  {}", result.age_rating);
            println!("Confidence:  {:.2}", result.confidence);
            println!("Flags:       {}", flag_list(result.flags.iter()));
        })
    }

    pub fn video(&self, video: &Video) -> Result<()> {
        self.emit(video, || print_video(video))
    }

    pub fn ingested(&self, outcome: &IngestOutcome) -> Result<()> {
        self.emit(outcome, || {
            if outcome.created {
                println!("Ingested {}", outcome.video.video_id);
            } else {
                println!("Already stored: {}", outcome.video.video_id);
            }
            print_video(&outcome.video);
        })
    }

    pub fn batch(&self, items: &[BatchItem]) -> Result<()> {
        self.emit(&items, || {
            for item in items {
                match item {
                    BatchItem::Classified {
                        video_id,
                        classification,
                        created,
                    } => println!(
                        "  [+] {}  {} ({}){}",
                        video_id,
                        classification.category,
                        classification.age_rating,
                        if *created { "" } else { "  already stored" }
                    ),
                    BatchItem::Failed { video_id, error } => {
                        println!("  [!] {}  {}", video_id, error)
                    }
                }
            }
            let ok = items.iter().filter(|i| i.is_success()).count();
            println!("{} of {} classified", ok, items.len());
        })
    }

    pub fn watch_logged(&self, entry: &WatchHistoryEntry) -> Result<()> {
        self.emit(entry, || {
            println!(
                "Logged {} of {} ({}% complete)",
                entry.formatted_watch_time(),
                entry.youtube_video_id,
                entry.completion_percentage
            );
        })
    }

    pub fn flag_record(&self, video_id: &str, record: &FlagRecord) -> Result<()> {
        self.emit(record, || {
            println!(
                "Flagged {} as {} ({}): {}",
                video_id, record.flag, record.severity, record.reason
            );
        })
    }

    pub fn unflagged(&self, video_id: &str, resolved: usize) -> Result<()> {
        #[derive(Serialize)]
        struct Unflagged<'a> {
            video_id: &'a str,
            resolved: usize,
        }
        self.emit(&Unflagged { video_id, resolved }, || {
            println!("Resolved {} flag record(s) on {}", resolved, video_id);
        })
    }

    pub fn daily(&self, day: &DailyAnalytics) -> Result<()> {
        self.emit(day, || print_day(day))
    }

    pub fn weekly(&self, week: &WeeklyAnalytics) -> Result<()> {
        self.emit(week, || {
            println!("Week {} .. {}", week.start_date, week.end_date);
            println!("==========================");
            for day in &week.days {
                println!(
                    "  {} {}  {:>8}  score {:>3}",
                    day.weekday,
                    day.analytics.date,
                    format_minutes(day.analytics.total_watch_time),
                    day.analytics.productivity_score
                );
            }
            println!();
            println!("Total:          {}", format_minutes(week.total_watch_time));
            println!("Productive:     {}", format_minutes(week.productive_minutes));
            println!("Leisure:        {}", format_minutes(week.leisure_minutes));
            println!("Videos:         {}", week.videos_watched);
            println!(
                "Average score:  {} over {} active day(s)",
                week.average_productivity_score, week.active_days
            );
        })
    }

    pub fn productivity(&self, report: &ProductivityReport) -> Result<()> {
        self.emit(report, || {
            for day in &report.daily {
                println!(
                    "  {} {}  score {:>3}  {}",
                    day.weekday,
                    day.date,
                    day.productivity_score,
                    format_minutes(day.total_watch_time)
                );
            }
            println!(
                "Average {} over {} day(s), trend: {}",
                report.summary.average_score, report.summary.days, report.summary.trend
            );
        })
    }

    pub fn goals(&self, progress: &GoalProgress) -> Result<()> {
        self.emit(progress, || print_goals(progress))
    }

    pub fn goals_updated(&self, user_id: &str, goals: &DailyGoals) -> Result<()> {
        self.emit(goals, || {
            println!(
                "Goals for {}: educational {}, entertainment {}, total {}",
                user_id,
                format_minutes(goals.educational),
                format_minutes(goals.entertainment),
                format_minutes(goals.total)
            );
        })
    }

    pub fn channels(&self, channels: &[ChannelStats]) -> Result<()> {
        self.emit(&channels, || {
            if channels.is_empty() {
                println!("No watch history in this period.");
            }
            for (rank, channel) in channels.iter().enumerate() {
                println!(
                    "{:>2}. {}  {}  ({} watch(es))",
                    rank + 1,
                    channel.channel_title,
                    format_minutes(channel.total_watch_time_minutes as f64),
                    channel.video_count
                );
            }
        })
    }

    pub fn flagged_content(&self, report: &FlaggedContentReport) -> Result<()> {
        self.emit(report, || {
            for item in &report.items {
                println!(
                    "  [{}] {}  {}  {}",
                    item.severity,
                    item.video_id,
                    item.title,
                    format_relative_time(item.watched_at)
                );
                println!("        flags: {}", flag_list(item.flags.iter()));
            }
            let s = &report.summary;
            println!(
                "{} flagged (high {}, medium {}, low {})",
                s.total, s.high, s.medium, s.low
            );
        })
    }

    pub fn flagged_videos(&self, page: &Page<FlaggedVideo>) -> Result<()> {
        self.emit(page, || {
            for item in &page.items {
                let reason = item
                    .latest_record
                    .as_ref()
                    .map(|r| r.reason.as_str())
                    .unwrap_or("");
                println!(
                    "  [{}] {}  {}  {}",
                    item.severity.map(|s| s.as_str()).unwrap_or("-"),
                    item.video.video_id,
                    item.video.title,
                    reason
                );
            }
            print_page_footer(page);
        })
    }

    pub fn dashboard(&self, dash: &Dashboard) -> Result<()> {
        self.emit(dash, || {
            println!("Dashboard for {}", dash.user_id);
            println!("==========================");
            print_day(&dash.today);
            println!();
            println!(
                "This week: {} watched, average score {}",
                format_minutes(dash.weekly.total_watch_time),
                dash.weekly.average_productivity_score
            );
            println!();
            print_goals(&dash.goal_progress);
            if !dash.achievements.is_empty() {
                println!();
                for achievement in &dash.achievements {
                    println!("  * {}: {}", achievement.title, achievement.description);
                }
            }
            if !dash.recent_watch_history.is_empty() {
                println!();
                println!("Recent:");
                for resolved in &dash.recent_watch_history {
                    print_history_row(resolved);
                }
            }
        })
    }

    pub fn history(&self, page: &Page<ResolvedWatch>) -> Result<()> {
        self.emit(page, || {
            for resolved in &page.items {
                print_history_row(resolved);
            }
            print_page_footer(page);
        })
    }

    pub fn family(&self, report: &FamilyReport) -> Result<()> {
        self.emit(report, || {
            println!("Family of {}", report.parent_id);
            for member in &report.members {
                let today = &member.analytics.today;
                println!(
                    "  {}  {} today, score {}, {} flagged ({} high)",
                    member.user.name,
                    format_minutes(today.total_watch_time),
                    today.productivity_score,
                    member.flagged_content.total,
                    member.flagged_content.high
                );
            }
            let s = &report.summary;
            println!(
                "{} member(s), {} flagged, {} high risk",
                s.total_members, s.total_flagged_content, s.high_risk_content
            );
        })
    }

    pub fn user(&self, user: &User) -> Result<()> {
        self.emit(user, || {
            println!("{} ({}) role={}", user.id, user.name, user.role.as_str());
            if let Some(parent) = &user.parent_id {
                println!("  parent: {}", parent);
            }
            let g = &user.daily_goals;
            println!(
                "  goals: educational {}, entertainment {}, total {}",
                format_minutes(g.educational),
                format_minutes(g.entertainment),
                format_minutes(g.total)
            );
        })
    }
}

fn flag_list<'a, T: std::fmt::Display + 'a>(flags: impl Iterator<Item = &'a T>) -> String {
    let names: Vec<String> = flags.map(|f| f.to_string()).collect();
    if names.is_empty() {
        "none".to_string()
    } else {
        names.join(", ")
    }
}

fn print_video(video: &Video) {
    let c = &video.classification;
    println!("  {}  {}", video.video_id, video.title);
    println!("  Channel:     {}", video.channel_title);
    println!("  Category:    {} ({:.2})", c.category, c.confidence);
    println!("  Age rating:  {}", c.age_rating);
    println!("  Flags:       {}", flag_list(c.flags.iter()));
}

fn print_day(day: &DailyAnalytics) {
    println!("{}", day.date);
    println!("  Total:       {}", format_minutes(day.total_watch_time));
    for category in Category::ALL {
        let minutes = day.categories.get(category);
        if minutes > 0.0 {
            println!("  {:<13}{}", category.as_str(), format_minutes(minutes));
        }
    }
    println!("  Videos:      {}", day.videos_watched);
    println!("  Score:       {}", day.productivity_score);
}

fn print_goal(name: &str, goal: &Goal) {
    println!(
        "  {:<14}{:>6} / {:<6} {:>3}%{}",
        name,
        format_minutes(goal.achieved),
        format_minutes(goal.target),
        goal.percentage,
        if goal.is_completed() { "  done" } else { "" }
    );
}

fn print_goals(progress: &GoalProgress) {
    println!("Goals:");
    print_goal("Educational", &progress.educational);
    print_goal("Entertainment", &progress.entertainment);
    print_goal("Total", &progress.total);
}

fn print_history_row(resolved: &ResolvedWatch) {
    let entry = &resolved.entry;
    let title = resolved
        .video
        .as_ref()
        .map(|v| v.title.as_str())
        .unwrap_or("(unknown video)");
    println!(
        "  {}  {:>6}  {:>3}%  {}",
        entry.watched_at.format("%Y-%m-%d %H:%M"),
        format_watch_time(entry.watch_duration),
        entry.completion_percentage,
        title
    );
}

fn print_page_footer<T>(page: &Page<T>) {
    println!(
        "Page {} of {} ({} total)",
        page.page,
        page.pages().max(1),
        page.total
    );
}
