//! watchlens - CLI for video watch tracking and productivity analytics
//!
//! This tool provides commands for:
//! - Classifying and ingesting videos, logging watch events
//! - Flagging and unflagging videos
//! - Daily, weekly and productivity analytics, top channels, dashboards
//! - Managing users and their daily goals
//!
//! Uses XDG Base Directory specification for file locations:
//! - Database: $XDG_DATA_HOME/watchlens/data.db (~/.local/share/watchlens/data.db)
//! - Logs: $XDG_STATE_HOME/watchlens/watchlens.log (~/.local/state/watchlens/watchlens.log)
//! - Config: $XDG_CONFIG_HOME/watchlens/config.toml (~/.config/watchlens/config.toml)

mod output;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, FixedOffset, Local, NaiveDate, TimeZone, Utc};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use watchlens_core::analytics::{self, AnalyticsContext};
use watchlens_core::classifier::KeywordTables;
use watchlens_core::ingest::{extract_video_id, Ingestor, NewWatch};
use watchlens_core::{
    Category, Config, DailyGoals, Database, FlagSeverity, HistoryQuery, TimeWindow, User,
    UserRole, VideoDetails, WatchSource, WatchStore,
};

use output::Output;

#[derive(Parser)]
#[command(name = "watchlens")]
#[command(about = "Track video watch time and productivity")]
#[command(version)]
struct Args {
    /// User to act as (falls back to user.default_user in config.toml)
    #[arg(short, long, global = true, env = "WATCHLENS_USER")]
    user: Option<String>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Classify a title without storing anything
    Classify {
        title: String,

        #[arg(short, long, default_value = "")]
        description: String,

        /// Tag (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,
    },

    /// Ingest video metadata from a JSON file (one object, or an array of up to 10)
    Ingest { file: PathBuf },

    /// Run the classifier again on a stored video
    Reclassify {
        /// Video URL or id
        video: String,
    },

    /// Record a watch event
    Log {
        /// Video URL or id
        video: String,

        /// Seconds watched
        #[arg(short, long)]
        watched: f64,

        /// Video length in seconds (defaults to the stored duration)
        #[arg(short, long)]
        duration: Option<f64>,

        /// When the video was watched (RFC 3339, defaults to now)
        #[arg(long)]
        at: Option<DateTime<FixedOffset>>,

        #[arg(long, default_value = "web_app")]
        source: WatchSource,
    },

    /// Report a video as inappropriate
    Flag {
        /// Video URL or id
        video: String,

        #[arg(short, long)]
        reason: String,

        #[arg(short, long, default_value = "medium")]
        severity: FlagSeverity,
    },

    /// Resolve your own reports against a video
    Unflag {
        /// Video URL or id
        video: String,
    },

    /// Analytics for one day
    Daily {
        /// Day to report (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Analytics for seven consecutive days
    Weekly {
        /// Last day of the seven-day window (defaults to today)
        #[arg(long, visible_alias = "from")]
        date: Option<NaiveDate>,
    },

    /// Per-day productivity scores and trend
    Productivity {
        /// Defaults to analytics.productivity_days
        #[arg(long)]
        days: Option<u32>,
    },

    /// Progress towards today's goals
    Goals {
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Update your daily goals (minutes)
    SetGoals {
        #[arg(long)]
        educational: Option<f64>,

        #[arg(long)]
        entertainment: Option<f64>,

        #[arg(long)]
        total: Option<f64>,
    },

    /// Channels with the most watch time
    TopChannels {
        /// Defaults to analytics.top_channels_days
        #[arg(long)]
        days: Option<u32>,
    },

    /// Flagged videos in your watch history
    Flagged {
        /// Defaults to analytics.flagged_days
        #[arg(long)]
        days: Option<u32>,
    },

    /// All videos with active flag records
    FlaggedVideos {
        #[arg(long)]
        severity: Option<FlagSeverity>,

        #[arg(long, default_value = "1")]
        page: u32,

        #[arg(long, default_value = "20")]
        limit: u32,
    },

    /// Today, this week, recent history, goals and achievements
    Dashboard,

    /// Paginated watch history, newest first
    History {
        #[arg(long, default_value = "1")]
        page: u32,

        #[arg(long, default_value = "20")]
        limit: u32,

        #[arg(long)]
        category: Option<Category>,

        /// First day included (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Last day included (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,
    },

    /// Dashboards and flagged content for every child account
    Family,

    /// Manage user accounts
    #[command(subcommand)]
    User(UserCommand),
}

#[derive(Subcommand)]
enum UserCommand {
    /// Create or update a user
    Add {
        id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        email: Option<String>,

        #[arg(long, default_value = "user")]
        role: UserRole,

        /// Parent account of a child
        #[arg(long)]
        parent: Option<String>,
    },

    /// Show a user
    Show { id: String },
}

/// Ingest file contents: a single video or a batch.
#[derive(Deserialize)]
#[serde(untagged)]
enum IngestInput {
    Batch(Vec<VideoDetails>),
    Single(Box<VideoDetails>),
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Ensure XDG environment variables are set before using core library
    Config::ensure_xdg_env();

    // Load configuration
    let config = Config::load().context("failed to load configuration")?;

    // Initialize logging
    let _log_guard =
        watchlens_core::logging::init(&config.logging).context("failed to initialize logging")?;

    let tables = config
        .classifier
        .keyword_tables()
        .context("failed to load keyword tables")?;

    let out = Output::new(args.json);

    if let Command::Classify {
        title,
        description,
        tags,
    } = &args.command
    {
        return out.classification(&tables.classify(title, description, tags));
    }

    // Open database at XDG-compliant path
    let db_path = Config::database_path();
    tracing::debug!(path = %db_path.display(), "Opening database");
    let db = Database::open(&db_path).context("failed to open database")?;
    db.migrate().context("failed to run database migrations")?;

    let app = App {
        config: &config,
        db: &db,
        tables: &tables,
        user: args.user,
        out,
    };
    app.run(args.command)
}

struct App<'a> {
    config: &'a Config,
    db: &'a Database,
    tables: &'a KeywordTables,
    user: Option<String>,
    out: Output,
}

impl App<'_> {
    fn run(&self, command: Command) -> Result<()> {
        match command {
            Command::Classify { .. } => Ok(()),
            Command::Ingest { file } => self.cmd_ingest(&file),
            Command::Reclassify { video } => {
                let video_id = extract_video_id(&video)?;
                let video = self
                    .ingestor()
                    .reclassify_video(&video_id)
                    .with_context(|| format!("failed to reclassify {}", video_id))?;
                self.out.video(&video)
            }
            Command::Log {
                video,
                watched,
                duration,
                at,
                source,
            } => self.cmd_log(&video, watched, duration, at, source),
            Command::Flag {
                video,
                reason,
                severity,
            } => {
                let user = self.current_user()?;
                let video_id = extract_video_id(&video)?;
                let record = self
                    .ingestor()
                    .flag_video(&user, &video_id, &reason, severity)
                    .with_context(|| format!("failed to flag {}", video_id))?;
                self.out.flag_record(&video_id, &record)
            }
            Command::Unflag { video } => {
                let user = self.current_user()?;
                let video_id = extract_video_id(&video)?;
                let resolved = self
                    .ingestor()
                    .unflag_video(&user, &video_id)
                    .with_context(|| format!("failed to unflag {}", video_id))?;
                self.out.unflagged(&video_id, resolved)
            }
            Command::Daily { date } => {
                let user = self.current_user()?;
                let day = analytics::daily_analytics(&self.ctx(), &user, reference(date)?)?;
                self.out.daily(&day)
            }
            Command::Weekly { date } => {
                let user = self.current_user()?;
                let week = analytics::weekly_analytics(&self.ctx(), &user, reference(date)?)?;
                self.out.weekly(&week)
            }
            Command::Productivity { days } => {
                let user = self.current_user()?;
                let days = days.unwrap_or(self.config.analytics.productivity_days);
                let report =
                    analytics::productivity_report(&self.ctx(), &user, days, reference(None)?)?;
                self.out.productivity(&report)
            }
            Command::Goals { date } => {
                let user = self.current_user()?;
                let ctx = self.ctx();
                let day = analytics::daily_analytics(&ctx, &user, reference(date)?)?;
                let goals = self.goals_for(&user)?;
                let progress = analytics::goal_progress(&day, &goals);
                self.out.goals(&progress)
            }
            Command::SetGoals {
                educational,
                entertainment,
                total,
            } => self.cmd_set_goals(educational, entertainment, total),
            Command::TopChannels { days } => {
                let user = self.current_user()?;
                let days = days.unwrap_or(self.config.analytics.top_channels_days);
                let channels = analytics::top_channels(&self.ctx(), &user, days, Utc::now())?;
                self.out.channels(&channels)
            }
            Command::Flagged { days } => {
                let user = self.current_user()?;
                let days = days.unwrap_or(self.config.analytics.flagged_days);
                let report = analytics::flagged_content(&self.ctx(), &user, days, Utc::now())?;
                self.out.flagged_content(&report)
            }
            Command::FlaggedVideos {
                severity,
                page,
                limit,
            } => {
                let videos = self.ingestor().list_flagged_videos(severity, page, limit)?;
                self.out.flagged_videos(&videos)
            }
            Command::Dashboard => {
                let user = self.current_user()?;
                let dash = analytics::dashboard(&self.ctx(), &user, reference(None)?)?;
                self.out.dashboard(&dash)
            }
            Command::History {
                page,
                limit,
                category,
                from,
                to,
            } => {
                let user = self.current_user()?;
                let start = match from {
                    Some(d) => Some(TimeWindow::for_day(d, local_offset_on(d)?).start),
                    None => None,
                };
                let end = match to {
                    Some(d) => Some(TimeWindow::for_day(d, local_offset_on(d)?).end),
                    None => None,
                };
                let query = HistoryQuery {
                    page,
                    limit,
                    category,
                    start,
                    end,
                };
                let history = self.ingestor().watch_history(&user, &query)?;
                self.out.history(&history)
            }
            Command::Family => {
                let user = self.current_user()?;
                let report = analytics::family_report(&self.ctx(), &user, reference(None)?)?;
                self.out.family(&report)
            }
            Command::User(UserCommand::Add {
                id,
                name,
                email,
                role,
                parent,
            }) => self.cmd_user_add(id, name, email, role, parent),
            Command::User(UserCommand::Show { id }) => {
                let user = self
                    .db
                    .get_user(&id)?
                    .with_context(|| format!("no user with id '{}'", id))?;
                self.out.user(&user)
            }
        }
    }

    fn ingestor(&self) -> Ingestor<'_> {
        Ingestor::new(self.db, self.tables)
    }

    fn ctx(&self) -> AnalyticsContext<'_, Database> {
        AnalyticsContext::new(self.db)
            .with_default_goals(self.config.goals)
            .with_timeout(self.config.analytics.query_timeout())
    }

    /// `--user`, then `WATCHLENS_USER`, then `user.default_user`.
    fn current_user(&self) -> Result<String> {
        match self
            .user
            .clone()
            .or_else(|| self.config.user.default_user.clone())
        {
            Some(user) if !user.trim().is_empty() => Ok(user),
            _ => bail!(
                "no user given; pass --user, set WATCHLENS_USER, or set user.default_user in {}",
                Config::config_path().display()
            ),
        }
    }

    fn goals_for(&self, user_id: &str) -> Result<DailyGoals> {
        Ok(self
            .db
            .get_user(user_id)?
            .map(|u| u.daily_goals)
            .unwrap_or(self.config.goals))
    }

    fn cmd_ingest(&self, file: &Path) -> Result<()> {
        let content = std::fs::read_to_string(file)
            .with_context(|| format!("failed to read {}", file.display()))?;
        let input: IngestInput = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse video metadata in {}", file.display()))?;

        match input {
            IngestInput::Single(details) => {
                let outcome = self
                    .ingestor()
                    .ingest_video(&details)
                    .with_context(|| format!("failed to ingest {}", details.video_id))?;
                self.out.ingested(&outcome)
            }
            IngestInput::Batch(videos) => {
                let items = self.ingestor().batch_classify(&videos)?;
                self.out.batch(&items)
            }
        }
    }

    fn cmd_log(
        &self,
        video: &str,
        watched: f64,
        duration: Option<f64>,
        at: Option<DateTime<FixedOffset>>,
        source: WatchSource,
    ) -> Result<()> {
        let user = self.current_user()?;
        let video_id = extract_video_id(video)?;

        let video_duration = match duration {
            Some(seconds) => seconds,
            None => {
                let stored = self
                    .db
                    .find_video_by_external_id(&video_id)?
                    .with_context(|| {
                        format!("video {} is not stored; ingest it first", video_id)
                    })?;
                stored.duration_seconds as f64
            }
        };

        let mut watch = NewWatch::new(&user, &video_id, watched, video_duration);
        watch.watched_at = at.map(|t| t.with_timezone(&Utc));
        watch.source = source;

        let entry = self
            .ingestor()
            .log_watch(&watch)
            .with_context(|| format!("failed to log watch of {}", video_id))?;
        self.out.watch_logged(&entry)
    }

    fn cmd_set_goals(
        &self,
        educational: Option<f64>,
        entertainment: Option<f64>,
        total: Option<f64>,
    ) -> Result<()> {
        let user = self.current_user()?;
        let current = self.goals_for(&user)?;
        let goals = DailyGoals {
            educational: educational.unwrap_or(current.educational),
            entertainment: entertainment.unwrap_or(current.entertainment),
            total: total.unwrap_or(current.total),
        };
        self.db
            .set_daily_goals(&user, &goals)
            .with_context(|| format!("failed to update goals for {}", user))?;
        self.out.goals_updated(&user, &goals)
    }

    fn cmd_user_add(
        &self,
        id: String,
        name: Option<String>,
        email: Option<String>,
        role: UserRole,
        parent: Option<String>,
    ) -> Result<()> {
        if let Some(parent_id) = &parent {
            let parent_user = self
                .db
                .get_user(parent_id)?
                .with_context(|| format!("no parent account '{}'", parent_id))?;
            if parent_user.role != UserRole::Parent {
                bail!("user '{}' is not a parent account", parent_id);
            }
        }

        let existing = self.db.get_user(&id)?;
        let user = User {
            name: name.unwrap_or_else(|| id.clone()),
            email,
            role,
            parent_id: parent,
            daily_goals: existing
                .as_ref()
                .map(|u| u.daily_goals)
                .unwrap_or(self.config.goals),
            created_at: existing.map(|u| u.created_at).unwrap_or_else(Utc::now),
            id,
        };
        self.db.upsert_user(&user).context("failed to save user")?;
        self.out.user(&user)
    }
}

/// Noon of `date` in the local offset, or now when no date is given.
fn reference(date: Option<NaiveDate>) -> Result<DateTime<FixedOffset>> {
    match date {
        None => Ok(Local::now().fixed_offset()),
        Some(day) => {
            let noon = day
                .and_hms_opt(12, 0, 0)
                .context("invalid time of day")?;
            Local
                .from_local_datetime(&noon)
                .single()
                .map(|dt| dt.fixed_offset())
                .with_context(|| format!("cannot place {} in the local time zone", day))
        }
    }
}

/// Local UTC offset in effect on `day`, which may differ from today's.
fn local_offset_on(day: NaiveDate) -> Result<FixedOffset> {
    Ok(*reference(Some(day))?.offset())
}
