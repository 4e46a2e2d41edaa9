//! # watchlens-core
//!
//! Core library for watchlens - video watch tracking and productivity
//! analytics.
//!
//! This library provides:
//! - Domain types for videos, classifications, flag records and watch events
//! - A keyword classifier for category, age rating and content flags
//! - Database storage layer with SQLite
//! - Time-bucketed analytics: daily and weekly rollups, goal progress,
//!   productivity trend, top channels, flagged content, dashboards
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Architecture
//!
//! Data flows in one direction:
//! - **Ingest:** video metadata is classified once and stored with its
//!   flag records; watch events are appended to the history
//! - **Store:** SQLite tables behind the [`WatchStore`] contract
//! - **Analytics:** read-then-compute over a user's entries in a time
//!   window, returning plain serializable records
//!
//! ## Example
//!
//! ```rust,no_run
//! use watchlens_core::analytics::{daily_analytics, AnalyticsContext};
//! use watchlens_core::{Config, Database};
//!
//! // Load configuration
//! let config = Config::load().expect("failed to load config");
//!
//! // Open database
//! let db = Database::open(&Config::database_path()).expect("failed to open database");
//! db.migrate().expect("failed to run migrations");
//!
//! // Today's analytics for one user
//! let ctx = AnalyticsContext::new(&db).with_timeout(config.analytics.query_timeout());
//! let today = daily_analytics(&ctx, "user-1", chrono::Local::now().fixed_offset())
//!     .expect("failed to compute analytics");
//! println!("{} minutes, score {}", today.total_watch_time, today.productivity_score);
//! ```

// Re-export commonly used items at the crate root
pub use classifier::{classify, ClassificationResult};
pub use config::Config;
pub use db::{Database, HistoryQuery, Page, WatchStore};
pub use error::{Error, Result};
pub use ingest::{extract_video_id, Ingestor, NewWatch};
pub use types::*;

// Public modules
pub mod analytics;
pub mod classifier;
pub mod config;
pub mod db;
pub mod error;
pub mod format;
pub mod ingest;
pub mod logging;
pub mod types;
