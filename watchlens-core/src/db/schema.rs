//! Database schema and migrations
//!
//! Uses SQLite with embedded migrations managed via PRAGMA user_version.

use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// SQL migrations, indexed by version number
const MIGRATIONS: &[&str] = &[
    // Version 1: users, videos, flag records, watch history
    r#"
    -- ============================================
    -- Accounts
    -- ============================================

    CREATE TABLE IF NOT EXISTS users (
        id                 TEXT PRIMARY KEY,
        name               TEXT NOT NULL,
        email              TEXT,
        role               TEXT NOT NULL DEFAULT 'user',
        parent_id          TEXT REFERENCES users(id),
        goal_educational   REAL NOT NULL DEFAULT 60,
        goal_entertainment REAL NOT NULL DEFAULT 120,
        goal_total         REAL NOT NULL DEFAULT 180,
        created_at         DATETIME NOT NULL
    );

    -- ============================================
    -- Videos and classification
    -- ============================================

    CREATE TABLE IF NOT EXISTS videos (
        id               INTEGER PRIMARY KEY AUTOINCREMENT,
        video_id         TEXT NOT NULL UNIQUE,
        title            TEXT NOT NULL,
        description      TEXT NOT NULL DEFAULT '',
        channel_id       TEXT NOT NULL,
        channel_title    TEXT NOT NULL,
        duration         TEXT NOT NULL,
        duration_seconds INTEGER NOT NULL DEFAULT 0,
        tags             JSON NOT NULL DEFAULT '[]',
        view_count       INTEGER NOT NULL DEFAULT 0,
        published_at     DATETIME,

        -- Classification (flags are derived from flag_records)
        category         TEXT NOT NULL,
        age_rating       TEXT NOT NULL,
        confidence       REAL NOT NULL,
        keywords_version INTEGER NOT NULL DEFAULT 1,
        processed_at     DATETIME NOT NULL,

        created_at       DATETIME NOT NULL,
        updated_at       DATETIME NOT NULL
    );

    -- Append-only: rows are resolved, never deleted
    CREATE TABLE IF NOT EXISTS flag_records (
        id               INTEGER PRIMARY KEY AUTOINCREMENT,
        video_ref        INTEGER NOT NULL REFERENCES videos(id),
        flagged_by_user  TEXT,               -- NULL when raised by the classifier
        flag             TEXT NOT NULL,
        reason           TEXT NOT NULL,
        severity         TEXT NOT NULL DEFAULT 'medium',
        flagged_at       DATETIME NOT NULL,
        status           TEXT NOT NULL DEFAULT 'active',
        resolved_at      DATETIME
    );

    -- ============================================
    -- Watch events
    -- ============================================

    -- video_ref is not a foreign key: entries may outlive their video
    -- and are then skipped by the category breakdowns.
    CREATE TABLE IF NOT EXISTS watch_history (
        id                    TEXT PRIMARY KEY,
        user_id               TEXT NOT NULL,
        video_ref             INTEGER NOT NULL,
        youtube_video_id      TEXT NOT NULL,
        watch_duration        INTEGER NOT NULL DEFAULT 0,
        video_duration        INTEGER NOT NULL DEFAULT 1,
        completion_percentage INTEGER NOT NULL DEFAULT 0,
        watched_at            DATETIME NOT NULL,
        session_id            TEXT NOT NULL,
        source                TEXT NOT NULL DEFAULT 'web_app'
    );

    -- ============================================
    -- Indexes
    -- ============================================

    CREATE INDEX IF NOT EXISTS idx_users_parent ON users(parent_id);
    CREATE INDEX IF NOT EXISTS idx_videos_channel ON videos(channel_id);
    CREATE INDEX IF NOT EXISTS idx_videos_category ON videos(category);
    CREATE INDEX IF NOT EXISTS idx_flag_records_video ON flag_records(video_ref);
    CREATE INDEX IF NOT EXISTS idx_flag_records_status ON flag_records(status, severity);
    CREATE INDEX IF NOT EXISTS idx_watch_history_user_time ON watch_history(user_id, watched_at);
    CREATE INDEX IF NOT EXISTS idx_watch_history_youtube_id ON watch_history(youtube_video_id);
    "#,
];

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> crate::error::Result<()> {
    let current_version: i32 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;

    for (i, migration) in MIGRATIONS.iter().enumerate() {
        let version = (i + 1) as i32;
        if version > current_version {
            tracing::info!(version, "Running migration");
            conn.execute_batch(migration)?;
            conn.execute(&format!("PRAGMA user_version = {}", version), [])?;
        }
    }

    if current_version < SCHEMA_VERSION {
        tracing::info!(
            from = current_version,
            to = SCHEMA_VERSION,
            "Migrations complete"
        );
    }

    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> crate::error::Result<i32> {
    let version: i32 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    Ok(version)
}
