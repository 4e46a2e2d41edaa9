//! Error types for watchlens-core

use thiserror::Error;

/// Main error type for the watchlens-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("database error: {0}")]
    Database(rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Input rejected before any computation started
    #[error("validation failed: {0}")]
    Validation(String),

    /// Video not found
    #[error("video not found: {0}")]
    VideoNotFound(String),

    /// User not found
    #[error("user not found: {0}")]
    UserNotFound(String),

    /// Request deadline expired before the computation finished
    #[error("analytics for user {user_id} over {window} exceeded {timeout_ms}ms")]
    Timeout {
        user_id: String,
        window: String,
        timeout_ms: u64,
    },

    /// An in-flight store query was interrupted by the caller
    #[error("query cancelled")]
    Cancelled,

    /// Store failure while computing analytics for a user and window
    #[error("query failed for user {user_id} over {window}: {source}")]
    Query {
        user_id: String,
        window: String,
        #[source]
        source: Box<Error>,
    },
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(ref failure, _)
                if failure.code == rusqlite::ErrorCode::OperationInterrupted =>
            {
                Error::Cancelled
            }
            other => Error::Database(other),
        }
    }
}

impl Error {
    /// Attach the user and window an analytics call was working on.
    ///
    /// Validation, not-found, timeout and cancellation errors already carry
    /// enough context and pass through unchanged.
    pub fn in_window(self, user_id: &str, window: impl std::fmt::Display) -> Self {
        match self {
            Error::Database(_) | Error::Io(_) | Error::Json(_) => Error::Query {
                user_id: user_id.to_string(),
                window: window.to_string(),
                source: Box::new(self),
            },
            other => other,
        }
    }
}

/// Result type alias for watchlens-core
pub type Result<T> = std::result::Result<T, Error>;
