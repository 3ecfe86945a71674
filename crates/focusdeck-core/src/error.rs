//! Core error types for focusdeck-core.
//!
//! Countdown, storage and sink failures all funnel into [`CoreError`] so the
//! CLI and the runtime can report them uniformly.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for focusdeck-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Start was requested while no task is selected.
    #[error("Please select a task before starting a Pomodoro!")]
    NoTaskSelected,

    /// Start was requested on a countdown that already reached zero.
    #[error("session has expired; reset the timer to start a new one")]
    SessionExpired,

    /// The focus time sink rejected or failed a write.
    #[error("focus sink '{sink}' failed to record {seconds}s for task {task_id}: {message}")]
    SinkWriteFailure {
        sink: String,
        task_id: String,
        seconds: u64,
        message: String,
    },

    /// Durable timer state exists but could not be decoded.
    #[error("malformed persisted timer state: key '{key}' = {value:?}")]
    HydrationParseFailure { key: String, value: String },

    #[error("task not found: {0}")]
    TaskNotFound(String),

    #[error("note not found: {0}")]
    NoteNotFound(i64),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The timer runtime task is gone (shut down or panicked).
    #[error("timer runtime is not running")]
    RuntimeStopped,
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Key does not exist in the configuration tree
    #[error("unknown config key: {0}")]
    UnknownKey(String),
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Text input was empty or whitespace only
    #[error("{0} must not be empty")]
    EmptyText(&'static str),
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
