//! Core error types for timeruler-core.
//!
//! Engine failures are reported through the closed [`ScheduleError`] enum.
//! Everything that touches the outside world (files, configuration, JSON)
//! is wrapped by [`CoreError`].

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for timeruler-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Timeline engine errors
    #[error("Schedule error: {0}")]
    Schedule(#[from] ScheduleError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors produced by the timeline engine.
///
/// Every engine operation either succeeds completely or returns one of these
/// and leaves the schedule untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// A proposed interval is malformed: too short, in the past where that is
    /// not allowed, or outside the current day.
    #[error("Invalid time: {0}")]
    InvalidTime(String),

    /// A structural violation of the timeline.
    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),

    /// Index-based operation outside `[0, len)`.
    #[error("Index {index} out of bounds for schedule (length: {len})")]
    IndexOutOfBounds { index: usize, len: usize },

    /// Malformed ingestion record.
    #[error("Line {line}: {message}")]
    Parse { line: usize, message: String },
}

impl ScheduleError {
    pub(crate) fn invalid_time(msg: impl Into<String>) -> Self {
        Self::InvalidTime(msg.into())
    }

    pub(crate) fn invalid_schedule(msg: impl Into<String>) -> Self {
        Self::InvalidSchedule(msg.into())
    }

    pub(crate) fn parse(line: usize, msg: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: msg.into(),
        }
    }
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

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Could not locate the configuration directory
    #[error("Cannot resolve configuration directory: {0}")]
    NoDataDir(String),
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
