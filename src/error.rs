//! Error types for daytask
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad args, bad config, no daily note yet)
//! - 3: Resource contention (lock timeout, disk full, no write permission)
//! - 4: Operation failed (I/O error, corrupt state, malformed task id)

use std::path::PathBuf;

use chrono::NaiveDate;
use serde_json::json;
use thiserror::Error;

/// Exit codes for the daytask CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const CONTENTION: i32 = 3;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for daytask operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("No daily note for {date}: {path} does not exist")]
    NoDailyNote { date: NaiveDate, path: PathBuf },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // Resource contention (exit code 3)
    #[error("Lock acquisition failed: {0}")]
    LockFailed(PathBuf),

    #[error("Insufficient disk space for {path}: need {needed} bytes, {available} available")]
    InsufficientSpace {
        path: PathBuf,
        needed: u64,
        available: u64,
    },

    #[error("Permission denied: cannot write to {0}")]
    PermissionDenied(PathBuf),

    // Operation failures (exit code 4)
    #[error("State file {path} is corrupt: {message}")]
    CorruptState { path: PathBuf, message: String },

    #[error("Invalid task id {value:?} at {path}:{line}")]
    InvalidTaskId {
        path: PathBuf,
        line: usize,
        value: String,
    },

    #[error("Failed to {action} {path}: {source}")]
    FileOp {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

impl Error {
    /// Wrap an I/O error with the operation and path it came from
    pub fn file_op(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::FileOp {
            action,
            path: path.into(),
            source,
        }
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            // User errors
            Error::NoDailyNote { .. } | Error::InvalidConfig(_) | Error::InvalidArgument(_) => {
                exit_codes::USER_ERROR
            }

            // Contention
            Error::LockFailed(_)
            | Error::InsufficientSpace { .. }
            | Error::PermissionDenied(_) => exit_codes::CONTENTION,

            // Operation failures
            Error::CorruptState { .. }
            | Error::InvalidTaskId { .. }
            | Error::FileOp { .. }
            | Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::OperationFailed(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// True when nothing was changed and the caller can simply try again later
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::NoDailyNote { .. }
                | Error::LockFailed(_)
                | Error::InsufficientSpace { .. }
                | Error::PermissionDenied(_)
        )
    }

    /// Structured fields for JSON error output
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::NoDailyNote { date, path } => Some(json!({
                "date": date.to_string(),
                "path": path.to_string_lossy(),
            })),
            Error::InvalidConfig(message) => Some(json!({ "message": message })),
            Error::LockFailed(path) | Error::PermissionDenied(path) => {
                Some(json!({ "path": path.to_string_lossy() }))
            }
            Error::InsufficientSpace {
                path,
                needed,
                available,
            } => Some(json!({
                "path": path.to_string_lossy(),
                "needed": needed,
                "available": available,
            })),
            Error::CorruptState { path, message } => Some(json!({
                "path": path.to_string_lossy(),
                "message": message,
            })),
            Error::InvalidTaskId { path, line, value } => Some(json!({
                "path": path.to_string_lossy(),
                "line": line,
                "value": value,
            })),
            Error::FileOp { action, path, .. } => Some(json!({
                "action": action,
                "path": path.to_string_lossy(),
            })),
            _ => None,
        }
    }
}

/// Result type alias for daytask operations
pub type Result<T> = std::result::Result<T, Error>;

/// Wrapper for displaying errors in JSON format
#[derive(serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&Error> for JsonError {
    fn from(err: &Error) -> Self {
        JsonError {
            error: err.to_string(),
            code: err.exit_code(),
            details: err.details(),
        }
    }
}
