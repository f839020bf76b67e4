use std::io;
use std::path::PathBuf;

use chrono::NaiveDate;
use serde_json::Value;
use daytask::error::{exit_codes, Error, JsonError};

#[test]
fn exit_code_user_error() {
    let err = Error::NoDailyNote {
        date: NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
        path: PathBuf::from("diary/2026/10/2026-10-19.md"),
    };
    assert_eq!(err.exit_code(), exit_codes::USER_ERROR);
    assert_eq!(
        Error::InvalidArgument("bad input".to_string()).exit_code(),
        exit_codes::USER_ERROR
    );
}

#[test]
fn exit_code_contention() {
    let err = Error::LockFailed(PathBuf::from("todo.md.lock"));
    assert_eq!(err.exit_code(), exit_codes::CONTENTION);
    assert!(err.is_retryable());

    let err = Error::InsufficientSpace {
        path: PathBuf::from("todo.md"),
        needed: 8192,
        available: 10,
    };
    assert_eq!(err.exit_code(), exit_codes::CONTENTION);
}

#[test]
fn exit_code_operation_failed() {
    let err = Error::OperationFailed("boom".to_string());
    assert_eq!(err.exit_code(), exit_codes::OPERATION_FAILED);
    assert!(!err.is_retryable());

    let err = Error::CorruptState {
        path: PathBuf::from(".todo.state.json"),
        message: "EOF while parsing".to_string(),
    };
    assert_eq!(err.exit_code(), exit_codes::OPERATION_FAILED);
    assert!(!err.is_retryable());
}

#[test]
fn file_op_keeps_source() {
    let err = Error::file_op(
        "read",
        "todo.md",
        io::Error::new(io::ErrorKind::Other, "disk on fire"),
    );
    assert_eq!(err.to_string(), "Failed to read todo.md: disk on fire");
    assert!(std::error::Error::source(&err).is_some());
    assert_eq!(err.details().expect("details")["action"], Value::String("read".to_string()));
}

#[test]
fn details_include_task_id_fields() {
    let err = Error::InvalidTaskId {
        path: PathBuf::from("todo.md"),
        line: 7,
        value: "xyz".to_string(),
    };
    let details = err.details().expect("details");
    assert_eq!(details["path"], Value::String("todo.md".to_string()));
    assert_eq!(details["line"], Value::from(7));
    assert_eq!(details["value"], Value::String("xyz".to_string()));
}

#[test]
fn json_error_includes_details() {
    let err = Error::InvalidConfig("bad config".to_string());
    let json = JsonError::from(&err);
    assert_eq!(json.code, exit_codes::USER_ERROR);
    let details = json.details.expect("details");
    assert_eq!(details["message"], Value::String("bad config".to_string()));
}
