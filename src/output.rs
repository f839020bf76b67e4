//! CLI output: a JSON envelope for scripts, a short text report for people.

use std::fmt;

use serde::Serialize;

use crate::error::{Error, Result};

pub const SCHEMA_VERSION: &str = "daytask.v1";

#[derive(Debug, Clone, Copy)]
pub struct OutputOptions {
    pub json: bool,
    pub quiet: bool,
}

/// A command result printable as JSON or as text
pub trait Report: Serialize {
    /// Subcommand name recorded in the JSON envelope
    fn command(&self) -> &'static str;

    fn render(&self) -> Rendered;
}

/// Text form of a [`Report`]
///
/// ```text
/// daytask sync: 2 new task(s)
///   note    diary/2026/10/2026-10-19.md
///   synced  2
/// warning: ...
/// hint: ...
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rendered {
    pub title: String,
    pub fields: Vec<(&'static str, String)>,
    pub notes: Vec<String>,
    pub warnings: Vec<String>,
    pub hint: Option<String>,
}

impl Rendered {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn field(&mut self, key: &'static str, value: impl ToString) -> &mut Self {
        self.fields.push((key, value.to_string()));
        self
    }

    pub fn note(&mut self, note: impl Into<String>) -> &mut Self {
        self.notes.push(note.into());
        self
    }

    pub fn warning(&mut self, warning: impl Into<String>) -> &mut Self {
        self.warnings.push(warning.into());
        self
    }

    pub fn hint(&mut self, hint: impl Into<String>) -> &mut Self {
        self.hint = Some(hint.into());
        self
    }
}

impl fmt::Display for Rendered {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)?;

        let width = self.fields.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
        for (key, value) in &self.fields {
            write!(f, "\n  {key:<width$}  {value}")?;
        }
        for note in &self.notes {
            write!(f, "\n  {note}")?;
        }
        for warning in &self.warnings {
            write!(f, "\nwarning: {warning}")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, "\nhint: {hint}")?;
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct SuccessEnvelope<'a, R: Serialize> {
    schema_version: &'static str,
    command: &'a str,
    status: &'static str,
    data: &'a R,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
}

/// Print a successful command result
pub fn emit<R: Report>(options: OutputOptions, report: &R) -> Result<()> {
    if options.json {
        let envelope = SuccessEnvelope {
            schema_version: SCHEMA_VERSION,
            command: report.command(),
            status: "success",
            data: report,
            warnings: report.render().warnings,
        };
        println!("{}", serde_json::to_string_pretty(&envelope)?);
    } else if !options.quiet {
        println!("{}", report.render());
    }
    Ok(())
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
    code: i32,
    kind: &'static str,
    retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

#[derive(Serialize)]
struct ErrorEnvelope<'a> {
    schema_version: &'static str,
    command: &'a str,
    status: &'static str,
    error: ErrorBody,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<String>,
}

/// Print a failed command; JSON goes to stdout, text to stderr
pub fn emit_error(command: &str, err: &Error, json: bool) -> Result<()> {
    let hint = error_hint(err);
    if json {
        let envelope = ErrorEnvelope {
            schema_version: SCHEMA_VERSION,
            command,
            status: "error",
            error: ErrorBody {
                message: err.to_string(),
                code: err.exit_code(),
                kind: error_kind(err),
                retryable: err.is_retryable(),
                details: err.details(),
            },
            hint,
        };
        println!("{}", serde_json::to_string_pretty(&envelope)?);
        return Ok(());
    }

    eprintln!("error: {err}");
    if let Some(hint) = hint {
        eprintln!("hint: {hint}");
    }
    Ok(())
}

/// First non-flag argument, used to label errors raised before parsing finishes
pub fn infer_command_name_from_args() -> String {
    std::env::args()
        .skip(1)
        .find(|arg| !arg.starts_with('-'))
        .unwrap_or_else(|| "daytask".to_string())
}

fn error_kind(err: &Error) -> &'static str {
    match err.exit_code() {
        2 => "user_error",
        3 => "contention",
        _ => "operation_failed",
    }
}

fn error_hint(err: &Error) -> Option<String> {
    match err {
        Error::LockFailed(path) => Some(format!(
            "another daytask run holds {}; retry when it finishes",
            path.display()
        )),
        Error::CorruptState { path, .. } => Some(format!(
            "restore {} from a backup, or move it aside to rebuild from the list",
            path.display()
        )),
        Error::InvalidTaskId { path, line, .. } => {
            Some(format!("fix the id marker at {}:{line}", path.display()))
        }
        Error::InvalidConfig(_) => Some("fix config.toml then retry".to_string()),
        Error::InsufficientSpace { .. } => Some("free some disk space then retry".to_string()),
        Error::PermissionDenied(path) => Some(format!("check permissions on {}", path.display())),
        _ => None,
    }
}
