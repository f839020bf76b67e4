//! Markdown checklist parsing and formatting.
//!
//! A task line looks like:
//!
//! ```text
//! - [ ] [P1] Review proposal #work due:2026-10-20 <!-- id:01jaxq3v8k2m9r7t5w4y6z0b1c -->
//! ```
//!
//! The heading above a task line is its section. `#tag` tokens stay part of
//! the text; priority, due date and the id marker are lifted out of it.

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::error::{Error, Result};

const ID_MARKER_OPEN: &str = "<!-- id:";
const ID_MARKER_CLOSE: &str = "-->";
const DUE_PREFIX: &str = "due:";
const TASK_ID_LEN: usize = 26;
const TASK_ID_CHARSET: &str = "0123456789abcdefghjkmnpqrstvwxyz";
const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Priority {
    P0,
    P1,
    P2,
    P3,
}

impl Priority {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "P0" => Some(Priority::P0),
            "P1" => Some(Priority::P1),
            "P2" => Some(Priority::P2),
            "P3" => Some(Priority::P3),
            _ => None,
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        token
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .and_then(Self::parse)
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Priority::P0 => "P0",
            Priority::P1 => "P1",
            Priority::P2 => "P2",
            Priority::P3 => "P3",
        };
        f.write_str(name)
    }
}

/// A checklist item as read from a markdown file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: Option<String>,
    pub text: String,
    pub section: String,
    pub completed: bool,
    pub priority: Option<Priority>,
    pub tags: BTreeSet<String>,
    pub due: Option<NaiveDate>,
    /// 1-based line number in the source file
    pub line: usize,
}

impl Task {
    pub fn new(text: impl Into<String>, section: impl Into<String>) -> Self {
        Self {
            id: None,
            text: text.into(),
            section: section.into(),
            completed: false,
            priority: None,
            tags: BTreeSet::new(),
            due: None,
            line: 0,
        }
    }
}

/// Generate a fresh task identifier (lowercase ULID).
pub fn new_task_id() -> String {
    Ulid::new().to_string().to_ascii_lowercase()
}

pub fn is_valid_task_id(value: &str) -> bool {
    value.len() == TASK_ID_LEN && value.chars().all(|c| TASK_ID_CHARSET.contains(c))
}

/// Give `task` an identifier if it has none; returns the identifier.
pub fn ensure_task_id(task: &mut Task) -> &str {
    task.id.get_or_insert_with(new_task_id)
}

/// Read every task line in a markdown file.
pub fn read_tasks(path: impl AsRef<Path>) -> Result<Vec<Task>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| Error::file_op("read", path, e))?;
    parse_tasks(&content, path)
}

/// Parse task lines out of markdown content. `path` is only used for errors.
pub fn parse_tasks(content: &str, path: &Path) -> Result<Vec<Task>> {
    let mut tasks = Vec::new();
    let mut section = String::new();
    let mut in_fence = false;

    for (idx, line) in content.lines().enumerate() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }

        if let Some(heading) = parse_heading(trimmed) {
            section = heading.to_string();
            continue;
        }

        let Some((completed, body)) = parse_checkbox(trimmed) else {
            continue;
        };

        let (body, id) = take_id_marker(body);
        let id = match id {
            Some(raw) => {
                let normalized = raw.to_ascii_lowercase();
                if !is_valid_task_id(&normalized) {
                    return Err(Error::InvalidTaskId {
                        path: path.to_path_buf(),
                        line: idx + 1,
                        value: raw,
                    });
                }
                Some(normalized)
            }
            None => None,
        };

        let mut task = Task::new(String::new(), section.clone());
        task.id = id;
        task.completed = completed;
        task.line = idx + 1;

        let mut words = Vec::new();
        for token in body.split_whitespace() {
            if task.priority.is_none() {
                if let Some(priority) = Priority::from_token(token) {
                    task.priority = Some(priority);
                    continue;
                }
            }
            if task.due.is_none() {
                if let Some(date) = token
                    .strip_prefix(DUE_PREFIX)
                    .and_then(|raw| NaiveDate::parse_from_str(raw, DATE_FORMAT).ok())
                {
                    task.due = Some(date);
                    continue;
                }
            }
            if let Some(tag) = token.strip_prefix('#') {
                if !tag.is_empty() {
                    task.tags.insert(tag.to_string());
                }
            }
            words.push(token);
        }

        if words.is_empty() {
            continue;
        }
        task.text = words.join(" ");
        tasks.push(task);
    }

    Ok(tasks)
}

/// Render a task as a markdown checklist line.
pub fn format_task(task: &Task) -> String {
    format_line(
        task.completed,
        task.priority,
        &task.text,
        task.due,
        task.id.as_deref(),
    )
}

pub(crate) fn format_line(
    completed: bool,
    priority: Option<Priority>,
    text: &str,
    due: Option<NaiveDate>,
    id: Option<&str>,
) -> String {
    let mut line = String::from(if completed { "- [x] " } else { "- [ ] " });
    if let Some(priority) = priority {
        line.push_str(&format!("[{priority}] "));
    }
    line.push_str(text);
    if let Some(due) = due {
        line.push_str(&format!(" {DUE_PREFIX}{}", due.format(DATE_FORMAT)));
    }
    if let Some(id) = id {
        line.push_str(&format!(" {ID_MARKER_OPEN}{id} {ID_MARKER_CLOSE}"));
    }
    line
}

fn parse_heading(line: &str) -> Option<&str> {
    let hashes = line.chars().take_while(|c| *c == '#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }
    let rest = &line[hashes..];
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some(rest.trim().trim_end_matches('#').trim())
}

fn parse_checkbox(line: &str) -> Option<(bool, &str)> {
    let rest = line
        .strip_prefix("- ")
        .or_else(|| line.strip_prefix("* "))?;
    let (completed, body) = if let Some(body) = rest.strip_prefix("[ ]") {
        (false, body)
    } else if let Some(body) = rest
        .strip_prefix("[x]")
        .or_else(|| rest.strip_prefix("[X]"))
    {
        (true, body)
    } else {
        return None;
    };
    if !body.is_empty() && !body.starts_with(char::is_whitespace) {
        return None;
    }
    Some((completed, body.trim()))
}

fn take_id_marker(body: &str) -> (String, Option<String>) {
    if let Some(start) = body.find(ID_MARKER_OPEN) {
        let inner_start = start + ID_MARKER_OPEN.len();
        if let Some(len) = body[inner_start..].find(ID_MARKER_CLOSE) {
            let id = body[inner_start..inner_start + len].trim().to_string();
            let rest = format!(
                "{} {}",
                &body[..start],
                &body[inner_start + len + ID_MARKER_CLOSE.len()..]
            );
            return (rest, Some(id));
        }
    }
    (body.to_string(), None)
}
