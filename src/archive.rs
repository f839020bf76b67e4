//! Moving completed tasks out of the canonical list.
//!
//! Completed tasks are appended to a monthly archive document, dropped from
//! the regenerated list and flagged `archived` in the state store. The state
//! records themselves are kept.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{Local, NaiveDate};
use serde::Serialize;

use crate::atomic::{write_atomic_str, MARKDOWN_FILE_MODE};
use crate::error::{Error, Result};
use crate::lock::{FileLock, DEFAULT_LOCK_TIMEOUT_MS};
use crate::state::{load_state, TaskState};
use crate::storage::Storage;
use crate::todo_list;

#[derive(Debug, Clone)]
pub struct ArchiveOptions {
    pub lock_timeout: Duration,
    /// Copy the list to `<list>.backup` before rewriting it
    pub backup: bool,
}

impl Default for ArchiveOptions {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_millis(DEFAULT_LOCK_TIMEOUT_MS),
            backup: true,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ArchiveReport {
    pub archived: usize,
    pub remaining: usize,
    /// `None` when there was nothing to archive
    pub archive_path: Option<PathBuf>,
}

pub struct ArchiveEngine {
    storage: Storage,
    options: ArchiveOptions,
}

impl ArchiveEngine {
    pub fn new(storage: Storage, options: ArchiveOptions) -> Self {
        Self { storage, options }
    }

    /// Archive completed tasks under today's date
    pub fn archive_tasks(&self) -> Result<ArchiveReport> {
        self.archive_on(Local::now().date_naive())
    }

    /// Archive completed tasks into the document for the month of `date`
    pub fn archive_on(&self, date: NaiveDate) -> Result<ArchiveReport> {
        let _lock = FileLock::acquire(self.storage.todo_file(), self.options.lock_timeout)?;

        let mut loaded = load_state(&self.storage)?;
        let origin = self.storage.todo_file().display().to_string();
        // Items checked off in the list count as completed.
        loaded
            .state
            .apply_list_edits(&mut loaded.list_tasks, &origin);

        let completed: Vec<TaskState> = loaded
            .state
            .completed_tasks()
            .into_iter()
            .cloned()
            .collect();
        if completed.is_empty() {
            let remaining = loaded.state.active_tasks().len();
            tracing::info!(remaining, "nothing to archive");
            return Ok(ArchiveReport {
                archived: 0,
                remaining,
                archive_path: None,
            });
        }

        let archive_path = self.storage.archive_file(date);
        let document = append_to_archive(&archive_path, date, &completed)?;
        write_atomic_str(&archive_path, &document, MARKDOWN_FILE_MODE)?;

        loaded.state.mark_archived();
        todo_list::write(self.storage.todo_file(), &loaded.state, self.options.backup)?;
        loaded.state.write(self.storage.state_file())?;

        let remaining = loaded.state.active_tasks().len();
        tracing::info!(
            archived = completed.len(),
            remaining,
            archive = %archive_path.display(),
            "archive complete"
        );
        Ok(ArchiveReport {
            archived: completed.len(),
            remaining,
            archive_path: Some(archive_path),
        })
    }
}

/// Existing archive content (or a fresh titled document) with a new dated
/// subsection listing `tasks`.
fn append_to_archive(path: &Path, date: NaiveDate, tasks: &[TaskState]) -> Result<String> {
    let mut document = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            format!("# Archive: {}\n", date.format("%B %Y"))
        }
        Err(e) => return Err(Error::file_op("read archive", path, e)),
    };

    if !document.ends_with('\n') {
        document.push('\n');
    }
    document.push_str(&format!("\n## Archived on {}\n\n", date.format("%Y-%m-%d")));
    for task in tasks {
        document.push_str(&task.to_markdown());
        document.push('\n');
    }
    Ok(document)
}
