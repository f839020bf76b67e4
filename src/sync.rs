//! Daily note to canonical list reconciliation.
//!
//! One pass reads the task section of a daily note, decides which open tasks
//! are new, records them in the state store and regenerates the canonical
//! list. Running a pass twice over an unchanged note is a no-op.
//!
//! A task is new only when all of these miss:
//! - the state store knows its id
//! - the list file on disk carries its id
//! - the list file on disk carries a task with exactly the same text
//!
//! Text matching is exact equality; "Review proposal" does not match
//! "Review proposal document".
//!
//! Daily notes are read-only. A note line without an id marker gets the id of
//! the record first synced from the same note with the same text (see
//! [`TodoState::find_by_source`]), so archiving a task or renaming it in the
//! list does not make the note line look new again.
//!
//! [`TodoState::find_by_source`]: crate::state::TodoState::find_by_source

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::lock::{FileLock, DEFAULT_LOCK_TIMEOUT_MS};
use crate::markdown::{ensure_task_id, read_tasks, Task};
use crate::state::load_state;
use crate::storage::Storage;
use crate::todo_list;

pub const DEFAULT_TASK_SECTION: &str = "Tasks";

/// Cooperative cancellation shared with signal handlers
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// The underlying flag, for `signal_hook::flag::register`
    pub fn handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncMode {
    /// Pull new tasks from the note; id matches are never compared
    #[default]
    OneWay,
    /// Also compare tasks present in both places and stop on divergence
    Bidirectional,
}

#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Heading of the daily-note section holding actionable items
    pub task_section: String,
    pub lock_timeout: Duration,
    pub mode: SyncMode,
    /// Copy the list to `<list>.backup` before rewriting it
    pub backup: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            task_section: DEFAULT_TASK_SECTION.to_string(),
            lock_timeout: Duration::from_millis(DEFAULT_LOCK_TIMEOUT_MS),
            mode: SyncMode::OneWay,
            backup: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictReason {
    TextDiffers,
    CompletionDiffers,
}

impl fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictReason::TextDiffers => f.write_str("text differs"),
            ConflictReason::CompletionDiffers => f.write_str("completion differs"),
        }
    }
}

/// A task edited independently in the daily note and in the list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncConflict {
    pub id: String,
    pub text_from_daily: String,
    pub text_from_todo: String,
    pub reason: ConflictReason,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub date: NaiveDate,
    pub note_path: PathBuf,
    /// Open tasks found in the note's task section
    pub tasks_read: usize,
    pub tasks_synced: usize,
    /// True when this pass folded a legacy list into a new state store
    pub migrated: bool,
    /// Non-empty means nothing was written
    pub conflicts: Vec<SyncConflict>,
}

impl SyncReport {
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BackfillReport {
    pub notes_scanned: usize,
    pub tasks_synced: usize,
    pub conflicts: Vec<SyncConflict>,
    pub cancelled: bool,
}

pub struct SyncEngine {
    storage: Storage,
    options: SyncOptions,
}

impl SyncEngine {
    pub fn new(storage: Storage, options: SyncOptions) -> Self {
        Self { storage, options }
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Sync today's daily note
    pub fn sync_tasks(&self) -> Result<SyncReport> {
        self.sync_date(Local::now().date_naive())
    }

    /// Sync the daily note for `date`
    pub fn sync_date(&self, date: NaiveDate) -> Result<SyncReport> {
        let note_path = self.storage.daily_note_path(date);
        if !note_path.exists() {
            return Err(Error::NoDailyNote {
                date,
                path: note_path,
            });
        }

        let section_tasks: Vec<Task> = read_tasks(&note_path)?
            .into_iter()
            .filter(|task| task.section == self.options.task_section)
            .collect();
        let mut candidates: Vec<Task> = section_tasks
            .iter()
            .filter(|task| !task.completed)
            .cloned()
            .collect();

        let mut report = SyncReport {
            date,
            note_path: note_path.clone(),
            tasks_read: candidates.len(),
            tasks_synced: 0,
            migrated: false,
            conflicts: Vec::new(),
        };

        let _lock = FileLock::acquire(self.storage.todo_file(), self.options.lock_timeout)?;
        let mut loaded = load_state(&self.storage)?;
        report.migrated = loaded.migrated;

        if self.options.mode == SyncMode::Bidirectional {
            let conflicts = detect_conflicts(&section_tasks, &loaded.list_tasks);
            if !conflicts.is_empty() {
                tracing::warn!(
                    note = %note_path.display(),
                    conflicts = conflicts.len(),
                    "tasks diverged between daily note and list; nothing written"
                );
                report.migrated = false;
                report.conflicts = conflicts;
                return Ok(report);
            }
        }

        let todo_origin = self.storage.todo_file().display().to_string();
        let folded = loaded
            .state
            .apply_list_edits(&mut loaded.list_tasks, &todo_origin);

        // The note carries no marker for ids assigned by earlier passes;
        // reconnect those lines to their records, archived ones included.
        let source = note_path.display().to_string();
        for task in candidates.iter_mut().filter(|task| task.id.is_none()) {
            if let Some(id) = loaded.state.find_by_source(&source, &task.text) {
                task.id = Some(id.to_string());
            }
        }

        let mut list_ids: HashSet<String> = HashSet::new();
        let mut list_texts: HashSet<String> = HashSet::new();
        for task in &loaded.list_tasks {
            if let Some(id) = &task.id {
                list_ids.insert(id.clone());
            }
            list_texts.insert(task.text.clone());
        }

        let section = date.format("%Y-%m-%d").to_string();
        for mut task in candidates {
            let id = ensure_task_id(&mut task).to_string();
            if loaded.state.has_task(&id) || list_ids.contains(&id) || list_texts.contains(&task.text)
            {
                tracing::debug!(id = %id, text = %task.text, "already tracked");
                continue;
            }

            tracing::debug!(id = %id, text = %task.text, "syncing new task");
            task.section = section.clone();
            list_texts.insert(task.text.clone());
            loaded.state.add_task(&mut task, &source);
            report.tasks_synced += 1;
        }

        let changed =
            loaded.migrated || folded > 0 || report.tasks_synced > 0 || !loaded.list_exists;
        if changed {
            // List first: a failed rewrite must not leave a state file that
            // describes a list that was never produced.
            todo_list::write(self.storage.todo_file(), &loaded.state, self.options.backup)?;
            loaded.state.write(self.storage.state_file())?;
        }

        tracing::info!(
            date = %date,
            read = report.tasks_read,
            synced = report.tasks_synced,
            folded,
            migrated = report.migrated,
            "sync complete"
        );
        Ok(report)
    }

    /// Sync every daily note in the diary, oldest first
    ///
    /// Each note is committed on its own; when `cancel` is set the scan stops
    /// before the next note and reports what was already committed.
    pub fn backfill(&self, cancel: &CancelFlag) -> Result<BackfillReport> {
        let mut report = BackfillReport::default();

        for (date, _) in self.storage.list_daily_notes(cancel)? {
            if cancel.is_cancelled() {
                break;
            }
            let result = self.sync_date(date)?;
            report.notes_scanned += 1;
            report.tasks_synced += result.tasks_synced;
            report.conflicts.extend(result.conflicts);
        }

        report.cancelled = cancel.is_cancelled();
        tracing::info!(
            notes = report.notes_scanned,
            synced = report.tasks_synced,
            cancelled = report.cancelled,
            "backfill complete"
        );
        Ok(report)
    }
}

/// Tasks sharing an embedded id between the note's task section and the list
/// conflict when their text or their completion differs.
fn detect_conflicts(daily: &[Task], list: &[Task]) -> Vec<SyncConflict> {
    let by_id: HashMap<&str, &Task> = list
        .iter()
        .filter_map(|task| task.id.as_deref().map(|id| (id, task)))
        .collect();

    daily
        .iter()
        .filter_map(|task| {
            let id = task.id.as_deref()?;
            let other = by_id.get(id)?;
            let reason = if task.text != other.text {
                ConflictReason::TextDiffers
            } else if task.completed != other.completed {
                ConflictReason::CompletionDiffers
            } else {
                return None;
            };
            Some(SyncConflict {
                id: id.to_string(),
                text_from_daily: task.text.clone(),
                text_from_todo: other.text.clone(),
                reason,
            })
        })
        .collect()
}
