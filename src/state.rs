//! Durable record of every task ever synced.
//!
//! The state file is the source of truth for task identity. The canonical
//! to-do list is regenerated from it, never the other way around, except for
//! the one-time migration of a list that predates the state file and the
//! folding of check-offs and edits made directly in the list.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::atomic::{write_atomic, STATE_FILE_MODE};
use crate::error::{Error, Result};
use crate::markdown::{ensure_task_id, format_line, read_tasks, Priority, Task};
use crate::storage::Storage;

pub const STATE_SCHEMA_VERSION: &str = "daytask.state.v1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskState {
    pub id: String,
    pub text: String,
    pub section: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub source_path: String,
    pub archived: bool,
    /// Insertion sequence; keeps the regenerated list stable.
    #[serde(default)]
    pub order: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due: Option<NaiveDate>,
    /// Text as it read in the daily note when first synced. Later list edits
    /// change `text` but not this, so the note line still maps back here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_text: Option<String>,
}

impl TaskState {
    fn from_task(id: String, task: &Task, source_path: &str, order: u64) -> Self {
        Self {
            id,
            text: task.text.clone(),
            section: task.section.clone(),
            completed: task.completed,
            created_at: Utc::now(),
            source_path: source_path.to_string(),
            archived: false,
            order,
            priority: task.priority,
            due: task.due,
            source_text: None,
        }
    }

    fn matches_source(&self, source_path: &str, text: &str) -> bool {
        self.source_path == source_path && self.source_text.as_deref().unwrap_or(&self.text) == text
    }

    /// Markdown checklist line for this task, id marker included.
    pub fn to_markdown(&self) -> String {
        format_line(
            self.completed,
            self.priority,
            &self.text,
            self.due,
            Some(&self.id),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoState {
    pub version: String,
    #[serde(default)]
    pub tasks: HashMap<String, TaskState>,
    #[serde(default)]
    pub migrated: bool,
}

impl Default for TodoState {
    fn default() -> Self {
        Self {
            version: STATE_SCHEMA_VERSION.to_string(),
            tasks: HashMap::new(),
            migrated: false,
        }
    }
}

impl TodoState {
    /// Load the state file; a missing file yields a fresh, unmigrated state.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(Error::file_op("read state file", path, e)),
        };

        serde_json::from_str(&content).map_err(|e| Error::CorruptState {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Persist the state atomically.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        write_atomic(path, json.as_bytes(), STATE_FILE_MODE)
    }

    pub fn needs_migration(&self) -> bool {
        !self.migrated
    }

    /// Record that there was no legacy list to fold in.
    pub fn mark_migrated(&mut self) {
        self.migrated = true;
    }

    /// Fold the tasks of a pre-existing canonical list into the state.
    ///
    /// Tasks without an id get one (written back into `tasks`). Tasks whose id
    /// is already stored are left alone. Returns the number inserted.
    pub fn migrate_from_markdown(&mut self, tasks: &mut [Task], origin: &str) -> usize {
        let mut inserted = 0;
        for task in tasks.iter_mut() {
            let id = ensure_task_id(task).to_string();
            if self.tasks.contains_key(&id) {
                continue;
            }
            let order = self.next_order();
            self.tasks
                .insert(id.clone(), TaskState::from_task(id, task, origin, order));
            inserted += 1;
        }
        self.migrated = true;
        tracing::info!(inserted, origin, "migrated legacy to-do list into state");
        inserted
    }

    pub fn has_task(&self, id: &str) -> bool {
        self.tasks.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&TaskState> {
        self.tasks.get(id)
    }

    /// Insert a newly discovered open task. Returns its id.
    pub fn add_task(&mut self, task: &mut Task, source_path: &str) -> String {
        let id = ensure_task_id(task).to_string();
        let order = self.next_order();
        let mut state = TaskState::from_task(id.clone(), task, source_path, order);
        state.completed = false;
        state.source_text = Some(task.text.clone());
        self.tasks.insert(id.clone(), state);
        id
    }

    /// Identifier of the record first synced from `source_path` with `text`,
    /// archived records included.
    ///
    /// Daily notes are never rewritten, so a note line without an id marker
    /// is reconnected to its record this way on every later pass.
    pub fn find_by_source(&self, source_path: &str, text: &str) -> Option<&str> {
        self.tasks
            .values()
            .filter(|task| task.matches_source(source_path, text))
            .min_by_key(|task| task.order)
            .map(|task| task.id.as_str())
    }

    /// Unarchived tasks in insertion order.
    pub fn active_tasks(&self) -> Vec<&TaskState> {
        self.sorted(|task| !task.archived)
    }

    /// Completed, unarchived tasks in insertion order.
    pub fn completed_tasks(&self) -> Vec<&TaskState> {
        self.sorted(|task| task.completed && !task.archived)
    }

    pub fn archived_count(&self) -> usize {
        self.tasks.values().filter(|task| task.archived).count()
    }

    /// Flip `archived` on every completed task. Returns the ids flipped.
    pub fn mark_archived(&mut self) -> Vec<String> {
        let mut flipped: Vec<(u64, String)> = self
            .tasks
            .values_mut()
            .filter(|task| task.completed && !task.archived)
            .map(|task| {
                task.archived = true;
                (task.order, task.id.clone())
            })
            .collect();
        flipped.sort();
        flipped.into_iter().map(|(_, id)| id).collect()
    }

    /// Fold edits made directly in the canonical list into the state.
    ///
    /// Known ids pick up the list's text, check-off state, priority and due
    /// date. Lines without an id, or with an id the state has never seen, are
    /// adopted as new records. Archived records stay archived. Returns the
    /// number of records changed or adopted.
    pub fn apply_list_edits(&mut self, tasks: &mut [Task], origin: &str) -> usize {
        let mut changed = 0;
        for task in tasks.iter_mut() {
            let id = ensure_task_id(task).to_string();
            match self.tasks.get_mut(&id) {
                Some(existing) if existing.archived => {}
                Some(existing) => {
                    if existing.text != task.text
                        || existing.completed != task.completed
                        || existing.priority != task.priority
                        || existing.due != task.due
                    {
                        tracing::debug!(id = %id, "folding list edit into state");
                        existing.text = task.text.clone();
                        existing.completed = task.completed;
                        existing.priority = task.priority;
                        existing.due = task.due;
                        changed += 1;
                    }
                }
                None => {
                    tracing::debug!(id = %id, text = %task.text, "adopting hand-added list task");
                    let order = self.next_order();
                    self.tasks
                        .insert(id.clone(), TaskState::from_task(id, task, origin, order));
                    changed += 1;
                }
            }
        }
        changed
    }

    fn next_order(&self) -> u64 {
        self.tasks
            .values()
            .map(|task| task.order + 1)
            .max()
            .unwrap_or(0)
    }

    fn sorted<F>(&self, keep: F) -> Vec<&TaskState>
    where
        F: Fn(&TaskState) -> bool,
    {
        let mut tasks: Vec<&TaskState> = self.tasks.values().filter(|task| keep(*task)).collect();
        tasks.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
        tasks
    }
}

/// State store plus the list file it was bootstrapped against
pub(crate) struct LoadedState {
    pub state: TodoState,
    pub list_tasks: Vec<Task>,
    pub list_exists: bool,
    pub migrated: bool,
}

/// Load the state store and the list on disk, folding a store-less legacy
/// list into the state exactly once. Callers hold the list lock.
pub(crate) fn load_state(storage: &Storage) -> Result<LoadedState> {
    let mut state = TodoState::read(storage.state_file())?;
    let list_exists = storage.todo_file().exists();
    let mut list_tasks = if list_exists {
        read_tasks(storage.todo_file())?
    } else {
        Vec::new()
    };

    let mut migrated = false;
    if state.needs_migration() {
        if list_exists {
            let origin = storage.todo_file().display().to_string();
            state.migrate_from_markdown(&mut list_tasks, &origin);
            migrated = true;
        } else {
            state.mark_migrated();
        }
    }

    Ok(LoadedState {
        state,
        list_tasks,
        list_exists,
        migrated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn task(text: &str, section: &str, completed: bool) -> Task {
        let mut task = Task::new(text, section);
        task.completed = completed;
        task
    }

    #[test]
    fn read_missing_file_is_fresh() {
        let temp = TempDir::new().unwrap();
        let state = TodoState::read(temp.path().join(".todo.state.json")).unwrap();
        assert!(state.tasks.is_empty());
        assert!(state.needs_migration());
        assert_eq!(state.version, STATE_SCHEMA_VERSION);
    }

    #[test]
    fn read_corrupt_file_is_fatal() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".todo.state.json");
        fs::write(&path, "{ not json").unwrap();

        let err = TodoState::read(&path).unwrap_err();
        assert!(matches!(err, Error::CorruptState { .. }));
    }

    #[test]
    fn write_then_read_preserves_state() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".todo.state.json");

        let mut state = TodoState::default();
        let mut item = task("Buy milk", "2026-10-19", false);
        item.priority = Some(Priority::P2);
        let id = state.add_task(&mut item, "diary/2026/10/2026-10-19.md");
        state.mark_migrated();
        state.write(&path).unwrap();

        let loaded = TodoState::read(&path).unwrap();
        assert_eq!(loaded, state);
        assert!(loaded.has_task(&id));
        assert!(!loaded.needs_migration());
    }

    #[test]
    fn add_task_assigns_id_and_opens_task() {
        let mut state = TodoState::default();
        let mut item = task("Water plants", "Home", true);

        let id = state.add_task(&mut item, "note.md");
        assert_eq!(item.id.as_deref(), Some(id.as_str()));

        let stored = state.get(&id).unwrap();
        assert!(!stored.completed);
        assert!(!stored.archived);
        assert_eq!(stored.source_path, "note.md");
    }

    #[test]
    fn migration_keeps_completion_and_skips_known_ids() {
        let mut state = TodoState::default();
        let mut tasks = vec![
            task("Active", "Work", false),
            task("Done", "Work", true),
        ];

        assert_eq!(state.migrate_from_markdown(&mut tasks, "todo.md"), 2);
        assert!(!state.needs_migration());
        assert_eq!(state.active_tasks().len(), 2);
        assert_eq!(state.completed_tasks().len(), 1);

        // Same tasks, now carrying ids: nothing new to insert
        assert_eq!(state.migrate_from_markdown(&mut tasks, "todo.md"), 0);
        assert_eq!(state.tasks.len(), 2);
    }

    #[test]
    fn mark_archived_flips_only_completed() {
        let mut state = TodoState::default();
        let mut tasks = vec![
            task("Keep", "Work", false),
            task("Done one", "Work", true),
            task("Done two", "Work", true),
        ];
        state.migrate_from_markdown(&mut tasks, "todo.md");

        let flipped = state.mark_archived();
        assert_eq!(flipped.len(), 2);
        assert_eq!(flipped[0], tasks[1].id.clone().unwrap());
        assert_eq!(state.active_tasks().len(), 1);
        assert!(state.completed_tasks().is_empty());
        assert_eq!(state.archived_count(), 2);
        // Audit trail: nothing removed
        assert_eq!(state.tasks.len(), 3);
    }

    #[test]
    fn list_edits_fold_check_offs_and_adopt_new_lines() {
        let mut state = TodoState::default();
        let mut item = task("Call plumber", "2026-10-18", false);
        let id = state.add_task(&mut item, "note.md");

        let mut edited = item.clone();
        edited.completed = true;
        let mut list = vec![edited, task("Hand added", "Misc", false)];

        assert_eq!(state.apply_list_edits(&mut list, "todo.md"), 2);
        assert!(state.get(&id).unwrap().completed);
        assert_eq!(state.tasks.len(), 2);

        // Re-applying the same list changes nothing
        assert_eq!(state.apply_list_edits(&mut list, "todo.md"), 0);
    }

    #[test]
    fn list_edits_do_not_revive_archived_tasks() {
        let mut state = TodoState::default();
        let mut tasks = vec![task("Done", "Work", true)];
        state.migrate_from_markdown(&mut tasks, "todo.md");
        state.mark_archived();

        let mut reopened = tasks.clone();
        reopened[0].completed = false;
        assert_eq!(state.apply_list_edits(&mut reopened, "todo.md"), 0);
        assert!(state.active_tasks().is_empty());
    }

    #[test]
    fn find_by_source_survives_renames_and_archiving() {
        let mut state = TodoState::default();
        let mut item = task("Buy milk", "2026-10-19", false);
        let id = state.add_task(&mut item, "note.md");

        let mut renamed = item.clone();
        renamed.text = "Buy oat milk".to_string();
        renamed.completed = true;
        state.apply_list_edits(std::slice::from_mut(&mut renamed), "todo.md");
        state.mark_archived();

        assert_eq!(state.find_by_source("note.md", "Buy milk"), Some(id.as_str()));
        assert_eq!(state.find_by_source("note.md", "Buy oat milk"), None);
        assert_eq!(state.find_by_source("other.md", "Buy milk"), None);
    }

    #[test]
    fn find_by_source_falls_back_to_text_for_migrated_records() {
        let mut state = TodoState::default();
        let mut tasks = vec![task("Pay rent", "Home", false)];
        state.migrate_from_markdown(&mut tasks, "todo.md");

        let id = tasks[0].id.as_deref().unwrap();
        assert_eq!(state.find_by_source("todo.md", "Pay rent"), Some(id));
    }
}
