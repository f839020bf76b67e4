#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use daytask::archive::{ArchiveEngine, ArchiveOptions};
use daytask::markdown::{read_tasks, Task};
use daytask::state::TodoState;
use daytask::storage::Storage;
use daytask::sync::{SyncEngine, SyncMode, SyncOptions};
use tempfile::TempDir;

/// A throwaway diary with a canonical list beside it
pub struct TestDiary {
    dir: TempDir,
    storage: Storage,
}

impl TestDiary {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let storage = Storage::new(dir.path().join("diary"), dir.path().join("todo.md"));
        Self { dir, storage }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn storage(&self) -> Storage {
        self.storage.clone()
    }

    pub fn write_note(&self, date: NaiveDate, contents: &str) -> PathBuf {
        let path = self.storage.daily_note_path(date);
        fs::create_dir_all(path.parent().expect("note dir")).expect("create note dir");
        fs::write(&path, contents).expect("write note");
        path
    }

    pub fn write_todo(&self, contents: &str) {
        fs::write(self.storage.todo_file(), contents).expect("write todo");
    }

    pub fn read_todo(&self) -> String {
        fs::read_to_string(self.storage.todo_file()).expect("read todo")
    }

    pub fn todo_tasks(&self) -> Vec<Task> {
        read_tasks(self.storage.todo_file()).expect("parse todo")
    }

    pub fn state(&self) -> TodoState {
        TodoState::read(self.storage.state_file()).expect("read state")
    }

    pub fn sync_engine(&self) -> SyncEngine {
        SyncEngine::new(self.storage(), fast_options(SyncMode::OneWay))
    }

    pub fn bidirectional_engine(&self) -> SyncEngine {
        SyncEngine::new(self.storage(), fast_options(SyncMode::Bidirectional))
    }

    pub fn archive_engine(&self) -> ArchiveEngine {
        ArchiveEngine::new(
            self.storage(),
            ArchiveOptions {
                lock_timeout: Duration::from_millis(200),
                backup: true,
            },
        )
    }
}

pub fn fast_options(mode: SyncMode) -> SyncOptions {
    SyncOptions {
        lock_timeout: Duration::from_millis(200),
        mode,
        ..SyncOptions::default()
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub fn today() -> NaiveDate {
    date(2026, 10, 19)
}

/// Open task texts in a parsed list, in file order
pub fn texts(tasks: &[Task]) -> Vec<&str> {
    tasks.iter().map(|task| task.text.as_str()).collect()
}
