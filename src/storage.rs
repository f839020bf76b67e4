//! On-disk layout for daytask
//!
//! # Directory Structure
//!
//! ```text
//! <diary_root>/
//!   2026/
//!     10/
//!       2026-10-19.md           # Daily note (read-only input)
//!
//! <todo dir>/
//!   todo.md                     # Canonical list (regenerated)
//!   todo.md.lock                # Advisory lock sidecar
//!   todo.md.backup              # Copy taken before each rewrite
//!   .todo.state.json            # State store
//!   archive/
//!     2026-10.md                # Monthly archive document
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};

use crate::atomic::backup_path_for;
use crate::error::{Error, Result};
use crate::lock::lock_path_for;
use crate::sync::CancelFlag;

/// Default name of the archive directory next to the canonical list
pub const ARCHIVE_DIR: &str = "archive";

const NOTE_EXTENSION: &str = "md";

/// Path layout for one diary and its canonical list
#[derive(Debug, Clone)]
pub struct Storage {
    diary_root: PathBuf,
    todo_file: PathBuf,
    archive_dir: PathBuf,
}

impl Storage {
    /// Create a layout; archives default to `archive/` beside the list
    pub fn new(diary_root: impl Into<PathBuf>, todo_file: impl Into<PathBuf>) -> Self {
        let todo_file = todo_file.into();
        let archive_dir = todo_dir(&todo_file).join(ARCHIVE_DIR);
        Self {
            diary_root: diary_root.into(),
            todo_file,
            archive_dir,
        }
    }

    pub fn with_archive_dir(mut self, archive_dir: impl Into<PathBuf>) -> Self {
        self.archive_dir = archive_dir.into();
        self
    }

    // =========================================================================
    // Path accessors
    // =========================================================================

    pub fn diary_root(&self) -> &Path {
        &self.diary_root
    }

    /// Path to the canonical to-do list
    pub fn todo_file(&self) -> &Path {
        &self.todo_file
    }

    pub fn archive_dir(&self) -> &Path {
        &self.archive_dir
    }

    /// Path to the state store: a dotfile named after the list, beside it
    pub fn state_file(&self) -> PathBuf {
        let stem = self
            .todo_file
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "todo".to_string());
        todo_dir(&self.todo_file).join(format!(".{stem}.state.json"))
    }

    /// Path to the lock sidecar guarding the canonical list
    pub fn lock_file(&self) -> PathBuf {
        lock_path_for(&self.todo_file)
    }

    pub fn backup_file(&self) -> PathBuf {
        backup_path_for(&self.todo_file)
    }

    /// Path to the daily note for `date`: `<diary>/<YYYY>/<MM>/<YYYY-MM-DD>.md`
    pub fn daily_note_path(&self, date: NaiveDate) -> PathBuf {
        self.diary_root
            .join(format!("{:04}", date.year()))
            .join(format!("{:02}", date.month()))
            .join(format!("{}.{NOTE_EXTENSION}", date.format("%Y-%m-%d")))
    }

    /// Path to the archive document for the month containing `date`
    pub fn archive_file(&self, date: NaiveDate) -> PathBuf {
        self.archive_dir
            .join(format!("{}.{NOTE_EXTENSION}", date.format("%Y-%m")))
    }

    // =========================================================================
    // Diary scan
    // =========================================================================

    /// List every date-stamped daily note under the diary root, oldest first
    ///
    /// Checks `cancel` between directories and returns what was found so far
    /// once it is set.
    pub fn list_daily_notes(&self, cancel: &CancelFlag) -> Result<Vec<(NaiveDate, PathBuf)>> {
        let mut notes = Vec::new();

        for year_dir in subdirs(&self.diary_root, 4)? {
            for month_dir in subdirs(&year_dir, 2)? {
                if cancel.is_cancelled() {
                    notes.sort();
                    return Ok(notes);
                }
                let entries = match fs::read_dir(&month_dir) {
                    Ok(entries) => entries,
                    Err(e) => return Err(Error::file_op("read directory", &month_dir, e)),
                };
                for entry in entries {
                    let path = entry
                        .map_err(|e| Error::file_op("read directory", &month_dir, e))?
                        .path();
                    if let Some(date) = note_date(&path) {
                        notes.push((date, path));
                    }
                }
            }
        }

        notes.sort();
        Ok(notes)
    }
}

fn todo_dir(todo_file: &Path) -> PathBuf {
    match todo_file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Subdirectories of `dir` whose names are `width` ASCII digits, sorted
fn subdirs(dir: &Path, width: usize) -> Result<Vec<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(Error::file_op("read directory", dir, e)),
    };

    let mut dirs = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| Error::file_op("read directory", dir, e))?.path();
        let numeric = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.len() == width && name.bytes().all(|b| b.is_ascii_digit()))
            .unwrap_or(false);
        if numeric && path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

fn note_date(path: &Path) -> Option<NaiveDate> {
    if path.extension().and_then(|ext| ext.to_str()) != Some(NOTE_EXTENSION) {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    NaiveDate::parse_from_str(stem, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_storage_paths() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().to_path_buf();
        let storage = Storage::new(root.join("diary"), root.join("todo.md"));

        assert_eq!(storage.state_file(), root.join(".todo.state.json"));
        assert_eq!(storage.lock_file(), root.join("todo.md.lock"));
        assert_eq!(storage.backup_file(), root.join("todo.md.backup"));
        assert_eq!(
            storage.daily_note_path(date(2026, 3, 7)),
            root.join("diary/2026/03/2026-03-07.md")
        );
        assert_eq!(
            storage.archive_file(date(2026, 10, 19)),
            root.join("archive/2026-10.md")
        );
    }

    #[test]
    fn archive_dir_can_be_overridden() {
        let storage =
            Storage::new("diary", "todo.md").with_archive_dir(PathBuf::from("/tmp/done"));
        assert_eq!(
            storage.archive_file(date(2026, 1, 2)),
            PathBuf::from("/tmp/done/2026-01.md")
        );
        assert_eq!(storage.state_file(), PathBuf::from("./.todo.state.json"));
    }

    #[test]
    fn lists_notes_in_date_order() {
        let temp = TempDir::new().unwrap();
        let storage = Storage::new(temp.path().join("diary"), temp.path().join("todo.md"));

        for day in [date(2026, 10, 2), date(2025, 12, 31), date(2026, 9, 30)] {
            let path = storage.daily_note_path(day);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, "## Tasks\n").unwrap();
        }
        fs::write(temp.path().join("diary/2026/10/scratch.md"), "").unwrap();
        fs::create_dir_all(temp.path().join("diary/templates")).unwrap();

        let notes = storage.list_daily_notes(&CancelFlag::new()).unwrap();
        let dates: Vec<NaiveDate> = notes.iter().map(|(d, _)| *d).collect();
        assert_eq!(
            dates,
            vec![date(2025, 12, 31), date(2026, 9, 30), date(2026, 10, 2)]
        );
    }

    #[test]
    fn missing_diary_root_lists_nothing() {
        let temp = TempDir::new().unwrap();
        let storage = Storage::new(temp.path().join("nope"), temp.path().join("todo.md"));
        assert!(storage.list_daily_notes(&CancelFlag::new()).unwrap().is_empty());
    }

    #[test]
    fn cancelled_scan_stops_early() {
        let temp = TempDir::new().unwrap();
        let storage = Storage::new(temp.path().join("diary"), temp.path().join("todo.md"));
        let path = storage.daily_note_path(date(2026, 10, 2));
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "").unwrap();

        let cancel = CancelFlag::new();
        cancel.cancel();
        assert!(storage.list_daily_notes(&cancel).unwrap().is_empty());
    }
}
