//! daytask sync / backfill command implementation

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::output::{emit, OutputOptions, Rendered, Report};
use crate::storage::Storage;
use crate::sync::{BackfillReport, CancelFlag, SyncConflict, SyncEngine, SyncOptions, SyncReport};

/// Options for the sync command
pub struct SyncCommand {
    pub storage: Storage,
    pub options: SyncOptions,
    pub date: Option<NaiveDate>,
    pub output: OutputOptions,
}

/// Sync result when the day's note has not been written yet
#[derive(Serialize)]
struct NoNoteReport {
    date: NaiveDate,
    note_path: String,
    tasks_synced: usize,
}

impl Report for NoNoteReport {
    fn command(&self) -> &'static str {
        "sync"
    }

    fn render(&self) -> Rendered {
        let mut out = Rendered::new(format!("daytask sync: no daily note for {}", self.date));
        out.warning(format!("{} does not exist; nothing to sync", self.note_path));
        out
    }
}

impl Report for SyncReport {
    fn command(&self) -> &'static str {
        "sync"
    }

    fn render(&self) -> Rendered {
        let title = if self.has_conflicts() {
            format!(
                "daytask sync: {} conflict(s), nothing written",
                self.conflicts.len()
            )
        } else {
            format!("daytask sync: {} new task(s)", self.tasks_synced)
        };
        let mut out = Rendered::new(title);
        out.field("note", self.note_path.display())
            .field("read", self.tasks_read)
            .field("synced", self.tasks_synced);
        if self.migrated {
            out.note("folded the existing to-do list into a new state file");
        }
        add_conflicts(&mut out, &self.conflicts);
        out
    }
}

impl Report for BackfillReport {
    fn command(&self) -> &'static str {
        "backfill"
    }

    fn render(&self) -> Rendered {
        let mut out = Rendered::new(format!(
            "daytask backfill: {} new task(s) from {} note(s)",
            self.tasks_synced, self.notes_scanned
        ));
        out.field("notes", self.notes_scanned)
            .field("synced", self.tasks_synced);
        if self.cancelled {
            out.warning("interrupted; notes already synced are kept");
        }
        add_conflicts(&mut out, &self.conflicts);
        out
    }
}

pub fn run_sync(command: SyncCommand) -> Result<()> {
    let engine = SyncEngine::new(command.storage, command.options);
    let result = match command.date {
        Some(date) => engine.sync_date(date),
        None => engine.sync_tasks(),
    };

    match result {
        Ok(report) => emit(command.output, &report),
        Err(Error::NoDailyNote { date, path }) => emit(
            command.output,
            &NoNoteReport {
                date,
                note_path: path.display().to_string(),
                tasks_synced: 0,
            },
        ),
        Err(err) => Err(err),
    }
}

pub fn run_backfill(storage: Storage, options: SyncOptions, output: OutputOptions) -> Result<()> {
    let cancel = CancelFlag::new();
    // Ctrl-C finishes the current note, then stops.
    let _ = signal_hook::flag::register(signal_hook::consts::SIGINT, cancel.handle());
    let _ = signal_hook::flag::register(signal_hook::consts::SIGTERM, cancel.handle());

    let report = SyncEngine::new(storage, options).backfill(&cancel)?;
    emit(output, &report)
}

fn add_conflicts(out: &mut Rendered, conflicts: &[SyncConflict]) {
    for conflict in conflicts {
        out.warning(format!(
            "{} ({}): note has {:?}, list has {:?}",
            conflict.id, conflict.reason, conflict.text_from_daily, conflict.text_from_todo
        ));
    }
    if !conflicts.is_empty() {
        out.hint("make the note and the list agree, then run daytask sync again");
    }
}
