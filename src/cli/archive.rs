//! daytask archive command implementation

use chrono::NaiveDate;

use crate::archive::{ArchiveEngine, ArchiveOptions, ArchiveReport};
use crate::error::Result;
use crate::output::{emit, OutputOptions, Rendered, Report};
use crate::storage::Storage;

/// Options for the archive command
pub struct ArchiveCommand {
    pub storage: Storage,
    pub options: ArchiveOptions,
    pub date: Option<NaiveDate>,
    pub output: OutputOptions,
}

impl Report for ArchiveReport {
    fn command(&self) -> &'static str {
        "archive"
    }

    fn render(&self) -> Rendered {
        let mut out = Rendered::new(format!("daytask archive: {} task(s) archived", self.archived));
        out.field("archived", self.archived)
            .field("remaining", self.remaining);
        match &self.archive_path {
            Some(path) => {
                out.field("archive", path.display());
            }
            None => {
                out.note("no completed tasks; nothing changed");
            }
        }
        out
    }
}

pub fn run(command: ArchiveCommand) -> Result<()> {
    let engine = ArchiveEngine::new(command.storage, command.options);
    let report = match command.date {
        Some(date) => engine.archive_on(date)?,
        None => engine.archive_tasks()?,
    };
    emit(command.output, &report)
}
