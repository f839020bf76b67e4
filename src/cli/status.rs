//! daytask status command implementation
//!
//! Read-only summary of the state store; takes no lock and writes nothing.

use std::path::PathBuf;

use serde::Serialize;

use crate::error::Result;
use crate::output::{emit, OutputOptions, Rendered, Report};
use crate::state::TodoState;
use crate::storage::Storage;

#[derive(Serialize)]
struct StatusReport {
    todo_file: PathBuf,
    state_file: PathBuf,
    state_exists: bool,
    migrated: bool,
    active: usize,
    completed: usize,
    archived: usize,
}

impl Report for StatusReport {
    fn command(&self) -> &'static str {
        "status"
    }

    fn render(&self) -> Rendered {
        let mut out = Rendered::new("daytask status");
        out.field("todo", self.todo_file.display())
            .field("state", self.state_file.display())
            .field("active", self.active)
            .field("completed", self.completed)
            .field("archived", self.archived);
        if !self.state_exists {
            out.hint("run daytask sync to create the state file");
        }
        out
    }
}

pub fn run(storage: Storage, output: OutputOptions) -> Result<()> {
    let state_file = storage.state_file();
    let state = TodoState::read(&state_file)?;

    let report = StatusReport {
        todo_file: storage.todo_file().to_path_buf(),
        state_exists: state_file.exists(),
        state_file,
        migrated: state.migrated,
        active: state.active_tasks().len(),
        completed: state.completed_tasks().len(),
        archived: state.archived_count(),
    };
    emit(output, &report)
}
