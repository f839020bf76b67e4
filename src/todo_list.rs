//! Canonical to-do list regeneration.
//!
//! The list is a projection of [`TodoState`]: it is rebuilt from the active
//! tasks on every write and never patched in place.

use std::path::Path;

use chrono::NaiveDate;

use crate::atomic::{backup_before_overwrite, write_atomic_str, MARKDOWN_FILE_MODE};
use crate::error::Result;
use crate::state::{TaskState, TodoState};

pub const LIST_TITLE: &str = "# To-Do";

/// Render the canonical list for every unarchived task in `state`.
pub fn render(state: &TodoState) -> String {
    let mut out = String::from(LIST_TITLE);
    out.push('\n');

    for (section, tasks) in group_sections(state.active_tasks()) {
        out.push('\n');
        if section.is_empty() {
            out.push_str("## Inbox\n");
        } else {
            out.push_str(&format!("## {section}\n"));
        }
        for task in tasks {
            out.push_str(&task.to_markdown());
            out.push('\n');
        }
    }

    out
}

/// Regenerate the list file from `state`, optionally keeping a backup of the
/// previous content. Callers hold the list lock.
pub fn write(path: &Path, state: &TodoState, backup: bool) -> Result<()> {
    if backup {
        backup_before_overwrite(path)?;
    }
    write_atomic_str(path, &render(state), MARKDOWN_FILE_MODE)
}

/// Group tasks by section. Date sections come first, newest first; the rest
/// keep the order in which they first appear.
fn group_sections(tasks: Vec<&TaskState>) -> Vec<(String, Vec<&TaskState>)> {
    let mut groups: Vec<(String, Vec<&TaskState>)> = Vec::new();
    for task in tasks {
        match groups.iter_mut().find(|(name, _)| *name == task.section) {
            Some((_, members)) => members.push(task),
            None => groups.push((task.section.clone(), vec![task])),
        }
    }

    // Stable sort: non-date sections keep first-appearance order.
    groups.sort_by(|(a, _), (b, _)| match (section_date(a), section_date(b)) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    groups
}

fn section_date(section: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(section.trim(), "%Y-%m-%d").ok()
}
