use std::fs;

use daytask::markdown::Priority;

mod support;

use support::{texts, today, TestDiary};

const LEGACY_LIST: &str = "\
# My list

## Work
- [ ] [P2] Ship release due:2026-10-30
- [x] Write changelog

## Home
- [ ] Fix the tap
";

#[test]
fn legacy_list_is_folded_in_once() {
    let diary = TestDiary::new();
    diary.write_todo(LEGACY_LIST);
    diary.write_note(today(), "## Tasks\n- [ ] Fix the tap\n- [ ] Book dentist\n");

    let report = diary.sync_engine().sync_date(today()).unwrap();
    assert!(report.migrated);
    assert_eq!(report.tasks_synced, 1);

    let state = diary.state();
    assert!(!state.needs_migration());
    assert_eq!(state.tasks.len(), 4);
    assert_eq!(state.completed_tasks().len(), 1);

    let tasks = diary.todo_tasks();
    assert_eq!(
        texts(&tasks),
        vec!["Book dentist", "Ship release", "Write changelog", "Fix the tap"]
    );
    let release = &tasks[1];
    assert_eq!(release.section, "Work");
    assert_eq!(release.priority, Some(Priority::P2));
    assert_eq!(release.due.map(|d| d.to_string()).as_deref(), Some("2026-10-30"));

    let second = diary.sync_engine().sync_date(today()).unwrap();
    assert!(!second.migrated);
    assert_eq!(second.tasks_synced, 0);
    assert_eq!(diary.state().tasks.len(), 4);
}

#[test]
fn migration_preserves_existing_ids() {
    let diary = TestDiary::new();
    let id = "01jaxq3v8k2m9r7t5w4y6z0b1c";
    diary.write_todo(&format!("# To-Do\n\n## Work\n- [ ] Keep me <!-- id:{id} -->\n"));
    diary.write_note(today(), "## Tasks\n");

    diary.sync_engine().sync_date(today()).unwrap();
    assert!(diary.state().has_task(id));
    assert_eq!(diary.todo_tasks()[0].id.as_deref(), Some(id));
}

#[test]
fn no_list_means_nothing_to_migrate() {
    let diary = TestDiary::new();
    diary.write_note(today(), "## Tasks\n- [ ] Only task\n");

    let report = diary.sync_engine().sync_date(today()).unwrap();
    assert!(!report.migrated);
    assert!(!diary.state().needs_migration());
    assert_eq!(diary.state().tasks.len(), 1);
}

#[test]
fn empty_note_still_creates_list_and_state() {
    let diary = TestDiary::new();
    diary.write_note(today(), "# 2026-10-19\n\nNothing planned.\n");

    let report = diary.sync_engine().sync_date(today()).unwrap();
    assert_eq!(report.tasks_synced, 0);
    assert_eq!(diary.read_todo(), "# To-Do\n");
    assert!(fs::metadata(diary.storage().state_file()).is_ok());
}
