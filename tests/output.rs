use daytask::output::Rendered;

#[test]
fn fields_are_aligned_under_the_title() {
    let mut out = Rendered::new("daytask sync: 2 new task(s)");
    out.field("note", "diary/2026/10/2026-10-19.md")
        .field("synced", 2)
        .note("folded the existing to-do list into a new state file")
        .warning("01jaxq3v8k2m9r7t5w4y6z0b1c (text differs)")
        .hint("daytask archive");

    let expected = "\
daytask sync: 2 new task(s)
  note    diary/2026/10/2026-10-19.md
  synced  2
  folded the existing to-do list into a new state file
warning: 01jaxq3v8k2m9r7t5w4y6z0b1c (text differs)
hint: daytask archive";
    assert_eq!(out.to_string(), expected);
}

#[test]
fn title_only_when_empty() {
    assert_eq!(Rendered::new("daytask status").to_string(), "daytask status");
}

#[test]
fn later_hint_replaces_earlier() {
    let mut out = Rendered::new("daytask");
    out.hint("first").hint("second");
    assert_eq!(out.to_string(), "daytask\nhint: second");
}
