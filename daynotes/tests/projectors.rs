use daynotes::core::Severity;
use daynotes::parser::{FileNotesParser, NotesParser};
use daynotes::projectors::outline::{RowKind, outline_rows};
use daynotes::projectors::view::{HighlightKind, JumpTarget, collect_highlights, element_jump};
use daynotes::tree::{ElementKind, NotesElement};
use daynotes::{DumpOptions, dump_tree, parse_str};
use pretty_assertions::assert_eq;
use std::fs;

const JOURNAL: &str = "\
2016-09-15
foo bar baz
\tblubber
quux

2016-09-16 (2) (travel)
  indented start
sw
\tnotes\textra

[...]
";

#[test]
fn dump_matches_expected_layout() {
    let doc = parse_str("2016-09-15\nfoo bar baz\n\tblubber\nquux\n");
    let expected = "\
Notes with 1 days
  2016-09-15: 2 entries
    Date 2016-09-15, chapter 1, comment: (none)
    Category foo / \"bar baz\"; body lines count 1
    Category quux; body lines count 0
";
    assert_eq!(dump_tree(doc.element(), DumpOptions::default()), expected);
}

#[test]
fn dump_has_one_line_per_element() {
    let doc = parse_str(JOURNAL);
    let elements = doc.element().preorder().len();
    let dumped = dump_tree(doc.element(), DumpOptions::default());
    assert_eq!(dumped.lines().count(), elements);

    let with_issues = dump_tree(
        doc.element(),
        DumpOptions {
            include_issues: true,
        },
    );
    assert_eq!(
        with_issues.lines().count(),
        elements + doc.total_issue_count()
    );
}

#[test]
fn outline_rows_cover_elements_and_issues() {
    let doc = parse_str(JOURNAL);
    let rows = outline_rows(doc.element());
    let elements = doc.element().preorder().len();
    assert_eq!(rows.len(), elements + doc.total_issue_count());

    let day_two = rows
        .iter()
        .find(|r| r.summary.starts_with("2016-09-16"))
        .expect("second day row");
    assert_eq!(day_two.summary, "2016-09-16 (2) (travel): 1 entries");
    assert_eq!(day_two.start, "6");
    assert_eq!(day_two.line_count, "4");
    assert_eq!(day_two.issues, "1");
    assert!(!day_two.flagged);

    let intro_two = rows
        .iter()
        .find(|r| r.start == "6" && r.kind == RowKind::Element(ElementKind::Intro))
        .expect("intro row");
    assert!(intro_two.flagged);

    let issue = rows
        .iter()
        .find(|r| matches!(r.kind, RowKind::Issue(Severity::Error)))
        .expect("issue row");
    assert_eq!(issue.summary, "Error: Day intro has to be a single line");
    assert_eq!(issue.start, "6-8");
    assert_eq!(issue.line_count, "2");
    assert_eq!(
        issue.jump,
        Some(JumpTarget::Lines {
            start_line: 6,
            end_line: 8
        })
    );
}

#[test]
fn element_jump_spans_all_lines() {
    let doc = parse_str(JOURNAL);
    let day = &doc.days()[0];
    assert_eq!(
        element_jump(day),
        JumpTarget::Lines {
            start_line: 1,
            end_line: 5
        }
    );
}

#[test]
fn highlights_stay_within_the_document() {
    let doc = parse_str(JOURNAL);
    let highlights = collect_highlights(doc.element());
    assert!(!highlights.is_empty());
    for h in &highlights {
        assert!(h.location.start_line() >= 1);
        assert!(h.location.last_line() <= doc.total_line_count());
    }
    let line_wise_issue = highlights
        .iter()
        .find(|h| h.kind == HighlightKind::Issue(Severity::Error))
        .expect("issue highlight");
    assert!(line_wise_issue.line_wise);
}

#[test]
fn file_parser_reads_from_disk() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let path = tmp.path().join("journal.notes");
    fs::write(&path, JOURNAL).expect("write journal");

    let doc = FileNotesParser.parse_file(&path).expect("parse file");
    assert_eq!(doc, parse_str(JOURNAL));
    assert_eq!(doc.days().len(), 3);

    let err = FileNotesParser
        .parse_file(&tmp.path().join("missing.notes"))
        .expect_err("missing file");
    assert!(format!("{err:#}").contains("missing.notes"));
}
