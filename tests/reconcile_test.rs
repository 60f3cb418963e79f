//! Integration tests for plain-text editing of hidden text.

use redjvu::model::{Rect, ZoneRecord, ZoneType};
use redjvu::reconcile::{self, ReconcileError, Reconciliation};
use redjvu::sexpr;

fn chars(s: &str) -> Vec<char> {
    s.chars().collect()
}

fn parse(input: &str) -> ZoneRecord {
    ZoneRecord::from_expr(&sexpr::parse(input).unwrap()).unwrap()
}

fn page() -> ZoneRecord {
    parse(
        r#"(page 0 0 400 300
             (column 0 0 400 300
               (line 0 0 62 10 (word 0 0 30 10 "foo") (word 32 0 62 10 "bar"))
               (line 0 20 60 30 (word 0 20 60 30 "foobar"))
               (para 0 40 200 80 "two\nrows")))"#,
    )
}

fn reconciled(outcome: Result<Reconciliation, ReconcileError>) -> ZoneRecord {
    match outcome.unwrap() {
        Reconciliation::Reconciled(record) => record,
        Reconciliation::NothingChanged => panic!("expected a change"),
    }
}

fn lines_of(record: &ZoneRecord) -> &[ZoneRecord] {
    record.children()[0].children()
}

#[test]
fn test_export_text() {
    assert_eq!(
        reconcile::export_text(&page()).unwrap(),
        "foo bar\nfoobar\ntwo\nrows\n"
    );
    assert_eq!(
        reconcile::export_units(&page()).unwrap(),
        ["foo bar", "foobar", "two\nrows"]
    );
}

#[test]
fn test_unchanged_text() {
    let outcome = reconcile::import_text(&page(), "foo bar\r\nfoobar\r\ntwo\r\nrows\r\n");
    assert_eq!(outcome.unwrap(), Reconciliation::NothingChanged);
}

#[test]
fn test_edit_touches_only_changed_line() {
    let original = page();
    let edited = reconciled(reconcile::import_text(
        &original,
        "foo bar\nfoo bar\ntwo\nrows\n",
    ));

    assert_eq!(lines_of(&edited)[0], lines_of(&original)[0]);
    assert_eq!(lines_of(&edited)[2], lines_of(&original)[2]);

    let split = lines_of(&edited)[1].children();
    assert_eq!(split.len(), 2);
    assert_eq!(split[0].text(), Some("foo"));
    assert_eq!(split[0].rect, Rect::new(0, 20, 30, 10));
    assert_eq!(split[1].text(), Some("bar"));
    assert_eq!(split[1].rect, Rect::new(30, 20, 30, 10));
    // The line keeps its own rectangle.
    assert_eq!(lines_of(&edited)[1].rect, lines_of(&original)[1].rect);
}

#[test]
fn test_substitution_keeps_rectangles() {
    let original = page();
    let edited = reconciled(reconcile::import_text(
        &original,
        "fox baz\nfoobar\ntwo\nrows\n",
    ));
    let words = lines_of(&edited)[0].children();
    assert_eq!(words[0].text(), Some("fox"));
    assert_eq!(words[0].rect, Rect::new(0, 0, 30, 10));
    assert_eq!(words[1].text(), Some("baz"));
    assert_eq!(words[1].rect, Rect::new(32, 0, 30, 10));
}

#[test]
fn test_multiline_leaf() {
    let edited = reconciled(reconcile::import_text(
        &page(),
        "foo bar\nfoobar\ntwo\ncolumns\n",
    ));
    let para = &lines_of(&edited)[2];
    assert_eq!(para.kind, ZoneType::Paragraph);
    assert_eq!(para.text(), Some("two\ncolumns"));
}

#[test]
fn test_line_count_must_match() {
    let outcome = reconcile::import_text(&page(), "foo bar\nfoobar\n");
    assert_eq!(
        outcome,
        Err(ReconcileError::LengthChanged {
            expected: 4,
            found: 2
        })
    );
}

#[test]
fn test_character_zones_are_rejected() {
    let record = parse(
        r#"(page 0 0 100 100
             (line 0 0 20 10 (word 0 0 20 10 (char 0 0 10 10 "a") (char 10 0 20 10 "b"))))"#,
    );
    assert_eq!(
        reconcile::export_text(&record),
        Err(ReconcileError::CharacterZoneFound)
    );
    assert_eq!(
        reconcile::import_text(&record, "ab\n"),
        Err(ReconcileError::CharacterZoneFound)
    );
}

#[test]
fn test_stripped_characters_become_editable() {
    let record = parse(
        r#"(page 0 0 100 100
             (line 0 0 20 10 (word 0 0 20 10 (char 0 0 10 10 "a") (char 10 0 20 10 "b"))))"#,
    );
    let stripped = record.strip(ZoneType::Character);
    assert_eq!(reconcile::export_lines(&stripped).unwrap(), ["ab"]);
}

#[test]
fn test_levenshtein_distance() {
    assert_eq!(reconcile::distance(&chars("kitten"), &chars("sitting")), 3);
    assert_eq!(reconcile::distance(&chars(""), &chars("abc")), 3);
    assert_eq!(reconcile::distance(&chars("same"), &chars("same")), 0);
    assert!(reconcile::edit_script(&chars("same"), &chars("same")).is_empty());
}
