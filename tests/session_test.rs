//! Integration tests for editing sessions over an in-memory document.

use std::cell::Cell;
use std::collections::BTreeMap;

use redjvu::model::{BookmarkRecord, MapArea, Rect, Shape, ZoneType};
use redjvu::sexpr::{self, Expr};
use redjvu::{
    DataSource, Error, PageId, PageMetadata, PageSelection, Result, Session, SessionOptions,
    ToolHandle,
};

/// A three-page document; counts how often each kind of data is read.
#[derive(Default)]
struct MemorySource {
    text_loads: Cell<usize>,
    outline_loads: Cell<usize>,
}

const PAGE_TEXT: &str = r#"(page 0 0 200 100
  (line 0 0 62 10 (word 0 0 30 10 "foo") (word 32 0 62 10 "bar"))
  (line 0 20 100 30 (word 0 20 40 30 "second") (word 50 20 100 30 "line")))"#;

impl DataSource for MemorySource {
    fn page_count(&self) -> Result<usize> {
        Ok(3)
    }

    fn text(&self, page: usize) -> Result<Option<Expr>> {
        self.text_loads.set(self.text_loads.get() + 1);
        match page {
            2 => Ok(None),
            _ => sexpr::parse(PAGE_TEXT).map(Some),
        }
    }

    fn annotations(&self, id: PageId) -> Result<Vec<Expr>> {
        match id {
            PageId::Shared => sexpr::parse_all("(background #FFFFFF) (zoom page)"),
            PageId::Page(_) => sexpr::parse_all(r##"(maparea "#2" "" (rect 10 10 20 20))"##),
        }
    }

    fn metadata(&self, id: PageId) -> Result<PageMetadata> {
        let mut data = BTreeMap::new();
        if id == PageId::Shared {
            data.insert("Title".to_string(), "A book".to_string());
        }
        Ok(PageMetadata::new(id, data))
    }

    fn outline(&self) -> Result<Option<Expr>> {
        self.outline_loads.set(self.outline_loads.get() + 1);
        sexpr::parse(r##"(bookmarks ("Chapter 1" "#1" ("Section 1.1" "#2")))"##).map(Some)
    }
}

fn session() -> Session<MemorySource> {
    Session::with_source(
        "book.djvu",
        ToolHandle::unchecked("djvused"),
        MemorySource::default(),
        SessionOptions::new(),
    )
}

#[test]
fn test_models_load_once() {
    let mut session = session();
    session.text(0).unwrap();
    session.text(0).unwrap();
    session.outline().unwrap();
    session.outline().unwrap();
    assert_eq!(session.source().text_loads.get(), 1);
    assert_eq!(session.source().outline_loads.get(), 1);
}

#[test]
fn test_page_out_of_range() {
    let mut session = session();
    assert!(matches!(session.text(3), Err(Error::PageOutOfRange(4, 3))));
    assert!(matches!(
        session.annotations(PageId::Page(7)),
        Err(Error::PageOutOfRange(8, 3))
    ));
}

#[test]
fn test_clean_session_saves_nothing() {
    let mut session = session();
    session.text(0).unwrap();
    session.annotations(PageId::Shared).unwrap();
    session.outline().unwrap();
    assert!(!session.is_dirty());
    assert!(session.save_script().is_empty());
    // Nothing to run, so the missing djvused is never started.
    session.save().unwrap();
}

#[test]
fn test_save_script_order() {
    let mut session = session();

    session.metadata(PageId::Page(1)).unwrap().set("Status", "draft");
    session.metadata(PageId::Shared).unwrap().set("Author", "Someone");
    session.outline().unwrap().set_records(vec![BookmarkRecord::new("Only", "#3")]);
    let text = session.text(1).unwrap();
    let word = text.leaves()[0];
    text.set_text(word, "fou").unwrap();
    let area = MapArea::new("#3", Shape::rectangle(Rect::new(0, 0, 5, 5)).unwrap());
    session.annotations(PageId::Page(0)).unwrap().add(area);

    let script = session.save_script();
    let heads: Vec<&str> = script
        .commands()
        .iter()
        .map(String::as_str)
        .filter(|c| {
            c.starts_with("select")
                || c.starts_with("create-shared-ant")
                || c.starts_with("set-")
        })
        .collect();
    assert_eq!(
        heads,
        [
            "select 1",
            "set-ant",
            "select 2",
            "set-txt",
            "set-outline",
            "create-shared-ant",
            "set-meta",
            "select 2",
            "set-meta",
        ]
    );
}

#[test]
fn test_finish_save_marks_models_clean() {
    let mut session = session();
    session.metadata(PageId::Shared).unwrap().set("Author", "Someone");
    assert!(session.is_dirty());

    let failure = session.finish_save(Err(Error::Djvused("disk full".to_string())));
    assert!(matches!(failure, Err(Error::Djvused(_))));
    assert!(session.is_dirty());

    session.finish_save(Ok(String::new())).unwrap();
    assert!(!session.is_dirty());
    assert!(session.save_script().is_empty());
    assert_eq!(
        session.metadata(PageId::Shared).unwrap().get("Author"),
        Some("Someone")
    );
}

#[test]
fn test_revert() {
    let mut session = session();
    session.metadata(PageId::Shared).unwrap().set("Title", "Changed");
    session.outline().unwrap().set_records(Vec::new());
    session.revert();
    assert!(!session.is_dirty());
    assert_eq!(session.metadata(PageId::Shared).unwrap().get("Title"), Some("A book"));
    assert_eq!(session.outline().unwrap().records().len(), 1);
}

#[test]
fn test_strip_text_on_selected_pages() {
    let mut session = session();
    let stripped = session
        .strip_text(&PageSelection::parse("1,3").unwrap(), ZoneType::Word)
        .unwrap();
    // Page 3 has no text layer.
    assert_eq!(stripped, 1);

    let record = session.text(0).unwrap().record().unwrap();
    assert!(!record.contains_kind(ZoneType::Word));
    assert_eq!(record.children()[0].text(), Some("foo bar"));
    assert!(!session.text(1).unwrap().record().unwrap().children()[0].is_leaf());
}

#[test]
fn test_apply_text_edit() {
    let mut session = session();
    let record = session.text(0).unwrap().record().unwrap();
    let outcome = redjvu::reconcile::import_text(&record, "foo baz\nsecond line\n")
        .map_err(Error::from);
    assert!(session.apply_text_edit(0, outcome).unwrap());
    assert!(session.is_dirty());

    let outcome = Ok(redjvu::Reconciliation::NothingChanged);
    assert!(!session.apply_text_edit(1, outcome).unwrap());

    let outcome = redjvu::reconcile::import_text(&record, "one line\n").map_err(Error::from);
    let err = session.apply_text_edit(0, outcome).unwrap_err();
    assert!(err.is_reconcile());
}

#[test]
fn test_apply_outline_edit() {
    let mut session = session();
    let lines = vec!["#1 Intro".to_string(), "    #2 Details".to_string()];
    session.apply_outline_edit(Ok(lines)).unwrap();
    let records = session.outline().unwrap().records();
    assert_eq!(records[0].title, "Intro");
    assert_eq!(records[0].children[0].uri, "#2");
    assert!(session.is_dirty());
}

#[cfg(unix)]
#[test]
fn test_external_text_edit_with_noop_editor() {
    let options = SessionOptions::new().with_editor(redjvu::ExternalEditor::from_command_line("true"));
    let mut session = Session::with_source(
        "book.djvu",
        ToolHandle::unchecked("djvused"),
        MemorySource::default(),
        options,
    );
    let job = session.edit_text_externally(0).unwrap();
    let outcome = job.wait().unwrap();
    assert!(!session.apply_text_edit(0, outcome).unwrap());
    assert!(!session.is_dirty());
}

#[test]
fn test_external_edit_requires_text_layer() {
    let mut session = session();
    assert!(matches!(session.edit_text_externally(2), Err(Error::NoTextLayer)));
}
