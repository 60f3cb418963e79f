//! Integration tests for the editable models.

use redjvu::djvused::StreamEditor;
use redjvu::model::{
    AnnotationEvent, Border, Color, DocumentModel, MapArea, Outline, OutlineEvent,
    PageAnnotations, PageText, Rect, Shape, ShapeKind, TextEvent, ZoneType,
};
use redjvu::sexpr::{self, Expr};
use redjvu::{Error, ErrorMode, PageId, ToolHandle};

fn editor() -> StreamEditor {
    StreamEditor::new(ToolHandle::unchecked("djvused"), "book.djvu")
}

fn page_text() -> PageText {
    let expr = sexpr::parse(
        r#"(page 0 0 300 200
             (column 0 0 300 200
               (line 10 10 110 30 (word 10 10 50 30 "Hello") (word 60 10 110 30 "world"))
               (line 10 40 110 60 (word 10 40 110 60 "again"))))"#,
    )
    .unwrap();
    PageText::new(0, Some(&expr)).unwrap()
}

#[test]
fn test_text_navigation() {
    let text = page_text();
    let root = text.root().unwrap();
    assert_eq!(text.zone(root).unwrap().kind(), ZoneType::Page);

    let column = text.left_child(root).unwrap();
    let first_line = text.left_child(column).unwrap();
    let second_line = text.right_sibling(first_line).unwrap();
    assert_eq!(text.left_sibling(second_line), Some(first_line));
    assert_eq!(text.parent(second_line), Some(column));
    assert_eq!(text.right_sibling(second_line), None);

    let words: Vec<_> = text
        .leaves()
        .into_iter()
        .filter_map(|id| text.zone(id).and_then(|z| z.text()).map(str::to_string))
        .collect();
    assert_eq!(words, ["Hello", "world", "again"]);
    assert_eq!(text.preorder()[0], root);
    assert_eq!(*text.postorder().last().unwrap(), root);
}

#[test]
fn test_text_edits_notify_observers() {
    let mut text = page_text();
    let events = text.subscribe();
    let leaves = text.leaves();

    text.select(leaves[0]).unwrap();
    assert!(!text.is_dirty());

    text.set_text(leaves[1], "there").unwrap();
    assert!(text.is_dirty());

    let line = text.parent(leaves[2]).unwrap();
    text.delete(leaves[2]).unwrap();
    // The emptied line becomes a leaf with no text.
    assert!(text.zone(line).unwrap().is_leaf());
    assert_eq!(text.zone(line).unwrap().text(), Some(""));

    let received: Vec<TextEvent> = events.try_iter().collect();
    assert_eq!(
        received,
        [
            TextEvent::NodeSelect(leaves[0]),
            TextEvent::NodeChange(leaves[1]),
            TextEvent::ChildrenChange(line),
        ]
    );
}

#[test]
fn test_text_export_and_revert() {
    let mut text = page_text();
    let mut ed = editor();
    text.export(&mut ed);
    assert!(ed.is_empty());

    let leaf = text.leaves()[0];
    text.set_text(leaf, "Hi").unwrap();
    text.export(&mut ed);
    assert_eq!(ed.commands()[0], "select 1");
    assert_eq!(ed.commands()[1], "set-txt");
    assert!(ed.commands()[2].contains("(word 10 10 50 30 \"Hi\")"));

    text.revert();
    assert!(!text.is_dirty());
    let leaf = text.leaves()[0];
    assert_eq!(text.zone(leaf).unwrap().text(), Some("Hello"));
}

#[test]
fn test_text_rejects_stale_and_inner_zones() {
    let mut text = page_text();
    let root = text.root().unwrap();
    assert!(matches!(
        text.set_text(root, "x"),
        Err(Error::InvalidValue { .. })
    ));

    let leaf = text.leaves()[0];
    text.delete(leaf).unwrap();
    assert!(matches!(text.set_text(leaf, "x"), Err(Error::NoSuchZone(_))));

    // Deleting the root is ignored.
    text.delete(root).unwrap();
    assert!(text.zone(root).is_some());
}

#[test]
fn test_strip_to_lines() {
    let mut text = page_text();
    text.strip(ZoneType::Word);
    let record = text.record().unwrap();
    let lines = record.children()[0].children();
    assert_eq!(lines[0].text(), Some("Hello world"));
    assert_eq!(lines[1].text(), Some("again"));

    let before = text.record();
    text.strip(ZoneType::Word);
    assert_eq!(text.record(), before);
}

#[test]
fn test_annotations_lenient_mode_keeps_bad_mapareas() {
    let records = sexpr::parse_all(
        r##"(maparea "#1" "" (rect 0 0 10 10))
            (maparea "#2" "" (oval 0 0 10 10) (hilite #FF0000))
            (background #FFFFFF)"##,
    )
    .unwrap();

    let strict = PageAnnotations::new(PageId::Page(0), records.clone(), ErrorMode::Strict);
    assert!(matches!(strict, Err(Error::MapAreaSyntax(_))));

    let lenient = PageAnnotations::new(PageId::Page(0), records.clone(), ErrorMode::Lenient).unwrap();
    assert_eq!(lenient.mapareas().count(), 1);
    assert_eq!(lenient.others().count(), 2);
    // Unknown and malformed records survive a save untouched.
    assert_eq!(lenient.records(), records);
}

#[test]
fn test_annotations_edit_cycle() {
    let records = sexpr::parse_all(r##"(mode color) (maparea "#1" "" (rect 0 0 10 10))"##).unwrap();
    let mut annotations = PageAnnotations::new(PageId::Shared, records, ErrorMode::Strict).unwrap();
    let events = annotations.subscribe();

    let (id, _) = annotations.mapareas().next().unwrap();
    annotations
        .update(id, |area| {
            area.set_border(Some(Border::Solid(Color::parse("#00ff00")?)))?;
            area.set_comment("green");
            Ok(())
        })
        .unwrap();

    // A failed update leaves the map-area untouched.
    let result = annotations.update(id, |area| {
        area.set_comment("lost");
        area.set_line_width(3)
    });
    assert!(result.is_err());
    assert_eq!(annotations.maparea(id).unwrap().comment(), "green");

    let oval = MapArea::new("http://example.com", Shape::oval(Rect::new(5, 5, 20, 10)).unwrap());
    let replaced = annotations.replace(id, oval).unwrap();
    assert_ne!(replaced, id);
    assert_eq!(annotations.maparea(replaced).unwrap().kind(), ShapeKind::Oval);

    let mut ed = editor();
    annotations.export(&mut ed);
    assert_eq!(
        ed.commands(),
        [
            "create-shared-ant",
            "set-ant",
            "(mode color)",
            "(maparea \"http://example.com\" \"\" (oval 5 5 20 10))",
            ".",
        ]
    );

    let received: Vec<AnnotationEvent> = events.try_iter().collect();
    assert_eq!(
        received,
        [
            AnnotationEvent::NodeChange(id),
            AnnotationEvent::NodeReplace { old: id, new: replaced },
        ]
    );
}

#[test]
fn test_non_symbol_annotation_is_rejected() {
    let records = vec![Expr::list([Expr::string("oops")])];
    let result = PageAnnotations::new(PageId::Page(0), records, ErrorMode::Lenient);
    assert!(matches!(result, Err(Error::AnnotationSyntax(_))));
}

#[test]
fn test_outline_editing() {
    let mut outline = Outline::new(None).unwrap();
    assert!(outline.is_empty());
    assert_eq!(outline.raw_value(), None);

    let events = outline.subscribe();
    let root = outline.root();
    let chapter = outline.add_child(root, "Chapter 1", "#1").unwrap();
    let section = outline.add_child(chapter, "Section", "#page 2").unwrap();
    assert_eq!(outline.uri(section), Some("#page%202"));
    outline.set_title(section, "Section 1.1").unwrap();

    let mut text = Vec::new();
    outline.export_as_plaintext(&mut text).unwrap();
    assert_eq!(
        String::from_utf8(text).unwrap(),
        "#1 Chapter 1\n    #page%202 Section 1.1\n"
    );

    outline.delete(chapter).unwrap();
    assert!(!outline.contains(section));
    assert!(outline.is_empty());

    let received: Vec<OutlineEvent> = events.try_iter().collect();
    assert_eq!(received.len(), 4);
    assert_eq!(received[3], OutlineEvent::ChildrenChange(root));
}

#[test]
fn test_outline_export_removes_when_empty() {
    let expr = sexpr::parse(r##"(bookmarks ("Intro" "#1"))"##).unwrap();
    let mut outline = Outline::new(Some(&expr)).unwrap();
    outline.remove();

    let mut ed = editor();
    outline.export(&mut ed);
    assert_eq!(ed.commands(), ["set-outline", "", "."]);
}

#[test]
fn test_outline_plaintext_import() {
    let mut outline = Outline::new(None).unwrap();
    outline.import_plaintext([
        "#1 Part I",
        "\t#2 Chapter 1",
        "",
        "        #3 Chapter 2",
        "#4",
    ]);
    let records = outline.records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].children.len(), 2);
    assert_eq!(records[0].children[1].uri, "#3");
    assert_eq!(records[1].title, "");
}
