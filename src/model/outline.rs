//! Document outline (bookmarks).
//!
//! The outline is a tree of `(title, uri)` bookmarks under an untitled root.
//! It travels as `(bookmarks ("title" "uri" child...) ...)` and can be edited
//! as indented plain text, one bookmark per line:
//!
//! ```text
//! #p1 Chapter 1
//!     #p2 Section 1.1
//! ```

use log::debug;
use serde::Serialize;
use std::io::{self, Write};

use super::cache::DocumentModel;
use super::events::{Observer, OutlineEvent, Observers};
use crate::djvused::StreamEditor;
use crate::error::{Error, Result};
use crate::sexpr::Expr;
use crate::util::{expand_tabs, fix_uri};

const INDENT: &str = "    ";
const TAB_WIDTH: usize = 8;

/// Owned bookmark subtree.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct BookmarkRecord {
    pub title: String,
    pub uri: String,
    pub children: Vec<BookmarkRecord>,
}

impl BookmarkRecord {
    pub fn new(title: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            uri: uri.into(),
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<BookmarkRecord>) -> Self {
        self.children = children;
        self
    }

    fn from_expr(expr: &Expr) -> Result<Self> {
        let items = expr
            .as_list()
            .ok_or_else(|| Error::OutlineSyntax(format!("expected a bookmark list, found {}", expr)))?;
        let (title, uri) = match items {
            [Expr::Str(title), Expr::Str(uri), ..] => (title.clone(), uri.clone()),
            _ => {
                return Err(Error::OutlineSyntax(format!(
                    "bookmark must start with title and uri strings: {}",
                    expr
                )))
            }
        };
        let children = items[2..]
            .iter()
            .map(BookmarkRecord::from_expr)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            title,
            uri,
            children,
        })
    }

    fn to_expr(&self) -> Expr {
        let mut items = vec![
            Expr::string(self.title.clone()),
            Expr::string(self.uri.clone()),
        ];
        items.extend(self.children.iter().map(BookmarkRecord::to_expr));
        Expr::List(items)
    }
}

/// Decode `print-outline` output into top-level bookmarks.
pub fn bookmarks_from_expr(expr: &Expr) -> Result<Vec<BookmarkRecord>> {
    let items = expr
        .as_list()
        .ok_or_else(|| Error::OutlineSyntax(format!("expected (bookmarks ...), found {}", expr)))?;
    match items.split_first() {
        Some((head, rest)) if head.is_symbol("bookmarks") => {
            rest.iter().map(BookmarkRecord::from_expr).collect()
        }
        _ => Err(Error::OutlineSyntax(format!(
            "expected (bookmarks ...), found {}",
            expr
        ))),
    }
}

pub fn bookmarks_to_expr(bookmarks: &[BookmarkRecord]) -> Expr {
    Expr::tagged("bookmarks", bookmarks.iter().map(BookmarkRecord::to_expr))
}

/// Build a bookmark forest from indented lines. Each line is
/// `<indent><uri> <title>`; a line hangs under the closest preceding line
/// that is indented less, or at the top level. Blank lines are skipped.
pub fn parse_plaintext<I, S>(lines: I) -> Vec<BookmarkRecord>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    // Stack of (indent, path of child indices from the root).
    let mut roots: Vec<BookmarkRecord> = Vec::new();
    let mut stack: Vec<(usize, Vec<usize>)> = Vec::new();
    for line in lines {
        let line = expand_tabs(line.as_ref(), TAB_WIDTH);
        let line = line.trim_end();
        let body = line.trim_start();
        if body.is_empty() {
            continue;
        }
        let indent = line.len() - body.len();
        let (uri, title) = match body.split_once(char::is_whitespace) {
            Some((uri, title)) => (uri, title.trim_start()),
            None => (body, ""),
        };
        while stack.last().is_some_and(|(top, _)| *top >= indent) {
            stack.pop();
        }
        let siblings = match stack.last() {
            Some((_, path)) => descend(&mut roots, path),
            None => &mut roots,
        };
        siblings.push(BookmarkRecord::new(title, uri));
        let mut path = stack.last().map(|(_, p)| p.clone()).unwrap_or_default();
        path.push(siblings.len() - 1);
        stack.push((indent, path));
    }
    roots
}

fn descend<'a>(roots: &'a mut Vec<BookmarkRecord>, path: &[usize]) -> &'a mut Vec<BookmarkRecord> {
    let mut level = roots;
    for &index in path {
        level = &mut level[index].children;
    }
    level
}

/// Write a bookmark forest as indented lines.
pub fn write_plaintext<W: Write>(bookmarks: &[BookmarkRecord], out: &mut W) -> io::Result<()> {
    fn walk<W: Write>(records: &[BookmarkRecord], depth: usize, out: &mut W) -> io::Result<()> {
        for record in records {
            writeln!(out, "{}{} {}", INDENT.repeat(depth), record.uri, record.title)?;
            walk(&record.children, depth + 1, out)?;
        }
        Ok(())
    }
    walk(bookmarks, 0, out)
}

/// Handle of a bookmark inside an [`Outline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct BookmarkId(usize);

impl BookmarkId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
struct Bookmark {
    title: String,
    uri: String,
    children: Vec<BookmarkId>,
    parent: Option<BookmarkId>,
    left: Option<BookmarkId>,
    right: Option<BookmarkId>,
}

impl Bookmark {
    fn root() -> Self {
        Self {
            title: String::new(),
            uri: String::new(),
            children: Vec::new(),
            parent: None,
            left: None,
            right: None,
        }
    }
}

/// The document outline.
#[derive(Debug)]
pub struct Outline {
    original: Vec<BookmarkRecord>,
    nodes: Vec<Option<Bookmark>>,
    dirty: bool,
    observers: Observers<OutlineEvent>,
}

impl Outline {
    /// Build from `print-outline` output; `None` means no outline.
    pub fn new(data: Option<&Expr>) -> Result<Self> {
        let original = match data {
            Some(expr) => bookmarks_from_expr(expr)?,
            None => Vec::new(),
        };
        Ok(Self::from_records(original))
    }

    pub fn from_records(records: Vec<BookmarkRecord>) -> Self {
        let mut outline = Self {
            original: records,
            nodes: Vec::new(),
            dirty: false,
            observers: Observers::new(),
        };
        outline.rebuild(outline.original.clone());
        outline
    }

    /// The untitled root; top-level bookmarks are its children.
    pub fn root(&self) -> BookmarkId {
        BookmarkId(0)
    }

    fn rebuild(&mut self, records: Vec<BookmarkRecord>) {
        self.nodes.clear();
        self.nodes.push(Some(Bookmark::root()));
        let root = self.root();
        for record in records {
            self.attach(root, record);
        }
    }

    fn attach(&mut self, parent: BookmarkId, record: BookmarkRecord) -> BookmarkId {
        let id = BookmarkId(self.nodes.len());
        let left = self.node(parent).and_then(|p| p.children.last().copied());
        self.nodes.push(Some(Bookmark {
            title: record.title,
            uri: record.uri,
            children: Vec::new(),
            parent: Some(parent),
            left,
            right: None,
        }));
        if let Some(left) = left.and_then(|l| self.node_mut(l)) {
            left.right = Some(id);
        }
        if let Some(parent) = self.node_mut(parent) {
            parent.children.push(id);
        }
        for child in record.children {
            self.attach(id, child);
        }
        id
    }

    fn node(&self, id: BookmarkId) -> Option<&Bookmark> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, id: BookmarkId) -> Option<&mut Bookmark> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }

    fn live_mut(&mut self, id: BookmarkId) -> Result<&mut Bookmark> {
        self.node_mut(id).ok_or(Error::NoSuchBookmark(id.0))
    }

    pub fn contains(&self, id: BookmarkId) -> bool {
        self.node(id).is_some()
    }

    pub fn title(&self, id: BookmarkId) -> Option<&str> {
        self.node(id).map(|b| b.title.as_str())
    }

    pub fn uri(&self, id: BookmarkId) -> Option<&str> {
        self.node(id).map(|b| b.uri.as_str())
    }

    pub fn children(&self, id: BookmarkId) -> &[BookmarkId] {
        self.node(id).map_or(&[], |b| b.children.as_slice())
    }

    pub fn parent(&self, id: BookmarkId) -> Option<BookmarkId> {
        self.node(id).and_then(|b| b.parent)
    }

    pub fn left_sibling(&self, id: BookmarkId) -> Option<BookmarkId> {
        self.node(id).and_then(|b| b.left)
    }

    pub fn right_sibling(&self, id: BookmarkId) -> Option<BookmarkId> {
        self.node(id).and_then(|b| b.right)
    }

    pub fn left_child(&self, id: BookmarkId) -> Option<BookmarkId> {
        self.children(id).first().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.children(self.root()).is_empty()
    }

    /// Owned copy of the top-level bookmarks.
    pub fn records(&self) -> Vec<BookmarkRecord> {
        self.children(self.root())
            .iter()
            .map(|&id| self.record_of(id))
            .collect()
    }

    fn record_of(&self, id: BookmarkId) -> BookmarkRecord {
        match self.node(id) {
            Some(node) => BookmarkRecord {
                title: node.title.clone(),
                uri: node.uri.clone(),
                children: node.children.iter().map(|&c| self.record_of(c)).collect(),
            },
            None => BookmarkRecord::default(),
        }
    }

    /// The outline as a `set-outline` expression; `None` when empty.
    pub fn raw_value(&self) -> Option<Expr> {
        if self.is_empty() {
            None
        } else {
            Some(bookmarks_to_expr(&self.records()))
        }
    }

    pub fn register_observer(&mut self, observer: Box<dyn Observer<OutlineEvent>>) {
        self.observers.register(observer);
    }

    pub fn subscribe(&mut self) -> crossbeam_channel::Receiver<OutlineEvent> {
        self.observers.subscribe()
    }

    fn changed(&mut self, event: OutlineEvent) {
        self.dirty = true;
        self.observers.emit(event);
    }

    pub fn set_records(&mut self, records: Vec<BookmarkRecord>) {
        self.rebuild(records);
        self.changed(OutlineEvent::TreeChange);
    }

    pub fn set_raw_value(&mut self, data: Option<&Expr>) -> Result<()> {
        let records = match data {
            Some(expr) => bookmarks_from_expr(expr)?,
            None => Vec::new(),
        };
        self.set_records(records);
        Ok(())
    }

    /// Remove every bookmark.
    pub fn remove(&mut self) {
        self.set_records(Vec::new());
    }

    /// Replace the outline with one parsed from indented plain text.
    pub fn import_plaintext<I, S>(&mut self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let records = parse_plaintext(lines);
        debug!("imported {} top-level bookmarks", records.len());
        self.set_records(records);
    }

    pub fn export_as_plaintext<W: Write>(&self, out: &mut W) -> io::Result<()> {
        write_plaintext(&self.records(), out)
    }

    /// Append a bookmark as the last child of `parent`.
    pub fn add_child(
        &mut self,
        parent: BookmarkId,
        title: impl Into<String>,
        uri: &str,
    ) -> Result<BookmarkId> {
        self.live_mut(parent)?;
        let id = self.attach(parent, BookmarkRecord::new(title, fix_uri(uri)));
        self.changed(OutlineEvent::ChildrenChange(parent));
        Ok(id)
    }

    /// Delete a bookmark and its subtree. Deleting the root does nothing.
    pub fn delete(&mut self, id: BookmarkId) -> Result<()> {
        let node = self.node(id).ok_or(Error::NoSuchBookmark(id.0))?;
        let (parent, left, right) = match node.parent {
            Some(parent) => (parent, node.left, node.right),
            None => return Ok(()),
        };
        if let Some(left) = left {
            self.live_mut(left)?.right = right;
        }
        if let Some(right) = right {
            self.live_mut(right)?.left = left;
        }
        self.live_mut(parent)?.children.retain(|&c| c != id);
        self.free_subtree(id);
        self.changed(OutlineEvent::ChildrenChange(parent));
        Ok(())
    }

    fn free_subtree(&mut self, id: BookmarkId) {
        if let Some(node) = self.nodes.get_mut(id.0).and_then(Option::take) {
            for child in node.children {
                self.free_subtree(child);
            }
        }
    }

    pub fn set_title(&mut self, id: BookmarkId, title: impl Into<String>) -> Result<()> {
        self.live_mut(id)?.title = title.into();
        self.changed(OutlineEvent::NodeChange(id));
        Ok(())
    }

    /// Set the target URI; unsafe characters are percent-escaped.
    pub fn set_uri(&mut self, id: BookmarkId, uri: &str) -> Result<()> {
        self.live_mut(id)?.uri = fix_uri(uri);
        self.changed(OutlineEvent::NodeChange(id));
        Ok(())
    }

    pub fn select(&mut self, id: BookmarkId) -> Result<()> {
        self.node(id).ok_or(Error::NoSuchBookmark(id.0))?;
        self.observers.emit(OutlineEvent::NodeSelect(id));
        Ok(())
    }
}

impl DocumentModel for Outline {
    fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn revert(&mut self) {
        self.rebuild(self.original.clone());
        self.observers.emit(OutlineEvent::TreeChange);
        self.dirty = false;
    }

    fn mark_saved(&mut self) {
        self.original = self.records();
        self.dirty = false;
    }

    fn export(&self, editor: &mut StreamEditor) {
        if !self.dirty {
            return;
        }
        editor.set_outline(self.raw_value().as_ref());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::djvused::ToolHandle;
    use crate::sexpr;

    fn sample() -> Outline {
        let expr = sexpr::parse(
            "(bookmarks (\"Chapter 1\" \"#p1\" (\"Section 1.1\" \"#p2\")) (\"Chapter 2\" \"#p5\"))",
        )
        .unwrap();
        Outline::new(Some(&expr)).unwrap()
    }

    #[test]
    fn test_plaintext_round_trip() {
        let text = "#p1 Chapter 1\n    #p2 Section 1.1\n";
        let mut outline = Outline::new(None).unwrap();
        outline.import_plaintext(text.lines());

        let expected = vec![BookmarkRecord::new("Chapter 1", "#p1")
            .with_children(vec![BookmarkRecord::new("Section 1.1", "#p2")])];
        assert_eq!(outline.records(), expected);

        let mut out = Vec::new();
        outline.export_as_plaintext(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), text);
    }

    #[test]
    fn test_plaintext_orphan_and_blank_lines() {
        let records = parse_plaintext(["        #p3 Deep", "", "#p1 Top", "\t#p2 Tabbed", "  #p4"]);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], BookmarkRecord::new("Deep", "#p3"));
        assert_eq!(records[1].children[0].title, "Tabbed");
        assert_eq!(records[1].children[1], BookmarkRecord::new("", "#p4"));
    }

    #[test]
    fn test_plaintext_shallower_sibling() {
        let records = parse_plaintext(["#a A", "        #b B", "    #c C"]);
        assert_eq!(records[0].children.len(), 2);
        assert_eq!(records[0].children[1].uri, "#c");
    }

    #[test]
    fn test_expr_round_trip() {
        let outline = sample();
        let expr = outline.raw_value().unwrap();
        assert_eq!(Outline::new(Some(&expr)).unwrap().records(), outline.records());
    }

    #[test]
    fn test_malformed_outline() {
        for input in ["(outline)", "(bookmarks (\"t\"))", "(bookmarks (1 2))"] {
            let expr = sexpr::parse(input).unwrap();
            assert!(matches!(Outline::new(Some(&expr)), Err(Error::OutlineSyntax(_))));
        }
    }

    #[test]
    fn test_add_and_delete() {
        let mut outline = sample();
        let events = outline.subscribe();
        let root = outline.root();
        let added = outline.add_child(root, "(no title)", "#p 7").unwrap();
        assert_eq!(outline.uri(added), Some("#p%207"));
        assert_eq!(events.try_recv().unwrap(), OutlineEvent::ChildrenChange(root));

        let first = outline.left_child(root).unwrap();
        let second = outline.right_sibling(first).unwrap();
        outline.delete(second).unwrap();
        assert_eq!(outline.right_sibling(first), Some(added));
        assert_eq!(outline.left_sibling(added), Some(first));
        assert!(!outline.contains(second));
        assert!(matches!(outline.set_title(second, "x"), Err(Error::NoSuchBookmark(_))));
    }

    #[test]
    fn test_export_and_remove() {
        let mut outline = sample();
        let mut editor = StreamEditor::new(ToolHandle::unchecked("djvused"), "book.djvu");
        outline.export(&mut editor);
        assert!(editor.commands().is_empty());

        outline.remove();
        assert!(outline.is_dirty());
        outline.export(&mut editor);
        assert_eq!(editor.commands(), ["set-outline", "", "."]);

        outline.revert();
        assert!(!outline.is_dirty());
        assert_eq!(outline.records().len(), 2);
    }
}
