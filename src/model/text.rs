//! Hidden text zones of a page.
//!
//! The text layer is a tree of rectangular zones. A zone either carries a run
//! of text (a leaf) or an ordered list of child zones. [`ZoneRecord`] is the
//! owned form exchanged with djvused; [`PageText`] keeps the tree in an arena
//! addressed by [`ZoneId`] so that parent and sibling links need no shared
//! ownership.

use log::debug;
use serde::Serialize;
use std::fmt;

use super::cache::{DocumentModel, PageId};
use super::events::{Observer, Observers, TextEvent};
use super::geometry::Rect;
use crate::djvused::StreamEditor;
use crate::error::{Error, Result};
use crate::sexpr::Expr;

/// Zone granularity, ordered by rank from characters up to the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneType {
    Character,
    Word,
    Line,
    Paragraph,
    Region,
    Column,
    Page,
}

impl ZoneType {
    /// All zone types from the finest to the coarsest.
    pub const ALL: [ZoneType; 7] = [
        ZoneType::Character,
        ZoneType::Word,
        ZoneType::Line,
        ZoneType::Paragraph,
        ZoneType::Region,
        ZoneType::Column,
        ZoneType::Page,
    ];

    /// The record symbol, e.g. `word`.
    pub fn symbol(self) -> &'static str {
        match self {
            ZoneType::Character => "char",
            ZoneType::Word => "word",
            ZoneType::Line => "line",
            ZoneType::Paragraph => "para",
            ZoneType::Region => "region",
            ZoneType::Column => "column",
            ZoneType::Page => "page",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<ZoneType> {
        ZoneType::ALL.into_iter().find(|t| t.symbol() == symbol)
    }

    /// Text inserted after a zone of this type when flattening.
    pub fn separator(self) -> &'static str {
        match self {
            ZoneType::Page => "\x0c",
            ZoneType::Column => "\x0b",
            ZoneType::Region => "\x1d",
            ZoneType::Paragraph => "\x1f",
            ZoneType::Line => "\n",
            ZoneType::Word => " ",
            ZoneType::Character => "",
        }
    }
}

impl fmt::Display for ZoneType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Payload of a zone record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneContent {
    Text(String),
    Children(Vec<ZoneRecord>),
}

/// Owned zone tree, as read from or written to `print-txt`/`set-txt`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZoneRecord {
    pub kind: ZoneType,
    pub rect: Rect,
    pub content: ZoneContent,
}

impl ZoneRecord {
    pub fn leaf(kind: ZoneType, rect: Rect, text: impl Into<String>) -> Self {
        Self {
            kind,
            rect,
            content: ZoneContent::Text(text.into()),
        }
    }

    pub fn inner(kind: ZoneType, rect: Rect, children: Vec<ZoneRecord>) -> Self {
        Self {
            kind,
            rect,
            content: ZoneContent::Children(children),
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.content, ZoneContent::Text(_))
    }

    pub fn text(&self) -> Option<&str> {
        match &self.content {
            ZoneContent::Text(text) => Some(text),
            ZoneContent::Children(_) => None,
        }
    }

    pub fn children(&self) -> &[ZoneRecord] {
        match &self.content {
            ZoneContent::Text(_) => &[],
            ZoneContent::Children(children) => children,
        }
    }

    /// Leaves in document order.
    pub fn leaves(&self) -> Vec<&ZoneRecord> {
        let mut leaves = Vec::new();
        collect_leaves(self, &mut leaves);
        leaves
    }

    /// Check whether any zone in the subtree is a character zone.
    pub fn contains_kind(&self, kind: ZoneType) -> bool {
        self.kind == kind || self.children().iter().any(|c| c.contains_kind(kind))
    }

    /// Flatten the subtree to plain text. Children are joined with the
    /// separator of the last child.
    pub fn flattened_text(&self) -> String {
        match &self.content {
            ZoneContent::Text(text) => text.clone(),
            ZoneContent::Children(children) => {
                let separator = children.last().map_or("", |c| c.kind.separator());
                children
                    .iter()
                    .map(ZoneRecord::flattened_text)
                    .collect::<Vec<_>>()
                    .join(separator)
            }
        }
    }

    /// Decode `(type x0 y0 x1 y1 "text")` or `(type x0 y0 x1 y1 child...)`.
    pub fn from_expr(expr: &Expr) -> Result<Self> {
        let items = expr
            .as_list()
            .ok_or_else(|| Error::ZoneSyntax(format!("expected a zone list, found {}", expr)))?;
        let symbol = items
            .first()
            .and_then(Expr::as_symbol)
            .ok_or_else(|| Error::ZoneSyntax("zone record must start with a symbol".into()))?;
        let kind = ZoneType::from_symbol(symbol)
            .ok_or_else(|| Error::ZoneSyntax(format!("unknown zone type {:?}", symbol)))?;
        if items.len() < 5 {
            return Err(Error::ZoneSyntax(format!(
                "{} zone needs four coordinates",
                symbol
            )));
        }
        let mut coords = [0i64; 4];
        for (slot, item) in coords.iter_mut().zip(&items[1..5]) {
            *slot = item
                .as_int()
                .ok_or_else(|| Error::ZoneSyntax(format!("bad coordinate {}", item)))?;
        }
        let rect = Rect::from_corners(coords[0], coords[1], coords[2], coords[3]);
        let rest = &items[5..];
        match rest {
            [] => Ok(ZoneRecord::leaf(kind, rect, "")),
            [Expr::Str(text)] => Ok(ZoneRecord::leaf(kind, rect, text.clone())),
            _ => {
                let children = rest
                    .iter()
                    .map(ZoneRecord::from_expr)
                    .collect::<Result<Vec<_>>>()?;
                Ok(ZoneRecord::inner(kind, rect, children))
            }
        }
    }

    pub fn to_expr(&self) -> Expr {
        let mut items = vec![
            Expr::symbol(self.kind.symbol()),
            Expr::Int(self.rect.x),
            Expr::Int(self.rect.y),
            Expr::Int(self.rect.x1()),
            Expr::Int(self.rect.y1()),
        ];
        match &self.content {
            ZoneContent::Text(text) => items.push(Expr::string(text.clone())),
            ZoneContent::Children(children) if children.is_empty() => {
                items.push(Expr::string(""))
            }
            ZoneContent::Children(children) => {
                items.extend(children.iter().map(ZoneRecord::to_expr))
            }
        }
        Expr::List(items)
    }

    /// Collapse every zone of rank `max` or finer into its nearest coarser
    /// ancestor. Stripping twice with the same rank changes nothing.
    pub fn strip(self, max: ZoneType) -> ZoneRecord {
        match strip_record(self, max) {
            Stripped::Kept(record) => record,
            Stripped::Merged { kind, rect, text } => ZoneRecord::leaf(kind, rect, text),
        }
    }
}

fn collect_leaves<'a>(record: &'a ZoneRecord, out: &mut Vec<&'a ZoneRecord>) {
    match &record.content {
        ZoneContent::Text(_) => out.push(record),
        ZoneContent::Children(children) => {
            for child in children {
                collect_leaves(child, out);
            }
        }
    }
}

enum Stripped {
    Kept(ZoneRecord),
    Merged {
        kind: ZoneType,
        rect: Rect,
        text: String,
    },
}

impl Stripped {
    fn kind(&self) -> ZoneType {
        match self {
            Stripped::Kept(record) => record.kind,
            Stripped::Merged { kind, .. } => *kind,
        }
    }

    fn text(&self) -> String {
        match self {
            Stripped::Kept(record) => record.flattened_text(),
            Stripped::Merged { text, .. } => text.clone(),
        }
    }

    fn into_record(self) -> ZoneRecord {
        match self {
            Stripped::Kept(record) => record,
            Stripped::Merged { kind, rect, text } => ZoneRecord::leaf(kind, rect, text),
        }
    }
}

fn strip_record(record: ZoneRecord, max: ZoneType) -> Stripped {
    let ZoneRecord {
        kind,
        rect,
        content,
    } = record;
    let children = match content {
        ZoneContent::Text(text) if kind <= max => return Stripped::Merged { kind, rect, text },
        ZoneContent::Text(text) => return Stripped::Kept(ZoneRecord::leaf(kind, rect, text)),
        ZoneContent::Children(children) => children,
    };
    let stripped: Vec<Stripped> = children
        .into_iter()
        .map(|child| strip_record(child, max))
        .collect();
    let joined = || {
        let separator = stripped.last().map_or("", |c| c.kind().separator());
        stripped
            .iter()
            .map(Stripped::text)
            .collect::<Vec<_>>()
            .join(separator)
    };
    if kind <= max {
        return Stripped::Merged {
            kind,
            rect,
            text: joined(),
        };
    }
    if stripped.iter().any(|c| matches!(c, Stripped::Kept(_))) {
        let children = stripped.into_iter().map(Stripped::into_record).collect();
        Stripped::Kept(ZoneRecord::inner(kind, rect, children))
    } else {
        Stripped::Kept(ZoneRecord::leaf(kind, rect, joined()))
    }
}

/// Handle of a zone inside a [`PageText`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ZoneId(usize);

impl ZoneId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A zone as stored in the arena.
#[derive(Debug, Clone)]
pub struct Zone {
    kind: ZoneType,
    rect: Rect,
    text: Option<String>,
    children: Vec<ZoneId>,
    parent: Option<ZoneId>,
    left: Option<ZoneId>,
    right: Option<ZoneId>,
}

impl Zone {
    pub fn kind(&self) -> ZoneType {
        self.kind
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// Text of a leaf; `None` for inner zones.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn children(&self) -> &[ZoneId] {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.text.is_some()
    }

    pub fn separator(&self) -> &'static str {
        self.kind.separator()
    }
}

/// Hidden text layer of one page.
#[derive(Debug)]
pub struct PageText {
    page: usize,
    original: Option<ZoneRecord>,
    zones: Vec<Option<Zone>>,
    root: Option<ZoneId>,
    dirty: bool,
    observers: Observers<TextEvent>,
}

impl PageText {
    /// Build the model of page `page` (0-based) from `print-txt` output.
    pub fn new(page: usize, data: Option<&Expr>) -> Result<Self> {
        let original = data.map(ZoneRecord::from_expr).transpose()?;
        Ok(Self::from_record(page, original))
    }

    pub fn from_record(page: usize, record: Option<ZoneRecord>) -> Self {
        let mut text = Self {
            page,
            original: record,
            zones: Vec::new(),
            root: None,
            dirty: false,
            observers: Observers::new(),
        };
        text.rebuild(text.original.clone());
        text
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn root(&self) -> Option<ZoneId> {
        self.root
    }

    pub fn zone(&self, id: ZoneId) -> Option<&Zone> {
        self.zones.get(id.0).and_then(Option::as_ref)
    }

    fn live(&self, id: ZoneId) -> Result<&Zone> {
        self.zone(id).ok_or(Error::NoSuchZone(id.0))
    }

    fn live_mut(&mut self, id: ZoneId) -> Result<&mut Zone> {
        self.zones
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(Error::NoSuchZone(id.0))
    }

    pub fn parent(&self, id: ZoneId) -> Option<ZoneId> {
        self.zone(id).and_then(|z| z.parent)
    }

    pub fn left_sibling(&self, id: ZoneId) -> Option<ZoneId> {
        self.zone(id).and_then(|z| z.left)
    }

    pub fn right_sibling(&self, id: ZoneId) -> Option<ZoneId> {
        self.zone(id).and_then(|z| z.right)
    }

    pub fn left_child(&self, id: ZoneId) -> Option<ZoneId> {
        self.zone(id).and_then(|z| z.children.first().copied())
    }

    /// Zones in pre-order, root first.
    pub fn preorder(&self) -> Vec<ZoneId> {
        let mut out = Vec::new();
        let mut stack: Vec<ZoneId> = self.root.into_iter().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            if let Some(zone) = self.zone(id) {
                stack.extend(zone.children.iter().rev().copied());
            }
        }
        out
    }

    /// Zones in post-order, root last.
    pub fn postorder(&self) -> Vec<ZoneId> {
        let mut out = self.preorder_mirrored();
        out.reverse();
        out
    }

    // Pre-order visiting children right to left; its reverse is post-order.
    fn preorder_mirrored(&self) -> Vec<ZoneId> {
        let mut out = Vec::new();
        let mut stack: Vec<ZoneId> = self.root.into_iter().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            if let Some(zone) = self.zone(id) {
                stack.extend(zone.children.iter().copied());
            }
        }
        out
    }

    /// Leaf zones in document order.
    pub fn leaves(&self) -> Vec<ZoneId> {
        self.preorder()
            .into_iter()
            .filter(|&id| self.zone(id).is_some_and(Zone::is_leaf))
            .collect()
    }

    /// Owned copy of the current tree.
    pub fn record(&self) -> Option<ZoneRecord> {
        self.root.map(|root| self.record_of(root))
    }

    fn record_of(&self, id: ZoneId) -> ZoneRecord {
        // Ids handed in come from the arena itself, so the zone is live.
        let zone = match self.zone(id) {
            Some(zone) => zone,
            None => return ZoneRecord::leaf(ZoneType::Page, Rect::default(), ""),
        };
        match &zone.text {
            Some(text) => ZoneRecord::leaf(zone.kind, zone.rect, text.clone()),
            None => ZoneRecord::inner(
                zone.kind,
                zone.rect,
                zone.children.iter().map(|&c| self.record_of(c)).collect(),
            ),
        }
    }

    /// The current tree as a `set-txt` expression.
    pub fn raw_value(&self) -> Option<Expr> {
        self.record().map(|r| r.to_expr())
    }

    fn rebuild(&mut self, record: Option<ZoneRecord>) {
        self.zones.clear();
        let root = match record {
            Some(record) => Some(self.insert_record(record, None)),
            None => None,
        };
        self.root = root;
    }

    fn insert_record(&mut self, record: ZoneRecord, parent: Option<ZoneId>) -> ZoneId {
        let id = ZoneId(self.zones.len());
        let (text, children) = match record.content {
            ZoneContent::Text(text) => (Some(text), Vec::new()),
            ZoneContent::Children(children) if children.is_empty() => {
                (Some(String::new()), Vec::new())
            }
            ZoneContent::Children(children) => (None, children),
        };
        self.zones.push(Some(Zone {
            kind: record.kind,
            rect: record.rect,
            text,
            children: Vec::new(),
            parent,
            left: None,
            right: None,
        }));
        let child_ids: Vec<ZoneId> = children
            .into_iter()
            .map(|child| self.insert_record(child, Some(id)))
            .collect();
        for pair in child_ids.windows(2) {
            if let [left, right] = *pair {
                if let Some(zone) = self.zones[left.0].as_mut() {
                    zone.right = Some(right);
                }
                if let Some(zone) = self.zones[right.0].as_mut() {
                    zone.left = Some(left);
                }
            }
        }
        if let Some(zone) = self.zones[id.0].as_mut() {
            zone.children = child_ids;
        }
        id
    }

    fn changed(&mut self, event: TextEvent) {
        self.dirty = true;
        self.observers.emit(event);
    }

    pub fn register_observer(&mut self, observer: Box<dyn Observer<TextEvent>>) {
        self.observers.register(observer);
    }

    pub fn subscribe(&mut self) -> crossbeam_channel::Receiver<TextEvent> {
        self.observers.subscribe()
    }

    /// Replace the whole tree.
    pub fn set_record(&mut self, record: Option<ZoneRecord>) {
        self.rebuild(record);
        self.changed(TextEvent::TreeChange);
    }

    /// Replace the whole tree from a `set-txt` expression.
    pub fn set_raw_value(&mut self, data: Option<&Expr>) -> Result<()> {
        let record = data.map(ZoneRecord::from_expr).transpose()?;
        self.set_record(record);
        Ok(())
    }

    /// Change the text of a leaf zone.
    pub fn set_text(&mut self, id: ZoneId, text: impl Into<String>) -> Result<()> {
        let zone = self.live_mut(id)?;
        match zone.text.as_mut() {
            Some(slot) => *slot = text.into(),
            None => return Err(Error::invalid("text", "only leaf zones carry text")),
        }
        self.changed(TextEvent::NodeChange(id));
        Ok(())
    }

    pub fn set_rect(&mut self, id: ZoneId, rect: Rect) -> Result<()> {
        self.live_mut(id)?.rect = rect;
        self.changed(TextEvent::NodeChange(id));
        Ok(())
    }

    /// Remove a zone with its subtree. A parent left without children
    /// becomes an empty leaf. Deleting the root does nothing.
    pub fn delete(&mut self, id: ZoneId) -> Result<()> {
        let zone = self.live(id)?;
        let (parent, left, right) = match zone.parent {
            Some(parent) => (parent, zone.left, zone.right),
            None => return Ok(()),
        };
        if let Some(left) = left {
            self.live_mut(left)?.right = right;
        }
        if let Some(right) = right {
            self.live_mut(right)?.left = left;
        }
        let parent_zone = self.live_mut(parent)?;
        parent_zone.children.retain(|&c| c != id);
        if parent_zone.children.is_empty() {
            parent_zone.text = Some(String::new());
        }
        self.free_subtree(id);
        self.changed(TextEvent::ChildrenChange(parent));
        Ok(())
    }

    fn free_subtree(&mut self, id: ZoneId) {
        if let Some(zone) = self.zones.get_mut(id.0).and_then(Option::take) {
            for child in zone.children {
                self.free_subtree(child);
            }
        }
    }

    /// Remove zone levels of rank `max` and finer, merging their text into
    /// the nearest surviving ancestor.
    pub fn strip(&mut self, max: ZoneType) {
        let Some(record) = self.record() else {
            return;
        };
        debug!("page {}: stripping {} zones and finer", self.page + 1, max);
        self.set_record(Some(record.strip(max)));
    }

    /// Selection notification; does not dirty the model.
    pub fn select(&mut self, id: ZoneId) -> Result<()> {
        self.live(id)?;
        self.observers.emit(TextEvent::NodeSelect(id));
        Ok(())
    }

    pub fn deselect(&mut self, id: ZoneId) -> Result<()> {
        self.live(id)?;
        self.observers.emit(TextEvent::NodeDeselect(id));
        Ok(())
    }
}

impl DocumentModel for PageText {
    fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn revert(&mut self) {
        self.rebuild(self.original.clone());
        self.observers.emit(TextEvent::TreeChange);
        self.dirty = false;
    }

    fn mark_saved(&mut self) {
        self.original = self.record();
        self.dirty = false;
    }

    fn export(&self, editor: &mut StreamEditor) {
        if !self.dirty {
            return;
        }
        editor.select(PageId::Page(self.page));
        editor.set_text(self.raw_value().as_ref());
    }
}
