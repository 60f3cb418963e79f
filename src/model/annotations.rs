//! Page and shared annotations.
//!
//! Annotation chunks hold arbitrary top-level records. `maparea` records are
//! decoded into [`MapArea`] values; every other record is kept verbatim and
//! written back unchanged.

use log::warn;
use serde::Serialize;

use super::cache::{DocumentModel, PageId};
use super::events::{AnnotationEvent, Observer, Observers};
use super::maparea::MapArea;
use crate::djvused::StreamEditor;
use crate::error::{Error, Result};
use crate::session::ErrorMode;
use crate::sexpr::Expr;

/// Stable handle of a map-area within one [`PageAnnotations`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct MapAreaId(u64);

impl MapAreaId {
    pub fn value(self) -> u64 {
        self.0
    }
}

/// A top-level annotation record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Annotation {
    MapArea(MapAreaId, MapArea),
    /// Any other record, e.g. `(background #FFFFFF)` or `(metadata ...)`.
    Other(Expr),
}

impl Annotation {
    pub fn to_expr(&self) -> Expr {
        match self {
            Annotation::MapArea(_, area) => area.to_expr(),
            Annotation::Other(expr) => expr.clone(),
        }
    }
}

/// Annotations of one page or of the shared chunk.
#[derive(Debug)]
pub struct PageAnnotations {
    id: PageId,
    original: Vec<Annotation>,
    entries: Vec<Annotation>,
    next_id: u64,
    dirty: bool,
    observers: Observers<AnnotationEvent>,
}

impl PageAnnotations {
    /// Classify the records of `print-ant` output.
    ///
    /// Records must be non-empty lists starting with a symbol. In strict
    /// mode a malformed `maparea` record fails the whole load; in lenient
    /// mode it is kept verbatim as an opaque record.
    pub fn new(id: PageId, records: Vec<Expr>, mode: ErrorMode) -> Result<Self> {
        let mut next_id = 0;
        let mut entries = Vec::with_capacity(records.len());
        for record in records {
            let head = record.head_symbol().ok_or_else(|| {
                Error::AnnotationSyntax(format!("record must start with a symbol: {}", record))
            })?;
            if head != "maparea" {
                entries.push(Annotation::Other(record));
                continue;
            }
            match MapArea::from_expr(&record) {
                Ok(area) => {
                    entries.push(Annotation::MapArea(MapAreaId(next_id), area));
                    next_id += 1;
                }
                Err(e) if mode == ErrorMode::Lenient => {
                    warn!("{}: keeping unparsable map-area as is: {}", id, e);
                    entries.push(Annotation::Other(record));
                }
                Err(e) => return Err(e),
            }
        }
        Ok(Self {
            id,
            original: entries.clone(),
            entries,
            next_id,
            dirty: false,
            observers: Observers::new(),
        })
    }

    pub fn id(&self) -> PageId {
        self.id
    }

    pub fn entries(&self) -> &[Annotation] {
        &self.entries
    }

    pub fn mapareas(&self) -> impl Iterator<Item = (MapAreaId, &MapArea)> + '_ {
        self.entries.iter().filter_map(|entry| match entry {
            Annotation::MapArea(id, area) => Some((*id, area)),
            Annotation::Other(_) => None,
        })
    }

    pub fn others(&self) -> impl Iterator<Item = &Expr> + '_ {
        self.entries.iter().filter_map(|entry| match entry {
            Annotation::Other(expr) => Some(expr),
            Annotation::MapArea(..) => None,
        })
    }

    pub fn maparea(&self, id: MapAreaId) -> Option<&MapArea> {
        self.position(id).ok().and_then(|i| match &self.entries[i] {
            Annotation::MapArea(_, area) => Some(area),
            Annotation::Other(_) => None,
        })
    }

    fn position(&self, id: MapAreaId) -> Result<usize> {
        self.entries
            .iter()
            .position(|entry| matches!(entry, Annotation::MapArea(entry_id, _) if *entry_id == id))
            .ok_or(Error::NoSuchMapArea(id.0))
    }

    fn allocate(&mut self) -> MapAreaId {
        let id = MapAreaId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn records(&self) -> Vec<Expr> {
        self.entries.iter().map(Annotation::to_expr).collect()
    }

    pub fn register_observer(&mut self, observer: Box<dyn Observer<AnnotationEvent>>) {
        self.observers.register(observer);
    }

    pub fn subscribe(&mut self) -> crossbeam_channel::Receiver<AnnotationEvent> {
        self.observers.subscribe()
    }

    fn changed(&mut self, event: AnnotationEvent) {
        self.dirty = true;
        self.observers.emit(event);
    }

    pub fn add(&mut self, area: MapArea) -> MapAreaId {
        let id = self.allocate();
        self.entries.push(Annotation::MapArea(id, area));
        self.changed(AnnotationEvent::NodeAdd(id));
        id
    }

    pub fn remove(&mut self, id: MapAreaId) -> Result<MapArea> {
        let index = self.position(id)?;
        let removed = match self.entries.remove(index) {
            Annotation::MapArea(_, area) => area,
            Annotation::Other(_) => return Err(Error::NoSuchMapArea(id.0)),
        };
        self.changed(AnnotationEvent::NodeDelete(id));
        Ok(removed)
    }

    /// Replace a map-area in place, keeping its position in the chunk.
    pub fn replace(&mut self, id: MapAreaId, area: MapArea) -> Result<MapAreaId> {
        let index = self.position(id)?;
        let new = self.allocate();
        self.entries[index] = Annotation::MapArea(new, area);
        self.changed(AnnotationEvent::NodeReplace { old: id, new });
        Ok(new)
    }

    /// Edit a map-area. The closure works on a copy that is stored only if
    /// it returns `Ok`.
    pub fn update<F>(&mut self, id: MapAreaId, edit: F) -> Result<()>
    where
        F: FnOnce(&mut MapArea) -> Result<()>,
    {
        let index = self.position(id)?;
        let Annotation::MapArea(_, current) = &self.entries[index] else {
            return Err(Error::NoSuchMapArea(id.0));
        };
        let mut draft = current.clone();
        edit(&mut draft)?;
        self.entries[index] = Annotation::MapArea(id, draft);
        self.changed(AnnotationEvent::NodeChange(id));
        Ok(())
    }

    pub fn select(&mut self, id: MapAreaId) -> Result<()> {
        self.position(id)?;
        self.observers.emit(AnnotationEvent::NodeSelect(id));
        Ok(())
    }

    pub fn deselect(&mut self, id: MapAreaId) -> Result<()> {
        self.position(id)?;
        self.observers.emit(AnnotationEvent::NodeDeselect(id));
        Ok(())
    }
}

impl DocumentModel for PageAnnotations {
    fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn revert(&mut self) {
        self.entries = self.original.clone();
        self.observers.emit(AnnotationEvent::Reverted);
        self.dirty = false;
    }

    fn mark_saved(&mut self) {
        self.original = self.entries.clone();
        self.dirty = false;
    }

    fn export(&self, editor: &mut StreamEditor) {
        if !self.dirty {
            return;
        }
        editor.select(self.id);
        editor.set_annotations(&self.records());
    }
}
