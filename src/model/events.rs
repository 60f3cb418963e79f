//! Change notifications fanned out by the page models.
//!
//! Every model owns an [`Observers`] registry. A mutation marks the model
//! dirty (selection events excepted) and then delivers exactly one event to
//! each registered observer. Observers are trait objects; a
//! `crossbeam_channel::Sender` is an observer too, so a GUI layer can just
//! drain a channel on its own thread.

use crossbeam_channel::{unbounded, Receiver, Sender};
use std::fmt;

use super::annotations::MapAreaId;
use super::outline::BookmarkId;
use super::text::ZoneId;

/// Events emitted by [`PageText`](super::PageText).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEvent {
    /// A zone's text or rectangle changed.
    NodeChange(ZoneId),
    /// The child list of a zone changed.
    ChildrenChange(ZoneId),
    NodeSelect(ZoneId),
    NodeDeselect(ZoneId),
    /// The whole tree was replaced; previously handed out ids are stale.
    TreeChange,
}

/// Events emitted by [`Outline`](super::Outline).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutlineEvent {
    TreeChange,
    NodeChange(BookmarkId),
    ChildrenChange(BookmarkId),
    NodeSelect(BookmarkId),
}

/// Events emitted by [`PageAnnotations`](super::PageAnnotations).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationEvent {
    NodeAdd(MapAreaId),
    NodeDelete(MapAreaId),
    NodeReplace { old: MapAreaId, new: MapAreaId },
    NodeChange(MapAreaId),
    NodeSelect(MapAreaId),
    NodeDeselect(MapAreaId),
    /// The collection was reloaded from its original data.
    Reverted,
}

/// Receiver of model events.
pub trait Observer<E>: Send {
    fn notify(&mut self, event: &E);
}

impl<E: Clone + Send> Observer<E> for Sender<E> {
    fn notify(&mut self, event: &E) {
        // A dropped receiver just means nobody listens any more.
        let _ = self.send(event.clone());
    }
}

/// Registry of observers for one model.
pub struct Observers<E> {
    observers: Vec<Box<dyn Observer<E>>>,
}

impl<E> Observers<E> {
    pub fn new() -> Self {
        Self {
            observers: Vec::new(),
        }
    }

    pub fn register(&mut self, observer: Box<dyn Observer<E>>) {
        self.observers.push(observer);
    }

    /// Deliver one event to every observer.
    pub fn emit(&mut self, event: E) {
        for observer in &mut self.observers {
            observer.notify(&event);
        }
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl<E: Clone + Send + 'static> Observers<E> {
    /// Register a channel and return its receiving end.
    pub fn subscribe(&mut self) -> Receiver<E> {
        let (sender, receiver) = unbounded();
        self.register(Box::new(sender));
        receiver
    }
}

impl<E> Default for Observers<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for Observers<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers")
            .field("count", &self.observers.len())
            .finish()
    }
}
