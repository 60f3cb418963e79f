//! Editable document models.
//!
//! Each model is loaded from djvused output, tracks a dirty flag, notifies
//! observers about changes and can export itself as djvused commands.

mod annotations;
mod cache;
mod events;
mod geometry;
mod maparea;
mod metadata;
mod outline;
mod text;

pub use annotations::{Annotation, MapAreaId, PageAnnotations};
pub use cache::{DocumentModel, PageCache, PageId};
pub use events::{AnnotationEvent, Observer, Observers, OutlineEvent, TextEvent};
pub use geometry::{Point, Rect, RectTransform};
pub use maparea::{
    Border, Color, MapArea, ShadowStyle, Shape, ShapeKind, DEFAULT_LINE_WIDTH, DEFAULT_OPACITY,
    MAX_SHADOW_WIDTH, MIN_SHADOW_WIDTH,
};
pub use metadata::PageMetadata;
pub use outline::{
    bookmarks_from_expr, bookmarks_to_expr, parse_plaintext, write_plaintext, BookmarkId,
    BookmarkRecord, Outline,
};
pub use text::{PageText, Zone, ZoneContent, ZoneId, ZoneRecord, ZoneType};
