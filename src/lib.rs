//! # redjvu
//!
//! Editing library for the non-image layers of DjVu documents.
//!
//! Hidden text, hyperlink annotations, the outline and metadata are loaded
//! into editable models, changed through typed operations, and written back
//! through the `djvused` tool from DjVuLibre.
//!
//! ## Quick Start
//!
//! ```no_run
//! use redjvu::model::ZoneType;
//! use redjvu::PageSelection;
//!
//! fn main() -> redjvu::Result<()> {
//!     // Open a document; djvused is located and checked once
//!     let mut session = redjvu::open("book.djvu")?;
//!
//!     // Keep only line-level text zones on every page
//!     session.strip_text(&PageSelection::All, ZoneType::Word)?;
//!
//!     // Persist every dirty model in a single djvused run
//!     session.save()?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Text zones**: navigation, editing and stripping of zone levels
//! - **Plain-text editing**: edited lines are mapped back onto word zones
//! - **Map-areas**: typed shapes with validated options
//! - **Outline**: bookmark trees with an indented plain-text form
//! - **Batched saving**: one djvused script per save, in a fixed order

pub mod config;
pub mod djvused;
pub mod error;
pub mod external;
pub mod model;
pub mod reconcile;
pub mod session;
pub mod sexpr;
pub mod util;

// Re-export commonly used types
pub use config::Config;
pub use djvused::{StreamEditor, ToolHandle};
pub use error::{Error, Result};
pub use external::ExternalEditor;
pub use model::{
    BookmarkRecord, DocumentModel, MapArea, Outline, PageAnnotations, PageId, PageMetadata,
    PageText, ZoneRecord, ZoneType,
};
pub use reconcile::{ReconcileError, Reconciliation};
pub use session::{DataSource, DjvusedSource, ErrorMode, Job, PageSelection, Session, SessionOptions};
pub use sexpr::Expr;

use std::path::Path;

/// Name of the settings resource under the XDG configuration directories.
pub const CONFIG_RESOURCE: &str = "redjvu";

/// Open a document with default options.
///
/// # Example
///
/// ```no_run
/// let mut session = redjvu::open("book.djvu").unwrap();
/// println!("Pages: {}", session.page_count().unwrap());
/// ```
pub fn open<P: AsRef<Path>>(path: P) -> Result<Session> {
    open_with_options(path, SessionOptions::default())
}

/// Open a document with custom options.
pub fn open_with_options<P: AsRef<Path>>(path: P, options: SessionOptions) -> Result<Session> {
    let tool = ToolHandle::locate()?;
    Ok(Session::open(path.as_ref(), tool, options))
}

/// Hidden text of a page as plain lines, one per text line.
pub fn page_text_lines<P: AsRef<Path>>(path: P, page: usize) -> Result<Vec<String>> {
    let mut session = open(path)?;
    let record = session.text(page)?.record().ok_or(Error::NoTextLayer)?;
    Ok(reconcile::export_lines(&record)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reexports() {
        let _ = ZoneType::Word;
        let _ = PageId::Shared;
        let _ = ErrorMode::Lenient;
        assert_eq!(CONFIG_RESOURCE, "redjvu");
    }
}
