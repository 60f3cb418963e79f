//! Where session models get their original data from.

use log::debug;
use std::path::{Path, PathBuf};

use crate::djvused::{StreamEditor, ToolHandle};
use crate::error::{Error, Result};
use crate::model::{PageId, PageMetadata};
use crate::sexpr::{self, Expr};

/// Read access to a document's current contents.
///
/// [`Session`](super::Session) goes through this trait for every load, so
/// tests can feed models from memory instead of running djvused.
pub trait DataSource {
    fn page_count(&self) -> Result<usize>;

    /// Hidden text of a 0-based page; `None` when the page has none.
    fn text(&self, page: usize) -> Result<Option<Expr>>;

    /// Top-level annotation records of a page or of the shared chunk.
    fn annotations(&self, id: PageId) -> Result<Vec<Expr>>;

    fn metadata(&self, id: PageId) -> Result<PageMetadata>;

    /// The outline; `None` when the document has none.
    fn outline(&self) -> Result<Option<Expr>>;
}

/// [`DataSource`] reading through `print-*` djvused commands.
#[derive(Debug, Clone)]
pub struct DjvusedSource {
    tool: ToolHandle,
    path: PathBuf,
}

impl DjvusedSource {
    pub fn new(tool: ToolHandle, path: impl Into<PathBuf>) -> Self {
        Self {
            tool,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn run(&self, script: impl FnOnce(&mut StreamEditor)) -> Result<String> {
        let mut editor = StreamEditor::new(self.tool.clone(), &self.path);
        script(&mut editor);
        editor.commit()
    }

    // Reading must not create a shared chunk, unlike StreamEditor::select.
    fn select(editor: &mut StreamEditor, id: PageId) {
        match id {
            PageId::Page(_) => editor.select(id),
            PageId::Shared => editor.select_shared_annotations(),
        }
    }
}

fn optional_expr(output: &str) -> Result<Option<Expr>> {
    if output.trim().is_empty() {
        Ok(None)
    } else {
        sexpr::parse(output).map(Some)
    }
}

impl DataSource for DjvusedSource {
    fn page_count(&self) -> Result<usize> {
        let output = self.run(StreamEditor::count_pages)?;
        output
            .trim()
            .parse()
            .map_err(|_| Error::Djvused(format!("unexpected page count {:?}", output.trim())))
    }

    fn text(&self, page: usize) -> Result<Option<Expr>> {
        debug!("loading text of page {}", page + 1);
        let output = self.run(|ed| {
            ed.select(PageId::Page(page));
            ed.print_text();
        })?;
        optional_expr(&output)
    }

    fn annotations(&self, id: PageId) -> Result<Vec<Expr>> {
        debug!("loading annotations of {}", id);
        let output = self.run(|ed| {
            Self::select(ed, id);
            ed.print_annotations();
        })?;
        sexpr::parse_all(&output)
    }

    fn metadata(&self, id: PageId) -> Result<PageMetadata> {
        let output = self.run(|ed| {
            Self::select(ed, id);
            ed.print_metadata();
        })?;
        PageMetadata::from_exprs(id, &sexpr::parse_all(&output)?)
    }

    fn outline(&self) -> Result<Option<Expr>> {
        let output = self.run(StreamEditor::print_outline)?;
        optional_expr(&output)
    }
}
