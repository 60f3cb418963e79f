//! Editing session over one document.
//!
//! A [`Session`] owns the page caches and the outline, loads models lazily
//! from a [`DataSource`], and saves every dirty model in one djvused script.
//! Commands are emitted per model kind in a fixed order (annotations, text,
//! outline, metadata) and by ascending page within each kind, shared data
//! first.

mod job;
mod options;
mod source;

pub use job::Job;
pub use options::{ErrorMode, PageSelection, SessionOptions};
pub use source::{DataSource, DjvusedSource};

use log::{debug, info};
use std::path::{Path, PathBuf};

use crate::djvused::{StreamEditor, ToolHandle};
use crate::error::{Error, Result};
use crate::external;
use crate::model::{
    DocumentModel, Outline, PageAnnotations, PageCache, PageId, PageMetadata, PageText, ZoneType,
};
use crate::reconcile::Reconciliation;

/// An open document.
#[derive(Debug)]
pub struct Session<S: DataSource = DjvusedSource> {
    path: PathBuf,
    tool: ToolHandle,
    source: S,
    options: SessionOptions,
    page_count: Option<usize>,
    text: PageCache<PageText>,
    annotations: PageCache<PageAnnotations>,
    metadata: PageCache<PageMetadata>,
    outline: Option<Outline>,
}

impl Session<DjvusedSource> {
    /// Open a document, reading it through djvused.
    pub fn open(path: impl Into<PathBuf>, tool: ToolHandle, options: SessionOptions) -> Self {
        let path = path.into();
        let source = DjvusedSource::new(tool.clone(), &path);
        Self::with_source(path, tool, source, options)
    }
}

impl<S: DataSource> Session<S> {
    pub fn with_source(
        path: impl Into<PathBuf>,
        tool: ToolHandle,
        source: S,
        options: SessionOptions,
    ) -> Self {
        Self {
            path: path.into(),
            tool,
            source,
            options,
            page_count: None,
            text: PageCache::new(),
            annotations: PageCache::new(),
            metadata: PageCache::new(),
            outline: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn page_count(&mut self) -> Result<usize> {
        match self.page_count {
            Some(count) => Ok(count),
            None => {
                let count = self.source.page_count()?;
                self.page_count = Some(count);
                Ok(count)
            }
        }
    }

    fn check_page(&mut self, page: usize) -> Result<()> {
        let count = self.page_count()?;
        if page >= count {
            return Err(Error::PageOutOfRange(page + 1, count));
        }
        Ok(())
    }

    /// Hidden text of a 0-based page.
    pub fn text(&mut self, page: usize) -> Result<&mut PageText> {
        self.check_page(page)?;
        let source = &self.source;
        self.text.get_or_try_insert_with(PageId::Page(page), |_| {
            PageText::new(page, source.text(page)?.as_ref())
        })
    }

    pub fn annotations(&mut self, id: PageId) -> Result<&mut PageAnnotations> {
        if let PageId::Page(page) = id {
            self.check_page(page)?;
        }
        let source = &self.source;
        let mode = self.options.error_mode;
        self.annotations
            .get_or_try_insert_with(id, |id| PageAnnotations::new(id, source.annotations(id)?, mode))
    }

    pub fn metadata(&mut self, id: PageId) -> Result<&mut PageMetadata> {
        if let PageId::Page(page) = id {
            self.check_page(page)?;
        }
        let source = &self.source;
        self.metadata
            .get_or_try_insert_with(id, |id| source.metadata(id))
    }

    pub fn outline(&mut self) -> Result<&mut Outline> {
        let outline = match self.outline.take() {
            Some(outline) => outline,
            None => Outline::new(self.source.outline()?.as_ref())?,
        };
        Ok(self.outline.insert(outline))
    }

    pub fn is_dirty(&self) -> bool {
        self.annotations.is_dirty()
            || self.text.is_dirty()
            || self.outline.as_ref().is_some_and(DocumentModel::is_dirty)
            || self.metadata.is_dirty()
    }

    /// Discard every unsaved change.
    pub fn revert(&mut self) {
        self.annotations.revert();
        self.text.revert();
        if let Some(outline) = self.outline.as_mut() {
            outline.revert();
        }
        self.metadata.revert();
    }

    /// Remove zone levels of rank `max` and finer on the selected pages.
    pub fn strip_text(&mut self, pages: &PageSelection, max: ZoneType) -> Result<usize> {
        let count = self.page_count()?;
        let mut stripped = 0;
        for page in pages.indices(count) {
            let text = self.text(page)?;
            if text.root().is_some() {
                text.strip(max);
                stripped += 1;
            }
        }
        info!("stripped {} zones on {} pages", max, stripped);
        Ok(stripped)
    }

    /// The script that persists every dirty model.
    pub fn save_script(&self) -> StreamEditor {
        let mut editor =
            StreamEditor::new(self.tool.clone(), &self.path).with_autosave(self.options.autosave);
        self.annotations.export(&mut editor);
        self.text.export(&mut editor);
        if let Some(outline) = &self.outline {
            outline.export(&mut editor);
        }
        self.metadata.export(&mut editor);
        editor
    }

    /// Save in the calling thread. Nothing runs when no model is dirty.
    pub fn save(&mut self) -> Result<()> {
        let mut editor = self.save_script();
        if editor.is_empty() {
            debug!("nothing to save");
            return Ok(());
        }
        let outcome = editor.commit();
        self.finish_save(outcome)
    }

    /// Run the save script on a worker thread. Pass the job's result to
    /// [`finish_save`](Session::finish_save) once it is available.
    pub fn save_in_background(&self) -> Result<Option<Job<Result<String>>>> {
        let mut editor = self.save_script();
        if editor.is_empty() {
            return Ok(None);
        }
        Job::spawn("redjvu-save", move || editor.commit()).map(Some)
    }

    /// Apply the outcome of a save. Success marks every model clean; a
    /// failure leaves the models dirty and is returned unchanged.
    pub fn finish_save(&mut self, outcome: Result<String>) -> Result<()> {
        outcome?;
        self.annotations.mark_saved();
        self.text.mark_saved();
        if let Some(outline) = self.outline.as_mut() {
            outline.mark_saved();
        }
        self.metadata.mark_saved();
        info!("saved {}", self.path.display());
        Ok(())
    }

    /// Start editing the text of a page in the external editor.
    pub fn edit_text_externally(&mut self, page: usize) -> Result<Job<Result<Reconciliation>>> {
        let record = self.text(page)?.record().ok_or(Error::NoTextLayer)?;
        // Fail before the editor opens if the text cannot be edited.
        crate::reconcile::export_units(&record)?;
        let editor = self.options.editor.clone();
        Job::spawn("redjvu-edit-text", move || {
            external::edit_zone_text(&editor, &record)
        })
    }

    /// Apply an external text edit. Returns whether the page changed.
    pub fn apply_text_edit(&mut self, page: usize, outcome: Result<Reconciliation>) -> Result<bool> {
        match outcome? {
            Reconciliation::Reconciled(record) => {
                self.text(page)?.set_record(Some(record));
                Ok(true)
            }
            Reconciliation::NothingChanged => Ok(false),
        }
    }

    /// Start editing the outline in the external editor.
    pub fn edit_outline_externally(&mut self) -> Result<Job<Result<Vec<String>>>> {
        let mut plaintext = Vec::new();
        self.outline()?.export_as_plaintext(&mut plaintext)?;
        let plaintext = String::from_utf8_lossy(&plaintext).into_owned();
        let editor = self.options.editor.clone();
        Job::spawn("redjvu-edit-outline", move || {
            external::edit_outline_text(&editor, &plaintext)
        })
    }

    pub fn apply_outline_edit(&mut self, outcome: Result<Vec<String>>) -> Result<()> {
        let lines = outcome?;
        self.outline()?.import_plaintext(lines);
        Ok(())
    }
}
