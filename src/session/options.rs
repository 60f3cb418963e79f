//! Session options and configuration.

use std::ops::RangeInclusive;

use crate::external::ExternalEditor;

/// Options for opening a document.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Error handling mode for annotation records
    pub error_mode: ErrorMode,

    /// Whether djvused saves the document after each save script (`-s`)
    pub autosave: bool,

    /// Editor used for plain-text editing of text and outline
    pub editor: ExternalEditor,
}

impl SessionOptions {
    /// Create new session options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set error mode.
    pub fn with_error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = mode;
        self
    }

    /// Enable lenient mode (keep unparsable map-areas verbatim).
    pub fn lenient(mut self) -> Self {
        self.error_mode = ErrorMode::Lenient;
        self
    }

    /// Enable or disable autosave.
    pub fn with_autosave(mut self, autosave: bool) -> Self {
        self.autosave = autosave;
        self
    }

    /// Set the external editor.
    pub fn with_editor(mut self, editor: ExternalEditor) -> Self {
        self.editor = editor;
        self
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            error_mode: ErrorMode::Strict,
            autosave: true,
            editor: ExternalEditor::default(),
        }
    }
}

/// Error handling mode while loading annotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMode {
    /// Fail on any malformed record
    #[default]
    Strict,
    /// Keep malformed map-areas as opaque records and continue
    Lenient,
}

/// Which pages a bulk operation touches.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PageSelection {
    /// All pages
    #[default]
    All,
    /// A range of pages (inclusive, 1-indexed)
    Range(RangeInclusive<usize>),
    /// Specific pages (1-indexed)
    Pages(Vec<usize>),
}

impl PageSelection {
    /// Check if a 1-based page number should be included.
    pub fn includes(&self, page: usize) -> bool {
        match self {
            PageSelection::All => true,
            PageSelection::Range(range) => range.contains(&page),
            PageSelection::Pages(pages) => pages.contains(&page),
        }
    }

    /// 0-based page indices selected from a document of `count` pages.
    pub fn indices(&self, count: usize) -> Vec<usize> {
        (1..=count)
            .filter(|&page| self.includes(page))
            .map(|page| page - 1)
            .collect()
    }

    /// Parse a page selection string (e.g., "1-10", "1,3,5,7-10").
    pub fn parse(s: &str) -> Result<Self, String> {
        let s = s.trim();

        if s.is_empty() || s == "all" {
            return Ok(PageSelection::All);
        }

        if let Some((start, end)) = s.split_once('-') {
            if !start.contains(',') && !end.contains(',') {
                let start: usize = start.trim().parse().map_err(|_| "Invalid start page")?;
                let end: usize = end.trim().parse().map_err(|_| "Invalid end page")?;
                return Ok(PageSelection::Range(start..=end));
            }
        }

        let mut pages = Vec::new();
        for part in s.split(',') {
            let part = part.trim();
            if let Some((start, end)) = part.split_once('-') {
                let start: usize = start.trim().parse().map_err(|_| "Invalid page number")?;
                let end: usize = end.trim().parse().map_err(|_| "Invalid page number")?;
                for p in start..=end {
                    if !pages.contains(&p) {
                        pages.push(p);
                    }
                }
            } else {
                let p: usize = part.parse().map_err(|_| "Invalid page number")?;
                if !pages.contains(&p) {
                    pages.push(p);
                }
            }
        }
        pages.sort_unstable();
        Ok(PageSelection::Pages(pages))
    }
}
