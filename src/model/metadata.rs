//! Document and page metadata (key/value pairs).

use std::collections::BTreeMap;

use super::cache::{DocumentModel, PageId};
use crate::djvused::StreamEditor;
use crate::error::{Error, Result};
use crate::sexpr::Expr;

/// Metadata of one page, or of the document when the id is
/// [`PageId::Shared`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageMetadata {
    id: PageId,
    original: BTreeMap<String, String>,
    data: BTreeMap<String, String>,
    dirty: bool,
}

impl PageMetadata {
    pub fn new(id: PageId, data: BTreeMap<String, String>) -> Self {
        Self {
            id,
            original: data.clone(),
            data,
            dirty: false,
        }
    }

    /// Decode `print-meta` output: alternating key symbols and value
    /// strings.
    pub fn from_exprs(id: PageId, exprs: &[Expr]) -> Result<Self> {
        if exprs.len() % 2 != 0 {
            return Err(Error::AnnotationSyntax(
                "metadata must come in key/value pairs".to_string(),
            ));
        }
        let mut data = BTreeMap::new();
        for pair in exprs.chunks(2) {
            let key = match &pair[0] {
                Expr::Symbol(key) | Expr::Str(key) => key.clone(),
                other => {
                    return Err(Error::AnnotationSyntax(format!(
                        "metadata key must be a symbol: {}",
                        other
                    )))
                }
            };
            let value = match &pair[1] {
                Expr::Str(value) | Expr::Symbol(value) => value.clone(),
                Expr::Int(n) => n.to_string(),
                other => {
                    return Err(Error::AnnotationSyntax(format!(
                        "metadata value must be a string: {}",
                        other
                    )))
                }
            };
            data.insert(key, value);
        }
        Ok(Self::new(id, data))
    }

    pub fn id(&self) -> PageId {
        self.id
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }

    pub fn data(&self) -> &BTreeMap<String, String> {
        &self.data
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.data.insert(key.into(), value.into());
        self.dirty = true;
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let removed = self.data.remove(key);
        if removed.is_some() {
            self.dirty = true;
        }
        removed
    }

    /// Replace every key at once, e.g. after a metadata dialog is accepted.
    pub fn replace(&mut self, data: BTreeMap<String, String>) {
        self.data = data;
        self.dirty = true;
    }

    /// Whether `key` differs from its loaded value.
    pub fn is_key_dirty(&self, key: &str) -> bool {
        self.data.get(key) != self.original.get(key)
    }

    /// Restore one key to its loaded value.
    pub fn revert_key(&mut self, key: &str) {
        match self.original.get(key) {
            Some(value) => {
                self.data.insert(key.to_string(), value.clone());
            }
            None => {
                self.data.remove(key);
            }
        }
        self.dirty = self.data != self.original;
    }
}

impl DocumentModel for PageMetadata {
    fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn revert(&mut self) {
        self.data = self.original.clone();
        self.dirty = false;
    }

    fn mark_saved(&mut self) {
        self.original = self.data.clone();
        self.dirty = false;
    }

    fn export(&self, editor: &mut StreamEditor) {
        if !self.dirty {
            return;
        }
        editor.select(self.id);
        editor.set_metadata(&self.data);
    }
}
