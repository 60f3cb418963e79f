//! Lazily populated per-page model cache.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::djvused::StreamEditor;
use crate::error::Result;

/// Key of a per-page model. The shared annotation chunk orders before every
/// page so its commands are emitted first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PageId {
    /// Document-wide shared annotations and metadata.
    Shared,
    /// A page, 0-based.
    Page(usize),
}

impl PageId {
    /// The 1-based page number djvused `select` expects.
    pub fn page_number(self) -> Option<usize> {
        match self {
            PageId::Shared => None,
            PageId::Page(n) => Some(n + 1),
        }
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageId::Shared => f.write_str("shared"),
            PageId::Page(n) => write!(f, "page {}", n + 1),
        }
    }
}

/// Behavior shared by all editable models.
pub trait DocumentModel {
    /// True after any mutation since load, save or revert.
    fn is_dirty(&self) -> bool;

    /// Restore the data the model was loaded with.
    fn revert(&mut self);

    /// Adopt the current state as the loaded state after a successful save.
    fn mark_saved(&mut self);

    /// Append the commands that persist this model; nothing when clean.
    fn export(&self, editor: &mut StreamEditor);
}

/// Map from [`PageId`] to a model, filled on first access.
#[derive(Debug)]
pub struct PageCache<M> {
    pages: BTreeMap<PageId, M>,
}

impl<M> Default for PageCache<M> {
    fn default() -> Self {
        Self {
            pages: BTreeMap::new(),
        }
    }
}

impl<M: DocumentModel> PageCache<M> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: PageId) -> Option<&M> {
        self.pages.get(&id)
    }

    pub fn get_mut(&mut self, id: PageId) -> Option<&mut M> {
        self.pages.get_mut(&id)
    }

    /// Return the cached model, loading it with `load` on a miss. A failed
    /// load leaves the cache untouched.
    pub fn get_or_try_insert_with<F>(&mut self, id: PageId, load: F) -> Result<&mut M>
    where
        F: FnOnce(PageId) -> Result<M>,
    {
        use std::collections::btree_map::Entry;
        match self.pages.entry(id) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => Ok(entry.insert(load(id)?)),
        }
    }

    pub fn insert(&mut self, id: PageId, model: M) -> Option<M> {
        self.pages.insert(id, model)
    }

    pub fn contains(&self, id: PageId) -> bool {
        self.pages.contains_key(&id)
    }

    /// Cached ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = PageId> + '_ {
        self.pages.keys().copied()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (PageId, &mut M)> + '_ {
        self.pages.iter_mut().map(|(id, m)| (*id, m))
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.pages.values().any(DocumentModel::is_dirty)
    }

    /// Export dirty models in ascending page order.
    pub fn export(&self, editor: &mut StreamEditor) {
        for model in self.pages.values() {
            model.export(editor);
        }
    }

    pub fn revert(&mut self) {
        for model in self.pages.values_mut() {
            model.revert();
        }
    }

    pub fn mark_saved(&mut self) {
        for model in self.pages.values_mut() {
            model.mark_saved();
        }
    }

    pub fn clear(&mut self) {
        self.pages.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::djvused::ToolHandle;
    use crate::error::Error;

    #[derive(Debug)]
    struct Fake {
        id: PageId,
        dirty: bool,
    }

    impl DocumentModel for Fake {
        fn is_dirty(&self) -> bool {
            self.dirty
        }

        fn revert(&mut self) {
            self.dirty = false;
        }

        fn mark_saved(&mut self) {
            self.dirty = false;
        }

        fn export(&self, editor: &mut StreamEditor) {
            if self.dirty {
                editor.select(self.id);
            }
        }
    }

    #[test]
    fn test_page_id_order() {
        let mut ids = vec![PageId::Page(3), PageId::Shared, PageId::Page(0)];
        ids.sort();
        assert_eq!(ids, vec![PageId::Shared, PageId::Page(0), PageId::Page(3)]);
        assert_eq!(PageId::Page(0).page_number(), Some(1));
        assert_eq!(PageId::Shared.to_string(), "shared");
    }

    #[test]
    fn test_load_once() {
        let mut cache = PageCache::new();
        let mut loads = 0;
        for _ in 0..3 {
            cache
                .get_or_try_insert_with(PageId::Page(1), |id| {
                    loads += 1;
                    Ok(Fake { id, dirty: false })
                })
                .unwrap();
        }
        assert_eq!(loads, 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_failed_load_caches_nothing() {
        let mut cache: PageCache<Fake> = PageCache::new();
        let result = cache.get_or_try_insert_with(PageId::Page(0), |_| Err(Error::NoTextLayer));
        assert!(result.is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_export_in_page_order() {
        let mut cache = PageCache::new();
        for id in [PageId::Page(2), PageId::Shared, PageId::Page(0), PageId::Page(1)] {
            cache.insert(id, Fake { id, dirty: id != PageId::Page(1) });
        }
        assert!(cache.is_dirty());

        let mut editor = StreamEditor::new(ToolHandle::unchecked("djvused"), "book.djvu");
        cache.export(&mut editor);
        assert_eq!(editor.commands(), ["create-shared-ant", "select 1", "select 3"]);

        cache.revert();
        assert!(!cache.is_dirty());
    }
}
