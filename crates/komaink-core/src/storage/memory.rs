//! Pages kept in process memory.

use super::{BoxFuture, PageSummary, Storage, StorageError, StorageResult, sort_summaries};
use crate::page::{PageDocument, PageId};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
struct Shelf {
    pages: HashMap<PageId, PageDocument>,
    last_saved: Option<PageId>,
}

/// In-memory page shelf for tests and sessions without a disk.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    shelf: RwLock<Shelf>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored pages.
    pub fn len(&self) -> usize {
        self.read().map(|shelf| shelf.pages.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> StorageResult<RwLockReadGuard<'_, Shelf>> {
        self.shelf
            .read()
            .map_err(|_| StorageError::Other("page shelf poisoned".to_string()))
    }

    fn write(&self) -> StorageResult<RwLockWriteGuard<'_, Shelf>> {
        self.shelf
            .write()
            .map_err(|_| StorageError::Other("page shelf poisoned".to_string()))
    }
}

impl Storage for MemoryStorage {
    fn save(&self, document: &PageDocument) -> BoxFuture<'_, StorageResult<()>> {
        let document = document.clone();
        Box::pin(async move {
            let mut shelf = self.write()?;
            shelf.last_saved = Some(document.page_id);
            shelf.pages.insert(document.page_id, document);
            Ok(())
        })
    }

    fn load(&self, id: PageId) -> BoxFuture<'_, StorageResult<PageDocument>> {
        Box::pin(async move { self.read()?.pages.get(&id).cloned().ok_or(StorageError::NotFound(id)) })
    }

    fn delete(&self, id: PageId) -> BoxFuture<'_, StorageResult<()>> {
        Box::pin(async move {
            let mut shelf = self.write()?;
            shelf.pages.remove(&id);
            if shelf.last_saved == Some(id) {
                shelf.last_saved = None;
            }
            Ok(())
        })
    }

    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<PageSummary>>> {
        Box::pin(async move {
            let mut summaries: Vec<PageSummary> = self.read()?.pages.values().map(PageSummary::of).collect();
            sort_summaries(&mut summaries);
            Ok(summaries)
        })
    }

    fn exists(&self, id: PageId) -> BoxFuture<'_, StorageResult<bool>> {
        Box::pin(async move { Ok(self.read()?.pages.contains_key(&id)) })
    }

    fn last_saved(&self) -> BoxFuture<'_, StorageResult<Option<PageId>>> {
        Box::pin(async move { Ok(self.read()?.last_saved) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::PageBook;
    use crate::storage::block_on;
    use crate::store::ElementStore;

    fn document(name: &str) -> PageDocument {
        let mut book = PageBook::new();
        book.rename(book.active_id(), name);
        book.active_document(&ElementStore::default())
    }

    #[test]
    fn test_pages_keyed_by_id() {
        let storage = MemoryStorage::new();
        let doc = document("Cover");
        block_on(storage.save(&doc)).unwrap();

        assert_eq!(block_on(storage.load(doc.page_id)).unwrap(), doc);
        let missing = PageBook::new().active_id();
        assert!(matches!(block_on(storage.load(missing)), Err(StorageError::NotFound(id)) if id == missing));

        // Saving again overwrites instead of adding
        block_on(storage.save(&doc)).unwrap();
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn test_list_is_sorted_by_name() {
        let storage = MemoryStorage::new();
        block_on(storage.save(&document("Page 2"))).unwrap();
        block_on(storage.save(&document("Page 1"))).unwrap();

        let names: Vec<String> = block_on(storage.list()).unwrap().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["Page 1".to_string(), "Page 2".to_string()]);
    }

    #[test]
    fn test_last_saved_follows_deletes() {
        let storage = MemoryStorage::new();
        let first = document("One");
        let second = document("Two");
        block_on(storage.save(&first)).unwrap();
        block_on(storage.save(&second)).unwrap();
        assert_eq!(block_on(storage.last_saved()).unwrap(), Some(second.page_id));

        block_on(storage.delete(second.page_id)).unwrap();
        assert!(!block_on(storage.exists(second.page_id)).unwrap());
        assert_eq!(block_on(storage.last_saved()).unwrap(), None);
        assert!(block_on(storage.exists(first.page_id)).unwrap());
    }
}
