//! Pages on disk: `<page id>.json` per page plus a `last-page` marker.
//!
//! Every write goes to a hidden temporary file first and is renamed into
//! place, so a crash mid-save leaves the previous version intact.

use super::{BoxFuture, PageSummary, Storage, StorageError, StorageResult, sort_summaries};
use crate::page::{PageDocument, PageId};
use serde::Deserialize;
use serde::de::IgnoredAny;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const LAST_PAGE_FILE: &str = "last-page";

/// Just enough of a page file to list it.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageHeader {
    page_id: PageId,
    name: String,
    elements: Vec<IgnoredAny>,
}

/// Stores page documents as JSON files in one directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    base_path: PathBuf,
}

impl FileStorage {
    /// Storage rooted at `base_path`, created if missing.
    pub fn new(base_path: PathBuf) -> StorageResult<Self> {
        fs::create_dir_all(&base_path).map_err(|e| io_error("create", &base_path, e))?;
        Ok(Self { base_path })
    }

    /// Storage under the platform data directory, e.g.
    /// `~/.local/share/komaink/pages/` on Linux.
    pub fn default_location() -> StorageResult<Self> {
        let base = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| StorageError::Io("no data or home directory".to_string()))?;
        Self::new(base.join("komaink").join("pages"))
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn page_path(&self, id: PageId) -> PathBuf {
        self.base_path.join(format!("{}.json", id))
    }

    fn marker_path(&self) -> PathBuf {
        self.base_path.join(LAST_PAGE_FILE)
    }

    fn read_marker(&self) -> StorageResult<Option<PageId>> {
        let path = self.marker_path();
        match fs::read_to_string(&path) {
            Ok(text) => Ok(PageId::parse_str(text.trim()).ok()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error("read", &path, e)),
        }
    }
}

fn io_error(action: &str, path: &Path, e: std::io::Error) -> StorageError {
    StorageError::Io(format!("cannot {} {}: {}", action, path.display(), e))
}

/// Write `bytes` to `path` through a temporary sibling and a rename.
fn write_atomic(path: &Path, bytes: &[u8]) -> StorageResult<()> {
    let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("page");
    let tmp = path.with_file_name(format!(".{}.tmp", file_name));
    if let Err(e) = fs::write(&tmp, bytes).and_then(|()| fs::rename(&tmp, path)) {
        let _ = fs::remove_file(&tmp);
        return Err(io_error("write", path, e));
    }
    Ok(())
}

impl Storage for FileStorage {
    fn save(&self, document: &PageDocument) -> BoxFuture<'_, StorageResult<()>> {
        let id = document.page_id;
        let json = document.to_json();
        Box::pin(async move {
            let json = json.map_err(|e| StorageError::Serialization(e.to_string()))?;
            write_atomic(&self.page_path(id), json.as_bytes())?;
            write_atomic(&self.marker_path(), id.to_string().as_bytes())?;
            log::debug!("Wrote page {} to {}", id, self.base_path.display());
            Ok(())
        })
    }

    fn load(&self, id: PageId) -> BoxFuture<'_, StorageResult<PageDocument>> {
        Box::pin(async move {
            let path = self.page_path(id);
            let json = match fs::read_to_string(&path) {
                Ok(json) => json,
                Err(e) if e.kind() == ErrorKind::NotFound => return Err(StorageError::NotFound(id)),
                Err(e) => return Err(io_error("read", &path, e)),
            };
            let document = PageDocument::from_json(&json)
                .map_err(|e| StorageError::Serialization(format!("{}: {}", path.display(), e)))?;
            if document.page_id != id {
                return Err(StorageError::Serialization(format!(
                    "{} holds page {}",
                    path.display(),
                    document.page_id
                )));
            }
            Ok(document)
        })
    }

    fn delete(&self, id: PageId) -> BoxFuture<'_, StorageResult<()>> {
        Box::pin(async move {
            let path = self.page_path(id);
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(io_error("delete", &path, e)),
            }
            if self.read_marker()? == Some(id) {
                let marker = self.marker_path();
                fs::remove_file(&marker).map_err(|e| io_error("delete", &marker, e))?;
            }
            Ok(())
        })
    }

    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<PageSummary>>> {
        Box::pin(async move {
            let entries = fs::read_dir(&self.base_path).map_err(|e| io_error("list", &self.base_path, e))?;
            let mut summaries = Vec::new();
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().is_none_or(|ext| ext != "json") {
                    continue;
                }
                let Some(id) = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .and_then(|s| PageId::parse_str(s).ok())
                else {
                    continue;
                };
                let header = fs::read_to_string(&path)
                    .ok()
                    .and_then(|json| serde_json::from_str::<PageHeader>(&json).ok());
                match header {
                    Some(header) if header.page_id == id => summaries.push(PageSummary {
                        page_id: header.page_id,
                        name: header.name,
                        element_count: header.elements.len(),
                    }),
                    _ => log::warn!("Skipping unreadable page file {}", path.display()),
                }
            }
            sort_summaries(&mut summaries);
            Ok(summaries)
        })
    }

    fn exists(&self, id: PageId) -> BoxFuture<'_, StorageResult<bool>> {
        Box::pin(async move { Ok(self.page_path(id).is_file()) })
    }

    fn last_saved(&self) -> BoxFuture<'_, StorageResult<Option<PageId>>> {
        Box::pin(async move {
            Ok(self
                .read_marker()?
                .filter(|id| self.page_path(*id).is_file()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{Element, PanelStyle};
    use crate::page::PageBook;
    use crate::storage::block_on;
    use crate::store::ElementStore;
    use kurbo::Rect;
    use tempfile::tempdir;
    use uuid::Uuid;

    fn document(name: &str, panels: usize) -> PageDocument {
        let mut store = ElementStore::default();
        for i in 0..panels {
            let x = i as f64 * 250.0;
            store.add_element(Element::panel(Uuid::nil(), Rect::new(x, 0.0, x + 200.0, 150.0), PanelStyle::default()));
        }
        let mut book = PageBook::new();
        book.rename(book.active_id(), name);
        book.active_document(&store)
    }

    #[test]
    fn test_save_load_leaves_no_temp_files() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path().to_path_buf()).unwrap();
        let doc = document("Cover", 2);

        block_on(storage.save(&doc)).unwrap();
        assert_eq!(block_on(storage.load(doc.page_id)).unwrap(), doc);
        assert!(dir.path().join(format!("{}.json", doc.page_id)).is_file());

        let stray: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .flatten()
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(stray.is_empty());
    }

    #[test]
    fn test_missing_page() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path().to_path_buf()).unwrap();
        let id = Uuid::new_v4();
        assert!(matches!(block_on(storage.load(id)), Err(StorageError::NotFound(_))));
        assert!(block_on(storage.delete(id)).is_ok());
        assert_eq!(block_on(storage.last_saved()).unwrap(), None);
    }

    #[test]
    fn test_list_summaries_skip_foreign_files() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path().to_path_buf()).unwrap();
        block_on(storage.save(&document("Page 2", 1))).unwrap();
        block_on(storage.save(&document("Page 1", 3))).unwrap();
        fs::write(dir.path().join("notes.json"), "{}").unwrap();
        fs::write(dir.path().join(format!("{}.json", Uuid::new_v4())), "not json").unwrap();

        let list = block_on(storage.list()).unwrap();
        let listed: Vec<(String, usize)> = list.into_iter().map(|s| (s.name, s.element_count)).collect();
        assert_eq!(listed, vec![("Page 1".to_string(), 3), ("Page 2".to_string(), 1)]);
    }

    #[test]
    fn test_last_saved_marker() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path().to_path_buf()).unwrap();
        let first = document("One", 0);
        let second = document("Two", 0);
        block_on(storage.save(&first)).unwrap();
        block_on(storage.save(&second)).unwrap();
        assert_eq!(block_on(storage.last_saved()).unwrap(), Some(second.page_id));

        // A fresh handle on the same directory sees the marker
        let reopened = FileStorage::new(dir.path().to_path_buf()).unwrap();
        assert_eq!(block_on(reopened.last_saved()).unwrap(), Some(second.page_id));

        block_on(storage.delete(second.page_id)).unwrap();
        assert_eq!(block_on(storage.last_saved()).unwrap(), None);
        assert!(block_on(storage.exists(first.page_id)).unwrap());
    }

    #[test]
    fn test_mismatched_page_file_rejected() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path().to_path_buf()).unwrap();
        let doc = document("Cover", 0);
        let other = Uuid::new_v4();
        fs::write(dir.path().join(format!("{}.json", other)), doc.to_json().unwrap()).unwrap();
        assert!(matches!(block_on(storage.load(other)), Err(StorageError::Serialization(_))));
    }
}
