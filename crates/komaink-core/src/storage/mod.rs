//! Storage abstraction for page persistence.
//!
//! The core never calls storage from a mutation. A [`PersistenceAdapter`]
//! listens to store events and saves page snapshots on its own schedule.

mod autosave;
mod file;
mod memory;

pub use autosave::{DEFAULT_AUTOSAVE_INTERVAL_SECS, PersistenceAdapter, create_default_storage};
pub use file::FileStorage;
pub use memory::MemoryStorage;

use crate::page::{PageDocument, PageId};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Page not found: {0}")]
    NotFound(PageId),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Storage error: {0}")]
    Other(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Boxed future for async operations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Listing entry for a stored page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSummary {
    pub page_id: PageId,
    pub name: String,
    pub element_count: usize,
}

impl PageSummary {
    pub fn of(document: &PageDocument) -> Self {
        Self {
            page_id: document.page_id,
            name: document.name.clone(),
            element_count: document.elements.len(),
        }
    }
}

/// Sort listings the way a page picker shows them.
fn sort_summaries(summaries: &mut [PageSummary]) {
    summaries.sort_by(|a, b| a.name.cmp(&b.name).then(a.page_id.cmp(&b.page_id)));
}

/// Page storage backend. Pages are keyed by their own id.
pub trait Storage: Send + Sync {
    /// Save a page and remember it as the last saved one.
    fn save(&self, document: &PageDocument) -> BoxFuture<'_, StorageResult<()>>;

    fn load(&self, id: PageId) -> BoxFuture<'_, StorageResult<PageDocument>>;

    /// Delete a page. Deleting a missing page is not an error.
    fn delete(&self, id: PageId) -> BoxFuture<'_, StorageResult<()>>;

    /// Stored pages ordered by name.
    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<PageSummary>>>;

    fn exists(&self, id: PageId) -> BoxFuture<'_, StorageResult<bool>>;

    /// The most recently saved page that is still stored.
    fn last_saved(&self) -> BoxFuture<'_, StorageResult<Option<PageId>>>;
}

/// Minimal executor for driving storage futures to completion.
///
/// The bundled backends never return `Pending`, so a busy poll suffices.
pub fn block_on<F: Future>(f: F) -> F::Output {
    use std::task::{Context, Poll, Waker};

    let mut cx = Context::from_waker(Waker::noop());
    let mut f = std::pin::pin!(f);
    loop {
        if let Poll::Ready(result) = f.as_mut().poll(&mut cx) {
            return result;
        }
        std::thread::yield_now();
    }
}
