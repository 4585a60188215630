//! Auto-save driven by store change events.

use crate::page::{PageDocument, PageId};
use crate::storage::{FileStorage, PageSummary, Storage, StorageResult};
use crate::store::{ChangeCause, ElementStore, StoreEvent};
use std::sync::Arc;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::{Duration, Instant};

/// Default auto-save interval in seconds.
pub const DEFAULT_AUTOSAVE_INTERVAL_SECS: u64 = 30;

/// Listens to store events and saves page snapshots when there are edits.
///
/// The store only emits events; it never reaches into the adapter. Attach
/// with [`PersistenceAdapter::new`] for a bare store or
/// [`Editor::attach_persistence`](crate::Editor::attach_persistence).
pub struct PersistenceAdapter<S: Storage> {
    storage: Arc<S>,
    events: Receiver<StoreEvent>,
    interval: Duration,
    last_save: Option<Instant>,
    dirty: bool,
    /// Store revision of the last event seen.
    revision: u64,
    /// Store revision of the last edit seen.
    edited_at: u64,
    disconnected: bool,
}

impl<S: Storage> PersistenceAdapter<S> {
    /// Attach to `store` with the given backend.
    pub fn new(storage: Arc<S>, store: &mut ElementStore) -> Self {
        let revision = store.revision();
        Self::from_events(storage, store.subscribe(), revision)
    }

    /// Attach to an event stream whose store is currently at `revision`.
    pub fn from_events(storage: Arc<S>, events: Receiver<StoreEvent>, revision: u64) -> Self {
        Self {
            storage,
            events,
            interval: Duration::from_secs(DEFAULT_AUTOSAVE_INTERVAL_SECS),
            last_save: None,
            dirty: false,
            revision,
            edited_at: revision,
            disconnected: false,
        }
    }

    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Drain pending store events. Returns whether there are unsaved changes.
    ///
    /// Live gesture frames do not count; their completion does. Page
    /// switches do not count either since nothing was edited.
    pub fn poll(&mut self) -> bool {
        loop {
            match self.events.try_recv() {
                Ok(StoreEvent::ElementsChanged { revision, cause }) => {
                    self.revision = revision;
                    if !matches!(cause, ChangeCause::Preview | ChangeCause::Reset) {
                        self.edited_at = revision;
                        self.dirty = true;
                    }
                }
                Ok(StoreEvent::SelectionChanged { .. }) => {}
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if !self.disconnected {
                        log::warn!("Element store dropped; auto-save detached");
                        self.disconnected = true;
                    }
                    break;
                }
            }
        }
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Last store revision observed.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Whether there are edits and the interval has elapsed.
    pub fn should_save(&mut self) -> bool {
        if !self.poll() {
            return false;
        }
        match self.last_save {
            Some(last) => last.elapsed() >= self.interval,
            None => true,
        }
    }

    /// Save if dirty and the interval elapsed. Returns true if saved.
    pub async fn maybe_save(&mut self, document: &PageDocument) -> StorageResult<bool> {
        if !self.should_save() {
            return Ok(false);
        }
        self.save(document).await?;
        Ok(true)
    }

    /// Save immediately. Edits made after `document` was taken stay unsaved.
    pub async fn save(&mut self, document: &PageDocument) -> StorageResult<()> {
        self.storage.save(document).await?;
        self.poll();
        self.last_save = Some(Instant::now());
        self.dirty = self.edited_at > document.revision;
        log::info!(
            "Saved page {} ({} elements, revision {})",
            document.name,
            document.elements.len(),
            document.revision
        );
        Ok(())
    }

    pub async fn load(&mut self, id: PageId) -> StorageResult<PageDocument> {
        let document = self.storage.load(id).await?;
        self.last_save = Some(Instant::now());
        Ok(document)
    }

    /// The most recently saved page, if any.
    pub async fn load_last(&mut self) -> StorageResult<Option<PageDocument>> {
        let Some(id) = self.storage.last_saved().await? else {
            log::debug!("No last page to restore");
            return Ok(None);
        };
        self.load(id).await.map(Some)
    }

    pub async fn list_pages(&self) -> StorageResult<Vec<PageSummary>> {
        self.storage.list().await
    }

    pub async fn delete(&self, id: PageId) -> StorageResult<()> {
        self.storage.delete(id).await
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }
}

/// File storage in the platform data directory.
pub fn create_default_storage() -> StorageResult<Arc<FileStorage>> {
    Ok(Arc::new(FileStorage::default_location()?))
}
