//! Pages and page documents.
//!
//! Only the active page's elements live in the [`ElementStore`]; inactive
//! pages keep theirs here until activated.

use crate::camera::{MAX_SCALE, MIN_SCALE, ViewTransform};
use crate::config::EditorConfig;
use crate::elements::Element;
use crate::store::ElementStore;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for pages.
pub type PageId = Uuid;

/// Grid overlay settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridSettings {
    pub visible: bool,
    pub size: f64,
    pub snap: bool,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            visible: false,
            size: 20.0,
            snap: false,
        }
    }
}

/// Per-page view state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewState {
    pub transform: ViewTransform,
    #[serde(default)]
    pub grid: GridSettings,
}

/// A page in the book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: PageId,
    pub name: String,
    /// Stale while the page is active; the store holds the live copy.
    pub elements: Vec<Element>,
    pub view: ViewState,
}

impl Page {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            elements: Vec::new(),
            view: ViewState::default(),
        }
    }
}

/// Persistence snapshot of one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageDocument {
    pub page_id: PageId,
    pub name: String,
    /// Elements in store order.
    pub elements: Vec<Element>,
    #[serde(default)]
    pub view: ViewState,
    /// Store revision the snapshot was taken at.
    #[serde(default)]
    pub revision: u64,
}

impl PageDocument {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Ordered pages with exactly one active page.
#[derive(Debug, Clone)]
pub struct PageBook {
    pages: Vec<Page>,
    active: usize,
    /// Zoom bounds every page's view is held to.
    min_zoom: f64,
    max_zoom: f64,
}

impl Default for PageBook {
    fn default() -> Self {
        Self::new()
    }
}

impl PageBook {
    /// A book with one empty page and the default zoom bounds.
    pub fn new() -> Self {
        Self::with_zoom_bounds(MIN_SCALE, MAX_SCALE)
    }

    /// A book whose pages use the configured zoom bounds.
    pub fn from_config(config: &EditorConfig) -> Self {
        Self::with_zoom_bounds(config.min_zoom, config.max_zoom)
    }

    pub fn with_zoom_bounds(min_zoom: f64, max_zoom: f64) -> Self {
        let mut book = Self {
            pages: Vec::new(),
            active: 0,
            min_zoom,
            max_zoom,
        };
        let first = book.blank_page("Page 1");
        book.pages.push(first);
        book
    }

    fn blank_page(&self, name: impl Into<String>) -> Page {
        let mut page = Page::new(name);
        page.view.transform = ViewTransform::with_bounds(self.min_zoom, self.max_zoom);
        page
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn active(&self) -> &Page {
        &self.pages[self.active]
    }

    pub fn active_mut(&mut self) -> &mut Page {
        &mut self.pages[self.active]
    }

    pub fn active_id(&self) -> PageId {
        self.active().id
    }

    pub fn get(&self, id: PageId) -> Option<&Page> {
        self.pages.iter().find(|p| p.id == id)
    }

    fn index_of(&self, id: PageId) -> Option<usize> {
        self.pages.iter().position(|p| p.id == id)
    }

    /// Append an empty page. Does not activate it.
    pub fn add_page(&mut self, name: impl Into<String>) -> PageId {
        let page = self.blank_page(name);
        let id = page.id;
        self.pages.push(page);
        id
    }

    pub fn rename(&mut self, id: PageId, name: impl Into<String>) -> bool {
        match self.pages.iter_mut().find(|p| p.id == id) {
            Some(page) => {
                page.name = name.into();
                true
            }
            None => false,
        }
    }

    /// Switch pages. The working collection is saved into the outgoing page
    /// and replaced by the incoming page's elements; history starts fresh.
    pub fn activate(&mut self, id: PageId, store: &mut ElementStore) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        if index == self.active {
            return true;
        }
        self.active_mut().elements = store.elements().to_vec();
        self.active = index;
        let incoming = std::mem::take(&mut self.pages[index].elements);
        store.clear_selection();
        store.reset(incoming);
        log::info!("Activated page {} ({})", self.active().name, id);
        true
    }

    /// Remove a page. The last page cannot be removed. Removing the active
    /// page activates its neighbour.
    pub fn remove(&mut self, id: PageId, store: &mut ElementStore) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        if self.pages.len() == 1 {
            return false;
        }
        if index == self.active {
            let neighbour = if index + 1 < self.pages.len() { index + 1 } else { index - 1 };
            let neighbour_id = self.pages[neighbour].id;
            self.activate(neighbour_id, store);
        }
        self.pages.remove(index);
        if self.active > index {
            self.active -= 1;
        }
        true
    }

    /// Snapshot of the active page with the live elements.
    pub fn active_document(&self, store: &ElementStore) -> PageDocument {
        let page = self.active();
        PageDocument {
            page_id: page.id,
            name: page.name.clone(),
            elements: store.elements().to_vec(),
            view: page.view,
            revision: store.revision(),
        }
    }

    /// Load a document as a page and activate it, replacing a page with the
    /// same id. The stored view is brought back within this book's zoom
    /// bounds.
    pub fn load_document(&mut self, document: PageDocument, store: &mut ElementStore) {
        let mut view = document.view;
        view.transform = view.transform.sanitized(self.min_zoom, self.max_zoom);
        let page = Page {
            id: document.page_id,
            name: document.name,
            elements: document.elements,
            view,
        };
        let id = page.id;
        match self.index_of(id) {
            Some(index) if index == self.active => {
                let Page { name, elements, view, .. } = page;
                let active = self.active_mut();
                active.name = name;
                active.view = view;
                store.clear_selection();
                store.reset(elements);
                log::info!("Reloaded active page {}", id);
            }
            Some(index) => {
                self.pages[index] = page;
                self.activate(id, store);
            }
            None => {
                self.pages.push(page);
                self.activate(id, store);
            }
        }
    }
}
