//! Authoritative element collection with history, selection and change events.

use crate::config::EditorConfig;
use crate::elements::{Element, ElementId, ElementPatch};
use crate::history::{History, Snapshot};
use kurbo::Point;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use uuid::Uuid;

/// Source of element ids, owned by the store.
pub trait IdGenerator: fmt::Debug {
    fn next_id(&mut self) -> ElementId;
}

/// Random v4 UUIDs.
#[derive(Debug, Default)]
pub struct RandomIds;

impl IdGenerator for RandomIds {
    fn next_id(&mut self) -> ElementId {
        Uuid::new_v4()
    }
}

/// Deterministic ids `00000000-0000-0000-0000-000000000001`, `...02`, ...
#[derive(Debug, Default)]
pub struct SequentialIds {
    counter: u128,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&mut self) -> ElementId {
        self.counter += 1;
        Uuid::from_u128(self.counter)
    }
}

/// Why the element array changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeCause {
    Add,
    Update,
    Remove,
    Batch,
    Undo,
    Redo,
    /// Live gesture frame, not in history.
    Preview,
    /// Gesture completion or cancellation.
    Gesture,
    /// Whole collection replaced (page switch, load).
    Reset,
}

/// Notification sent to subscribers after each change.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    ElementsChanged { revision: u64, cause: ChangeCause },
    SelectionChanged { selection: Vec<ElementId> },
}

/// Ordered element collection plus snapshot history and selection.
///
/// Every mutation installs a new `Arc`, so observers can compare
/// [`ElementStore::snapshot`] results by pointer.
#[derive(Debug)]
pub struct ElementStore {
    history: History,
    selection: Vec<ElementId>,
    ids: Box<dyn IdGenerator>,
    min_size: f64,
    revision: u64,
    subscribers: Vec<Sender<StoreEvent>>,
}

impl Default for ElementStore {
    fn default() -> Self {
        Self::new(&EditorConfig::default())
    }
}

impl ElementStore {
    /// Create an empty store with random ids.
    pub fn new(config: &EditorConfig) -> Self {
        Self::with_id_generator(config, Box::new(RandomIds))
    }

    pub fn with_id_generator(config: &EditorConfig, ids: Box<dyn IdGenerator>) -> Self {
        Self {
            history: History::new(Vec::new(), config.history_limit),
            selection: Vec::new(),
            ids,
            min_size: config.min_element_size,
            revision: 0,
            subscribers: Vec::new(),
        }
    }

    // --- Reading ---

    /// The live element array.
    pub fn elements(&self) -> &[Element] {
        self.history.present()
    }

    /// Shared handle to the live array. Changes whenever the store mutates.
    pub fn snapshot(&self) -> Snapshot {
        self.history.present().clone()
    }

    pub fn len(&self) -> usize {
        self.elements().len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements().is_empty()
    }

    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.elements().iter().find(|e| e.id == id)
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.get(id).is_some()
    }

    /// Monotonic counter bumped on every element change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn min_size(&self) -> f64 {
        self.min_size
    }

    /// Elements sorted for drawing: by layer, then z-index, then insertion.
    pub fn draw_order(&self) -> Vec<&Element> {
        let mut ordered: Vec<(usize, &Element)> = self.elements().iter().enumerate().collect();
        ordered.sort_by_key(|(i, e)| (e.layer, e.transform.z_index, *i));
        ordered.into_iter().map(|(_, e)| e).collect()
    }

    /// Topmost visible element under `point`, searching by descending z-index.
    pub fn hit_test(&self, point: Point) -> Option<ElementId> {
        let mut ordered: Vec<(usize, &Element)> = self.elements().iter().enumerate().collect();
        ordered.sort_by_key(|(i, e)| std::cmp::Reverse((e.transform.z_index, e.layer, *i)));
        ordered
            .into_iter()
            .find(|(_, e)| e.hit_test(point))
            .map(|(_, e)| e.id)
    }

    /// One above the highest z-index in use.
    pub fn next_z_index(&self) -> i64 {
        self.elements()
            .iter()
            .map(|e| e.transform.z_index)
            .max()
            .map_or(0, |z| z + 1)
    }

    // --- Element commands ---

    /// Append an element. A nil or already used id is replaced with a fresh
    /// one. Returns the id the element was stored under.
    pub fn add_element(&mut self, element: Element) -> ElementId {
        let mut next = self.elements().to_vec();
        let id = insert_element(&mut next, element, self.ids.as_mut(), self.min_size);
        self.commit(next, ChangeCause::Add);
        id
    }

    /// Merge `patch` into the element. Unknown ids are ignored.
    pub fn update_element(&mut self, id: ElementId, patch: &ElementPatch) -> bool {
        let Some(index) = self.index_of(id) else {
            log::debug!("update_element: no element {}", id);
            return false;
        };
        let mut next = self.elements().to_vec();
        patch.apply(&mut next[index], self.min_size);
        self.commit(next, ChangeCause::Update);
        true
    }

    /// Remove one element. Unknown ids are ignored.
    pub fn remove_element(&mut self, id: ElementId) -> bool {
        self.remove_elements(&[id]) > 0
    }

    /// Remove several elements, pruning them from the selection.
    /// Returns how many were removed.
    pub fn remove_elements(&mut self, ids: &[ElementId]) -> usize {
        let doomed: HashSet<ElementId> = ids.iter().copied().collect();
        let next: Vec<Element> = self
            .elements()
            .iter()
            .filter(|e| !doomed.contains(&e.id))
            .cloned()
            .collect();
        let removed = self.len() - next.len();
        if removed == 0 {
            return 0;
        }
        self.commit(next, ChangeCause::Remove);
        removed
    }

    /// Apply several mutations as one undo step.
    ///
    /// Nothing is recorded if the closure leaves the elements unchanged.
    pub fn batch<R>(&mut self, f: impl FnOnce(&mut Batch<'_>) -> R) -> R {
        let mut batch = Batch {
            elements: self.elements().to_vec(),
            ids: self.ids.as_mut(),
            min_size: self.min_size,
            changed: false,
        };
        let result = f(&mut batch);
        let Batch { elements, changed, .. } = batch;
        if changed {
            self.commit(elements, ChangeCause::Batch);
        }
        result
    }

    /// Move an element above every other element.
    pub fn bring_to_front(&mut self, id: ElementId) -> bool {
        let top = self.next_z_index();
        match self.get(id) {
            Some(e) if e.transform.z_index + 1 == top && self.is_unique_top(id) => false,
            Some(_) => self.update_element(id, &ElementPatch::new().z_index(top)),
            None => false,
        }
    }

    /// Move an element below every other element.
    pub fn send_to_back(&mut self, id: ElementId) -> bool {
        let Some(bottom) = self.elements().iter().map(|e| e.transform.z_index).min() else {
            return false;
        };
        match self.get(id) {
            Some(e) if e.transform.z_index == bottom && self.count_at_z(bottom) == 1 => false,
            Some(_) => self.update_element(id, &ElementPatch::new().z_index(bottom - 1)),
            None => false,
        }
    }

    fn is_unique_top(&self, id: ElementId) -> bool {
        let top = self.next_z_index() - 1;
        self.elements()
            .iter()
            .all(|e| e.id == id || e.transform.z_index < top)
    }

    fn count_at_z(&self, z: i64) -> usize {
        self.elements().iter().filter(|e| e.transform.z_index == z).count()
    }

    /// Step back in history. No-op on an empty stack.
    pub fn undo(&mut self) -> bool {
        if !self.history.undo() {
            return false;
        }
        self.after_history_step(ChangeCause::Undo);
        true
    }

    /// Step forward in history. No-op on an empty stack.
    pub fn redo(&mut self) -> bool {
        if !self.history.redo() {
            return false;
        }
        self.after_history_step(ChangeCause::Redo);
        true
    }

    /// Replace the whole collection and drop history (page activation, load).
    pub fn reset(&mut self, elements: Vec<Element>) {
        let mut unique = Vec::with_capacity(elements.len());
        for element in elements {
            insert_element(&mut unique, element, self.ids.as_mut(), self.min_size);
        }
        self.history.reset(unique);
        self.bump(ChangeCause::Reset);
        self.prune_selection();
    }

    // --- Gestures ---

    /// Update an element for a live gesture frame without recording history.
    pub fn preview_update(&mut self, id: ElementId, patch: &ElementPatch) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        let mut next = self.elements().to_vec();
        patch.apply(&mut next[index], self.min_size);
        self.history.replace_present(Arc::new(next));
        self.bump(ChangeCause::Preview);
        true
    }

    /// Finish a gesture that started at `before`, recording one undo step if
    /// anything changed.
    pub fn commit_gesture(&mut self, before: Snapshot) -> bool {
        if Arc::ptr_eq(&before, self.history.present()) || *before == **self.history.present() {
            return false;
        }
        self.history.record_since(before);
        self.bump(ChangeCause::Gesture);
        true
    }

    /// Abandon a gesture, restoring the state it started from.
    pub fn cancel_gesture(&mut self, before: Snapshot) {
        if Arc::ptr_eq(&before, self.history.present()) {
            return;
        }
        self.history.replace_present(before);
        self.bump(ChangeCause::Gesture);
        self.prune_selection();
    }

    // --- Selection ---

    pub fn selection(&self) -> &[ElementId] {
        &self.selection
    }

    pub fn is_selected(&self, id: ElementId) -> bool {
        self.selection.contains(&id)
    }

    /// Replace the selection. Ids not in the store are dropped.
    pub fn set_selection(&mut self, ids: impl IntoIterator<Item = ElementId>) {
        let mut next: Vec<ElementId> = Vec::new();
        for id in ids {
            if self.contains(id) && !next.contains(&id) {
                next.push(id);
            }
        }
        if next != self.selection {
            self.selection = next;
            self.emit_selection();
        }
    }

    /// Make `id` the sole selection.
    pub fn select(&mut self, id: ElementId) {
        self.set_selection([id]);
    }

    pub fn clear_selection(&mut self) {
        self.set_selection([]);
    }

    // --- Events ---

    /// Receive a [`StoreEvent`] after every change. Dropped receivers are
    /// pruned on the next send.
    pub fn subscribe(&mut self) -> Receiver<StoreEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    fn emit(&mut self, event: StoreEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn emit_selection(&mut self) {
        let selection = self.selection.clone();
        self.emit(StoreEvent::SelectionChanged { selection });
    }

    fn bump(&mut self, cause: ChangeCause) {
        self.revision += 1;
        let revision = self.revision;
        self.emit(StoreEvent::ElementsChanged { revision, cause });
    }

    fn commit(&mut self, next: Vec<Element>, cause: ChangeCause) {
        self.history.record(Arc::new(next));
        self.bump(cause);
        self.prune_selection();
    }

    fn after_history_step(&mut self, cause: ChangeCause) {
        self.bump(cause);
        self.prune_selection();
    }

    fn prune_selection(&mut self) {
        let present = self.history.present().clone();
        let before = self.selection.len();
        self.selection.retain(|id| present.iter().any(|e| e.id == *id));
        if self.selection.len() != before {
            self.emit_selection();
        }
    }

    fn index_of(&self, id: ElementId) -> Option<usize> {
        self.elements().iter().position(|e| e.id == id)
    }
}

/// Working copy handed to [`ElementStore::batch`].
pub struct Batch<'a> {
    elements: Vec<Element>,
    ids: &'a mut dyn IdGenerator,
    min_size: f64,
    changed: bool,
}

impl Batch<'_> {
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.elements.iter().find(|e| e.id == id)
    }

    pub fn add(&mut self, element: Element) -> ElementId {
        self.changed = true;
        insert_element(&mut self.elements, element, self.ids, self.min_size)
    }

    pub fn update(&mut self, id: ElementId, patch: &ElementPatch) -> bool {
        match self.elements.iter_mut().find(|e| e.id == id) {
            Some(element) => {
                patch.apply(element, self.min_size);
                self.changed = true;
                true
            }
            None => false,
        }
    }

    /// Mutate an element in place.
    pub fn modify(&mut self, id: ElementId, f: impl FnOnce(&mut Element)) -> bool {
        match self.elements.iter_mut().find(|e| e.id == id) {
            Some(element) => {
                f(element);
                element.transform.clamp_size(self.min_size);
                self.changed = true;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: ElementId) -> bool {
        let before = self.elements.len();
        self.elements.retain(|e| e.id != id);
        let removed = self.elements.len() != before;
        self.changed |= removed;
        removed
    }
}

fn insert_element(
    elements: &mut Vec<Element>,
    mut element: Element,
    ids: &mut dyn IdGenerator,
    min_size: f64,
) -> ElementId {
    while element.id.is_nil() || elements.iter().any(|e| e.id == element.id) {
        element.id = ids.next_id();
    }
    element.transform.clamp_size(min_size);
    let id = element.id;
    elements.push(element);
    id
}
