//! Snapshot-based undo/redo.
//!
//! Every state is a whole element array behind an `Arc`, so taking a
//! snapshot is a pointer copy and the renderer can detect change by identity.

use crate::elements::Element;
use std::collections::VecDeque;
use std::sync::Arc;

/// Default number of undo states kept.
pub const MAX_UNDO_HISTORY: usize = 50;

/// Shared, immutable element array.
pub type Snapshot = Arc<Vec<Element>>;

/// Past, present and future element arrays.
///
/// `present` is the live collection; the store never keeps a second copy.
#[derive(Debug, Clone)]
pub struct History {
    past: VecDeque<Snapshot>,
    present: Snapshot,
    future: Vec<Snapshot>,
    limit: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(Vec::new(), MAX_UNDO_HISTORY)
    }
}

impl History {
    /// Create a history whose present is `elements`.
    pub fn new(elements: Vec<Element>, limit: usize) -> Self {
        Self {
            past: VecDeque::new(),
            present: Arc::new(elements),
            future: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// The live element array.
    pub fn present(&self) -> &Snapshot {
        &self.present
    }

    /// Make `next` the present, remembering the current one for undo.
    pub fn record(&mut self, next: Snapshot) {
        let previous = std::mem::replace(&mut self.present, next);
        self.push_past(previous);
    }

    /// Remember `before` as the undo state for the current present.
    ///
    /// Used when the present was already advanced without history (live
    /// gesture previews) and the gesture is now complete.
    pub fn record_since(&mut self, before: Snapshot) {
        self.push_past(before);
    }

    /// Replace the present without touching past or future.
    pub fn replace_present(&mut self, next: Snapshot) {
        self.present = next;
    }

    /// Drop all history and start again from `elements`.
    pub fn reset(&mut self, elements: Vec<Element>) {
        self.past.clear();
        self.future.clear();
        self.present = Arc::new(elements);
    }

    fn push_past(&mut self, snapshot: Snapshot) {
        self.past.push_back(snapshot);
        // New changes invalidate redo
        self.future.clear();
        while self.past.len() > self.limit {
            self.past.pop_front();
        }
    }

    /// Step back. Returns false if there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        match self.past.pop_back() {
            Some(snapshot) => {
                let current = std::mem::replace(&mut self.present, snapshot);
                self.future.push(current);
                true
            }
            None => false,
        }
    }

    /// Step forward. Returns false if there is nothing to redo.
    pub fn redo(&mut self) -> bool {
        match self.future.pop() {
            Some(snapshot) => {
                let current = std::mem::replace(&mut self.present, snapshot);
                self.past.push_back(current);
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    /// Number of undo states.
    pub fn undo_len(&self) -> usize {
        self.past.len()
    }

    /// Number of redo states.
    pub fn redo_len(&self) -> usize {
        self.future.len()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{Element, PanelStyle};
    use kurbo::Rect;
    use uuid::Uuid;

    fn state(n: usize) -> Snapshot {
        Arc::new(
            (0..n)
                .map(|i| {
                    let x = i as f64 * 300.0;
                    Element::panel(Uuid::from_u128(i as u128 + 1), Rect::new(x, 0.0, x + 200.0, 150.0), PanelStyle::default())
                })
                .collect(),
        )
    }

    #[test]
    fn test_undo_redo() {
        let mut history = History::default();
        history.record(state(1));
        history.record(state(2));
        assert_eq!(history.present().len(), 2);

        assert!(history.undo());
        assert_eq!(history.present().len(), 1);
        assert!(history.redo());
        assert_eq!(history.present().len(), 2);
        assert!(!history.redo());
    }

    #[test]
    fn test_empty_stacks_are_noops() {
        let mut history = History::default();
        assert!(!history.undo());
        assert!(!history.redo());
        assert!(history.present().is_empty());
    }

    #[test]
    fn test_record_clears_redo() {
        let mut history = History::default();
        history.record(state(1));
        history.undo();
        assert!(history.can_redo());
        history.record(state(3));
        assert!(!history.can_redo());
    }

    #[test]
    fn test_oldest_evicted() {
        let mut history = History::new(Vec::new(), 3);
        for n in 1..=5 {
            history.record(state(n));
        }
        assert_eq!(history.undo_len(), 3);
        while history.undo() {}
        // States 0 and 1 were evicted
        assert_eq!(history.present().len(), 2);
    }

    #[test]
    fn test_record_since_keeps_present() {
        let mut history = History::default();
        let before = history.present().clone();
        history.replace_present(state(1));
        history.replace_present(state(2));
        assert!(!history.can_undo());

        history.record_since(before);
        assert_eq!(history.undo_len(), 1);
        assert!(history.undo());
        assert!(history.present().is_empty());
    }
}
