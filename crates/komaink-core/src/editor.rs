//! Editor façade: the single entry point for commands and input.
//!
//! Every pointer event reads the active page's view transform once, converts
//! coordinates with that copy, runs the tool, then writes the copy back.

use crate::association::AssociationEngine;
use crate::camera::{ViewTransform, Viewport};
use crate::config::{ConfigError, EditorConfig};
use crate::elements::{BubbleType, DropPayload, Element, ElementId, ElementPatch, Metadata};
use crate::error::PlacementError;
use crate::history::Snapshot;
use crate::input::{Key, Modifiers, PointerButton, PointerInput};
use crate::page::{PageBook, PageDocument, PageId};
use crate::shortcuts::{ShortcutAction, ShortcutRegistry};
use crate::storage::{PersistenceAdapter, Storage};
use crate::store::{ElementStore, IdGenerator, RandomIds, StoreEvent};
use crate::tools::{GestureOutcome, ToolContext, ToolController, ToolKind};
use kurbo::{Point, Rect, Size, Vec2};
use std::sync::Arc;
use std::sync::mpsc::Receiver;

/// The page-assembly editor core.
#[derive(Debug)]
pub struct Editor {
    config: EditorConfig,
    store: ElementStore,
    tools: ToolController,
    associations: AssociationEngine,
    pages: PageBook,
    viewport: Viewport,
}

impl Editor {
    /// Create an editor with random element ids.
    pub fn new(config: EditorConfig) -> Result<Self, ConfigError> {
        Self::with_id_generator(config, Box::new(RandomIds))
    }

    pub fn with_id_generator(config: EditorConfig, ids: Box<dyn IdGenerator>) -> Result<Self, ConfigError> {
        config.validate()?;
        let document = config.document_size();
        Ok(Self {
            store: ElementStore::with_id_generator(&config, ids),
            tools: ToolController::new(&config),
            associations: AssociationEngine::new(&config),
            pages: PageBook::from_config(&config),
            viewport: Viewport::new(document, document),
            config,
        })
    }

    // --- Accessors ---

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn store(&self) -> &ElementStore {
        &self.store
    }

    pub fn elements(&self) -> &[Element] {
        self.store.elements()
    }

    /// Shared handle to the live element array.
    pub fn snapshot(&self) -> Snapshot {
        self.store.snapshot()
    }

    pub fn selection(&self) -> &[ElementId] {
        self.store.selection()
    }

    pub fn tools(&self) -> &ToolController {
        &self.tools
    }

    pub fn active_tool(&self) -> ToolKind {
        self.tools.current_tool()
    }

    pub fn associations(&self) -> &AssociationEngine {
        &self.associations
    }

    pub fn pages(&self) -> &PageBook {
        &self.pages
    }

    /// Copy of the active page's view transform.
    pub fn view(&self) -> ViewTransform {
        self.pages.active().view.transform
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Size of the container hosting the page, and its pixel ratio.
    pub fn set_container(&mut self, container: Size, device_pixel_ratio: f64) {
        self.viewport = Viewport::new(container, self.config.document_size()).with_device_pixel_ratio(device_pixel_ratio);
    }

    /// Receive store change notifications.
    pub fn subscribe(&mut self) -> Receiver<StoreEvent> {
        self.store.subscribe()
    }

    /// Persistence adapter listening to this editor's store.
    pub fn attach_persistence<S: Storage>(&mut self, storage: Arc<S>) -> PersistenceAdapter<S> {
        let revision = self.store.revision();
        PersistenceAdapter::from_events(storage, self.store.subscribe(), revision)
    }

    /// Rectangle of an in-flight panel drag.
    pub fn preview_rect(&self) -> Option<Rect> {
        self.tools.preview_rect()
    }

    // --- Element commands ---

    pub fn add_element(&mut self, element: Element) -> ElementId {
        let id = self.store.add_element(element);
        self.refresh_associations();
        id
    }

    /// Merge a partial update. Unknown ids are ignored.
    pub fn update_element(&mut self, id: ElementId, patch: &ElementPatch) -> bool {
        let updated = self.store.update_element(id, patch);
        if updated {
            self.refresh_associations();
        }
        updated
    }

    pub fn remove_element(&mut self, id: ElementId) -> bool {
        self.remove_elements(&[id]) > 0
    }

    /// Remove elements with association cleanup, as one undo step.
    pub fn remove_elements(&mut self, ids: &[ElementId]) -> usize {
        self.tools.cancel(&mut self.store);
        let removed: Vec<Element> = self
            .store
            .elements()
            .iter()
            .filter(|e| ids.contains(&e.id))
            .cloned()
            .collect();
        if removed.is_empty() {
            return 0;
        }
        let associations = &self.associations;
        self.store.batch(|tx| {
            for element in &removed {
                tx.remove(element.id);
            }
            associations.cascade_removal(tx, &removed);
        });
        self.refresh_associations();
        removed.len()
    }

    pub fn delete_selection(&mut self) -> usize {
        let selection = self.store.selection().to_vec();
        self.remove_elements(&selection)
    }

    pub fn undo(&mut self) -> bool {
        self.tools.cancel(&mut self.store);
        let done = self.store.undo();
        if done {
            self.refresh_associations();
        }
        done
    }

    pub fn redo(&mut self) -> bool {
        self.tools.cancel(&mut self.store);
        let done = self.store.redo();
        if done {
            self.refresh_associations();
        }
        done
    }

    pub fn select(&mut self, id: ElementId) {
        self.store.select(id);
    }

    pub fn clear_selection(&mut self) {
        self.store.clear_selection();
    }

    /// Clone the selection offset by the duplicate offset, selecting the
    /// copies. Copies are never hosted by a panel.
    pub fn duplicate_selection(&mut self) -> Vec<ElementId> {
        self.tools.cancel(&mut self.store);
        let offset = Vec2::new(self.config.duplicate_offset, self.config.duplicate_offset);
        let base_z = self.store.next_z_index();
        let copies: Vec<Element> = self
            .store
            .selection()
            .iter()
            .filter_map(|id| self.store.get(*id))
            .enumerate()
            .map(|(i, original)| {
                let mut copy = original.clone();
                copy.id = ElementId::nil();
                copy.transform.translate(offset);
                copy.transform.z_index = base_z + i as i64;
                copy.metadata = Metadata {
                    parent_panel_id: None,
                    source: Some(format!("duplicate:{}", original.id)),
                    created_by: original.metadata.created_by.clone(),
                };
                copy
            })
            .collect();
        if copies.is_empty() {
            return Vec::new();
        }
        let ids = self.store.batch(|tx| copies.into_iter().map(|c| tx.add(c)).collect::<Vec<_>>());
        self.store.set_selection(ids.iter().copied());
        self.refresh_associations();
        ids
    }

    /// Change the type of every selected bubble, keeping text and position.
    /// Returns how many bubbles changed.
    pub fn restyle_selected_bubbles(&mut self, bubble_type: BubbleType) -> usize {
        let targets: Vec<ElementId> = self
            .store
            .selection()
            .iter()
            .filter_map(|id| self.store.get(*id))
            .filter(|e| {
                e.as_dialogue()
                    .is_some_and(|style| style.bubble_type != bubble_type)
            })
            .map(|e| e.id)
            .collect();
        if targets.is_empty() {
            return 0;
        }
        self.store.batch(|tx| {
            for id in &targets {
                tx.modify(*id, |element| {
                    if let Some(style) = element.as_dialogue_mut() {
                        style.set_bubble_type(bubble_type);
                    }
                });
            }
        });
        targets.len()
    }

    /// Raise the selection above everything else.
    pub fn bring_selection_to_front(&mut self) -> bool {
        let selection = self.store.selection().to_vec();
        let mut changed = false;
        for id in selection {
            changed |= self.store.bring_to_front(id);
        }
        changed
    }

    /// Lower the selection below everything else.
    pub fn send_selection_to_back(&mut self) -> bool {
        let selection = self.store.selection().to_vec();
        let mut changed = false;
        for id in selection.into_iter().rev() {
            changed |= self.store.send_to_back(id);
        }
        changed
    }

    // --- Tool and view commands ---

    /// Switch tools, cancelling any in-flight gesture.
    pub fn set_active_tool(&mut self, tool: ToolKind) {
        self.tools.set_tool(tool, &mut self.store);
    }

    /// Arm placement of a bubble type from the palette; the next click in
    /// the Select tool places it.
    pub fn arm_bubble_placement(&mut self, bubble_type: BubbleType) {
        self.tools.arm_bubble(bubble_type, &mut self.store);
    }

    /// Zoom as a percentage, clamped to the configured bounds.
    pub fn set_zoom(&mut self, percent: f64) {
        self.pages.active_mut().view.transform.set_zoom_percent(percent);
    }

    pub fn set_pan(&mut self, pan_x: f64, pan_y: f64) {
        self.pages.active_mut().view.transform.set_pan(pan_x, pan_y);
    }

    /// Zoom by the configured step around the container center.
    pub fn zoom_in(&mut self) {
        self.zoom_by(self.config.zoom_step);
    }

    pub fn zoom_out(&mut self) {
        self.zoom_by(1.0 / self.config.zoom_step);
    }

    fn zoom_by(&mut self, factor: f64) {
        let viewport = self.viewport;
        let anchor = Point::new(viewport.container.width / 2.0, viewport.container.height / 2.0);
        self.pages.active_mut().view.transform.zoom_by(anchor, factor, &viewport);
    }

    pub fn reset_view(&mut self) {
        self.pages.active_mut().view.transform.reset();
    }

    // --- Input ---

    /// Document position of a container-relative point.
    pub fn logical_point(&self, container: Point) -> Point {
        self.view().container_to_logical(container, &self.viewport)
    }

    /// Container-relative point from physical pixels.
    pub fn container_point(&self, physical: Point) -> Point {
        let dpr = self.viewport.device_pixel_ratio;
        Point::new(physical.x / dpr, physical.y / dpr)
    }

    pub fn pointer_down(&mut self, container: Point, button: PointerButton, modifiers: Modifiers) -> GestureOutcome {
        self.dispatch(container, button, modifiers, |tools, ctx, input| tools.pointer_down(ctx, input))
    }

    pub fn pointer_move(&mut self, container: Point, modifiers: Modifiers) -> GestureOutcome {
        self.dispatch(container, PointerButton::Primary, modifiers, |tools, ctx, input| {
            tools.pointer_move(ctx, input)
        })
    }

    pub fn pointer_up(&mut self, container: Point, button: PointerButton, modifiers: Modifiers) -> GestureOutcome {
        self.dispatch(container, button, modifiers, |tools, ctx, input| tools.pointer_up(ctx, input))
    }

    fn dispatch(
        &mut self,
        container: Point,
        button: PointerButton,
        modifiers: Modifiers,
        f: impl FnOnce(&mut ToolController, &mut ToolContext<'_>, PointerInput) -> GestureOutcome,
    ) -> GestureOutcome {
        let mut view = self.pages.active().view.transform;
        let input = PointerInput {
            container,
            logical: view.container_to_logical(container, &self.viewport),
            button,
            modifiers,
        };
        let revision = self.store.revision();
        let outcome = {
            let mut ctx = ToolContext {
                store: &mut self.store,
                config: &self.config,
                view: &mut view,
                viewport: &self.viewport,
            };
            f(&mut self.tools, &mut ctx, input)
        };
        self.pages.active_mut().view.transform = view;

        if self.store.revision() != revision && !self.tools.is_active() {
            self.refresh_associations();
        }
        outcome
    }

    /// Handle a key press. Returns the action performed, if any.
    pub fn key_down(&mut self, key: &Key, modifiers: Modifiers) -> Option<ShortcutAction> {
        let action = ShortcutRegistry::resolve(key, modifiers)?;
        match action {
            ShortcutAction::SelectTool(tool) => self.set_active_tool(tool),
            ShortcutAction::DeleteSelection => {
                self.delete_selection();
            }
            ShortcutAction::Escape => self.tools.escape(&mut self.store),
            ShortcutAction::RestyleBubbles(bubble_type) => {
                self.restyle_selected_bubbles(bubble_type);
            }
            ShortcutAction::Duplicate => {
                self.duplicate_selection();
            }
            ShortcutAction::Undo => {
                self.undo();
            }
            ShortcutAction::Redo => {
                self.redo();
            }
            ShortcutAction::ZoomIn => self.zoom_in(),
            ShortcutAction::ZoomOut => self.zoom_out(),
            ShortcutAction::ResetView => self.reset_view(),
        }
        Some(action)
    }

    /// Drop an image at a container-relative point. Rejected drops create
    /// nothing.
    pub fn drop_image(&mut self, payload: &DropPayload, container: Point) -> Result<ElementId, PlacementError> {
        self.tools.cancel(&mut self.store);
        let point = self.logical_point(container);
        self.associations.drop_image(&mut self.store, payload, point)
    }

    // --- Pages ---

    pub fn add_page(&mut self, name: impl Into<String>) -> PageId {
        self.pages.add_page(name)
    }

    /// Make a page active, swapping the working element collection.
    pub fn activate_page(&mut self, id: PageId) -> bool {
        self.tools.cancel(&mut self.store);
        self.tools.disarm();
        let activated = self.pages.activate(id, &mut self.store);
        if activated {
            self.refresh_associations();
        }
        activated
    }

    pub fn rename_page(&mut self, id: PageId, name: impl Into<String>) -> bool {
        self.pages.rename(id, name)
    }

    pub fn remove_page(&mut self, id: PageId) -> bool {
        self.tools.cancel(&mut self.store);
        let removed = self.pages.remove(id, &mut self.store);
        if removed {
            self.refresh_associations();
        }
        removed
    }

    /// Snapshot of the active page for persistence.
    pub fn page_document(&self) -> PageDocument {
        self.pages.active_document(&self.store)
    }

    /// Load a page document and make it active.
    pub fn load_document(&mut self, document: PageDocument) {
        self.tools.cancel(&mut self.store);
        self.tools.disarm();
        self.pages.load_document(document, &mut self.store);
        self.refresh_associations();
    }

    fn refresh_associations(&mut self) {
        self.associations.reevaluate(self.store.elements());
    }
}
