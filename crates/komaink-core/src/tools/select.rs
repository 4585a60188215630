//! Select tool: pick, move, resize, and place armed bubbles.

use super::{Gesture, GestureOutcome, ToolContext, ToolController, bubble_element};
use crate::elements::ElementPatch;
use crate::history::Snapshot;
use crate::input::PointerInput;
use crate::selection::{ManipulationState, hit_test_handles};
use crate::store::ElementStore;

impl ToolController {
    pub(super) fn select_down(&mut self, ctx: &mut ToolContext<'_>, input: PointerInput) -> GestureOutcome {
        let point = input.logical;

        if let Some(bubble_type) = self.armed_bubble.take() {
            let element = bubble_element(ctx.config, point, bubble_type, ctx.store.next_z_index());
            return self.finish_creation(ctx.store, element);
        }

        // Handles of the sole selected element take priority over bodies
        let tolerance = ctx.config.handle_tolerance / ctx.view.scale;
        if let [selected] = ctx.store.selection() {
            if let Some(element) = ctx.store.get(*selected) {
                if !element.properties.locked {
                    if let Some(handle) = hit_test_handles(element, point, tolerance) {
                        let state = ManipulationState::new(element.id, Some(handle), point, element.transform);
                        self.gesture = Gesture::Manipulating {
                            state,
                            before: ctx.store.snapshot(),
                        };
                        return GestureOutcome::None;
                    }
                }
            }
        }

        match ctx.store.hit_test(point) {
            Some(id) => {
                ctx.store.select(id);
                if let Some(element) = ctx.store.get(id) {
                    if !element.properties.locked {
                        let state = ManipulationState::new(id, None, point, element.transform);
                        self.gesture = Gesture::Manipulating {
                            state,
                            before: ctx.store.snapshot(),
                        };
                    }
                }
                GestureOutcome::Selected(Some(id))
            }
            None => {
                ctx.store.clear_selection();
                GestureOutcome::Selected(None)
            }
        }
    }
}

/// Apply the current pointer position as a live preview.
pub(super) fn preview_manipulation(store: &mut ElementStore, state: &ManipulationState) {
    let rect = state.target_rect(store.min_size());
    store.preview_update(state.element_id, &ElementPatch::new().rect(rect));
}

/// Apply the final position and record a single undo step.
pub(super) fn finish_manipulation(store: &mut ElementStore, state: ManipulationState, before: Snapshot) -> GestureOutcome {
    preview_manipulation(store, &state);
    if !store.commit_gesture(before) {
        return GestureOutcome::None;
    }
    match state.handle {
        None => GestureOutcome::Moved(state.element_id),
        Some(_) => GestureOutcome::Resized(state.element_id),
    }
}

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::elements::{Element, PanelStyle};
    use crate::input::{Modifiers, PointerButton};
    use crate::store::SequentialIds;
    use kurbo::{Point, Rect, Size};
    use uuid::Uuid;

    fn setup() -> (ElementStore, EditorConfig, ViewTransform, Viewport, ToolController) {
        let config = EditorConfig::default();
        let store = ElementStore::with_id_generator(&config, Box::new(SequentialIds::new()));
        let viewport = Viewport::new(Size::new(1200.0, 1600.0), config.document_size());
        let tools = ToolController::new(&config);
        (store, config, ViewTransform::new(), viewport, tools)
    }

    fn at(x: f64, y: f64) -> PointerInput {
        PointerInput {
            container: Point::new(x, y),
            logical: Point::new(x, y),
            button: PointerButton::Primary,
            modifiers: Modifiers::NONE,
        }
    }

    #[test]
    fn test_move_pushes_one_history_entry() {
        let (mut store, config, mut view, viewport, mut tools) = setup();
        let id = store.add_element(Element::panel(Uuid::nil(), Rect::new(0.0, 0.0, 200.0, 150.0), PanelStyle::default()));
        let undo_before = store.history().undo_len();

        let mut ctx = ToolContext {
            store: &mut store,
            config: &config,
            view: &mut view,
            viewport: &viewport,
        };
        assert_eq!(tools.pointer_down(&mut ctx, at(100.0, 75.0)), GestureOutcome::Selected(Some(id)));
        for i in 1..=20 {
            tools.pointer_move(&mut ctx, at(100.0 + i as f64, 75.0));
        }
        assert_eq!(ctx.store.history().undo_len(), undo_before);
        assert_eq!(tools.pointer_up(&mut ctx, at(150.0, 95.0)), GestureOutcome::Moved(id));

        assert_eq!(store.history().undo_len(), undo_before + 1);
        assert_eq!(store.get(id).map(|e| e.bounds()), Some(Rect::new(50.0, 20.0, 250.0, 170.0)));
        store.undo();
        assert_eq!(store.get(id).map(|e| e.bounds()), Some(Rect::new(0.0, 0.0, 200.0, 150.0)));
    }

    #[test]
    fn test_click_without_motion_records_nothing() {
        let (mut store, config, mut view, viewport, mut tools) = setup();
        store.add_element(Element::panel(Uuid::nil(), Rect::new(0.0, 0.0, 200.0, 150.0), PanelStyle::default()));
        let undo_before = store.history().undo_len();
        let mut ctx = ToolContext {
            store: &mut store,
            config: &config,
            view: &mut view,
            viewport: &viewport,
        };
        tools.pointer_down(&mut ctx, at(100.0, 75.0));
        assert_eq!(tools.pointer_up(&mut ctx, at(100.0, 75.0)), GestureOutcome::None);
        assert_eq!(store.history().undo_len(), undo_before);
    }

    #[test]
    fn test_resize_from_handle() {
        let (mut store, config, mut view, viewport, mut tools) = setup();
        let id = store.add_element(Element::panel(Uuid::nil(), Rect::new(0.0, 0.0, 200.0, 150.0), PanelStyle::default()));
        store.select(id);
        let mut ctx = ToolContext {
            store: &mut store,
            config: &config,
            view: &mut view,
            viewport: &viewport,
        };
        tools.pointer_down(&mut ctx, at(200.0, 150.0));
        tools.pointer_move(&mut ctx, at(250.0, 160.0));
        assert_eq!(tools.pointer_up(&mut ctx, at(300.0, 200.0)), GestureOutcome::Resized(id));
        assert_eq!(store.get(id).map(|e| e.bounds()), Some(Rect::new(0.0, 0.0, 300.0, 200.0)));
    }

    #[test]
    fn test_cancel_restores_original() {
        let (mut store, config, mut view, viewport, mut tools) = setup();
        let id = store.add_element(Element::panel(Uuid::nil(), Rect::new(0.0, 0.0, 200.0, 150.0), PanelStyle::default()));
        {
            let mut ctx = ToolContext {
                store: &mut store,
                config: &config,
                view: &mut view,
                viewport: &viewport,
            };
            tools.pointer_down(&mut ctx, at(100.0, 75.0));
            tools.pointer_move(&mut ctx, at(400.0, 400.0));
        }
        tools.set_tool(ToolKind::Panel, &mut store);
        assert_eq!(store.get(id).map(|e| e.bounds()), Some(Rect::new(0.0, 0.0, 200.0, 150.0)));
        assert_eq!(store.history().undo_len(), 1);
    }

    #[test]
    fn test_locked_elements_select_but_do_not_move() {
        let (mut store, config, mut view, viewport, mut tools) = setup();
        let mut panel = Element::panel(Uuid::nil(), Rect::new(0.0, 0.0, 200.0, 150.0), PanelStyle::default());
        panel.properties.locked = true;
        let id = store.add_element(panel);
        let mut ctx = ToolContext {
            store: &mut store,
            config: &config,
            view: &mut view,
            viewport: &viewport,
        };
        assert_eq!(tools.pointer_down(&mut ctx, at(100.0, 75.0)), GestureOutcome::Selected(Some(id)));
        assert!(!tools.is_active());
    }
}
