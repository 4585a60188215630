//! Pan and zoom tools. These only touch the view, never history.

use super::{GestureOutcome, ToolContext};
use crate::input::PointerInput;
use kurbo::Point;

/// Zoom in by the configured step around the pointer; Alt zooms out.
pub(super) fn zoom_click(ctx: &mut ToolContext<'_>, input: PointerInput) -> GestureOutcome {
    let step = ctx.config.zoom_step;
    let factor = if input.modifiers.alt { 1.0 / step } else { step };
    ctx.view.zoom_by(input.container, factor, ctx.viewport);
    GestureOutcome::ViewChanged
}

/// Pan by the container-space motion since `last`.
pub(super) fn pan_drag(ctx: &mut ToolContext<'_>, last: &mut Point, current: Point) -> GestureOutcome {
    let delta = current - *last;
    *last = current;
    if delta.hypot2() == 0.0 {
        return GestureOutcome::None;
    }
    ctx.view.pan_by(delta);
    GestureOutcome::ViewChanged
}

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::input::{Modifiers, PointerButton};
    use kurbo::Size;

    fn input(x: f64, y: f64, modifiers: Modifiers) -> PointerInput {
        PointerInput {
            container: Point::new(x, y),
            logical: Point::new(x, y),
            button: PointerButton::Primary,
            modifiers,
        }
    }

    #[test]
    fn test_pan_and_zoom_tools() {
        let config = EditorConfig::default();
        let mut store = ElementStore::new(&config);
        let mut view = ViewTransform::new();
        let viewport = Viewport::new(Size::new(800.0, 600.0), config.document_size());
        let mut tools = ToolController::new(&config);

        tools.set_tool(ToolKind::Pan, &mut store);
        let mut ctx = ToolContext {
            store: &mut store,
            config: &config,
            view: &mut view,
            viewport: &viewport,
        };
        tools.pointer_down(&mut ctx, input(10.0, 10.0, Modifiers::NONE));
        tools.pointer_move(&mut ctx, input(30.0, 5.0, Modifiers::NONE));
        assert_eq!(tools.pointer_up(&mut ctx, input(40.0, 0.0, Modifiers::NONE)), GestureOutcome::ViewChanged);
        assert_eq!((view.pan_x, view.pan_y), (30.0, -10.0));

        tools.set_tool(ToolKind::Zoom, &mut store);
        let mut ctx = ToolContext {
            store: &mut store,
            config: &config,
            view: &mut view,
            viewport: &viewport,
        };
        tools.pointer_down(&mut ctx, input(400.0, 300.0, Modifiers::NONE));
        assert!((view.scale - config.zoom_step).abs() < 1e-12);

        let mut ctx = ToolContext {
            store: &mut store,
            config: &config,
            view: &mut view,
            viewport: &viewport,
        };
        tools.pointer_down(&mut ctx, input(400.0, 300.0, Modifiers::ALT));
        assert!((view.scale - 1.0).abs() < 1e-12);
        assert!(store.history().undo_len() == 0);
    }
}
