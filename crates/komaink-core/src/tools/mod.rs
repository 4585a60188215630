//! Tool state machine.
//!
//! The controller owns the active tool and any in-flight gesture. Gestures
//! live here, not in the store, so live frames never reach history.

mod bubble;
mod panel;
mod select;
mod view;

pub use bubble::{bubble_element, text_element};
pub use panel::{check_panel_placement, panel_rect_from_drag};

use crate::camera::{ViewTransform, Viewport};
use crate::config::EditorConfig;
use crate::elements::{BubbleType, ElementId};
use crate::error::PlacementError;
use crate::history::Snapshot;
use crate::input::PointerInput;
use crate::rng::SimpleRng;
use crate::selection::ManipulationState;
use crate::store::ElementStore;
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// Available tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ToolKind {
    #[default]
    Select,
    Panel,
    Dialogue,
    Text,
    Pan,
    Zoom,
}

impl ToolKind {
    pub const ALL: [ToolKind; 6] = [
        ToolKind::Select,
        ToolKind::Panel,
        ToolKind::Dialogue,
        ToolKind::Text,
        ToolKind::Pan,
        ToolKind::Zoom,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ToolKind::Select => "Select",
            ToolKind::Panel => "Panel",
            ToolKind::Dialogue => "Dialogue",
            ToolKind::Text => "Text",
            ToolKind::Pan => "Pan",
            ToolKind::Zoom => "Zoom",
        }
    }

    /// Whether completing a gesture with this tool creates an element.
    pub fn creates_elements(self) -> bool {
        matches!(self, ToolKind::Panel | ToolKind::Dialogue | ToolKind::Text)
    }
}

/// In-flight pointer gesture.
#[derive(Debug, Clone, Default)]
pub enum Gesture {
    #[default]
    Idle,
    /// Panel tool drag.
    DrawingPanel { start: Point, current: Point },
    /// Select tool move or resize; `before` is the state to undo to.
    Manipulating { state: ManipulationState, before: Snapshot },
    /// Pan tool drag, in container pixels.
    Panning { last: Point },
}

/// What a pointer event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureOutcome {
    /// Nothing that callers need to react to.
    None,
    /// Selection changed (`None` = cleared).
    Selected(Option<ElementId>),
    /// A new element was created and selected.
    Created(ElementId),
    /// A move gesture completed with a change.
    Moved(ElementId),
    /// A resize gesture completed with a change.
    Resized(ElementId),
    /// The pending creation was refused; nothing was created.
    Rejected(PlacementError),
    /// Pan or zoom changed.
    ViewChanged,
}

/// Everything a tool handler may touch during one event.
///
/// `view` is the single per-event copy of the page transform; the caller
/// writes it back after the handler returns.
pub struct ToolContext<'a> {
    pub store: &'a mut ElementStore,
    pub config: &'a EditorConfig,
    pub view: &'a mut ViewTransform,
    pub viewport: &'a Viewport,
}

/// Manages the current tool and its gesture state.
#[derive(Debug, Clone)]
pub struct ToolController {
    current_tool: ToolKind,
    gesture: Gesture,
    /// Bubble type waiting to be placed by the next Select click.
    armed_bubble: Option<BubbleType>,
    rng: SimpleRng,
}

impl Default for ToolController {
    fn default() -> Self {
        Self::new(&EditorConfig::default())
    }
}

impl ToolController {
    pub fn new(config: &EditorConfig) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => SimpleRng::new(seed),
            None => SimpleRng::from_entropy(),
        };
        Self {
            current_tool: ToolKind::Select,
            gesture: Gesture::Idle,
            armed_bubble: None,
            rng,
        }
    }

    pub fn current_tool(&self) -> ToolKind {
        self.current_tool
    }

    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    /// Check if a gesture is in flight.
    pub fn is_active(&self) -> bool {
        !matches!(self.gesture, Gesture::Idle)
    }

    pub fn armed_bubble(&self) -> Option<BubbleType> {
        self.armed_bubble
    }

    /// Switch tools, cancelling any in-flight gesture first.
    ///
    /// Switching to anything but Select also disarms a pending bubble
    /// placement.
    pub fn set_tool(&mut self, tool: ToolKind, store: &mut ElementStore) {
        self.cancel(store);
        if tool != ToolKind::Select {
            self.armed_bubble = None;
        }
        if tool != self.current_tool {
            log::debug!("Tool {} -> {}", self.current_tool.name(), tool.name());
        }
        self.current_tool = tool;
    }

    /// Arm placement of a bubble type chosen in the palette. The next Select
    /// click places it.
    pub fn arm_bubble(&mut self, bubble_type: BubbleType, store: &mut ElementStore) {
        self.set_tool(ToolKind::Select, store);
        self.armed_bubble = Some(bubble_type);
    }

    pub fn disarm(&mut self) {
        self.armed_bubble = None;
    }

    /// Abandon the in-flight gesture, restoring anything it changed.
    pub fn cancel(&mut self, store: &mut ElementStore) -> bool {
        match std::mem::take(&mut self.gesture) {
            Gesture::Idle => false,
            Gesture::Manipulating { before, .. } => {
                store.cancel_gesture(before);
                true
            }
            Gesture::DrawingPanel { .. } | Gesture::Panning { .. } => true,
        }
    }

    /// Escape: cancel the gesture, else disarm, else clear the selection.
    pub fn escape(&mut self, store: &mut ElementStore) {
        if self.cancel(store) {
            return;
        }
        if self.armed_bubble.take().is_some() {
            return;
        }
        if self.current_tool == ToolKind::Select {
            store.clear_selection();
        }
    }

    /// Rectangle of an in-flight panel drag, for the preview overlay.
    pub fn preview_rect(&self) -> Option<Rect> {
        match &self.gesture {
            Gesture::DrawingPanel { start, current } => Some(Rect::from_points(*start, *current)),
            _ => None,
        }
    }

    pub fn pointer_down(&mut self, ctx: &mut ToolContext<'_>, input: PointerInput) -> GestureOutcome {
        // A stray down while a gesture is live (lost pointer-up) drops it
        self.cancel(ctx.store);
        match self.current_tool {
            ToolKind::Select => self.select_down(ctx, input),
            ToolKind::Panel => {
                self.gesture = Gesture::DrawingPanel {
                    start: input.logical,
                    current: input.logical,
                };
                GestureOutcome::None
            }
            ToolKind::Dialogue => {
                let element = bubble_element(ctx.config, input.logical, BubbleType::Speech, ctx.store.next_z_index());
                self.finish_creation(ctx.store, element)
            }
            ToolKind::Text => {
                let element = text_element(ctx.config, input.logical, ctx.store.next_z_index());
                self.finish_creation(ctx.store, element)
            }
            ToolKind::Pan => {
                self.gesture = Gesture::Panning { last: input.container };
                GestureOutcome::None
            }
            ToolKind::Zoom => view::zoom_click(ctx, input),
        }
    }

    pub fn pointer_move(&mut self, ctx: &mut ToolContext<'_>, input: PointerInput) -> GestureOutcome {
        match &mut self.gesture {
            Gesture::Idle => GestureOutcome::None,
            Gesture::DrawingPanel { current, .. } => {
                *current = input.logical;
                GestureOutcome::None
            }
            Gesture::Manipulating { state, .. } => {
                state.current_point = input.logical;
                select::preview_manipulation(ctx.store, state);
                GestureOutcome::None
            }
            Gesture::Panning { last } => view::pan_drag(ctx, last, input.container),
        }
    }

    pub fn pointer_up(&mut self, ctx: &mut ToolContext<'_>, input: PointerInput) -> GestureOutcome {
        match std::mem::take(&mut self.gesture) {
            Gesture::Idle => GestureOutcome::None,
            Gesture::DrawingPanel { start, .. } => {
                let rect = panel_rect_from_drag(ctx.config, start, input.logical);
                match check_panel_placement(ctx.store.elements(), rect) {
                    Ok(()) => {
                        let element = panel::panel_element(rect, self.rng.next_u64(), ctx.store.next_z_index());
                        self.finish_creation(ctx.store, element)
                    }
                    Err(err) => {
                        log::debug!("Panel at {:?} rejected: {}", rect, err);
                        GestureOutcome::Rejected(err)
                    }
                }
            }
            Gesture::Manipulating { mut state, before } => {
                state.current_point = input.logical;
                select::finish_manipulation(ctx.store, state, before)
            }
            Gesture::Panning { mut last } => {
                view::pan_drag(ctx, &mut last, input.container);
                GestureOutcome::ViewChanged
            }
        }
    }

    /// Add a freshly built element, select it and hand control back to Select.
    fn finish_creation(&mut self, store: &mut ElementStore, element: crate::elements::Element) -> GestureOutcome {
        let id = store.add_element(element);
        store.select(id);
        self.gesture = Gesture::Idle;
        self.current_tool = ToolKind::Select;
        GestureOutcome::Created(id)
    }
}
