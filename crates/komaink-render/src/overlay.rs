//! Selection overlay: frames and handles drawn above every layer.

use komaink_core::elements::{Element, ElementId};
use komaink_core::selection::{HANDLE_SIZE, Handle, get_handles};
use kurbo::{BezPath, Rect, Shape as KurboShape};
use std::f64::consts::TAU;

/// Seconds for one handle pulse.
pub const PULSE_PERIOD_SECS: f64 = 1.2;

/// How far handles grow at the top of a pulse.
const PULSE_AMPLITUDE: f64 = 0.2;

/// Overlay geometry for one selected element.
#[derive(Debug, Clone)]
pub struct OverlayItem {
    pub element_id: ElementId,
    /// Selection frame in document space, rotated with the element.
    pub frame: BezPath,
    /// Empty for locked elements.
    pub handles: Vec<Handle>,
}

/// Top-most layer showing the selection.
///
/// Rebuilt from scratch whenever the selected ids or the store revision
/// change. The pulse is cosmetic and never touches the document.
#[derive(Debug, Clone, Default)]
pub struct SelectionOverlay {
    selection: Vec<ElementId>,
    revision: Option<u64>,
    items: Vec<OverlayItem>,
    preview: Option<Rect>,
    phase: f64,
    redraws: u64,
}

impl SelectionOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild if the selection or the elements changed. Returns true if
    /// the overlay was redrawn.
    pub fn update(&mut self, elements: &[Element], selection: &[ElementId], revision: u64) -> bool {
        if self.revision == Some(revision) && self.selection == selection {
            return false;
        }
        self.selection = selection.to_vec();
        self.revision = Some(revision);
        self.items.clear();

        for id in selection {
            let Some(element) = elements.iter().find(|e| e.id == *id) else {
                continue;
            };
            let frame = element.transform.rotation_affine() * element.bounds().to_path(0.1);
            let handles = if element.properties.locked {
                Vec::new()
            } else {
                get_handles(&element.transform)
            };
            self.items.push(OverlayItem {
                element_id: element.id,
                frame,
                handles,
            });
        }
        self.redraws += 1;
        true
    }

    pub fn set_preview(&mut self, rect: Option<Rect>) {
        self.preview = rect;
    }

    pub fn preview(&self) -> Option<Rect> {
        self.preview
    }

    pub fn items(&self) -> &[OverlayItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.preview.is_none()
    }

    /// How many times the overlay has been rebuilt.
    pub fn redraws(&self) -> u64 {
        self.redraws
    }

    /// Advance the pulse by `dt` seconds.
    pub fn tick(&mut self, dt: f64) {
        if dt.is_finite() && dt > 0.0 {
            self.phase = (self.phase + dt / PULSE_PERIOD_SECS).fract();
        }
    }

    /// Pulse position in [0, 1).
    pub fn phase(&self) -> f64 {
        self.phase
    }

    /// Handle edge length for the current pulse.
    pub fn handle_size(&self) -> f64 {
        let wave = 0.5 - 0.5 * (self.phase * TAU).cos();
        HANDLE_SIZE * (1.0 + PULSE_AMPLITUDE * wave)
    }
}
