//! Panel tool: drag a frame, or click for a default-sized one.

use crate::config::EditorConfig;
use crate::elements::{Element, Metadata, PanelStyle, rects_overlap};
use crate::error::PlacementError;
use kurbo::{Point, Rect, Size};
use uuid::Uuid;

/// Rectangle for a panel drag from `start` to `end`.
///
/// A drag shorter than the minimum size on both axes counts as a click and
/// yields the default panel size centered on `start`.
pub fn panel_rect_from_drag(config: &EditorConfig, start: Point, end: Point) -> Rect {
    let min = config.min_element_size;
    if (end.x - start.x).abs() < min && (end.y - start.y).abs() < min {
        return Rect::from_center_size(start, Size::new(config.default_panel_width, config.default_panel_height));
    }
    let mut rect = Rect::from_points(start, end);
    // One thin axis still gets the minimum size
    if rect.width() < min {
        rect.x1 = rect.x0 + min;
    }
    if rect.height() < min {
        rect.y1 = rect.y0 + min;
    }
    rect
}

/// Refuse a panel that overlaps any existing panel. Touching edges are fine.
pub fn check_panel_placement(elements: &[Element], rect: Rect) -> Result<(), PlacementError> {
    match elements
        .iter()
        .filter(|e| e.is_panel())
        .find(|e| rects_overlap(e.bounds(), rect))
    {
        Some(other) => Err(PlacementError::Overlap { with: other.id }),
        None => Ok(()),
    }
}

pub(super) fn panel_element(rect: Rect, seed: u64, z_index: i64) -> Element {
    let style = PanelStyle {
        seed,
        ..PanelStyle::default()
    };
    Element::panel(Uuid::nil(), rect, style)
        .with_z(z_index)
        .with_metadata(Metadata {
            created_by: Some("panel_tool".to_string()),
            ..Metadata::default()
        })
}
