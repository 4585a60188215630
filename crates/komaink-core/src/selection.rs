//! Resize handles and move/resize manipulation.

use crate::elements::{Element, ElementId, Transform};
use kurbo::{Affine, Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

/// Handle size in screen pixels.
pub const HANDLE_SIZE: f64 = 10.0;

/// Corner positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

/// Edge positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Edge {
    Top,
    Right,
    Bottom,
    Left,
}

/// Type of selection handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandleKind {
    Corner(Corner),
    Edge(Edge),
}

impl HandleKind {
    /// Which sides of the rectangle this handle drags: (left, top, right, bottom).
    fn sides(self) -> (bool, bool, bool, bool) {
        match self {
            HandleKind::Corner(Corner::TopLeft) => (true, true, false, false),
            HandleKind::Corner(Corner::TopRight) => (false, true, true, false),
            HandleKind::Corner(Corner::BottomLeft) => (true, false, false, true),
            HandleKind::Corner(Corner::BottomRight) => (false, false, true, true),
            HandleKind::Edge(Edge::Top) => (false, true, false, false),
            HandleKind::Edge(Edge::Right) => (false, false, true, false),
            HandleKind::Edge(Edge::Bottom) => (false, false, false, true),
            HandleKind::Edge(Edge::Left) => (true, false, false, false),
        }
    }
}

/// A selection handle with its position and type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Handle {
    /// Position in document coordinates.
    pub position: Point,
    pub kind: HandleKind,
}

impl Handle {
    pub fn new(position: Point, kind: HandleKind) -> Self {
        Self { position, kind }
    }

    /// Check if a document point hits this handle (square hit area).
    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        (point.x - self.position.x).abs() <= tolerance && (point.y - self.position.y).abs() <= tolerance
    }
}

/// The eight resize handles of an element, rotated with it.
pub fn get_handles(transform: &Transform) -> Vec<Handle> {
    let r = transform.rect();
    let c = r.center();
    let rot = transform.rotation_affine();
    [
        (Point::new(r.x0, r.y0), HandleKind::Corner(Corner::TopLeft)),
        (Point::new(r.x1, r.y0), HandleKind::Corner(Corner::TopRight)),
        (Point::new(r.x0, r.y1), HandleKind::Corner(Corner::BottomLeft)),
        (Point::new(r.x1, r.y1), HandleKind::Corner(Corner::BottomRight)),
        (Point::new(c.x, r.y0), HandleKind::Edge(Edge::Top)),
        (Point::new(r.x1, c.y), HandleKind::Edge(Edge::Right)),
        (Point::new(c.x, r.y1), HandleKind::Edge(Edge::Bottom)),
        (Point::new(r.x0, c.y), HandleKind::Edge(Edge::Left)),
    ]
    .into_iter()
    .map(|(p, kind)| Handle::new(rot * p, kind))
    .collect()
}

/// Find the handle under `point`. Corners win over edges.
/// `tolerance` is in document units (screen tolerance divided by zoom).
pub fn hit_test_handles(element: &Element, point: Point, tolerance: f64) -> Option<HandleKind> {
    get_handles(&element.transform)
        .into_iter()
        .find(|h| h.hit_test(point, tolerance))
        .map(|h| h.kind)
}

/// In-flight move or resize of one element.
#[derive(Debug, Clone)]
pub struct ManipulationState {
    pub element_id: ElementId,
    /// The handle being dragged (None = moving the whole element).
    pub handle: Option<HandleKind>,
    pub start_point: Point,
    pub current_point: Point,
    /// Transform when the gesture began.
    pub original: Transform,
}

impl ManipulationState {
    pub fn new(element_id: ElementId, handle: Option<HandleKind>, start_point: Point, original: Transform) -> Self {
        Self {
            element_id,
            handle,
            start_point,
            current_point: start_point,
            original,
        }
    }

    pub fn delta(&self) -> Vec2 {
        self.current_point - self.start_point
    }

    /// Rectangle the element should occupy for the current pointer position.
    pub fn target_rect(&self, min_size: f64) -> Rect {
        match self.handle {
            None => self.original.rect() + self.delta(),
            Some(handle) => apply_resize(&self.original, handle, self.delta(), min_size),
        }
    }
}

/// Resize `original` by dragging `handle` by `delta` (document units).
///
/// The delta is taken into the element's unrotated frame. Sides that are not
/// dragged stay put, and the dragged side stops at `min_size`.
pub fn apply_resize(original: &Transform, handle: HandleKind, delta: Vec2, min_size: f64) -> Rect {
    let local = if original.rotation.abs() > f64::EPSILON {
        Affine::rotate(-original.rotation) * delta.to_point()
    } else {
        delta.to_point()
    };
    let (left, top, right, bottom) = handle.sides();
    let mut r = original.rect();

    if left {
        r.x0 = (r.x0 + local.x).min(r.x1 - min_size);
    }
    if right {
        r.x1 = (r.x1 + local.x).max(r.x0 + min_size);
    }
    if top {
        r.y0 = (r.y0 + local.y).min(r.y1 - min_size);
    }
    if bottom {
        r.y1 = (r.y1 + local.y).max(r.y0 + min_size);
    }
    r
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::PanelStyle;
    use uuid::Uuid;

    fn element() -> Element {
        Element::panel(Uuid::new_v4(), Rect::new(100.0, 100.0, 300.0, 250.0), PanelStyle::default())
    }

    #[test]
    fn test_eight_handles() {
        let handles = get_handles(&element().transform);
        assert_eq!(handles.len(), 8);
        assert_eq!(handles[0].position, Point::new(100.0, 100.0));
        assert_eq!(handles[6].position, Point::new(200.0, 250.0));
    }

    #[test]
    fn test_hit_handles() {
        let e = element();
        assert_eq!(
            hit_test_handles(&e, Point::new(303.0, 248.0), 8.0),
            Some(HandleKind::Corner(Corner::BottomRight))
        );
        assert_eq!(hit_test_handles(&e, Point::new(200.0, 102.0), 8.0), Some(HandleKind::Edge(Edge::Top)));
        assert_eq!(hit_test_handles(&e, Point::new(200.0, 175.0), 8.0), None);
    }

    #[test]
    fn test_corner_resize() {
        let t = element().transform;
        let r = apply_resize(&t, HandleKind::Corner(Corner::BottomRight), Vec2::new(50.0, 25.0), 20.0);
        assert_eq!(r, Rect::new(100.0, 100.0, 350.0, 275.0));

        let r = apply_resize(&t, HandleKind::Corner(Corner::TopLeft), Vec2::new(-10.0, -20.0), 20.0);
        assert_eq!(r, Rect::new(90.0, 80.0, 300.0, 250.0));
    }

    #[test]
    fn test_edge_resize_only_moves_one_side() {
        let t = element().transform;
        let r = apply_resize(&t, HandleKind::Edge(Edge::Left), Vec2::new(30.0, 99.0), 20.0);
        assert_eq!(r, Rect::new(130.0, 100.0, 300.0, 250.0));
    }

    #[test]
    fn test_resize_stops_at_min_size() {
        let t = element().transform;
        let r = apply_resize(&t, HandleKind::Corner(Corner::BottomRight), Vec2::new(-500.0, -500.0), 20.0);
        assert!((r.width() - 20.0).abs() < f64::EPSILON);
        assert!((r.height() - 20.0).abs() < f64::EPSILON);
        assert_eq!((r.x0, r.y0), (100.0, 100.0));
    }

    #[test]
    fn test_move_target() {
        let e = element();
        let mut state = ManipulationState::new(e.id, None, Point::new(150.0, 150.0), e.transform);
        state.current_point = Point::new(170.0, 140.0);
        assert_eq!(state.target_rect(20.0), Rect::new(120.0, 90.0, 320.0, 240.0));
    }
}
