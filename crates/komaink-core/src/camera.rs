//! Pan/zoom view transform and the pointer coordinate pipeline.
//!
//! The page is drawn centered in its container, scaled by `scale` and then
//! shifted by `pan`. The scene itself is never scaled; only pointer
//! coordinates are mapped back into logical document units.

use kurbo::{Point, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Lowest zoom (25%).
pub const MIN_SCALE: f64 = 0.25;
/// Highest zoom (400%).
pub const MAX_SCALE: f64 = 4.0;

/// Geometry of the element hosting the page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Container size in CSS/logical pixels.
    pub container: Size,
    /// Logical document size.
    pub document: Size,
    /// Physical pixels per logical pixel.
    pub device_pixel_ratio: f64,
}

impl Viewport {
    pub fn new(container: Size, document: Size) -> Self {
        Self {
            container,
            document,
            device_pixel_ratio: 1.0,
        }
    }

    pub fn with_device_pixel_ratio(mut self, ratio: f64) -> Self {
        self.device_pixel_ratio = if ratio > 0.0 { ratio } else { 1.0 };
        self
    }
}

/// Per-page pan and zoom.
///
/// `Copy` on purpose: an event handler takes one copy and uses it for every
/// conversion in that event. The zoom bounds come from the editor config and
/// are not persisted; a deserialized transform must go through
/// [`ViewTransform::sanitized`] before use.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewTransform {
    pub pan_x: f64,
    pub pan_y: f64,
    pub scale: f64,
    #[serde(skip, default = "default_min_scale")]
    pub min_scale: f64,
    #[serde(skip, default = "default_max_scale")]
    pub max_scale: f64,
}

fn default_min_scale() -> f64 {
    MIN_SCALE
}

fn default_max_scale() -> f64 {
    MAX_SCALE
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            pan_x: 0.0,
            pan_y: 0.0,
            scale: 1.0,
            min_scale: MIN_SCALE,
            max_scale: MAX_SCALE,
        }
    }
}

impl ViewTransform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transform with custom zoom bounds, at 100% if the bounds allow it.
    pub fn with_bounds(min_scale: f64, max_scale: f64) -> Self {
        Self::default().sanitized(min_scale, max_scale)
    }

    /// Adopt `min_scale..=max_scale` and bring pan and zoom back into a
    /// usable state. Non-finite pan resets to zero; the scale is clamped.
    pub fn sanitized(mut self, min_scale: f64, max_scale: f64) -> Self {
        self.min_scale = min_scale;
        self.max_scale = max_scale;
        if !(self.pan_x.is_finite() && self.pan_y.is_finite()) {
            self.pan_x = 0.0;
            self.pan_y = 0.0;
        }
        self.set_scale(self.scale);
        self
    }

    pub fn pan(&self) -> Vec2 {
        Vec2::new(self.pan_x, self.pan_y)
    }

    /// Set the zoom, clamped to the bounds.
    pub fn set_scale(&mut self, scale: f64) {
        let scale = if scale.is_finite() { scale } else { 1.0 };
        self.scale = scale.clamp(self.min_scale, self.max_scale);
    }

    /// Zoom as a percentage (100 = actual size).
    pub fn zoom_percent(&self) -> f64 {
        self.scale * 100.0
    }

    pub fn set_zoom_percent(&mut self, percent: f64) {
        self.set_scale(percent / 100.0);
    }

    /// Set the pan offset. Unbounded.
    pub fn set_pan(&mut self, pan_x: f64, pan_y: f64) {
        self.pan_x = pan_x;
        self.pan_y = pan_y;
    }

    /// Pan by a delta in container pixels.
    pub fn pan_by(&mut self, delta: Vec2) {
        self.pan_x += delta.x;
        self.pan_y += delta.y;
    }

    /// Back to 100% and centered.
    pub fn reset(&mut self) {
        self.pan_x = 0.0;
        self.pan_y = 0.0;
        self.scale = 1.0_f64.clamp(self.min_scale, self.max_scale);
    }

    /// Map a position relative to the scaled page to document units.
    pub fn local_to_logical(&self, local: Point) -> Point {
        Point::new(local.x / self.scale, local.y / self.scale)
    }

    /// Container position of the document origin.
    pub fn origin_in_container(&self, viewport: &Viewport) -> Point {
        Point::new(
            viewport.container.width / 2.0 + self.pan_x - viewport.document.width * self.scale / 2.0,
            viewport.container.height / 2.0 + self.pan_y - viewport.document.height * self.scale / 2.0,
        )
    }

    /// Map a container-relative position to document units.
    pub fn container_to_logical(&self, raw: Point, viewport: &Viewport) -> Point {
        let origin = self.origin_in_container(viewport);
        self.local_to_logical(Point::new(raw.x - origin.x, raw.y - origin.y))
    }

    /// Map document units to a container-relative position.
    pub fn logical_to_container(&self, logical: Point, viewport: &Viewport) -> Point {
        let origin = self.origin_in_container(viewport);
        Point::new(logical.x * self.scale + origin.x, logical.y * self.scale + origin.y)
    }

    /// Map a physical-pixel position to document units.
    pub fn physical_to_logical(&self, physical: Point, viewport: &Viewport) -> Point {
        let dpr = viewport.device_pixel_ratio;
        self.container_to_logical(Point::new(physical.x / dpr, physical.y / dpr), viewport)
    }

    /// Zoom to `scale`, keeping the document point under `anchor` (a
    /// container position) fixed.
    pub fn zoom_at(&mut self, anchor: Point, scale: f64, viewport: &Viewport) {
        let logical = self.container_to_logical(anchor, viewport);
        self.set_scale(scale);
        let s = self.scale;
        self.pan_x = anchor.x - logical.x * s - viewport.container.width / 2.0 + viewport.document.width * s / 2.0;
        self.pan_y = anchor.y - logical.y * s - viewport.container.height / 2.0 + viewport.document.height * s / 2.0;
    }

    /// Multiply the zoom by `factor` around `anchor`.
    pub fn zoom_by(&mut self, anchor: Point, factor: f64, viewport: &Viewport) {
        self.zoom_at(anchor, self.scale * factor, viewport);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport() -> Viewport {
        Viewport::new(Size::new(1600.0, 1000.0), Size::new(1200.0, 1600.0))
    }

    #[test]
    fn test_default_transform() {
        let view = ViewTransform::new();
        assert!((view.scale - 1.0).abs() < f64::EPSILON);
        assert_eq!(view.pan(), Vec2::ZERO);
    }

    #[test]
    fn test_zoom_clamped() {
        let mut view = ViewTransform::new();
        view.set_zoom_percent(1000.0);
        assert!((view.zoom_percent() - 400.0).abs() < 1e-9);
        view.set_zoom_percent(-50.0);
        assert!((view.zoom_percent() - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_custom_bounds_clamp() {
        let mut view = ViewTransform::with_bounds(0.5, 2.0);
        view.set_zoom_percent(300.0);
        assert!((view.scale - 2.0).abs() < f64::EPSILON);
        view.set_zoom_percent(10.0);
        assert!((view.scale - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_deserialized_view_is_sanitized() {
        let json = r#"{ "panX": 10.0, "panY": -5.0, "scale": 0.0, "minScale": 0.0, "maxScale": 1000.0 }"#;
        let raw: ViewTransform = serde_json::from_str(json).unwrap();
        // Persisted bounds are ignored
        assert!((raw.min_scale - MIN_SCALE).abs() < f64::EPSILON);
        assert!((raw.max_scale - MAX_SCALE).abs() < f64::EPSILON);

        let view = raw.sanitized(MIN_SCALE, MAX_SCALE);
        assert!((view.scale - MIN_SCALE).abs() < f64::EPSILON);
        assert!((view.pan_x - 10.0).abs() < f64::EPSILON);

        let json = serde_json::to_string(&view).unwrap();
        assert!(!json.contains("minScale"));
    }

    #[test]
    fn test_pan_unbounded() {
        let mut view = ViewTransform::new();
        view.set_pan(-1.0e6, 5.0e6);
        assert!((view.pan_x + 1.0e6).abs() < f64::EPSILON);
        assert!((view.pan_y - 5.0e6).abs() < f64::EPSILON);
    }

    #[test]
    fn test_origin_formula() {
        let mut view = ViewTransform::new();
        view.set_pan(30.0, -20.0);
        view.set_scale(0.5);
        let origin = view.origin_in_container(&viewport());
        // 1600/2 + 30 - 1200*0.5/2
        assert!((origin.x - 530.0).abs() < 1e-9);
        // 1000/2 - 20 - 1600*0.5/2
        assert!((origin.y - 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_container_roundtrip() {
        let vp = viewport();
        for &(px, py, s) in &[(0.0, 0.0, 1.0), (123.4, -567.8, 0.25), (-9e3, 4e3, 4.0), (17.0, 3.0, 1.7)] {
            let mut view = ViewTransform::new();
            view.set_pan(px, py);
            view.set_scale(s);
            let p = Point::new(321.5, 987.25);
            let back = view.container_to_logical(view.logical_to_container(p, &vp), &vp);
            assert!((back.x - p.x).abs() < 1e-9);
            assert!((back.y - p.y).abs() < 1e-9);
        }
    }

    #[test]
    fn test_local_formula_agrees_with_container_formula() {
        let vp = viewport();
        let mut view = ViewTransform::new();
        view.set_pan(40.0, 60.0);
        view.set_scale(2.0);
        let origin = view.origin_in_container(&vp);
        let raw = Point::new(900.0, 700.0);
        let a = view.container_to_logical(raw, &vp);
        let b = view.local_to_logical(Point::new(raw.x - origin.x, raw.y - origin.y));
        assert!((a.x - b.x).abs() < 1e-12);
        assert!((a.y - b.y).abs() < 1e-12);
    }

    #[test]
    fn test_device_pixel_ratio() {
        let vp = viewport().with_device_pixel_ratio(2.0);
        let view = ViewTransform::new();
        let a = view.physical_to_logical(Point::new(1000.0, 600.0), &vp);
        let b = view.container_to_logical(Point::new(500.0, 300.0), &vp);
        assert!((a.x - b.x).abs() < 1e-12);
        assert!((a.y - b.y).abs() < 1e-12);
    }

    #[test]
    fn test_zoom_at_keeps_anchor() {
        let vp = viewport();
        let mut view = ViewTransform::new();
        view.set_pan(25.0, -75.0);
        let anchor = Point::new(700.0, 420.0);
        let before = view.container_to_logical(anchor, &vp);
        view.zoom_by(anchor, 1.25, &vp);
        let after = view.container_to_logical(anchor, &vp);
        assert!((before.x - after.x).abs() < 1e-9);
        assert!((before.y - after.y).abs() < 1e-9);
        assert!((view.scale - 1.25).abs() < 1e-12);
    }
}
