//! Panel (frame) style and outline.

use super::SerializableColor;
use crate::rng::SimpleRng;
use kurbo::{BezPath, Point, Rect, RoundedRect, Shape as KurboShape};
use serde::{Deserialize, Serialize};

/// Outline shape of a panel.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PanelShape {
    #[default]
    Rectangle,
    /// Uses the style's corner radius.
    Rounded,
    /// Hand-cut look: corners and edge midpoints wobble by up to `jitter`.
    Irregular { jitter: f64 },
}

/// Appearance of a panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelStyle {
    pub border_width: f64,
    pub border_color: SerializableColor,
    pub fill_color: SerializableColor,
    /// Multiplies the fill alpha. Drops to near zero while hosting an image.
    pub fill_opacity: f64,
    pub shape: PanelShape,
    pub corner_radius: f64,
    /// Seed for irregular outlines.
    #[serde(default)]
    pub seed: u64,
    /// Fill opacity before an image was hosted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_opacity_before_hosting: Option<f64>,
}

impl Default for PanelStyle {
    fn default() -> Self {
        Self {
            border_width: 3.0,
            border_color: SerializableColor::black(),
            fill_color: SerializableColor::white(),
            fill_opacity: 1.0,
            shape: PanelShape::Rectangle,
            corner_radius: 0.0,
            seed: 0,
            fill_opacity_before_hosting: None,
        }
    }
}

impl PanelStyle {
    /// Fill color with the fill opacity applied.
    pub fn effective_fill(&self) -> SerializableColor {
        self.fill_color.with_opacity(self.fill_opacity)
    }

    /// Whether the fill has been made transparent for a hosted image.
    pub fn is_hosting(&self) -> bool {
        self.fill_opacity_before_hosting.is_some()
    }

    /// Make the fill near-transparent so a hosted image shows through.
    pub fn host_image(&mut self, hosted_opacity: f64) {
        if self.fill_opacity_before_hosting.is_none() {
            self.fill_opacity_before_hosting = Some(self.fill_opacity);
        }
        self.fill_opacity = hosted_opacity;
    }

    /// Restore the pre-hosting fill. Returns false if nothing was hosted.
    pub fn unhost_image(&mut self) -> bool {
        match self.fill_opacity_before_hosting.take() {
            Some(opacity) => {
                self.fill_opacity = opacity;
                true
            }
            None => false,
        }
    }

    /// Outline path for a panel occupying `rect`.
    pub fn outline(&self, rect: Rect) -> BezPath {
        match self.shape {
            PanelShape::Rectangle => rect.to_path(0.1),
            PanelShape::Rounded => {
                let max_radius = rect.width().min(rect.height()) / 2.0;
                RoundedRect::from_rect(rect, self.corner_radius.clamp(0.0, max_radius)).to_path(0.1)
            }
            PanelShape::Irregular { jitter } => irregular_outline(rect, jitter, self.seed),
        }
    }
}

/// Jitter the corners and edge midpoints of `rect`, reproducibly for `seed`.
fn irregular_outline(rect: Rect, jitter: f64, seed: u64) -> BezPath {
    let mut rng = SimpleRng::new(seed);
    let jitter = jitter.max(0.0);
    let corners = [
        Point::new(rect.x0, rect.y0),
        Point::new(rect.x1, rect.y0),
        Point::new(rect.x1, rect.y1),
        Point::new(rect.x0, rect.y1),
    ];

    let mut path = BezPath::new();
    for (i, corner) in corners.iter().enumerate() {
        let next = corners[(i + 1) % corners.len()];
        let p = Point::new(corner.x + rng.offset(jitter), corner.y + rng.offset(jitter));
        if i == 0 {
            path.move_to(p);
        } else {
            path.line_to(p);
        }
        let mid = corner.midpoint(next);
        path.line_to(Point::new(
            mid.x + rng.offset(jitter / 2.0),
            mid.y + rng.offset(jitter / 2.0),
        ));
    }
    path.close_path();
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_and_unhost_restores_opacity() {
        let mut style = PanelStyle {
            fill_opacity: 0.8,
            ..PanelStyle::default()
        };
        style.host_image(0.05);
        assert!(style.is_hosting());
        assert!((style.fill_opacity - 0.05).abs() < f64::EPSILON);

        // Hosting again keeps the original backup.
        style.host_image(0.05);
        assert!(style.unhost_image());
        assert!((style.fill_opacity - 0.8).abs() < f64::EPSILON);
        assert!(!style.unhost_image());
    }

    #[test]
    fn test_irregular_outline_is_reproducible() {
        let rect = Rect::new(0.0, 0.0, 200.0, 150.0);
        let style = PanelStyle {
            shape: PanelShape::Irregular { jitter: 6.0 },
            seed: 1234,
            ..PanelStyle::default()
        };
        let a = style.outline(rect);
        let b = style.outline(rect);
        assert_eq!(a, b);

        let other = PanelStyle { seed: 99, ..style.clone() };
        assert_ne!(a, other.outline(rect));

        // Jitter stays within bounds.
        let bbox = a.bounding_box();
        assert!(bbox.x0 >= -6.0 && bbox.x1 <= 206.0);
        assert!(bbox.y0 >= -6.0 && bbox.y1 <= 156.0);
    }

    #[test]
    fn test_rounded_radius_clamped() {
        let style = PanelStyle {
            shape: PanelShape::Rounded,
            corner_radius: 500.0,
            ..PanelStyle::default()
        };
        let bbox = style.outline(Rect::new(0.0, 0.0, 40.0, 20.0)).bounding_box();
        assert!((bbox.width() - 40.0).abs() < 1e-6);
    }
}
