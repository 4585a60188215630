//! CPU render surface sized to the logical document.
//!
//! Export and thumbnail collaborators read pixels back through
//! [`RenderSurface::capture`], never by walking the scene.

use crate::images::ImageState;
use crate::overlay::SelectionOverlay;
use crate::renderer::{RenderResult, RendererError};
use crate::scene::{ImageSlot, NodeContent, Scene, SceneNode};
use image::{Rgba, RgbaImage};
use komaink_core::elements::{BlendMode, ImageFit, Layer, SerializableColor};
use kurbo::{Affine, BezPath, PathEl, Point, Rect, Shape as KurboShape, Size};
use peniko::Color;
use tiny_skia::{FillRule, Mask, Paint, Path, PathBuilder, Pixmap, PixmapPaint, Stroke, StrokeDash, Transform};

/// Colors used by the surface itself.
#[derive(Debug, Clone, Copy)]
pub struct SurfaceStyle {
    /// Paper color.
    pub background: Color,
    pub selection: Color,
    pub placeholder: Color,
    pub error: Color,
}

impl Default for SurfaceStyle {
    fn default() -> Self {
        Self {
            background: Color::WHITE,
            selection: Color::from_rgba8(59, 130, 246, 255), // Blue
            placeholder: Color::from_rgba8(200, 200, 200, 255),
            error: Color::from_rgba8(220, 90, 90, 255),
        }
    }
}

/// Pixel target for one page.
pub struct RenderSurface {
    pixmap: Pixmap,
    document: Size,
    /// Pixels per document unit.
    scale: f64,
    style: SurfaceStyle,
}

impl RenderSurface {
    /// A surface with one pixel per document unit.
    pub fn new(document: Size) -> RenderResult<Self> {
        Self::with_scale(document, 1.0)
    }

    pub fn with_scale(document: Size, scale: f64) -> RenderResult<Self> {
        if !(scale.is_finite() && scale > 0.0) {
            return Err(RendererError::Surface(format!("invalid scale {}", scale)));
        }
        let width = (document.width * scale).round();
        let height = (document.height * scale).round();
        let pixmap = Pixmap::new(width as u32, height as u32)
            .ok_or_else(|| RendererError::Surface(format!("cannot allocate {}x{} surface", width, height)))?;
        Ok(Self {
            pixmap,
            document,
            scale,
            style: SurfaceStyle::default(),
        })
    }

    pub fn with_style(mut self, style: SurfaceStyle) -> Self {
        self.style = style;
        self
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub fn document_size(&self) -> Size {
        self.document
    }

    /// Draw every visible layer and the overlay.
    pub fn render(&mut self, scene: &Scene, overlay: Option<&SelectionOverlay>) {
        self.draw_scene(scene, true);
        if let Some(overlay) = overlay {
            self.draw_overlay(overlay);
        }
    }

    /// Render the document without UI chrome and read it back.
    pub fn capture(&mut self, scene: &Scene) -> RgbaImage {
        self.draw_scene(scene, false);
        self.to_image()
    }

    /// Current contents, un-premultiplied.
    pub fn to_image(&self) -> RgbaImage {
        let width = self.pixmap.width();
        let pixels = self.pixmap.pixels();
        RgbaImage::from_fn(width, self.pixmap.height(), |x, y| {
            let c = pixels[(y * width + x) as usize].demultiply();
            Rgba([c.red(), c.green(), c.blue(), c.alpha()])
        })
    }

    /// One pixel, un-premultiplied.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let c = self.pixmap.pixel(x, y)?.demultiply();
        Some([c.red(), c.green(), c.blue(), c.alpha()])
    }

    fn base(&self) -> Affine {
        Affine::scale(self.scale)
    }

    fn draw_scene(&mut self, scene: &Scene, include_ui: bool) {
        let background = SerializableColor::from(self.style.background);
        self.pixmap.fill(tiny_skia::Color::from_rgba8(
            background.r,
            background.g,
            background.b,
            background.a,
        ));
        for (layer, node) in scene.draw_list() {
            if !include_ui && layer.layer() == Layer::Ui {
                continue;
            }
            if !node.visible() {
                continue;
            }
            let opacity = node.transform().alpha.clamp(0.0, 1.0) * layer.opacity;
            if opacity <= 0.0 {
                continue;
            }
            self.draw_node(node, opacity);
        }
    }

    fn draw_node(&mut self, node: &SceneNode, opacity: f64) {
        let transform = to_skia_transform(self.base() * node.affine());
        let blend = to_skia_blend(node.blend_mode());
        let bounds = node.transform().rect();

        match node.content() {
            NodeContent::Panel {
                outline,
                fill,
                border,
                border_width,
            } => {
                let Some(path) = to_skia_path(outline) else {
                    return;
                };
                self.fill(&path, *fill, opacity, blend, transform);
                self.stroke(&path, *border, *border_width, false, opacity, transform);
            }
            NodeContent::Dialogue {
                outline,
                fill,
                border,
                border_width,
                dashed,
                ..
            } => {
                let Some(path) = to_skia_path(outline) else {
                    return;
                };
                self.fill(&path, *fill, opacity, blend, transform);
                self.stroke(&path, *border, *border_width, *dashed, opacity, transform);
            }
            // Glyphs are laid out by the host; only the box is reserved here.
            NodeContent::Text { .. } => {}
            NodeContent::Sprite { tint, .. } => {
                let color = tint.unwrap_or_else(|| SerializableColor::from(self.style.placeholder));
                if let Some(path) = to_skia_path(&bounds.to_path(0.1)) {
                    self.fill(&path, color, opacity * 0.5, blend, transform);
                }
            }
            NodeContent::Image { slot, mask } => {
                let mask = mask.as_ref().and_then(|m| self.build_mask(m));
                match &slot.state {
                    ImageState::Ready(image) => {
                        let dst = fit_rect(bounds, slot);
                        let (pw, ph) = (image.width() as f64, image.height() as f64);
                        let affine = self.base()
                            * node.affine()
                            * Affine::translate((dst.x0, dst.y0))
                            * Affine::scale_non_uniform(dst.width() / pw, dst.height() / ph);
                        let paint = PixmapPaint {
                            opacity: opacity as f32,
                            blend_mode: blend,
                            ..PixmapPaint::default()
                        };
                        self.pixmap
                            .draw_pixmap(0, 0, image.pixmap.as_ref(), &paint, to_skia_transform(affine), mask.as_ref());
                    }
                    ImageState::Placeholder => self.draw_placeholder(bounds, self.style.placeholder, opacity, transform),
                    ImageState::Error(_) => self.draw_placeholder(bounds, self.style.error, opacity, transform),
                }
            }
        }
    }

    /// Gray box with a cross, as shown while loading or after a failure.
    fn draw_placeholder(&mut self, bounds: Rect, color: Color, opacity: f64, transform: Transform) {
        let color = SerializableColor::from(color);
        let Some(rect) = to_skia_path(&bounds.to_path(0.1)) else {
            return;
        };
        self.fill(&rect, color, opacity, tiny_skia::BlendMode::SourceOver, transform);

        let mut cross = BezPath::new();
        cross.move_to(Point::new(bounds.x0, bounds.y0));
        cross.line_to(Point::new(bounds.x1, bounds.y1));
        cross.move_to(Point::new(bounds.x1, bounds.y0));
        cross.line_to(Point::new(bounds.x0, bounds.y1));
        let line = SerializableColor::new(color.r / 2, color.g / 2, color.b / 2, 255);
        if let Some(cross) = to_skia_path(&cross) {
            self.stroke(&cross, line, 2.0, false, opacity, transform);
        }
        self.stroke(&rect, line, 2.0, false, opacity, transform);
    }

    fn draw_overlay(&mut self, overlay: &SelectionOverlay) {
        let color = SerializableColor::from(self.style.selection);
        let transform = to_skia_transform(self.base());

        for item in overlay.items() {
            if let Some(frame) = to_skia_path(&item.frame) {
                self.stroke(&frame, color, 1.5, false, 1.0, transform);
            }
            let half = overlay.handle_size() / 2.0;
            for handle in &item.handles {
                let p = handle.position;
                let square = Rect::new(p.x - half, p.y - half, p.x + half, p.y + half);
                if let Some(path) = to_skia_path(&square.to_path(0.1)) {
                    self.fill(&path, SerializableColor::white(), 1.0, tiny_skia::BlendMode::SourceOver, transform);
                    self.stroke(&path, color, 1.5, false, 1.0, transform);
                }
            }
        }

        if let Some(preview) = overlay.preview() {
            if let Some(path) = to_skia_path(&preview.to_path(0.1)) {
                self.stroke(&path, color, 1.5, true, 1.0, transform);
            }
        }
    }

    fn build_mask(&self, clip: &BezPath) -> Option<Mask> {
        let path = to_skia_path(clip)?;
        let mut mask = Mask::new(self.pixmap.width(), self.pixmap.height())?;
        mask.fill_path(&path, FillRule::Winding, true, to_skia_transform(self.base()));
        Some(mask)
    }

    fn fill(&mut self, path: &Path, color: SerializableColor, opacity: f64, blend: tiny_skia::BlendMode, transform: Transform) {
        let mut paint = paint_for(color, opacity);
        paint.blend_mode = blend;
        self.pixmap.fill_path(path, &paint, FillRule::Winding, transform, None);
    }

    fn stroke(&mut self, path: &Path, color: SerializableColor, width: f64, dashed: bool, opacity: f64, transform: Transform) {
        if width <= 0.0 {
            return;
        }
        let paint = paint_for(color, opacity);
        let mut stroke = Stroke {
            width: width as f32,
            ..Stroke::default()
        };
        if dashed {
            stroke.dash = StrokeDash::new(vec![6.0, 4.0], 0.0);
        }
        self.pixmap.stroke_path(path, &paint, &stroke, transform, None);
    }
}

fn paint_for(color: SerializableColor, opacity: f64) -> Paint<'static> {
    let color = color.with_opacity(opacity);
    let mut paint = Paint::default();
    paint.set_color_rgba8(color.r, color.g, color.b, color.a);
    paint.anti_alias = true;
    paint
}

/// Where the bitmap lands inside the element rectangle.
fn fit_rect(bounds: Rect, slot: &ImageSlot) -> Rect {
    let (ow, oh) = slot.original;
    match slot.fit {
        ImageFit::Fill => bounds,
        ImageFit::Contain if ow == 0 || oh == 0 => bounds,
        ImageFit::Contain => {
            let scale = (bounds.width() / ow as f64).min(bounds.height() / oh as f64);
            let size = Size::new(ow as f64 * scale, oh as f64 * scale);
            Rect::from_center_size(bounds.center(), size)
        }
    }
}

fn to_skia_blend(mode: BlendMode) -> tiny_skia::BlendMode {
    match mode {
        BlendMode::Normal => tiny_skia::BlendMode::SourceOver,
        BlendMode::Multiply => tiny_skia::BlendMode::Multiply,
        BlendMode::Screen => tiny_skia::BlendMode::Screen,
        BlendMode::Overlay => tiny_skia::BlendMode::Overlay,
    }
}

fn to_skia_transform(affine: Affine) -> Transform {
    let [a, b, c, d, e, f] = affine.as_coeffs();
    Transform::from_row(a as f32, b as f32, c as f32, d as f32, e as f32, f as f32)
}

/// Convert a kurbo path. Empty paths yield `None`.
fn to_skia_path(path: &BezPath) -> Option<Path> {
    let mut pb = PathBuilder::new();
    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => pb.move_to(p.x as f32, p.y as f32),
            PathEl::LineTo(p) => pb.line_to(p.x as f32, p.y as f32),
            PathEl::QuadTo(p1, p2) => pb.quad_to(p1.x as f32, p1.y as f32, p2.x as f32, p2.y as f32),
            PathEl::CurveTo(p1, p2, p3) => pb.cubic_to(
                p1.x as f32,
                p1.y as f32,
                p2.x as f32,
                p2.y as f32,
                p3.x as f32,
                p3.y as f32,
            ),
            PathEl::ClosePath => pb.close(),
        }
    }
    pb.finish()
}
