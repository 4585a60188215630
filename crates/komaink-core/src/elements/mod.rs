//! Document elements placed on a page.

mod dialogue;
mod image;
mod panel;
mod sprite;
mod text;

pub use dialogue::{BubbleType, DialogueStyle, Tail};
pub use image::{DropMetadata, DropPayload, ImageFit, ImageSourceType, ImageStyle};
pub use panel::{PanelShape, PanelStyle};
pub use sprite::SpriteStyle;
pub use text::{FontSpec, TextAlign, TextStyle};

use kurbo::{Affine, BezPath, Point, Rect, Shape as KurboShape, Vec2};
use peniko::Color;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for elements.
pub type ElementId = Uuid;

/// Serializable color representation (RGBA8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    pub const fn white() -> Self {
        Self::new(255, 255, 255, 255)
    }

    pub const fn transparent() -> Self {
        Self::new(0, 0, 0, 0)
    }

    /// Same color with alpha scaled by `opacity`.
    pub fn with_opacity(self, opacity: f64) -> Self {
        let a = (self.a as f64 * opacity.clamp(0.0, 1.0)).round() as u8;
        Self { a, ..self }
    }
}

impl From<Color> for SerializableColor {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self {
            r: rgba.r,
            g: rgba.g,
            b: rgba.b,
            a: rgba.a,
        }
    }
}

impl From<SerializableColor> for Color {
    fn from(color: SerializableColor) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

/// Fixed rendering bucket. Declaration order is draw order (back to front).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    Background,
    /// Characters and raster art. Panels draw above this layer, so an image
    /// shows through a panel whose fill has been made transparent.
    #[default]
    Characters,
    Panels,
    Dialogue,
    Ui,
}

impl Layer {
    /// All layers in draw order.
    pub const ALL: [Layer; 5] = [
        Layer::Background,
        Layer::Characters,
        Layer::Panels,
        Layer::Dialogue,
        Layer::Ui,
    ];

    /// Position in draw order.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Layer::Background => "Background",
            Layer::Characters => "Characters",
            Layer::Panels => "Panels",
            Layer::Dialogue => "Dialogue",
            Layer::Ui => "UI",
        }
    }
}

/// Position, size, rotation, opacity and stacking of an element.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transform {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Rotation in radians around the center.
    #[serde(default)]
    pub rotation: f64,
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    #[serde(default)]
    pub z_index: i64,
}

fn default_alpha() -> f64 {
    1.0
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 100.0,
            height: 100.0,
            rotation: 0.0,
            alpha: 1.0,
            z_index: 0,
        }
    }
}

impl Transform {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
            ..Self::default()
        }
    }

    /// Build from a kurbo rectangle (normalized).
    pub fn from_rect(rect: Rect) -> Self {
        let rect = rect.abs();
        Self::new(rect.x0, rect.y0, rect.width(), rect.height())
    }

    /// Axis-aligned rectangle ignoring rotation.
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.x + self.width, self.y + self.height)
    }

    pub fn center(&self) -> Point {
        self.rect().center()
    }

    /// Set position and size from a rectangle, keeping rotation, alpha and z.
    pub fn set_rect(&mut self, rect: Rect) {
        let rect = rect.abs();
        self.x = rect.x0;
        self.y = rect.y0;
        self.width = rect.width();
        self.height = rect.height();
    }

    /// Enforce the minimum size on both axes.
    pub fn clamp_size(&mut self, min: f64) {
        self.width = self.width.max(min);
        self.height = self.height.max(min);
    }

    /// Rotation about the center, mapping local (unrotated) to document space.
    pub fn rotation_affine(&self) -> Affine {
        let c = self.center();
        Affine::translate(c.to_vec2()) * Affine::rotate(self.rotation) * Affine::translate(-c.to_vec2())
    }

    /// Whether a document point lies inside the (rotated) rectangle.
    pub fn contains(&self, point: Point) -> bool {
        let local = if self.rotation.abs() > f64::EPSILON {
            self.rotation_affine().inverse() * point
        } else {
            point
        };
        self.rect().contains(local)
    }

    /// Translate by a delta.
    pub fn translate(&mut self, delta: Vec2) {
        self.x += delta.x;
        self.y += delta.y;
    }
}

/// Compositing mode for an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendMode {
    #[default]
    Normal,
    Multiply,
    Screen,
    Overlay,
}

/// User-facing flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Properties {
    pub name: String,
    #[serde(default)]
    pub locked: bool,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default)]
    pub blend_mode: BlendMode,
}

fn default_visible() -> bool {
    true
}

impl Properties {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            locked: false,
            visible: true,
            blend_mode: BlendMode::Normal,
        }
    }
}

/// Optional provenance and linkage data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// Panel hosting this image, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_panel_id: Option<ElementId>,
    /// Where the element came from (asset gallery, upload, duplicate...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Tool that created the element.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
}

/// Variant-specific data for an element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "style", rename_all = "snake_case")]
pub enum ElementKind {
    Panel(PanelStyle),
    Dialogue(DialogueStyle),
    Text(TextStyle),
    Sprite(SpriteStyle),
    Image(ImageStyle),
}

impl ElementKind {
    /// Layer a new element of this kind is placed in.
    pub fn default_layer(&self) -> Layer {
        match self {
            ElementKind::Panel(_) => Layer::Panels,
            ElementKind::Dialogue(_) | ElementKind::Text(_) => Layer::Dialogue,
            ElementKind::Sprite(_) | ElementKind::Image(_) => Layer::Characters,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ElementKind::Panel(_) => "Panel",
            ElementKind::Dialogue(_) => "Dialogue",
            ElementKind::Text(_) => "Text",
            ElementKind::Sprite(_) => "Sprite",
            ElementKind::Image(_) => "Image",
        }
    }
}

/// A single placeable document object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub id: ElementId,
    pub layer: Layer,
    pub transform: Transform,
    pub kind: ElementKind,
    pub properties: Properties,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Element {
    /// Create an element in the default layer for its kind.
    ///
    /// A nil `id` asks the store to assign one on insertion.
    pub fn new(id: ElementId, transform: Transform, kind: ElementKind) -> Self {
        let layer = kind.default_layer();
        let properties = Properties::named(kind.name());
        Self {
            id,
            layer,
            transform,
            kind,
            properties,
            metadata: Metadata::default(),
        }
    }

    pub fn panel(id: ElementId, rect: Rect, style: PanelStyle) -> Self {
        Self::new(id, Transform::from_rect(rect), ElementKind::Panel(style))
    }

    pub fn dialogue(id: ElementId, rect: Rect, style: DialogueStyle) -> Self {
        Self::new(id, Transform::from_rect(rect), ElementKind::Dialogue(style))
    }

    pub fn text(id: ElementId, rect: Rect, style: TextStyle) -> Self {
        Self::new(id, Transform::from_rect(rect), ElementKind::Text(style))
    }

    pub fn sprite(id: ElementId, rect: Rect, style: SpriteStyle) -> Self {
        Self::new(id, Transform::from_rect(rect), ElementKind::Sprite(style))
    }

    pub fn image(id: ElementId, rect: Rect, style: ImageStyle) -> Self {
        Self::new(id, Transform::from_rect(rect), ElementKind::Image(style))
    }

    pub fn with_z(mut self, z_index: i64) -> Self {
        self.transform.z_index = z_index;
        self
    }

    pub fn with_layer(mut self, layer: Layer) -> Self {
        self.layer = layer;
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Axis-aligned bounds ignoring rotation.
    pub fn bounds(&self) -> Rect {
        self.transform.rect()
    }

    /// Bounds of the rotated element.
    pub fn rotated_bounds(&self) -> Rect {
        if self.transform.rotation.abs() <= f64::EPSILON {
            return self.bounds();
        }
        (self.transform.rotation_affine() * self.bounds().to_path(0.1)).bounding_box()
    }

    /// Whether a visible element covers the document point.
    pub fn hit_test(&self, point: Point) -> bool {
        self.properties.visible && self.transform.contains(point)
    }

    /// Outline path in document space, before rotation.
    pub fn outline(&self) -> BezPath {
        let rect = self.bounds();
        match &self.kind {
            ElementKind::Panel(style) => style.outline(rect),
            ElementKind::Dialogue(style) => style.outline(rect),
            ElementKind::Text(_) | ElementKind::Sprite(_) | ElementKind::Image(_) => {
                rect.to_path(0.1)
            }
        }
    }

    pub fn is_panel(&self) -> bool {
        matches!(self.kind, ElementKind::Panel(_))
    }

    pub fn is_image(&self) -> bool {
        matches!(self.kind, ElementKind::Image(_))
    }

    pub fn is_dialogue(&self) -> bool {
        matches!(self.kind, ElementKind::Dialogue(_))
    }

    pub fn as_panel(&self) -> Option<&PanelStyle> {
        match &self.kind {
            ElementKind::Panel(style) => Some(style),
            _ => None,
        }
    }

    pub fn as_panel_mut(&mut self) -> Option<&mut PanelStyle> {
        match &mut self.kind {
            ElementKind::Panel(style) => Some(style),
            _ => None,
        }
    }

    pub fn as_dialogue(&self) -> Option<&DialogueStyle> {
        match &self.kind {
            ElementKind::Dialogue(style) => Some(style),
            _ => None,
        }
    }

    pub fn as_dialogue_mut(&mut self) -> Option<&mut DialogueStyle> {
        match &mut self.kind {
            ElementKind::Dialogue(style) => Some(style),
            _ => None,
        }
    }

    pub fn as_image(&self) -> Option<&ImageStyle> {
        match &self.kind {
            ElementKind::Image(style) => Some(style),
            _ => None,
        }
    }

    pub fn parent_panel_id(&self) -> Option<ElementId> {
        self.metadata.parent_panel_id
    }
}

/// Partial update merged into an existing element.
///
/// `None` fields are left untouched. `parent_panel_id: Some(None)` clears the
/// back-reference.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementPatch {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub rotation: Option<f64>,
    pub alpha: Option<f64>,
    pub z_index: Option<i64>,
    pub layer: Option<Layer>,
    pub kind: Option<ElementKind>,
    pub name: Option<String>,
    pub locked: Option<bool>,
    pub visible: Option<bool>,
    pub blend_mode: Option<BlendMode>,
    pub parent_panel_id: Option<Option<ElementId>>,
}

impl ElementPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(mut self, x: f64, y: f64) -> Self {
        self.x = Some(x);
        self.y = Some(y);
        self
    }

    pub fn size(mut self, width: f64, height: f64) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Position and size from a rectangle.
    pub fn rect(self, rect: Rect) -> Self {
        let rect = rect.abs();
        self.position(rect.x0, rect.y0).size(rect.width(), rect.height())
    }

    /// Copy all geometric fields of a transform.
    pub fn transform(mut self, transform: &Transform) -> Self {
        self = self
            .position(transform.x, transform.y)
            .size(transform.width, transform.height);
        self.rotation = Some(transform.rotation);
        self.alpha = Some(transform.alpha);
        self.z_index = Some(transform.z_index);
        self
    }

    pub fn kind(mut self, kind: ElementKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn z_index(mut self, z_index: i64) -> Self {
        self.z_index = Some(z_index);
        self
    }

    pub fn visible(mut self, visible: bool) -> Self {
        self.visible = Some(visible);
        self
    }

    pub fn locked(mut self, locked: bool) -> Self {
        self.locked = Some(locked);
        self
    }

    pub fn parent_panel(mut self, parent: Option<ElementId>) -> Self {
        self.parent_panel_id = Some(parent);
        self
    }

    /// Merge into `element`, clamping sizes to `min_size`.
    pub fn apply(&self, element: &mut Element, min_size: f64) {
        let t = &mut element.transform;
        if let Some(x) = self.x {
            t.x = x;
        }
        if let Some(y) = self.y {
            t.y = y;
        }
        if let Some(width) = self.width {
            t.width = width;
        }
        if let Some(height) = self.height {
            t.height = height;
        }
        if let Some(rotation) = self.rotation {
            t.rotation = rotation;
        }
        if let Some(alpha) = self.alpha {
            t.alpha = alpha.clamp(0.0, 1.0);
        }
        if let Some(z) = self.z_index {
            t.z_index = z;
        }
        t.clamp_size(min_size);

        if let Some(layer) = self.layer {
            element.layer = layer;
        }
        if let Some(kind) = &self.kind {
            if std::mem::discriminant(kind) != std::mem::discriminant(&element.kind) {
                log::debug!(
                    "Element {} changes kind from {} to {}",
                    element.id,
                    element.kind.name(),
                    kind.name()
                );
            }
            element.kind = kind.clone();
        }
        if let Some(name) = &self.name {
            element.properties.name = name.clone();
        }
        if let Some(locked) = self.locked {
            element.properties.locked = locked;
        }
        if let Some(visible) = self.visible {
            element.properties.visible = visible;
        }
        if let Some(blend_mode) = self.blend_mode {
            element.properties.blend_mode = blend_mode;
        }
        if let Some(parent) = self.parent_panel_id {
            element.metadata.parent_panel_id = parent;
        }
    }
}

/// Axis-aligned overlap test. Touching edges do not overlap.
pub fn rects_overlap(a: Rect, b: Rect) -> bool {
    !(a.x1 <= b.x0 || b.x1 <= a.x0 || a.y1 <= b.y0 || b.y1 <= a.y0)
}
