//! Retained-mode scene mirroring the element store.
//!
//! Nodes are tagged with their element id and bucketed by layer. Each sync
//! reconciles in two passes: upsert every current element in place, then
//! sweep nodes whose id is gone. Nodes are never rebuilt wholesale, so
//! decoded bitmaps and animation state survive edits.

use crate::images::{DecodeResult, ImageRequest, ImageState};
use komaink_core::association::{AssociationEngine, AssociationType};
use komaink_core::elements::{
    BlendMode, Element, ElementId, ElementKind, FontSpec, ImageFit, Layer, SerializableColor, TextAlign, Transform,
};
use kurbo::{Affine, BezPath, Point, Shape as KurboShape};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Counts from one reconcile pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub removed: usize,
}

impl ReconcileStats {
    /// Whether the pass touched anything.
    pub fn changed(&self) -> bool {
        self.created + self.updated + self.removed > 0
    }
}

/// Bitmap slot of an image node.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSlot {
    pub url: String,
    pub fit: ImageFit,
    /// Source size reported by the gallery.
    pub original: (u32, u32),
    /// Pixel size of the most recent request.
    pub requested: (u32, u32),
    pub state: ImageState,
    /// Ticket of the most recent request. Older results are discarded.
    pub ticket: u64,
}

/// What a node draws.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeContent {
    Panel {
        outline: BezPath,
        fill: SerializableColor,
        border: SerializableColor,
        border_width: f64,
    },
    Dialogue {
        outline: BezPath,
        fill: SerializableColor,
        border: SerializableColor,
        border_width: f64,
        dashed: bool,
        text: String,
        font: FontSpec,
    },
    Text {
        content: String,
        font: FontSpec,
        align: TextAlign,
    },
    Sprite {
        asset_id: String,
        flip_x: bool,
        flip_y: bool,
        tint: Option<SerializableColor>,
    },
    Image {
        slot: ImageSlot,
        /// Clip path in document space when the hosting panel masks it.
        mask: Option<BezPath>,
    },
}

impl NodeContent {
    fn from_element(element: &Element, mask: Option<BezPath>) -> Self {
        let rect = element.bounds();
        match &element.kind {
            ElementKind::Panel(style) => NodeContent::Panel {
                outline: style.outline(rect),
                fill: style.effective_fill(),
                border: style.border_color,
                border_width: style.border_width,
            },
            ElementKind::Dialogue(style) => NodeContent::Dialogue {
                outline: style.outline(rect),
                fill: style.fill_color,
                border: style.border_color,
                border_width: style.border_width,
                dashed: style.dashed_border(),
                text: style.text.clone(),
                font: style.font.clone(),
            },
            ElementKind::Text(style) => NodeContent::Text {
                content: style.content.clone(),
                font: style.font.clone(),
                align: style.align,
            },
            ElementKind::Sprite(style) => NodeContent::Sprite {
                asset_id: style.asset_id.clone(),
                flip_x: style.flip_x,
                flip_y: style.flip_y,
                tint: style.tint,
            },
            ElementKind::Image(style) => NodeContent::Image {
                slot: ImageSlot {
                    url: style.url.clone(),
                    fit: style.fit,
                    original: (style.original_width, style.original_height),
                    requested: pixel_size(&element.transform),
                    state: ImageState::Placeholder,
                    ticket: 0,
                },
                mask,
            },
        }
    }

    pub fn image_slot(&self) -> Option<&ImageSlot> {
        match self {
            NodeContent::Image { slot, .. } => Some(slot),
            _ => None,
        }
    }

    fn image_slot_mut(&mut self) -> Option<&mut ImageSlot> {
        match self {
            NodeContent::Image { slot, .. } => Some(slot),
            _ => None,
        }
    }
}

/// Bitmap size for an element, one pixel per document unit.
fn pixel_size(transform: &Transform) -> (u32, u32) {
    (
        transform.width.round().max(1.0) as u32,
        transform.height.round().max(1.0) as u32,
    )
}

/// Render-side mirror of one element.
#[derive(Debug, Clone)]
pub struct SceneNode {
    id: ElementId,
    layer: Layer,
    transform: Transform,
    /// Position in the store, the tie-break after z-index.
    order: usize,
    visible: bool,
    blend_mode: BlendMode,
    content: NodeContent,
    /// Bumped on every in-place change.
    version: u64,
}

impl SceneNode {
    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn layer(&self) -> Layer {
        self.layer
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    pub fn content(&self) -> &NodeContent {
        &self.content
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn image_state(&self) -> Option<&ImageState> {
        self.content.image_slot().map(|slot| &slot.state)
    }

    /// Rotation about the element center.
    pub fn affine(&self) -> Affine {
        self.transform.rotation_affine()
    }

    fn draw_key(&self) -> (i64, usize) {
        (self.transform.z_index, self.order)
    }

    /// Merge fresh element state, bumping the version on change. Returns a
    /// decode request when the bitmap needs refreshing.
    fn update_from(&mut self, element: &Element, order: usize, mut content: NodeContent, next_ticket: &mut u64) -> Option<ImageRequest> {
        let mut request = None;
        if let (Some(old), Some(new)) = (self.content.image_slot(), content.image_slot_mut()) {
            request = carry_image_state(element.id, old, new, next_ticket);
        }

        let changed = self.transform != element.transform
            || self.visible != element.properties.visible
            || self.blend_mode != element.properties.blend_mode
            || self.order != order
            || self.content != content;
        if changed {
            self.transform = element.transform;
            self.visible = element.properties.visible;
            self.blend_mode = element.properties.blend_mode;
            self.order = order;
            self.content = content;
            self.version += 1;
        }
        request
    }
}

/// Keep a decoded bitmap across edits. A new URL goes back to the
/// placeholder; a new size keeps the old bitmap on screen until the resized
/// one lands. Errors are never retried for the same URL.
fn carry_image_state(id: ElementId, old: &ImageSlot, new: &mut ImageSlot, next_ticket: &mut u64) -> Option<ImageRequest> {
    if old.url != new.url {
        return Some(issue_request(id, new, next_ticket));
    }
    new.state = old.state.clone();
    new.ticket = old.ticket;
    if old.requested == new.requested || old.state.is_error() {
        new.requested = old.requested;
        return None;
    }
    Some(issue_request(id, new, next_ticket))
}

fn issue_request(id: ElementId, slot: &mut ImageSlot, next_ticket: &mut u64) -> ImageRequest {
    *next_ticket += 1;
    slot.ticket = *next_ticket;
    ImageRequest {
        element_id: id,
        ticket: slot.ticket,
        url: slot.url.clone(),
        width: slot.requested.0,
        height: slot.requested.1,
    }
}

/// One layer bucket with its display toggles.
#[derive(Debug, Clone)]
pub struct SceneLayer {
    layer: Layer,
    nodes: HashMap<ElementId, SceneNode>,
    pub visible: bool,
    pub opacity: f64,
    /// Locked layers are drawn but not hit-tested.
    pub locked: bool,
}

impl SceneLayer {
    fn new(layer: Layer) -> Self {
        Self {
            layer,
            nodes: HashMap::new(),
            visible: true,
            opacity: 1.0,
            locked: false,
        }
    }

    pub fn layer(&self) -> Layer {
        self.layer
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: ElementId) -> Option<&SceneNode> {
        self.nodes.get(&id)
    }

    /// Nodes back to front.
    pub fn draw_order(&self) -> Vec<&SceneNode> {
        let mut nodes: Vec<&SceneNode> = self.nodes.values().collect();
        nodes.sort_by_key(|n| n.draw_key());
        nodes
    }
}

/// The retained scene.
#[derive(Debug, Clone)]
pub struct Scene {
    layers: Vec<SceneLayer>,
    /// Layer currently holding each id.
    index: HashMap<ElementId, Layer>,
    next_ticket: u64,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        Self {
            layers: Layer::ALL.iter().map(|l| SceneLayer::new(*l)).collect(),
            index: HashMap::new(),
            next_ticket: 0,
        }
    }

    pub fn layer(&self, layer: Layer) -> &SceneLayer {
        &self.layers[layer.index()]
    }

    fn layer_mut(&mut self, layer: Layer) -> &mut SceneLayer {
        &mut self.layers[layer.index()]
    }

    pub fn layers(&self) -> &[SceneLayer] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn get(&self, id: ElementId) -> Option<&SceneNode> {
        let layer = self.index.get(&id)?;
        self.layer(*layer).get(id)
    }

    pub fn set_layer_visible(&mut self, layer: Layer, visible: bool) {
        self.layer_mut(layer).visible = visible;
    }

    pub fn set_layer_opacity(&mut self, layer: Layer, opacity: f64) {
        self.layer_mut(layer).opacity = opacity.clamp(0.0, 1.0);
    }

    pub fn set_layer_locked(&mut self, layer: Layer, locked: bool) {
        self.layer_mut(layer).locked = locked;
    }

    /// Reconcile with the current elements.
    ///
    /// Returns the pass statistics and the image decodes to start.
    pub fn reconcile(&mut self, elements: &[Element], associations: &AssociationEngine) -> (ReconcileStats, Vec<ImageRequest>) {
        let masks = image_masks(elements, associations);
        let mut stats = ReconcileStats::default();
        let mut requests = Vec::new();

        // Upsert
        for (order, element) in elements.iter().enumerate() {
            let content = NodeContent::from_element(element, masks.get(&element.id).cloned());

            let existing = self.index.get(&element.id).copied();
            let moved = match existing {
                Some(layer) if layer != element.layer => self.layer_mut(layer).nodes.remove(&element.id),
                _ => None,
            };
            let ticket = &mut self.next_ticket;
            let bucket = &mut self.layers[element.layer.index()].nodes;

            match bucket.get_mut(&element.id) {
                Some(node) => {
                    let version = node.version;
                    requests.extend(node.update_from(element, order, content, ticket));
                    if node.version == version {
                        stats.unchanged += 1;
                    } else {
                        stats.updated += 1;
                    }
                }
                None => {
                    let mut node = match moved {
                        Some(mut node) => {
                            let version = node.version;
                            node.layer = element.layer;
                            requests.extend(node.update_from(element, order, content, ticket));
                            if node.version == version {
                                node.version += 1;
                            }
                            stats.updated += 1;
                            node
                        }
                        None => {
                            stats.created += 1;
                            SceneNode {
                                id: element.id,
                                layer: element.layer,
                                transform: element.transform,
                                order,
                                visible: element.properties.visible,
                                blend_mode: element.properties.blend_mode,
                                content,
                                version: 0,
                            }
                        }
                    };
                    if let Some(slot) = node.content.image_slot_mut() {
                        if slot.ticket == 0 {
                            requests.push(issue_request(element.id, slot, ticket));
                        }
                    }
                    bucket.insert(element.id, node);
                    self.index.insert(element.id, element.layer);
                }
            }
        }

        // Sweep. After the upsert every current id is indexed, so any
        // surplus entry is stale.
        if self.index.len() > elements.len() {
            let current: HashSet<ElementId> = elements.iter().map(|e| e.id).collect();
            for layer in &mut self.layers {
                let before = layer.nodes.len();
                layer.nodes.retain(|id, _| current.contains(id));
                stats.removed += before - layer.nodes.len();
            }
            self.index.retain(|id, _| current.contains(id));
        }

        if stats.changed() {
            log::debug!(
                "Reconciled scene: {} created, {} updated, {} unchanged, {} removed",
                stats.created,
                stats.updated,
                stats.unchanged,
                stats.removed
            );
        }
        (stats, requests)
    }

    /// Apply a finished decode if its node is still attached and still
    /// waiting on that ticket.
    pub fn apply_decode(&mut self, result: DecodeResult) -> bool {
        let Some(layer) = self.index.get(&result.element_id).copied() else {
            log::debug!("Dropping decode for detached node {}", result.element_id);
            return false;
        };
        let Some(slot) = self
            .layer_mut(layer)
            .nodes
            .get_mut(&result.element_id)
            .and_then(|node| node.content.image_slot_mut())
        else {
            return false;
        };
        if slot.ticket != result.ticket {
            log::debug!(
                "Dropping stale decode for {} (ticket {}, want {})",
                result.element_id,
                result.ticket,
                slot.ticket
            );
            return false;
        }
        slot.state = match result.outcome {
            Ok(image) => ImageState::Ready(Arc::new(image)),
            Err(e) => {
                log::warn!("Image {} failed to load from {}: {}", result.element_id, slot.url, e);
                ImageState::Error(e.to_string())
            }
        };
        true
    }

    /// Every node back to front, skipping hidden layers.
    pub fn draw_list(&self) -> Vec<(&SceneLayer, &SceneNode)> {
        self.layers
            .iter()
            .filter(|layer| layer.visible)
            .flat_map(|layer| layer.draw_order().into_iter().map(move |node| (layer, node)))
            .collect()
    }

    /// Topmost visible node under `point` in an unlocked, visible layer.
    pub fn hit_test(&self, point: Point) -> Option<ElementId> {
        self.draw_list()
            .into_iter()
            .rev()
            .filter(|(layer, node)| !layer.locked && node.visible)
            .find(|(_, node)| node.transform.contains(point))
            .map(|(_, node)| node.id)
    }
}

/// Clip paths for images that a panel hosts with masking enabled.
fn image_masks(elements: &[Element], associations: &AssociationEngine) -> HashMap<ElementId, BezPath> {
    let mut masks = HashMap::new();
    for (panel_id, association) in associations.associations() {
        if association.association_type != AssociationType::Fitted || !association.mask_enabled {
            continue;
        }
        let Some(image_id) = association.image_id() else {
            continue;
        };
        let Some(panel) = elements.iter().find(|e| e.id == *panel_id) else {
            continue;
        };
        let outline = panel.outline();
        let clip = if panel.transform.rotation.abs() > f64::EPSILON {
            panel.transform.rotation_affine() * outline
        } else {
            outline
        };
        if clip.area().abs() > f64::EPSILON {
            masks.insert(image_id, clip);
        }
    }
    masks
}
