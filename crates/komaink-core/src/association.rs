//! Panel–image association.
//!
//! Links images to the panel that frames them. The link map is derived from
//! element geometry and `parent_panel_id` back-references; it is rebuilt by
//! [`AssociationEngine::reevaluate`] and never drives geometry itself.

use crate::config::EditorConfig;
use crate::elements::{DropPayload, Element, ElementId, ElementPatch, ImageStyle, Metadata};
use crate::error::PlacementError;
use crate::store::{Batch, ElementStore};
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use uuid::Uuid;

/// How an image came to be linked with a panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssociationType {
    /// Explicitly hosted via drop; the image is fitted to the panel.
    Fitted,
    /// Image overlaps the panel above the coverage threshold.
    Overlapping,
}

/// Link between a panel and the image it frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Association {
    /// At most one entry.
    pub image_ids: Vec<ElementId>,
    pub association_type: AssociationType,
    pub mask_enabled: bool,
}

impl Association {
    pub fn image_id(&self) -> Option<ElementId> {
        self.image_ids.first().copied()
    }
}

/// Coverage of one image by a panel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverageCandidate {
    pub image_id: ElementId,
    /// Percentage of the image area inside the panel (0-100).
    pub coverage: f64,
    /// Above the coverage threshold.
    pub significant: bool,
}

/// Changes made by a re-evaluation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssociationDelta {
    /// Panels whose association was created or changed.
    pub linked: Vec<ElementId>,
    /// Panels that lost their association.
    pub unlinked: Vec<ElementId>,
}

impl AssociationDelta {
    pub fn is_empty(&self) -> bool {
        self.linked.is_empty() && self.unlinked.is_empty()
    }
}

/// Percentage of `image` covered by `panel`.
pub fn coverage_percent(image: Rect, panel: Rect) -> f64 {
    let image_area = image.area();
    if image_area <= 0.0 {
        return 0.0;
    }
    let overlap = image.intersect(panel);
    if overlap.width() <= 0.0 || overlap.height() <= 0.0 {
        return 0.0;
    }
    overlap.area() / image_area * 100.0
}

/// Whether `point` lies strictly inside `rect` (edges excluded).
fn strictly_contains(rect: Rect, point: Point) -> bool {
    point.x > rect.x0 && point.x < rect.x1 && point.y > rect.y0 && point.y < rect.y1
}

/// Maintains the panel → image map and performs hosting side effects.
#[derive(Debug, Clone)]
pub struct AssociationEngine {
    associations: BTreeMap<ElementId, Association>,
    coverage_threshold: f64,
    hosted_fill_opacity: f64,
    restore_fill_on_unhost: bool,
}

impl Default for AssociationEngine {
    fn default() -> Self {
        Self::new(&EditorConfig::default())
    }
}

impl AssociationEngine {
    pub fn new(config: &EditorConfig) -> Self {
        Self {
            associations: BTreeMap::new(),
            coverage_threshold: config.coverage_threshold,
            hosted_fill_opacity: config.hosted_fill_opacity,
            restore_fill_on_unhost: config.restore_fill_on_unhost,
        }
    }

    pub fn get(&self, panel_id: ElementId) -> Option<&Association> {
        self.associations.get(&panel_id)
    }

    pub fn associations(&self) -> impl Iterator<Item = (&ElementId, &Association)> {
        self.associations.iter()
    }

    pub fn len(&self) -> usize {
        self.associations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.associations.is_empty()
    }

    /// Image linked to `panel_id`, if any.
    pub fn image_for(&self, panel_id: ElementId) -> Option<ElementId> {
        self.get(panel_id).and_then(Association::image_id)
    }

    /// Coverage of every image by the panel, best first.
    pub fn detect_images_under_panel(&self, elements: &[Element], panel_id: ElementId) -> Vec<CoverageCandidate> {
        let Some(panel) = elements.iter().find(|e| e.id == panel_id && e.is_panel()) else {
            return Vec::new();
        };
        let panel_rect = panel.bounds();
        let mut candidates: Vec<CoverageCandidate> = elements
            .iter()
            .filter(|e| e.is_image())
            .map(|image| {
                let coverage = coverage_percent(image.bounds(), panel_rect);
                CoverageCandidate {
                    image_id: image.id,
                    coverage,
                    significant: coverage > self.coverage_threshold,
                }
            })
            .filter(|c| c.coverage > 0.0)
            .collect();
        candidates.sort_by(|a, b| b.coverage.total_cmp(&a.coverage));
        candidates
    }

    /// Topmost visible panel whose bounds strictly contain `point`.
    pub fn panel_at(elements: &[Element], point: Point) -> Option<ElementId> {
        elements
            .iter()
            .enumerate()
            .filter(|(_, e)| e.is_panel() && e.properties.visible && strictly_contains(e.bounds(), point))
            .max_by_key(|(i, e)| (e.transform.z_index, *i))
            .map(|(_, e)| e.id)
    }

    /// Rebuild the map from the current elements.
    ///
    /// An image whose `parent_panel_id` names a panel is that panel's fitted
    /// image. Panels without one take their best significant overlapping
    /// image that has no parent of its own.
    pub fn reevaluate(&mut self, elements: &[Element]) -> AssociationDelta {
        let mut next: BTreeMap<ElementId, Association> = BTreeMap::new();
        let panel_ids: HashSet<ElementId> = elements.iter().filter(|e| e.is_panel()).map(|e| e.id).collect();

        for image in elements.iter().filter(|e| e.is_image()) {
            if let Some(parent) = image.parent_panel_id() {
                if panel_ids.contains(&parent) && !next.contains_key(&parent) {
                    next.insert(
                        parent,
                        Association {
                            image_ids: vec![image.id],
                            association_type: AssociationType::Fitted,
                            mask_enabled: true,
                        },
                    );
                }
            }
        }

        for panel in elements.iter().filter(|e| e.is_panel()) {
            if next.contains_key(&panel.id) {
                continue;
            }
            let best = self
                .detect_images_under_panel(elements, panel.id)
                .into_iter()
                .filter(|c| c.significant)
                .find(|c| {
                    elements
                        .iter()
                        .any(|e| e.id == c.image_id && e.parent_panel_id().is_none())
                });
            if let Some(candidate) = best {
                next.insert(
                    panel.id,
                    Association {
                        image_ids: vec![candidate.image_id],
                        association_type: AssociationType::Overlapping,
                        mask_enabled: false,
                    },
                );
            }
        }

        let mut delta = AssociationDelta::default();
        for (panel_id, association) in &next {
            if self.associations.get(panel_id) != Some(association) {
                delta.linked.push(*panel_id);
            }
        }
        for panel_id in self.associations.keys() {
            if !next.contains_key(panel_id) {
                delta.unlinked.push(*panel_id);
            }
        }
        if !delta.is_empty() {
            log::debug!("Associations: {} linked, {} unlinked", delta.linked.len(), delta.unlinked.len());
        }
        self.associations = next;
        delta
    }

    /// Drop an image at `point`.
    ///
    /// Accepted only strictly inside a panel. The image is fitted exactly to
    /// the panel, replaces the image the panel already hosts (not images
    /// that merely overlap it), and the panel
    /// fill goes near-transparent. All of it is one undo step. The new image
    /// is selected.
    pub fn drop_image(
        &mut self,
        store: &mut ElementStore,
        payload: &DropPayload,
        point: Point,
    ) -> Result<ElementId, PlacementError> {
        let Some(panel_id) = Self::panel_at(store.elements(), point) else {
            log::debug!("Image drop at ({:.1}, {:.1}) outside every panel", point.x, point.y);
            return Err(PlacementError::OutsidePanel);
        };
        let panel_rect = store.get(panel_id).map(Element::bounds).ok_or(PlacementError::OutsidePanel)?;

        // Only hosted images are replaced. An image that merely overlaps the
        // panel was placed by hand and stays.
        let previous: Vec<ElementId> = store
            .elements()
            .iter()
            .filter(|e| e.is_image() && e.parent_panel_id() == Some(panel_id))
            .map(|e| e.id)
            .collect();

        let z_index = store.next_z_index();
        let hosted_opacity = self.hosted_fill_opacity;
        let image = Element::image(Uuid::nil(), panel_rect, ImageStyle::from_payload(payload))
            .with_z(z_index)
            .with_metadata(Metadata {
                parent_panel_id: Some(panel_id),
                source: Some(payload.image_url.clone()),
                created_by: Some("drop".to_string()),
            });

        let image_id = store.batch(|tx| {
            for id in &previous {
                tx.remove(*id);
            }
            let id = tx.add(image);
            tx.modify(panel_id, |panel| {
                if let Some(style) = panel.as_panel_mut() {
                    style.host_image(hosted_opacity);
                }
            });
            id
        });
        store.select(image_id);
        log::debug!("Image {} hosted by panel {} (replaced {})", image_id, panel_id, previous.len());
        self.reevaluate(store.elements());
        Ok(image_id)
    }

    /// Clean up after `removed` elements inside a batch.
    ///
    /// Images hosted by a removed panel lose their back-reference. Panels
    /// that lost their hosted image get their fill back when configured.
    pub fn cascade_removal(&self, tx: &mut Batch<'_>, removed: &[Element]) {
        let removed_ids: HashSet<ElementId> = removed.iter().map(|e| e.id).collect();

        let orphans: Vec<ElementId> = tx
            .elements()
            .iter()
            .filter(|e| e.parent_panel_id().is_some_and(|p| removed_ids.contains(&p)))
            .map(|e| e.id)
            .collect();
        for id in orphans {
            tx.update(id, &ElementPatch::new().parent_panel(None));
        }

        if !self.restore_fill_on_unhost {
            return;
        }
        for image in removed.iter().filter(|e| e.is_image()) {
            let Some(panel_id) = image.parent_panel_id() else {
                continue;
            };
            let still_hosting = tx
                .elements()
                .iter()
                .any(|e| e.is_image() && e.parent_panel_id() == Some(panel_id));
            if !still_hosting {
                tx.modify(panel_id, |panel| {
                    if let Some(style) = panel.as_panel_mut() {
                        style.unhost_image();
                    }
                });
            }
        }
    }
}
