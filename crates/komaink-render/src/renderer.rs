//! Scene renderer: keeps the retained scene in step with the element store.

use crate::images::{AssetResolver, DefaultResolver, ImageLoader};
use crate::overlay::SelectionOverlay;
use crate::scene::{ReconcileStats, Scene};
use crate::surface::RenderSurface;
use image::RgbaImage;
use komaink_core::association::AssociationEngine;
use komaink_core::elements::{ElementId, Layer};
use komaink_core::history::Snapshot;
use komaink_core::Editor;
use kurbo::{Rect, Size};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Renderer errors.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("Initialization failed: {0}")]
    InitFailed(String),
    #[error("Surface error: {0}")]
    Surface(String),
    #[error("Asset unavailable: {0}")]
    Asset(String),
    #[error("Decode failed: {0}")]
    Decode(String),
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RendererError>;

/// Everything the renderer reads from the editor for one frame.
pub struct RenderContext<'a> {
    /// The live element array. Identity changes on every mutation.
    pub elements: Snapshot,
    pub revision: u64,
    pub selection: &'a [ElementId],
    pub associations: &'a AssociationEngine,
    /// In-flight panel drag, in document units.
    pub preview_rect: Option<Rect>,
}

impl<'a> RenderContext<'a> {
    pub fn new(elements: Snapshot, associations: &'a AssociationEngine) -> Self {
        Self {
            elements,
            revision: 0,
            selection: &[],
            associations,
            preview_rect: None,
        }
    }

    /// Capture the editor state for this frame.
    pub fn from_editor(editor: &'a Editor) -> Self {
        Self {
            elements: editor.snapshot(),
            revision: editor.store().revision(),
            selection: editor.selection(),
            associations: editor.associations(),
            preview_rect: editor.preview_rect(),
        }
    }

    pub fn with_selection(mut self, selection: &'a [ElementId], revision: u64) -> Self {
        self.selection = selection;
        self.revision = revision;
        self
    }

    pub fn with_preview_rect(mut self, rect: Option<Rect>) -> Self {
        self.preview_rect = rect;
        self
    }
}

/// Owns the scene, the selection overlay, the image decoder and the surface.
pub struct SceneRenderer {
    scene: Scene,
    overlay: SelectionOverlay,
    loader: ImageLoader,
    surface: RenderSurface,
    last_snapshot: Option<Snapshot>,
}

impl SceneRenderer {
    /// Renderer for a document of `document` units, resolving assets from
    /// `data:` URLs and the local filesystem.
    pub fn new(document: Size) -> RenderResult<Self> {
        Self::with_resolver(document, Arc::new(DefaultResolver::default()))
    }

    pub fn with_resolver(document: Size, resolver: Arc<dyn AssetResolver>) -> RenderResult<Self> {
        Ok(Self {
            scene: Scene::new(),
            overlay: SelectionOverlay::new(),
            loader: ImageLoader::spawn(resolver)?,
            surface: RenderSurface::new(document)?,
            last_snapshot: None,
        })
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn overlay(&self) -> &SelectionOverlay {
        &self.overlay
    }

    pub fn surface(&self) -> &RenderSurface {
        &self.surface
    }

    /// Bring the scene and overlay up to date. Returns reconcile stats when
    /// the element array changed since the last sync.
    pub fn sync(&mut self, ctx: &RenderContext<'_>) -> Option<ReconcileStats> {
        let unchanged = self
            .last_snapshot
            .as_ref()
            .is_some_and(|last| Arc::ptr_eq(last, &ctx.elements));

        let stats = if unchanged {
            None
        } else {
            let (stats, requests) = self.scene.reconcile(&ctx.elements, ctx.associations);
            for request in requests {
                self.loader.request(request);
            }
            self.last_snapshot = Some(Arc::clone(&ctx.elements));
            Some(stats)
        };

        self.overlay.update(&ctx.elements, ctx.selection, ctx.revision);
        self.overlay.set_preview(ctx.preview_rect);
        self.pump_decodes();
        stats
    }

    /// Apply any finished decodes. Returns how many landed on a live node.
    pub fn pump_decodes(&mut self) -> usize {
        let results = self.loader.poll();
        results.into_iter().map(|r| self.scene.apply_decode(r)).filter(|applied| *applied).count()
    }

    /// Block until every requested decode has finished or `timeout` passes.
    /// Returns how many results landed on a live node.
    pub fn wait_for_decodes(&mut self, timeout: Duration) -> usize {
        let results = self.loader.wait(timeout);
        results.into_iter().map(|r| self.scene.apply_decode(r)).filter(|applied| *applied).count()
    }

    pub fn pending_decodes(&self) -> usize {
        self.loader.pending()
    }

    /// Advance cosmetic animation.
    pub fn tick(&mut self, dt: f64) {
        self.overlay.tick(dt);
    }

    pub fn set_layer_visible(&mut self, layer: Layer, visible: bool) {
        self.scene.set_layer_visible(layer, visible);
    }

    pub fn set_layer_opacity(&mut self, layer: Layer, opacity: f64) {
        self.scene.set_layer_opacity(layer, opacity);
    }

    pub fn set_layer_locked(&mut self, layer: Layer, locked: bool) {
        self.scene.set_layer_locked(layer, locked);
    }

    /// Draw the full frame, overlay included.
    pub fn render(&mut self) -> &RenderSurface {
        self.surface.render(&self.scene, Some(&self.overlay));
        &self.surface
    }

    /// Read back document pixels for export. The UI layer and selection
    /// overlay are left out.
    pub fn capture(&mut self) -> RgbaImage {
        self.pump_decodes();
        self.surface.capture(&self.scene)
    }
}
