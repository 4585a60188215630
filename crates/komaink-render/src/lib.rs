//! KomaInk Render Library
//!
//! Retained-mode scene kept in step with the element store, a selection
//! overlay, background image decoding, and a CPU surface for pixel capture.

pub mod images;
pub mod overlay;
mod renderer;
pub mod scene;
pub mod surface;

pub use images::{AssetResolver, DefaultResolver, ImageLoader, ImageState};
pub use overlay::SelectionOverlay;
pub use renderer::{RenderContext, RenderResult, RendererError, SceneRenderer};
pub use scene::{NodeContent, ReconcileStats, Scene, SceneNode};
pub use surface::{RenderSurface, SurfaceStyle};
