//! KomaInk Core Library
//!
//! Document model, tools, history and panel/image associations for the
//! KomaInk manga page editor. Rendering lives in `komaink-render`.

pub mod association;
pub mod camera;
pub mod config;
pub mod editor;
pub mod elements;
pub mod error;
pub mod history;
pub mod input;
pub mod page;
pub mod rng;
pub mod selection;
pub mod shortcuts;
pub mod storage;
pub mod store;
pub mod tools;

pub use association::{Association, AssociationEngine, AssociationType};
pub use camera::{ViewTransform, Viewport};
pub use config::{ConfigError, EditorConfig};
pub use editor::Editor;
pub use elements::{BubbleType, DropPayload, Element, ElementId, ElementKind, ElementPatch, Layer};
pub use error::PlacementError;
pub use history::{History, Snapshot};
pub use input::{Key, Modifiers, PointerButton, PointerInput};
pub use page::{PageBook, PageDocument, PageId};
pub use shortcuts::{ShortcutAction, ShortcutRegistry};
pub use store::{ChangeCause, ElementStore, IdGenerator, RandomIds, SequentialIds, StoreEvent};
pub use tools::{GestureOutcome, ToolController, ToolKind};
