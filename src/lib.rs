// meshview-engine - 3D model preview and viewing
//
// Two renderers sit behind one session:
//   - glTF/GLB/OBJ go to an embedded model-viewing element (viewer)
//   - STL/FBX are parsed here and drawn through a managed scene (engine)
//
// Everything outside web/ is host-agnostic; web/ binds it to the browser.

pub mod config;
pub mod engine;
pub mod error;
pub mod format;
pub mod lighting;
pub mod loaders;
pub mod render;
pub mod scene;
pub mod session;
pub mod viewer;

#[cfg(target_arch = "wasm32")]
pub mod web;

pub use config::ViewerConfig;
pub use engine::{Container, EngineState, LoadSummary, LoadTicket, SceneEngine};
pub use error::{ParseError, ViewerError};
pub use format::{classify, MeshFormat, RendererBackend, UploadedFile};
pub use render::{HeadlessFactory, RenderSurface, SurfaceFactory};
pub use session::{Screen, SessionState, SessionUi, ViewerSession};
pub use viewer::{DeclarativeViewer, MemoryElement, ViewerElement};
