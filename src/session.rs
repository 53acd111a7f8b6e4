// session.rs - Viewer session controller
//
//   Main(no file) -> Main(file staged) -> FullViewer -> Main(file staged) ...
//
// Picks the backend for the staged file and drives it through open/close.
// Owns at most one SceneEngine, created on open and disposed on close. Errors
// stop here: user-facing ones become notices, stale loads vanish.

use crate::config::ViewerConfig;
use crate::engine::{Container, LoadSummary, LoadTicket, SceneEngine};
use crate::error::ViewerError;
use crate::format::{self, MeshFormat, RendererBackend, UploadedFile};
use crate::render::SurfaceFactory;
use crate::viewer::{DeclarativeViewer, ViewerElement};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Main,
    Viewer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NoFile,
    Staged(RendererBackend),
    FullViewer(RendererBackend),
}

/// Page chrome the session drives.
pub trait SessionUi {
    fn notify(&self, message: &str);
    fn set_open_enabled(&self, enabled: bool);
    fn set_loading(&self, loading: bool);
    fn set_progress(&self, percent: u8);
    fn show_screen(&self, screen: Screen);
}

struct Staged {
    file: UploadedFile,
    format: MeshFormat,
}

pub struct ViewerSession<E: ViewerElement, U: SessionUi, F: SurfaceFactory> {
    config: ViewerConfig,
    adapter: DeclarativeViewer<E>,
    ui: U,
    factory: F,
    staged: Option<Staged>,
    viewing: Option<RendererBackend>,
    engine: Option<SceneEngine>,
    auto_rotate: bool,
}

impl<E: ViewerElement, U: SessionUi, F: SurfaceFactory> ViewerSession<E, U, F> {
    pub fn new(config: ViewerConfig, adapter: DeclarativeViewer<E>, ui: U, factory: F) -> Self {
        ui.set_open_enabled(false);
        Self { config, adapter, ui, factory, staged: None, viewing: None, engine: None, auto_rotate: false }
    }

    pub fn state(&self) -> SessionState {
        match (self.viewing, &self.staged) {
            (Some(backend), _) => SessionState::FullViewer(backend),
            (None, Some(s)) => SessionState::Staged(s.format.backend()),
            (None, None) => SessionState::NoFile,
        }
    }

    pub fn staged_file(&self) -> Option<&UploadedFile> {
        self.staged.as_ref().map(|s| &s.file)
    }

    pub fn engine(&self) -> Option<&SceneEngine> {
        self.engine.as_ref()
    }

    pub fn ui(&self) -> &U {
        &self.ui
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    fn report(&self, err: &ViewerError) {
        if err.is_user_facing() {
            self.ui.notify(&err.to_string());
        }
    }

    /// Classify and stage a file, showing its preview.
    pub fn stage_file(&mut self, file: UploadedFile) -> Result<RendererBackend, ViewerError> {
        if self.viewing.is_some() {
            return Err(ViewerError::InvalidState { op: "stage_file", state: "FullViewer" });
        }

        let format = match format::detect(&file.name) {
            Ok(f) => f,
            Err(e) => {
                tracing::info!(name = %file.name, "Rejected upload");
                self.staged = None;
                self.ui.set_open_enabled(false);
                self.report(&e);
                return Err(e);
            }
        };

        let backend = format.backend();
        match backend {
            RendererBackend::DeclarativeViewer => self.adapter.load_preview(&file),
            RendererBackend::ManualScene => self.adapter.show_manual_preview(),
        }
        tracing::info!(name = %file.name, ?backend, "Staged file");
        self.staged = Some(Staged { file, format });
        self.ui.set_open_enabled(true);
        Ok(backend)
    }

    /// Switch to the full viewer. For manual-scene files the returned ticket
    /// identifies the load the host must now transfer.
    pub fn open_viewer(&mut self, container: Container) -> Result<Option<LoadTicket>, ViewerError> {
        if self.viewing.is_some() {
            return Err(ViewerError::InvalidState { op: "open_viewer", state: "FullViewer" });
        }
        let Some(staged) = self.staged.as_ref() else {
            return Err(ViewerError::InvalidState { op: "open_viewer", state: "NoFile" });
        };
        let (file, format) = (staged.file.clone(), staged.format);

        self.ui.set_loading(true);
        self.ui.show_screen(Screen::Viewer);

        match format.backend() {
            RendererBackend::DeclarativeViewer => {
                self.adapter.open_full(&file);
                self.adapter.toggle_auto_rotate(self.auto_rotate);
                self.ui.set_loading(false);
                self.viewing = Some(RendererBackend::DeclarativeViewer);
                Ok(None)
            }
            RendererBackend::ManualScene => {
                if let Some(mut old) = self.engine.take() {
                    old.dispose();
                }
                match self.start_engine(container, &file, format) {
                    Ok((engine, ticket)) => {
                        self.engine = Some(engine);
                        self.viewing = Some(RendererBackend::ManualScene);
                        Ok(Some(ticket))
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Could not open viewer");
                        self.ui.set_loading(false);
                        self.ui.show_screen(Screen::Main);
                        self.report(&e);
                        Err(e)
                    }
                }
            }
        }
    }

    fn start_engine(
        &mut self,
        container: Container,
        file: &UploadedFile,
        format: MeshFormat,
    ) -> Result<(SceneEngine, LoadTicket), ViewerError> {
        let mut engine = SceneEngine::new(self.config.clone());
        engine.initialize(container, &mut self.factory)?;
        engine.set_auto_rotate(self.auto_rotate);
        let ticket = engine.begin_load(&file.source, format)?;
        Ok((engine, ticket))
    }

    pub fn load_progress(&mut self, ticket: LoadTicket, loaded: u64, total: u64) {
        if let Some(pct) = self.engine.as_mut().and_then(|e| e.report_progress(ticket, loaded, total)) {
            self.ui.set_progress(pct);
        }
    }

    pub fn load_complete(&mut self, ticket: LoadTicket, bytes: &[u8]) -> Result<LoadSummary, ViewerError> {
        let result = match self.engine.as_mut() {
            Some(engine) => engine.complete_load(ticket, bytes),
            None => Err(ViewerError::StaleLoad { generation: ticket.generation }),
        };
        self.finish_load(result)
    }

    pub fn load_failed(&mut self, ticket: LoadTicket, reason: &str) -> ViewerError {
        let err = match self.engine.as_mut() {
            Some(engine) => engine.fail_load(ticket, reason),
            None => ViewerError::StaleLoad { generation: ticket.generation },
        };
        self.contain(&err);
        err
    }

    fn finish_load(&mut self, result: Result<LoadSummary, ViewerError>) -> Result<LoadSummary, ViewerError> {
        match &result {
            Ok(_) => self.ui.set_loading(false),
            Err(e) => self.contain(e),
        }
        result
    }

    /// Stale loads belong to a viewer that no longer exists; drop them quietly.
    fn contain(&self, err: &ViewerError) {
        if matches!(err, ViewerError::StaleLoad { .. }) {
            return;
        }
        self.ui.set_loading(false);
        self.report(err);
    }

    pub fn toggle_auto_rotate(&mut self, enabled: bool) {
        self.auto_rotate = enabled;
        match self.viewing {
            Some(RendererBackend::DeclarativeViewer) => self.adapter.toggle_auto_rotate(enabled),
            Some(RendererBackend::ManualScene) => {
                if let Some(engine) = self.engine.as_mut() {
                    engine.set_auto_rotate(enabled);
                }
            }
            None => {}
        }
    }

    pub fn reset_camera(&mut self) {
        match self.viewing {
            Some(RendererBackend::DeclarativeViewer) => self.adapter.reset_camera(),
            Some(RendererBackend::ManualScene) => {
                if let Some(engine) = self.engine.as_mut() {
                    engine.reset_camera();
                }
            }
            None => {}
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if let Some(engine) = self.engine.as_mut() {
            engine.resize(width, height);
        }
    }

    pub fn rotate(&mut self, dx: f32, dy: f32, viewport_height: f32) {
        if let Some(engine) = self.engine.as_mut() {
            engine.rotate(dx, dy, viewport_height);
        }
    }

    pub fn zoom(&mut self, steps: f32) {
        if let Some(engine) = self.engine.as_mut() {
            engine.zoom(steps);
        }
    }

    pub fn pan(&mut self, dx: f32, dy: f32, viewport_height: f32) {
        if let Some(engine) = self.engine.as_mut() {
            engine.pan(dx, dy, viewport_height);
        }
    }

    /// Render-loop step; false when no manual scene is live.
    pub fn tick(&mut self, now_ms: f64) -> bool {
        self.engine.as_mut().is_some_and(|e| e.tick(now_ms))
    }

    /// Back to the main screen, tearing down the manual scene if one is open.
    pub fn close_viewer(&mut self) {
        let Some(backend) = self.viewing.take() else { return };
        self.ui.show_screen(Screen::Main);
        self.ui.set_loading(false);
        match backend {
            RendererBackend::ManualScene => {
                if let Some(mut engine) = self.engine.take() {
                    engine.dispose();
                }
            }
            RendererBackend::DeclarativeViewer => self.adapter.clear(),
        }
        tracing::info!(?backend, "Viewer closed");
    }
}
