// engine/ - Manual scene engine
//
// Owns the one SceneState for STL/FBX viewing:
//
//   Uninitialized -> Initialized -> ModelLoading -> ModelReady -> Disposed
//
// Loads are split into begin/progress/complete so the host can do the
// transfer. Every begin bumps a generation; completions carrying an older
// generation are discarded without touching the scene.

mod framing;

pub use framing::Framing;

use std::sync::atomic::{AtomicU64, Ordering};

use glam::Vec3;

use crate::config::ViewerConfig;
use crate::error::ViewerError;
use crate::format::MeshFormat;
use crate::lighting::{self, LightingRig, SpotlightCage};
use crate::loaders::{self, LoadProgress, ProgressTracker};
use crate::render::{FrameEncoder, ModelBuffers, RenderSurface, SurfaceFactory};
use crate::scene::{Aabb, NodeId, NodeKind, OrbitControls, PerspectiveCamera, Scene};

/// Frame deltas above this are treated as a stall, not elapsed animation time.
const MAX_FRAME_DT: f32 = 0.1;

/// Shared by all engines so a ticket from a disposed engine never matches
/// a load in its successor.
static GENERATIONS: AtomicU64 = AtomicU64::new(1);

fn next_generation() -> u64 {
    GENERATIONS.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    Initialized,
    ModelLoading,
    ModelReady,
    Disposed,
}

impl EngineState {
    pub fn name(self) -> &'static str {
        match self {
            Self::Uninitialized => "Uninitialized",
            Self::Initialized => "Initialized",
            Self::ModelLoading => "ModelLoading",
            Self::ModelReady => "ModelReady",
            Self::Disposed => "Disposed",
        }
    }
}

/// Pixel size of the element the viewer fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Container {
    pub width: u32,
    pub height: u32,
}

/// Identifies one `begin_load` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    pub generation: u64,
}

/// Outcome of a successful load.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadSummary {
    pub triangles: usize,
    pub framing: Framing,
}

struct PendingLoad {
    generation: u64,
    format: MeshFormat,
    progress: ProgressTracker,
}

/// Everything that exists while a manual-scene viewer is open.
pub struct SceneState {
    scene: Scene,
    camera: PerspectiveCamera,
    surface: Box<dyn RenderSurface>,
    controls: OrbitControls,
    model: Option<NodeId>,
    rig: LightingRig,
    cage: SpotlightCage,
    auto_rotate: bool,
    last_frame_ms: Option<f64>,
    /// Seconds of auto-rotate time driving the point-light orbit
    light_clock: f32,
    encoder: FrameEncoder,
}

impl SceneState {
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn camera(&self) -> &PerspectiveCamera {
        &self.camera
    }

    pub fn controls(&self) -> &OrbitControls {
        &self.controls
    }

    pub fn model(&self) -> Option<NodeId> {
        self.model
    }

    pub fn rig(&self) -> &LightingRig {
        &self.rig
    }

    pub fn cage(&self) -> &SpotlightCage {
        &self.cage
    }

    pub fn auto_rotate(&self) -> bool {
        self.auto_rotate
    }

    /// Last encoded frame.
    pub fn frame(&self) -> (*const f32, usize) {
        (self.encoder.ptr(), self.encoder.len())
    }

    /// Drop the resident model and the cage placed around it.
    fn remove_model(&mut self) {
        if let Some(id) = self.model.take() {
            self.scene.remove(id);
            self.surface.clear_model();
        }
        self.cage.clear(&mut self.scene);
    }
}

pub struct SceneEngine {
    config: ViewerConfig,
    phase: EngineState,
    state: Option<SceneState>,
    generation: u64,
    pending: Option<PendingLoad>,
}

impl SceneEngine {
    pub fn new(config: ViewerConfig) -> Self {
        Self { config, phase: EngineState::Uninitialized, state: None, generation: 0, pending: None }
    }

    pub fn phase(&self) -> EngineState {
        self.phase
    }

    pub fn state(&self) -> Option<&SceneState> {
        self.state.as_ref()
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    fn invalid(&self, op: &'static str) -> ViewerError {
        ViewerError::InvalidState { op, state: self.phase.name() }
    }

    /// Build scene, camera, surface, controls and the light rig.
    pub fn initialize(&mut self, container: Container, factory: &mut dyn SurfaceFactory) -> Result<(), ViewerError> {
        if !matches!(self.phase, EngineState::Uninitialized | EngineState::Disposed) {
            return Err(self.invalid("initialize"));
        }

        let mut surface = factory.create(container.width, container.height)?;
        surface.set_size(container.width, container.height);
        surface.watch_resize();

        let cam_cfg = &self.config.camera;
        let mut camera = PerspectiveCamera::new(cam_cfg.fov_deg, 1.0, cam_cfg.near, cam_cfg.far);
        camera.set_viewport(container.width, container.height);
        camera.position = Vec3::new(0.0, 0.0, cam_cfg.initial_distance);
        camera.look_at(Vec3::ZERO);
        let controls = OrbitControls::new(&camera, &self.config.controls);

        let mut scene = Scene::new();
        let rig = lighting::build_rig(&mut scene, &self.config.rig);

        self.state = Some(SceneState {
            scene,
            camera,
            surface,
            controls,
            model: None,
            rig,
            cage: SpotlightCage::default(),
            auto_rotate: false,
            last_frame_ms: None,
            light_clock: 0.0,
            encoder: FrameEncoder::new(),
        });
        self.pending = None;
        self.phase = EngineState::Initialized;
        tracing::info!(width = container.width, height = container.height, "Scene engine initialized");
        Ok(())
    }

    /// Viewport changed: new aspect and surface size.
    pub fn resize(&mut self, width: u32, height: u32) {
        if let Some(st) = self.state.as_mut() {
            st.camera.set_viewport(width, height);
            st.surface.set_size(width, height);
        }
    }

    /// Start loading a model, superseding any load in flight.
    pub fn begin_load(&mut self, url: &str, format: MeshFormat) -> Result<LoadTicket, ViewerError> {
        if !matches!(self.phase, EngineState::Initialized | EngineState::ModelReady | EngineState::ModelLoading) {
            return Err(self.invalid("load_model"));
        }
        if loaders::loader_for(format).is_none() {
            return Err(ViewerError::UnsupportedFormat { filename: url.to_string() });
        }
        let Some(st) = self.state.as_mut() else {
            return Err(self.invalid("load_model"));
        };

        st.remove_model();
        if let Some(old) = self.pending.take() {
            tracing::debug!(superseded = old.generation, "Superseding in-flight load");
        }

        self.generation = next_generation();
        self.pending = Some(PendingLoad { generation: self.generation, format, progress: ProgressTracker::default() });
        self.phase = EngineState::ModelLoading;
        tracing::info!(url, format = format.extension(), generation = self.generation, "Loading model");
        Ok(LoadTicket { generation: self.generation })
    }

    fn pending_for(&mut self, ticket: LoadTicket) -> Option<&mut PendingLoad> {
        self.pending.as_mut().filter(|p| p.generation == ticket.generation)
    }

    /// Transfer progress as a whole percent, or `None` when stale or unknown.
    pub fn report_progress(&mut self, ticket: LoadTicket, loaded: u64, total: u64) -> Option<u8> {
        self.pending_for(ticket)?.progress.update(LoadProgress { loaded, total })
    }

    /// Parse and install the model for `ticket`.
    pub fn complete_load(&mut self, ticket: LoadTicket, bytes: &[u8]) -> Result<LoadSummary, ViewerError> {
        let Some(pending) = self.pending_for(ticket).map(|p| p.format) else {
            tracing::debug!(generation = ticket.generation, "Discarding stale load completion");
            return Err(ViewerError::StaleLoad { generation: ticket.generation });
        };
        self.pending = None;

        let parsed = loaders::loader_for(pending)
            .ok_or(ViewerError::UnsupportedFormat { filename: pending.extension().to_string() })
            .and_then(|loader| loader.parse(bytes).map_err(ViewerError::from));

        self.phase = EngineState::ModelReady;
        let model = match parsed {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(error = %e, "Model load failed");
                return Err(e);
            }
        };

        let Some(st) = self.state.as_mut() else {
            return Err(self.invalid("complete_load"));
        };
        let triangles = model.triangle_count();
        let buffers = ModelBuffers::from_model(&model);
        st.model = Some(st.scene.add("model", Vec3::ZERO, NodeKind::Model(model)));

        // Recenter and frame first so the cage is placed around the final position.
        let framing = self.frame_camera().ok_or_else(|| self.invalid("frame_camera"))?;
        self.rebuild_cage();
        if let Some(st) = self.state.as_mut() {
            st.surface.upload_model(&buffers);
        }

        tracing::info!(triangles, distance = framing.distance, "Model ready");
        Ok(LoadSummary { triangles, framing })
    }

    /// Transfer failed on the host side.
    pub fn fail_load(&mut self, ticket: LoadTicket, reason: &str) -> ViewerError {
        if self.pending_for(ticket).is_none() {
            tracing::debug!(generation = ticket.generation, "Discarding stale load failure");
            return ViewerError::StaleLoad { generation: ticket.generation };
        }
        self.pending = None;
        self.phase = EngineState::ModelReady;
        tracing::warn!(reason, "Model transfer failed");
        ViewerError::LoadFailure(reason.to_string())
    }

    /// Move the model to the origin and fit the camera around it.
    pub fn frame_camera(&mut self) -> Option<Framing> {
        let st = self.state.as_mut()?;
        let id = st.model?;
        let bounds = st.scene.model_bounds(id)?;
        let framing = framing::compute(&bounds, st.camera.fov_deg, &self.config.framing);

        if let Some(node) = st.scene.get_mut(id) {
            node.position -= framing.center;
        }
        st.camera.near = framing.near;
        st.camera.far = framing.far;
        st.camera.position = Vec3::new(0.0, 0.0, framing.distance);
        st.camera.look_at(Vec3::ZERO);
        st.controls.target = Vec3::ZERO;
        st.controls.save_state(&st.camera);
        st.controls.reset(&mut st.camera);
        Some(framing)
    }

    fn rebuild_cage(&mut self) {
        let Some(st) = self.state.as_mut() else { return };
        let bounds = st.model.and_then(|id| st.scene.model_bounds(id)).unwrap_or(Aabb::EMPTY);
        if bounds.is_empty() {
            st.cage.clear(&mut st.scene);
            return;
        }
        let mut previous = std::mem::take(&mut st.cage);
        st.cage = lighting::build_spotlight_cage(&mut st.scene, &mut previous, &bounds, &self.config.cage);
    }

    /// Back to the saved orbit pose. Lights are left alone.
    pub fn reset_camera(&mut self) {
        if let Some(st) = self.state.as_mut() {
            st.controls.reset(&mut st.camera);
        }
    }

    pub fn set_auto_rotate(&mut self, enabled: bool) {
        if let Some(st) = self.state.as_mut() {
            st.auto_rotate = enabled;
            st.controls.auto_rotate = enabled;
        }
    }

    pub fn rotate(&mut self, dx: f32, dy: f32, viewport_height: f32) {
        if let Some(st) = self.state.as_mut() {
            st.controls.rotate(dx, dy, viewport_height);
        }
    }

    pub fn zoom(&mut self, steps: f32) {
        if let Some(st) = self.state.as_mut() {
            st.controls.zoom(steps);
        }
    }

    pub fn pan(&mut self, dx: f32, dy: f32, viewport_height: f32) {
        if let Some(st) = self.state.as_mut() {
            st.controls.pan(dx, dy, viewport_height, &st.camera);
        }
    }

    /// One render-loop iteration. Returns false once there is nothing to draw,
    /// which ends the host's loop.
    pub fn tick(&mut self, now_ms: f64) -> bool {
        let Some(st) = self.state.as_mut() else { return false };

        let dt = match st.last_frame_ms {
            Some(last) => (((now_ms - last) / 1000.0) as f32).clamp(0.0, MAX_FRAME_DT),
            None => 0.0,
        };
        st.last_frame_ms = Some(now_ms);

        st.controls.update(&mut st.camera, dt);
        if st.auto_rotate {
            st.light_clock += dt;
            lighting::animate_point_light(&mut st.scene, &st.rig, &self.config.rig, st.light_clock);
        }

        let frame = st.encoder.encode(&st.scene, &st.camera, st.model);
        st.surface.render(frame);
        true
    }

    /// Release the surface and drop all scene state. Safe to repeat.
    pub fn dispose(&mut self) {
        if self.phase == EngineState::Disposed {
            return;
        }
        if let Some(mut st) = self.state.take() {
            st.surface.unwatch_resize();
            st.surface.clear_model();
            st.surface.release();
        }
        if self.pending.take().is_some() {
            tracing::debug!("Disposed with a load in flight");
        }
        // Anything still in flight now carries an old generation.
        self.generation = next_generation();
        self.phase = EngineState::Disposed;
        tracing::info!("Scene engine disposed");
    }
}

impl Drop for SceneEngine {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loaders::box_stl;
    use crate::render::{HeadlessFactory, HEADER_LEN};
    use crate::scene::LightRole;
    use approx::assert_relative_eq;

    const CONTAINER: Container = Container { width: 800, height: 600 };

    fn ready_engine() -> (SceneEngine, HeadlessFactory) {
        let mut factory = HeadlessFactory::new();
        let mut engine = SceneEngine::new(ViewerConfig::default());
        engine.initialize(CONTAINER, &mut factory).unwrap();
        (engine, factory)
    }

    fn load(engine: &mut SceneEngine, min: Vec3, max: Vec3) -> LoadSummary {
        let ticket = engine.begin_load("blob:model", MeshFormat::Stl).unwrap();
        engine.complete_load(ticket, &box_stl(min, max)).unwrap()
    }

    fn spot_count(engine: &SceneEngine) -> usize {
        engine.state().unwrap().scene().count_lights(LightRole::Cage)
    }

    fn model_count(engine: &SceneEngine) -> usize {
        engine.state().unwrap().scene().models().count()
    }

    #[test]
    fn initialize_builds_fresh_state() {
        let (engine, factory) = ready_engine();
        let st = engine.state().unwrap();
        assert_eq!(engine.phase(), EngineState::Initialized);
        assert_eq!(st.scene().count_lights(LightRole::Rig), 3);
        assert_eq!(spot_count(&engine), 0);
        assert!(st.model().is_none());
        assert_relative_eq!(st.camera().aspect, 800.0 / 600.0);
        assert_eq!(st.camera().fov_deg, 75.0);
        assert_eq!(st.controls().damping_factor, 0.05);

        let log = factory.log();
        assert_eq!(log.live(), 1);
        assert_eq!(log.resize_watchers, 1);
    }

    #[test]
    fn context_failure_is_fatal_for_initialize() {
        let mut engine = SceneEngine::new(ViewerConfig::default());
        let err = engine.initialize(CONTAINER, &mut HeadlessFactory::unavailable()).unwrap_err();
        assert!(matches!(err, ViewerError::ContextCreation(_)));
        assert_eq!(engine.phase(), EngineState::Uninitialized);
        assert!(engine.state().is_none());
    }

    #[test]
    fn cannot_initialize_twice() {
        let (mut engine, mut factory) = ready_engine();
        assert!(matches!(engine.initialize(CONTAINER, &mut factory), Err(ViewerError::InvalidState { .. })));
        assert_eq!(factory.log().created, 1);
    }

    #[test]
    fn framing_uses_fov_formula() {
        let (mut engine, _) = ready_engine();
        let summary = load(&mut engine, Vec3::new(10.0, 0.0, 0.0), Vec3::new(12.0, 4.0, 1.0));
        let expected = 4.0 / 37.5f32.to_radians().sin() * 1.5;

        assert_eq!(summary.triangles, 12);
        assert_relative_eq!(summary.framing.distance, expected, epsilon = 1e-4);
        let st = engine.state().unwrap();
        assert_relative_eq!(st.camera().position.z, expected, epsilon = 1e-4);
        assert_relative_eq!(st.camera().near, expected / 100.0, epsilon = 1e-6);
        assert_relative_eq!(st.camera().far, expected * 100.0, epsilon = 1e-2);

        let bounds = st.scene().model_bounds(st.model().unwrap()).unwrap();
        assert_relative_eq!(bounds.center().length(), 0.0, epsilon = 1e-5);
        assert_eq!(engine.phase(), EngineState::ModelReady);
    }

    #[test]
    fn second_load_replaces_model_and_cage() {
        let (mut engine, factory) = ready_engine();
        load(&mut engine, Vec3::ZERO, Vec3::ONE);
        let first_cage = engine.state().unwrap().cage().clone();

        load(&mut engine, Vec3::ZERO, Vec3::new(2.0, 6.0, 4.0));
        let st = engine.state().unwrap();
        assert_eq!(model_count(&engine), 1);
        assert_eq!(spot_count(&engine), 5);
        for (s, _) in &first_cage.lights {
            assert!(!st.scene().contains(*s));
        }

        // Centered model of size (2, 6, 4): top light sits one full height above center.
        let top = st.scene().get(st.cage().lights[0].0).unwrap().position;
        assert_relative_eq!(top.y, 6.0, epsilon = 1e-5);
        assert_relative_eq!(top.x, 0.0, epsilon = 1e-5);
        assert_eq!(factory.log().uploaded_vertices, Some(36));
    }

    #[test]
    fn reset_camera_leaves_rig_untouched() {
        let (mut engine, _) = ready_engine();
        load(&mut engine, Vec3::ZERO, Vec3::ONE);
        engine.set_auto_rotate(true);
        engine.tick(0.0);
        engine.tick(50.0);

        let snapshot = |e: &SceneEngine| {
            let st = e.state().unwrap();
            let ids: Vec<_> = st.rig().ids().to_vec();
            let pos: Vec<_> = ids.iter().map(|id| st.scene().get(*id).unwrap().position).collect();
            (ids, pos, st.scene().count_lights(LightRole::Rig), st.scene().lights().count())
        };
        engine.rotate(200.0, 40.0, 600.0);
        engine.tick(60.0);
        let before = snapshot(&engine);
        engine.reset_camera();
        let after = snapshot(&engine);

        assert_eq!(before.0, after.0);
        assert_eq!(before.1, after.1);
        assert_eq!(before.2, 3);
        assert_eq!(after.2, 3);
        assert_eq!(before.3, after.3);
        let st = engine.state().unwrap();
        assert_eq!(st.camera().position, st.controls().saved_position());
    }

    #[test]
    fn light_orbits_only_while_auto_rotating() {
        let (mut engine, _) = ready_engine();
        let point = engine.state().unwrap().rig().point;
        let pos = |e: &SceneEngine| e.state().unwrap().scene().get(point).unwrap().position;

        engine.tick(0.0);
        engine.tick(16.0);
        assert_eq!(pos(&engine), Vec3::new(8.0, 4.0, 0.0));

        engine.set_auto_rotate(true);
        engine.tick(66.0);
        let moved = pos(&engine);
        assert_ne!(moved, Vec3::new(8.0, 4.0, 0.0));
        assert_relative_eq!(Vec3::new(moved.x, 0.0, moved.z).length(), 8.0, epsilon = 1e-4);

        engine.set_auto_rotate(false);
        engine.tick(116.0);
        assert_eq!(pos(&engine), moved);
    }

    #[test]
    fn tick_renders_frames_until_disposed() {
        let (mut engine, factory) = ready_engine();
        assert!(engine.tick(0.0));
        assert!(engine.tick(16.0));
        let log = factory.log();
        assert_eq!(log.frames, 2);
        assert_eq!(log.last_frame.len(), HEADER_LEN + 3 * crate::render::LIGHT_STRIDE);

        engine.dispose();
        assert!(!engine.tick(32.0));
        assert_eq!(factory.log().frames, 2);
    }

    #[test]
    fn dispose_then_initialize_is_clean() {
        let (mut engine, mut factory) = ready_engine();
        load(&mut engine, Vec3::ZERO, Vec3::ONE);
        engine.dispose();
        engine.dispose();
        assert_eq!(engine.phase(), EngineState::Disposed);
        assert!(engine.state().is_none());
        let log = factory.log();
        assert_eq!((log.live(), log.resize_watchers), (0, 0));

        engine.initialize(CONTAINER, &mut factory).unwrap();
        let st = engine.state().unwrap();
        assert_eq!(st.scene().count_lights(LightRole::Rig), 3);
        assert_eq!(spot_count(&engine), 0);
        assert_eq!(model_count(&engine), 0);
        assert_eq!(factory.log().live(), 1);
    }

    #[test]
    fn progress_is_republished_as_percent() {
        let (mut engine, _) = ready_engine();
        let ticket = engine.begin_load("blob:x", MeshFormat::Stl).unwrap();
        assert_eq!(engine.report_progress(ticket, 500, 2000), Some(25));
        assert_eq!(engine.report_progress(ticket, 2000, 2000), Some(100));
    }

    #[test]
    fn superseded_load_is_discarded() {
        let (mut engine, _) = ready_engine();
        let a = engine.begin_load("blob:a", MeshFormat::Stl).unwrap();
        let b = engine.begin_load("blob:b", MeshFormat::Stl).unwrap();
        assert!(b.generation > a.generation);

        assert_eq!(engine.report_progress(a, 10, 20), None);
        let err = engine.complete_load(a, &box_stl(Vec3::ZERO, Vec3::ONE)).unwrap_err();
        assert!(matches!(err, ViewerError::StaleLoad { .. }));
        assert_eq!(model_count(&engine), 0);
        assert_eq!(engine.phase(), EngineState::ModelLoading);

        engine.complete_load(b, &box_stl(Vec3::ZERO, Vec3::splat(2.0))).unwrap();
        assert_eq!(model_count(&engine), 1);
        assert!(matches!(engine.fail_load(a, "late"), ViewerError::StaleLoad { .. }));
    }

    #[test]
    fn begin_load_clears_resident_model() {
        let (mut engine, factory) = ready_engine();
        load(&mut engine, Vec3::ZERO, Vec3::ONE);
        engine.begin_load("blob:next", MeshFormat::Fbx).unwrap();
        assert_eq!(model_count(&engine), 0);
        assert_eq!(factory.log().uploaded_vertices, None);
    }

    #[test]
    fn dispose_during_load_discards_result() {
        let (mut engine, _) = ready_engine();
        let ticket = engine.begin_load("blob:a", MeshFormat::Stl).unwrap();
        engine.dispose();
        let err = engine.complete_load(ticket, &box_stl(Vec3::ZERO, Vec3::ONE)).unwrap_err();
        assert!(matches!(err, ViewerError::StaleLoad { .. }));
        assert_eq!(engine.phase(), EngineState::Disposed);
    }

    #[test]
    fn parse_failure_is_recoverable() {
        let (mut engine, _) = ready_engine();
        load(&mut engine, Vec3::ZERO, Vec3::ONE);
        let ticket = engine.begin_load("blob:bad", MeshFormat::Stl).unwrap();
        let err = engine.complete_load(ticket, b"not an stl at all").unwrap_err();
        assert!(matches!(err, ViewerError::LoadFailure(_)));
        assert_eq!(engine.phase(), EngineState::ModelReady);
        assert_eq!(model_count(&engine), 0);
        assert_eq!(spot_count(&engine), 0);
        assert!(engine.state().unwrap().cage().is_empty());

        load(&mut engine, Vec3::ZERO, Vec3::ONE);
        assert_eq!(model_count(&engine), 1);
    }

    #[test]
    fn transfer_failure_is_recoverable() {
        let (mut engine, _) = ready_engine();
        load(&mut engine, Vec3::ZERO, Vec3::ONE);
        let ticket = engine.begin_load("blob:gone", MeshFormat::Fbx).unwrap();
        assert!(matches!(engine.fail_load(ticket, "404"), ViewerError::LoadFailure(_)));
        assert_eq!(engine.phase(), EngineState::ModelReady);
        assert_eq!(spot_count(&engine), 0);
        load(&mut engine, Vec3::ZERO, Vec3::ONE);
    }

    #[test]
    fn declarative_formats_are_refused() {
        let (mut engine, _) = ready_engine();
        assert!(matches!(
            engine.begin_load("blob:x", MeshFormat::Glb),
            Err(ViewerError::UnsupportedFormat { .. })
        ));
        assert_eq!(engine.phase(), EngineState::Initialized);
    }

    #[test]
    fn load_requires_initialize() {
        let mut engine = SceneEngine::new(ViewerConfig::default());
        assert!(matches!(engine.begin_load("blob:x", MeshFormat::Stl), Err(ViewerError::InvalidState { .. })));
    }

    #[test]
    fn resize_updates_camera_and_surface() {
        let (mut engine, factory) = ready_engine();
        engine.resize(1000, 500);
        assert_relative_eq!(engine.state().unwrap().camera().aspect, 2.0);
        assert_eq!(factory.log().size, (1000, 500));
    }

    #[test]
    fn drop_releases_surface() {
        let (engine, factory) = ready_engine();
        drop(engine);
        assert_eq!(factory.log().live(), 0);
    }
}
