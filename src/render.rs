// render.rs - Render surface seam and frame encoding
//
// The engine never draws. Each tick it flattens camera and lights into a
// float buffer and hands it to a RenderSurface; the host (WebGL on the page,
// or the headless surface natively) does the drawing.
//
// Frame layout (f32):
//   0..16    view matrix, column-major
//   16..32   projection matrix
//   32..35   camera position
//   35       light count
//   36       shadows enabled
//   37..40   model offset
//   40       model resident (0/1)
//   41..     lights, LIGHT_STRIDE floats each:
//            type, r, g, b, intensity, pos xyz, target xyz,
//            range, angle, penumbra, decay, casts shadow

use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec3;

use crate::error::ViewerError;
use crate::scene::{LightKind, Model, NodeId, PerspectiveCamera, Scene};

pub const HEADER_LEN: usize = 41;
pub const LIGHT_STRIDE: usize = 16;

/// Where frames go. Owned by exactly one SceneState.
pub trait RenderSurface {
    fn set_size(&mut self, width: u32, height: u32);
    fn upload_model(&mut self, model: &ModelBuffers);
    fn clear_model(&mut self);
    fn render(&mut self, frame: &[f32]);
    fn watch_resize(&mut self);
    fn unwatch_resize(&mut self);
    /// Free graphics resources. The surface is not used afterwards.
    fn release(&mut self);
}

/// Creates surfaces; fails when no graphics context is available.
pub trait SurfaceFactory {
    fn create(&mut self, width: u32, height: u32) -> Result<Box<dyn RenderSurface>, ViewerError>;
}

/// Flat vertex data for upload, one draw range per mesh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelBuffers {
    pub positions: Vec<f32>,
    pub normals: Vec<f32>,
    pub indices: Vec<u32>,
    /// (first index, index count, roughness, metalness) per mesh
    pub ranges: Vec<[f32; 4]>,
}

impl ModelBuffers {
    pub fn from_model(model: &Model) -> Self {
        let mut out = Self::default();
        for mesh in &model.meshes {
            let base = (out.positions.len() / 3) as u32;
            let first = out.indices.len();
            out.positions.extend(mesh.positions.iter().flat_map(|p| p.to_array()));
            if mesh.normals.len() == mesh.positions.len() {
                out.normals.extend(mesh.normals.iter().flat_map(|n| n.to_array()));
            } else {
                out.normals.extend(std::iter::repeat_n(0.0, mesh.positions.len() * 3));
            }
            out.indices.extend(mesh.indices.iter().map(|i| i + base));
            out.ranges.push([first as f32, mesh.indices.len() as f32, mesh.material.roughness, mesh.material.metalness]);
        }
        out
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }
}

/// Reusable frame buffer.
#[derive(Default)]
pub struct FrameEncoder {
    out: Vec<f32>,
}

impl FrameEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn encode(&mut self, scene: &Scene, camera: &PerspectiveCamera, model: Option<NodeId>) -> &[f32] {
        self.out.clear();
        self.out.extend_from_slice(&camera.view_matrix().to_cols_array());
        self.out.extend_from_slice(&camera.projection_matrix().to_cols_array());
        self.out.extend_from_slice(&camera.position.to_array());

        let light_count = scene.lights().count();
        self.out.push(light_count as f32);
        self.out.push(1.0);

        let model_pos = model.and_then(|id| scene.get(id)).map(|n| n.position);
        self.out.extend_from_slice(&model_pos.unwrap_or(Vec3::ZERO).to_array());
        self.out.push(if model_pos.is_some() { 1.0 } else { 0.0 });

        for (node, light) in scene.lights() {
            let (range, angle, penumbra, decay, target) = match light.kind {
                LightKind::Ambient | LightKind::Directional => (0.0, 0.0, 0.0, 0.0, Vec3::ZERO),
                LightKind::Point { range, decay } => (range, 0.0, 0.0, decay, Vec3::ZERO),
                LightKind::Spot { range, angle, penumbra, decay, target } => {
                    let aim = scene.get(target).map_or(Vec3::ZERO, |t| t.position);
                    (range, angle, penumbra, decay, aim)
                }
            };
            self.out.push(light.type_code());
            self.out.extend_from_slice(&light.color.to_array());
            self.out.push(light.intensity);
            self.out.extend_from_slice(&node.position.to_array());
            self.out.extend_from_slice(&target.to_array());
            self.out.extend_from_slice(&[range, angle, penumbra, decay]);
            self.out.push(if light.cast_shadow { 1.0 } else { 0.0 });
        }

        &self.out
    }

    pub fn ptr(&self) -> *const f32 {
        self.out.as_ptr()
    }

    pub fn len(&self) -> usize {
        self.out.len()
    }

    pub fn is_empty(&self) -> bool {
        self.out.is_empty()
    }
}

// ============================================================================
// Headless surface
// ============================================================================

/// What headless surfaces did, shared across every surface of one factory.
#[derive(Debug, Default, Clone)]
pub struct SurfaceLog {
    pub created: usize,
    pub released: usize,
    pub frames: usize,
    pub resize_watchers: isize,
    pub size: (u32, u32),
    pub uploaded_vertices: Option<usize>,
    pub last_frame: Vec<f32>,
}

impl SurfaceLog {
    /// Surfaces created and not yet released.
    pub fn live(&self) -> usize {
        self.created - self.released
    }
}

/// Surface that draws nothing and records what it was asked to do.
pub struct HeadlessSurface {
    log: Rc<RefCell<SurfaceLog>>,
    watching: bool,
    released: bool,
}

impl RenderSurface for HeadlessSurface {
    fn set_size(&mut self, width: u32, height: u32) {
        self.log.borrow_mut().size = (width, height);
    }

    fn upload_model(&mut self, model: &ModelBuffers) {
        self.log.borrow_mut().uploaded_vertices = Some(model.vertex_count());
    }

    fn clear_model(&mut self) {
        self.log.borrow_mut().uploaded_vertices = None;
    }

    fn render(&mut self, frame: &[f32]) {
        let mut log = self.log.borrow_mut();
        log.frames += 1;
        log.last_frame.clear();
        log.last_frame.extend_from_slice(frame);
    }

    fn watch_resize(&mut self) {
        if !self.watching {
            self.watching = true;
            self.log.borrow_mut().resize_watchers += 1;
        }
    }

    fn unwatch_resize(&mut self) {
        if self.watching {
            self.watching = false;
            self.log.borrow_mut().resize_watchers -= 1;
        }
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.log.borrow_mut().released += 1;
        }
    }
}

#[derive(Default, Clone)]
pub struct HeadlessFactory {
    log: Rc<RefCell<SurfaceLog>>,
    /// When set, `create` fails as if no graphics context were available.
    pub unavailable: bool,
}

impl HeadlessFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unavailable() -> Self {
        Self { unavailable: true, ..Self::default() }
    }

    pub fn log(&self) -> SurfaceLog {
        self.log.borrow().clone()
    }
}

impl SurfaceFactory for HeadlessFactory {
    fn create(&mut self, width: u32, height: u32) -> Result<Box<dyn RenderSurface>, ViewerError> {
        if self.unavailable {
            return Err(ViewerError::ContextCreation("no graphics context available".into()));
        }
        {
            let mut log = self.log.borrow_mut();
            log.created += 1;
            log.size = (width, height);
        }
        Ok(Box::new(HeadlessSurface { log: self.log.clone(), watching: false, released: false }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::MeshFormat;
    use crate::scene::{Light, Mesh, NodeKind};

    #[test]
    fn frame_layout() {
        let mut scene = Scene::new();
        scene.add("amb", Vec3::ZERO, NodeKind::Light(Light::ambient(Vec3::ONE, 0.4)));
        let t = scene.add("t", Vec3::new(1.0, 2.0, 3.0), NodeKind::Target);
        scene.add("spot", Vec3::Y, NodeKind::Light(Light::spot(1.0, 9.0, 0.5, 0.2, 1.5, t)));

        let mut cam = PerspectiveCamera::new(75.0, 1.0, 0.1, 100.0);
        cam.position = Vec3::new(0.0, 0.0, 5.0);

        let mut enc = FrameEncoder::new();
        let frame = enc.encode(&scene, &cam, None).to_vec();
        assert_eq!(frame.len(), HEADER_LEN + 2 * LIGHT_STRIDE);
        assert_eq!(&frame[32..35], &[0.0, 0.0, 5.0]);
        assert_eq!(frame[35], 2.0);
        assert_eq!(frame[40], 0.0);

        let spot = &frame[HEADER_LEN + LIGHT_STRIDE..];
        assert_eq!(spot[0], 3.0);
        assert_eq!(&spot[8..11], &[1.0, 2.0, 3.0]);
        assert_eq!(spot[11], 9.0);
        assert_eq!(spot[15], 1.0);
    }

    #[test]
    fn buffers_offset_indices_per_mesh() {
        let a = Mesh::new("a", vec![Vec3::ZERO, Vec3::X, Vec3::Y], vec![0, 1, 2]);
        let b = Mesh::new("b", vec![Vec3::ZERO, Vec3::X, Vec3::Z], vec![0, 2, 1]);
        let bufs = ModelBuffers::from_model(&Model::new(MeshFormat::Fbx, vec![a, b]));
        assert_eq!(bufs.vertex_count(), 6);
        assert_eq!(bufs.indices, vec![0, 1, 2, 3, 5, 4]);
        assert_eq!(bufs.normals.len(), bufs.positions.len());
        assert_eq!(bufs.ranges[1][0], 3.0);
    }

    #[test]
    fn headless_factory_tracks_lifetimes() {
        let mut factory = HeadlessFactory::new();
        let mut s = factory.create(640, 480).unwrap();
        s.watch_resize();
        s.unwatch_resize();
        s.release();
        s.release();
        let log = factory.log();
        assert_eq!((log.created, log.released, log.live()), (1, 1, 0));
        assert_eq!(log.resize_watchers, 0);

        assert!(matches!(HeadlessFactory::unavailable().create(1, 1), Err(ViewerError::ContextCreation(_))));
    }
}
