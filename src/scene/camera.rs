// camera.rs - Perspective camera

use glam::{Mat4, Vec3};

#[derive(Debug, Clone, PartialEq)]
pub struct PerspectiveCamera {
    /// Vertical field of view in degrees
    pub fov_deg: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
}

impl PerspectiveCamera {
    pub fn new(fov_deg: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            fov_deg,
            aspect,
            near,
            far,
            position: Vec3::ZERO,
            target: Vec3::ZERO,
            up: Vec3::Y,
        }
    }

    /// Aspect from container pixels. A zero-height container keeps the old aspect.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        if height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    pub fn fov_rad(&self) -> f32 {
        self.fov_deg.to_radians()
    }

    pub fn look_at(&mut self, target: Vec3) {
        self.target = target;
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov_rad(), self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Unit vector from the camera toward its target.
    pub fn forward(&self) -> Vec3 {
        (self.target - self.position).normalize_or_zero()
    }
}
