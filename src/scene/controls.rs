// controls.rs - Orbit controls with damping
//
// Input accumulates into a spherical delta around the target; each update
// applies a damped fraction of it and decays the rest.

use std::f32::consts::{PI, TAU};

use glam::Vec3;

use super::PerspectiveCamera;
use crate::config::ControlsConfig;

const POLAR_EPS: f32 = 1e-6;
const ZOOM_STEP: f32 = 0.95;

#[derive(Debug, Clone, Copy, PartialEq)]
struct SavedState {
    target: Vec3,
    position: Vec3,
}

#[derive(Debug, Clone)]
pub struct OrbitControls {
    pub target: Vec3,
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub auto_rotate: bool,
    pub auto_rotate_speed: f32,
    rotate_speed: f32,
    zoom_speed: f32,
    min_distance: f32,
    max_distance: f32,

    // Pending input
    delta_theta: f32,
    delta_phi: f32,
    scale: f32,
    pan: Vec3,

    saved: SavedState,
}

impl OrbitControls {
    /// Controls around the camera's current target; that pose becomes the reset state.
    pub fn new(camera: &PerspectiveCamera, config: &ControlsConfig) -> Self {
        Self {
            target: camera.target,
            enable_damping: true,
            damping_factor: config.damping_factor,
            auto_rotate: false,
            auto_rotate_speed: config.auto_rotate_speed,
            rotate_speed: config.rotate_speed,
            zoom_speed: config.zoom_speed,
            min_distance: config.min_distance,
            max_distance: config.max_distance,
            delta_theta: 0.0,
            delta_phi: 0.0,
            scale: 1.0,
            pan: Vec3::ZERO,
            saved: SavedState { target: camera.target, position: camera.position },
        }
    }

    /// Record the current pose as the one `reset` returns to.
    pub fn save_state(&mut self, camera: &PerspectiveCamera) {
        self.saved = SavedState { target: self.target, position: camera.position };
    }

    /// Return to the saved pose and drop pending input.
    pub fn reset(&mut self, camera: &mut PerspectiveCamera) {
        self.target = self.saved.target;
        camera.position = self.saved.position;
        camera.look_at(self.target);
        self.clear_pending();
    }

    pub fn saved_position(&self) -> Vec3 {
        self.saved.position
    }

    /// Pointer drag in pixels against a viewport of `height` pixels.
    pub fn rotate(&mut self, dx: f32, dy: f32, height: f32) {
        if height <= 0.0 { return; }
        self.delta_theta -= TAU * dx / height * self.rotate_speed;
        self.delta_phi -= TAU * dy / height * self.rotate_speed;
    }

    /// Wheel steps; positive moves away from the target.
    pub fn zoom(&mut self, steps: f32) {
        self.scale *= ZOOM_STEP.powf(-steps * self.zoom_speed);
    }

    /// Pointer drag in pixels, translating the target in the view plane.
    pub fn pan(&mut self, dx: f32, dy: f32, height: f32, camera: &PerspectiveCamera) {
        if height <= 0.0 { return; }
        let offset = camera.position - self.target;
        let distance = offset.length() * (camera.fov_rad() * 0.5).tan();
        let forward = camera.forward();
        let right = forward.cross(camera.up).normalize_or_zero();
        let up = right.cross(forward);
        self.pan += right * (-2.0 * dx * distance / height);
        self.pan += up * (2.0 * dy * distance / height);
    }

    /// Apply one frame of pending input. Returns true when the camera moved.
    pub fn update(&mut self, camera: &mut PerspectiveCamera, dt: f32) -> bool {
        let before = camera.position;
        let offset = camera.position - self.target;

        let mut radius = offset.length();
        let mut theta = offset.x.atan2(offset.z);
        let mut phi = if radius > 0.0 { (offset.y / radius).clamp(-1.0, 1.0).acos() } else { 0.0 };

        if self.auto_rotate {
            self.delta_theta -= TAU / 60.0 * self.auto_rotate_speed * dt;
        }

        let k = if self.enable_damping { self.damping_factor } else { 1.0 };
        theta += self.delta_theta * k;
        phi = (phi + self.delta_phi * k).clamp(POLAR_EPS, PI - POLAR_EPS);
        radius = (radius * self.scale).clamp(self.min_distance, self.max_distance);
        self.target += self.pan * k;

        let sin_phi = phi.sin();
        let offset = Vec3::new(radius * sin_phi * theta.sin(), radius * phi.cos(), radius * sin_phi * theta.cos());
        camera.position = self.target + offset;
        camera.look_at(self.target);

        if self.enable_damping {
            self.delta_theta *= 1.0 - k;
            self.delta_phi *= 1.0 - k;
            self.pan *= 1.0 - k;
        } else {
            self.delta_theta = 0.0;
            self.delta_phi = 0.0;
            self.pan = Vec3::ZERO;
        }
        self.scale = 1.0;

        camera.position.distance_squared(before) > 1e-12
    }

    fn clear_pending(&mut self) {
        self.delta_theta = 0.0;
        self.delta_phi = 0.0;
        self.scale = 1.0;
        self.pan = Vec3::ZERO;
    }
}
