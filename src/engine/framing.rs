// framing.rs - Fit a bounding box in the camera's view

use glam::Vec3;

use crate::config::FramingConfig;
use crate::scene::Aabb;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Framing {
    /// Box center before recentering; the model is moved by `-center`
    pub center: Vec3,
    pub size: Vec3,
    /// Camera distance from the origin along +Z
    pub distance: f32,
    pub near: f32,
    pub far: f32,
}

/// distance = maxDim / sin(fov / 2) * margin, clip planes scaled from it.
pub fn compute(bounds: &Aabb, fov_deg: f32, cfg: &FramingConfig) -> Framing {
    let size = bounds.size();
    let max_dim = bounds.max_dimension();
    // Degenerate (single point) models still get a usable camera.
    let max_dim = if max_dim > f32::EPSILON { max_dim } else { 1.0 };

    let distance = max_dim / (fov_deg.to_radians() * 0.5).sin() * cfg.margin;
    Framing {
        center: bounds.center(),
        size,
        distance,
        near: distance / cfg.clip_ratio,
        far: distance * cfg.clip_ratio,
    }
}
