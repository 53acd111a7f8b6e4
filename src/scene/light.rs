// light.rs - Light sources

use glam::Vec3;

use super::NodeId;

/// Which manager owns a light. Used to sweep a set without touching the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightRole {
    Rig,
    Cage,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    Ambient,
    Directional,
    Point { range: f32, decay: f32 },
    Spot { range: f32, angle: f32, penumbra: f32, decay: f32, target: NodeId },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    pub kind: LightKind,
    pub role: LightRole,
    pub color: Vec3,
    pub intensity: f32,
    pub cast_shadow: bool,
}

impl Light {
    pub fn ambient(color: Vec3, intensity: f32) -> Self {
        Self { kind: LightKind::Ambient, role: LightRole::Rig, color, intensity, cast_shadow: false }
    }

    pub fn directional(intensity: f32) -> Self {
        Self {
            kind: LightKind::Directional,
            role: LightRole::Rig,
            color: Vec3::ONE,
            intensity,
            cast_shadow: true,
        }
    }

    pub fn point(intensity: f32, range: f32) -> Self {
        Self {
            kind: LightKind::Point { range, decay: 2.0 },
            role: LightRole::Rig,
            color: Vec3::ONE,
            intensity,
            cast_shadow: true,
        }
    }

    pub fn spot(intensity: f32, range: f32, angle: f32, penumbra: f32, decay: f32, target: NodeId) -> Self {
        Self {
            kind: LightKind::Spot { range, angle, penumbra, decay, target },
            role: LightRole::Cage,
            color: Vec3::ONE,
            intensity,
            cast_shadow: true,
        }
    }

    /// Numeric tag used by the frame encoder.
    pub fn type_code(&self) -> f32 {
        match self.kind {
            LightKind::Ambient => 0.0,
            LightKind::Directional => 1.0,
            LightKind::Point { .. } => 2.0,
            LightKind::Spot { .. } => 3.0,
        }
    }
}
