// lighting.rs - Rig and spotlight cage
//
// The rig (ambient + directional + orbiting point) is built once per scene
// lifetime. The cage (five spotlights boxed around the model) is rebuilt on
// every model load.

use glam::Vec3;

use crate::config::{CageConfig, RigConfig};
use crate::scene::{Aabb, Light, LightRole, Node, NodeId, NodeKind, Scene};

/// Handles to the three rig lights.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightingRig {
    pub point: NodeId,
    pub ambient: NodeId,
    pub directional: NodeId,
}

impl LightingRig {
    pub fn ids(&self) -> [NodeId; 3] {
        [self.point, self.ambient, self.directional]
    }
}

/// Spotlights and their aim targets, in placement order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpotlightCage {
    pub lights: Vec<(NodeId, NodeId)>,
}

impl SpotlightCage {
    pub fn len(&self) -> usize {
        self.lights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }

    /// Remove every spotlight and target of this cage from the scene.
    pub fn clear(&mut self, scene: &mut Scene) {
        for (spot, target) in self.lights.drain(..) {
            scene.remove(spot);
            scene.remove(target);
        }
    }
}

fn is_rig_light(n: &Node) -> bool {
    matches!(&n.kind, NodeKind::Light(l) if l.role == LightRole::Rig)
}

/// Add the rig, sweeping out any rig lights already present.
pub fn build_rig(scene: &mut Scene, cfg: &RigConfig) -> LightingRig {
    let swept = scene.remove_where(is_rig_light);
    if swept > 0 {
        tracing::warn!(swept, "Removed stale rig lights before rebuilding");
    }

    let point = scene.add(
        "rig.point",
        Vec3::from(cfg.point_start),
        NodeKind::Light(Light::point(cfg.point_intensity, cfg.point_range)),
    );
    let ambient = scene.add(
        "rig.ambient",
        Vec3::ZERO,
        NodeKind::Light(Light::ambient(Vec3::from(cfg.ambient_color), cfg.ambient_intensity)),
    );
    let directional = scene.add(
        "rig.directional",
        Vec3::from(cfg.directional_position),
        NodeKind::Light(Light::directional(cfg.directional_intensity)),
    );

    LightingRig { point, ambient, directional }
}

/// Point-light position on its orbit at animation time `t` seconds.
pub fn orbit_position(cfg: &RigConfig, t: f32) -> Vec3 {
    Vec3::new(
        (t * cfg.orbit_rate).cos() * cfg.orbit_radius,
        cfg.orbit_height + (t * cfg.bob_rate).sin() * cfg.orbit_bob,
        (t * cfg.orbit_rate).sin() * cfg.orbit_radius,
    )
}

pub fn animate_point_light(scene: &mut Scene, rig: &LightingRig, cfg: &RigConfig, t: f32) {
    if let Some(node) = scene.get_mut(rig.point) {
        node.position = orbit_position(cfg, t);
    }
}

/// Offsets from the box center: top, bottom, +X, -X, +Z.
fn cage_offsets(size: Vec3) -> [Vec3; 5] {
    [
        Vec3::new(0.0, size.y, 0.0),
        Vec3::new(0.0, -size.y, 0.0),
        Vec3::new(size.x, 0.0, 0.0),
        Vec3::new(-size.x, 0.0, 0.0),
        Vec3::new(0.0, 0.0, size.z),
    ]
}

/// Replace `previous` with a fresh cage around `bounds`.
pub fn build_spotlight_cage(
    scene: &mut Scene,
    previous: &mut SpotlightCage,
    bounds: &Aabb,
    cfg: &CageConfig,
) -> SpotlightCage {
    previous.clear(scene);

    let center = bounds.center();
    let range = bounds.max_dimension() * cfg.range_factor;
    let angle = cfg.angle_deg.to_radians();

    let mut cage = SpotlightCage::default();
    for (i, offset) in cage_offsets(bounds.size()).into_iter().enumerate() {
        let target = scene.add(format!("cage.target{i}"), center, NodeKind::Target);
        let light = Light::spot(cfg.intensity, range, angle, cfg.penumbra, cfg.decay, target);
        let spot = scene.add(format!("cage.spot{i}"), center + offset, NodeKind::Light(light));
        cage.lights.push((spot, target));
    }
    cage
}
