// scene/ - Scene graph
//
// Flat node arena. Ids are never reused, so a handle held across a rebuild
// can be compared for identity.
//
// - bounds:   axis-aligned boxes
// - camera:   perspective camera
// - controls: damped orbit controls
// - light:    light sources tagged by owner
// - mesh:     meshes, materials, loaded models

mod bounds;
mod camera;
mod controls;
mod light;
mod mesh;

pub use bounds::Aabb;
pub use camera::PerspectiveCamera;
pub use controls::OrbitControls;
pub use light::{Light, LightKind, LightRole};
pub use mesh::{Material, Mesh, Model};

use glam::Vec3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Light(Light),
    /// Aim point for a spotlight
    Target,
    Model(Model),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub position: Vec3,
    pub kind: NodeKind,
}

#[derive(Debug, Default)]
pub struct Scene {
    nodes: Vec<Node>,
    next_id: u64,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: impl Into<String>, position: Vec3, kind: NodeKind) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.push(Node { id, name: name.into(), position, kind });
        id
    }

    pub fn remove(&mut self, id: NodeId) -> Option<Node> {
        let i = self.nodes.iter().position(|n| n.id == id)?;
        Some(self.nodes.remove(i))
    }

    /// Drop every node matching `pred`. Returns how many were removed.
    pub fn remove_where(&mut self, pred: impl Fn(&Node) -> bool) -> usize {
        let before = self.nodes.len();
        self.nodes.retain(|n| !pred(n));
        before - self.nodes.len()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn lights(&self) -> impl Iterator<Item = (&Node, &Light)> {
        self.nodes.iter().filter_map(|n| match &n.kind {
            NodeKind::Light(l) => Some((n, l)),
            _ => None,
        })
    }

    pub fn models(&self) -> impl Iterator<Item = (&Node, &Model)> {
        self.nodes.iter().filter_map(|n| match &n.kind {
            NodeKind::Model(m) => Some((n, m)),
            _ => None,
        })
    }

    pub fn count_lights(&self, role: LightRole) -> usize {
        self.lights().filter(|(_, l)| l.role == role).count()
    }

    /// World-space bounds of a model node.
    pub fn model_bounds(&self, id: NodeId) -> Option<Aabb> {
        match self.get(id) {
            Some(Node { kind: NodeKind::Model(m), position, .. }) => Some(m.bounds().translated(*position)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_not_reused() {
        let mut scene = Scene::new();
        let a = scene.add("a", Vec3::ZERO, NodeKind::Target);
        scene.remove(a);
        let b = scene.add("b", Vec3::ZERO, NodeKind::Target);
        assert_ne!(a, b);
        assert!(!scene.contains(a));
        assert!(scene.contains(b));
    }

    #[test]
    fn remove_where_filters_by_role() {
        let mut scene = Scene::new();
        scene.add("amb", Vec3::ZERO, NodeKind::Light(Light::ambient(Vec3::ONE, 0.4)));
        let t = scene.add("t", Vec3::ZERO, NodeKind::Target);
        scene.add("spot", Vec3::Y, NodeKind::Light(Light::spot(1.0, 3.0, 0.7, 0.2, 1.5, t)));
        let removed = scene.remove_where(|n| matches!(&n.kind, NodeKind::Light(l) if l.role == LightRole::Cage));
        assert_eq!(removed, 1);
        assert_eq!(scene.count_lights(LightRole::Rig), 1);
        assert_eq!(scene.count_lights(LightRole::Cage), 0);
    }

    #[test]
    fn model_bounds_include_node_offset() {
        let mut scene = Scene::new();
        let mesh = Mesh::new("m", vec![Vec3::ZERO, Vec3::ONE], vec![]);
        let id = scene.add(
            "model",
            Vec3::new(10.0, 0.0, 0.0),
            NodeKind::Model(Model::new(crate::format::MeshFormat::Stl, vec![mesh])),
        );
        let b = scene.model_bounds(id).unwrap();
        assert_eq!(b.min.x, 10.0);
        assert_eq!(b.max.x, 11.0);
    }
}
