// mesh.rs - Triangle meshes and loaded models
//
// A Model is what a loader produces: one or more meshes in model space.
// Its placement in the world is the owning node's position.

use glam::Vec3;

use super::Aabb;
use crate::format::MeshFormat;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub color: Vec3,
    pub roughness: f32,
    pub metalness: f32,
}

impl Material {
    /// Matte standard material applied to imported STL geometry.
    pub const MATTE: Self = Self { color: Vec3::new(0.8, 0.8, 0.8), roughness: 0.7, metalness: 0.2 };
}

impl Default for Material {
    fn default() -> Self {
        Self { color: Vec3::ONE, roughness: 1.0, metalness: 0.0 }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub name: String,
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub indices: Vec<u32>,
    pub material: Material,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

impl Mesh {
    pub fn new(name: impl Into<String>, positions: Vec<Vec3>, indices: Vec<u32>) -> Self {
        Self {
            name: name.into(),
            positions,
            normals: Vec::new(),
            indices,
            material: Material::default(),
            cast_shadow: false,
            receive_shadow: false,
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::from_points(&self.positions)
    }

    /// Area-weighted vertex normals from the index buffer.
    pub fn compute_normals(&mut self) {
        let mut normals = vec![Vec3::ZERO; self.positions.len()];
        for tri in self.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            let n = (self.positions[b] - self.positions[a]).cross(self.positions[c] - self.positions[a]);
            normals[a] += n;
            normals[b] += n;
            normals[c] += n;
        }
        for n in &mut normals {
            *n = n.normalize_or_zero();
        }
        self.normals = normals;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    pub format: MeshFormat,
    pub meshes: Vec<Mesh>,
}

impl Model {
    pub fn new(format: MeshFormat, meshes: Vec<Mesh>) -> Self {
        Self { format, meshes }
    }

    /// Bounds in model space.
    pub fn bounds(&self) -> Aabb {
        self.meshes.iter().fold(Aabb::EMPTY, |b, m| b.union(m.bounds()))
    }

    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(Mesh::triangle_count).sum()
    }

    pub fn vertex_count(&self) -> usize {
        self.meshes.iter().map(|m| m.positions.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normals_follow_winding() {
        let mut m = Mesh::new(
            "tri",
            vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            vec![0, 1, 2],
        );
        m.compute_normals();
        for n in &m.normals {
            assert_eq!(*n, Vec3::Z);
        }
    }

    #[test]
    fn model_bounds_span_meshes() {
        let a = Mesh::new("a", vec![Vec3::ZERO, Vec3::ONE], vec![]);
        let b = Mesh::new("b", vec![Vec3::splat(-2.0)], vec![]);
        let model = Model::new(MeshFormat::Fbx, vec![a, b]);
        let bounds = model.bounds();
        assert_eq!(bounds.min, Vec3::splat(-2.0));
        assert_eq!(bounds.max, Vec3::ONE);
    }
}
