// stl.rs - STL import
//
// Binary layout: 80-byte header, u32 triangle count, then 50 bytes per
// triangle (normal, three vertices, u16 attribute). ASCII files start with
// "solid" and list facet/vertex records.

use glam::Vec3;

use super::GeometryLoader;
use crate::error::ParseError;
use crate::format::MeshFormat;
use crate::scene::{Material, Mesh, Model};

const HEADER: usize = 80;
const TRIANGLE: usize = 50;

pub struct StlLoader;

impl GeometryLoader for StlLoader {
    fn format(&self) -> MeshFormat {
        MeshFormat::Stl
    }

    fn parse(&self, bytes: &[u8]) -> Result<Model, ParseError> {
        if bytes.is_empty() {
            return Err(ParseError::Empty);
        }
        let (positions, normals) = if is_binary(bytes) { parse_binary(bytes)? } else { parse_ascii(bytes)? };
        if positions.is_empty() {
            return Err(ParseError::NoGeometry);
        }

        let indices = (0..positions.len() as u32).collect();
        let mut mesh = Mesh::new("stl", positions, indices);
        mesh.material = Material::MATTE;
        if normals.iter().all(|n| *n != Vec3::ZERO) {
            mesh.normals = normals;
        } else {
            mesh.compute_normals();
        }

        tracing::debug!(triangles = mesh.triangle_count(), "Parsed STL");
        Ok(Model::new(MeshFormat::Stl, vec![mesh]))
    }
}

fn triangle_count(bytes: &[u8]) -> Option<usize> {
    let raw = bytes.get(HEADER..HEADER + 4)?;
    Some(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as usize)
}

/// Exact binary size wins; otherwise a leading "solid" means ASCII.
fn is_binary(bytes: &[u8]) -> bool {
    if triangle_count(bytes).and_then(binary_len) == Some(bytes.len()) {
        return true;
    }
    let start = bytes.iter().position(|b| !b.is_ascii_whitespace()).unwrap_or(0);
    !bytes[start..].starts_with(b"solid")
}

fn binary_len(triangles: usize) -> Option<usize> {
    triangles.checked_mul(TRIANGLE)?.checked_add(HEADER + 4)
}

#[inline]
fn read_f32(data: &[u8], at: usize) -> f32 {
    f32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

#[inline]
fn read_vec3(data: &[u8], at: usize) -> Vec3 {
    Vec3::new(read_f32(data, at), read_f32(data, at + 4), read_f32(data, at + 8))
}

fn parse_binary(bytes: &[u8]) -> Result<(Vec<Vec3>, Vec<Vec3>), ParseError> {
    let n = triangle_count(bytes).ok_or(ParseError::Truncated { expected: HEADER + 4, actual: bytes.len() })?;
    let expected = binary_len(n).unwrap_or(usize::MAX);
    if bytes.len() < expected {
        return Err(ParseError::Truncated { expected, actual: bytes.len() });
    }

    let mut positions = Vec::with_capacity(n * 3);
    let mut normals = Vec::with_capacity(n * 3);
    let mut at = HEADER + 4;
    for _ in 0..n {
        let normal = read_vec3(bytes, at);
        for v in 0..3 {
            positions.push(read_vec3(bytes, at + 12 + v * 12));
            normals.push(normal);
        }
        at += TRIANGLE;
    }
    Ok((positions, normals))
}

fn parse_ascii(bytes: &[u8]) -> Result<(Vec<Vec3>, Vec<Vec3>), ParseError> {
    let text = std::str::from_utf8(bytes).map_err(|e| malformed(format!("not UTF-8: {e}")))?;
    let mut tokens = text.split_ascii_whitespace();

    let mut positions = Vec::new();
    let mut normals = Vec::new();
    let mut facet_normal = Vec3::ZERO;

    while let Some(tok) = tokens.next() {
        match tok {
            "normal" => facet_normal = read_triplet(&mut tokens, "normal")?,
            "vertex" => {
                positions.push(read_triplet(&mut tokens, "vertex")?);
                normals.push(facet_normal);
            }
            "endfacet" => facet_normal = Vec3::ZERO,
            _ => {}
        }
    }

    if positions.len() % 3 != 0 {
        return Err(malformed(format!("{} vertices is not a whole number of triangles", positions.len())));
    }
    Ok((positions, normals))
}

fn read_triplet<'a>(tokens: &mut impl Iterator<Item = &'a str>, what: &str) -> Result<Vec3, ParseError> {
    let mut v = [0.0f32; 3];
    for c in &mut v {
        let tok = tokens.next().ok_or_else(|| malformed(format!("{what} record cut short")))?;
        *c = tok.parse().map_err(|_| malformed(format!("bad {what} component '{tok}'")))?;
    }
    Ok(Vec3::from(v))
}

fn malformed(detail: String) -> ParseError {
    ParseError::Malformed { format: "STL", detail }
}
