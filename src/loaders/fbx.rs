// fbx.rs - Binary FBX import
//
// Reads the node tree, then resolves Geometry -> Model links through the
// Connections section. Each linked geometry becomes one mesh with the model's
// world transform baked in. Polygons are fan-triangulated.
//
// Node record: end offset, property count, property bytes (u32 each before
// version 7500, u64 after), name, properties, children, null terminator.

use std::collections::HashMap;
use std::io::Read;

use flate2::read::ZlibDecoder;
use glam::{EulerRot, Mat4, Quat, Vec3};

use super::GeometryLoader;
use crate::error::ParseError;
use crate::format::MeshFormat;
use crate::scene::{Mesh, Model};

const MAGIC: &[u8] = b"Kaydara FBX Binary  \0";
const FIRST_NODE: usize = 27;
const WIDE_HEADER_VERSION: u32 = 7500;
/// Deepest node nesting accepted; real exports stay well under 16.
const MAX_DEPTH: usize = 64;

pub struct FbxLoader;

impl GeometryLoader for FbxLoader {
    fn format(&self) -> MeshFormat {
        MeshFormat::Fbx
    }

    fn parse(&self, bytes: &[u8]) -> Result<Model, ParseError> {
        if bytes.is_empty() {
            return Err(ParseError::Empty);
        }
        if !bytes.starts_with(MAGIC) {
            return Err(if looks_ascii(bytes) {
                ParseError::Unsupported { format: "FBX", detail: "ASCII FBX files are not supported".into() }
            } else {
                malformed("missing binary header")
            });
        }

        let version = {
            let mut r = Reader::new(bytes, 23);
            r.u32()?
        };
        let nodes = read_document(bytes, version)?;
        let meshes = build_meshes(&nodes)?;
        if meshes.is_empty() {
            return Err(ParseError::NoGeometry);
        }

        tracing::debug!(version, meshes = meshes.len(), "Parsed FBX");
        Ok(Model::new(MeshFormat::Fbx, meshes))
    }
}

fn looks_ascii(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(256)];
    head.iter().all(|b| b.is_ascii()) && (head.starts_with(b";") || head.windows(6).any(|w| w == b"FBXHea"))
}

fn malformed(detail: impl Into<String>) -> ParseError {
    ParseError::Malformed { format: "FBX", detail: detail.into() }
}

// ----------------------------------------------------------------------------
// Node tree
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Prop {
    Int(i64),
    Float(f64),
    Str(String),
    Ints(Vec<i64>),
    Floats(Vec<f64>),
    Raw,
}

impl Prop {
    fn as_int(&self) -> Option<i64> {
        match self {
            Prop::Int(v) => Some(*v),
            _ => None,
        }
    }

    fn as_float(&self) -> Option<f64> {
        match self {
            Prop::Float(v) => Some(*v),
            Prop::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    fn as_str(&self) -> Option<&str> {
        match self {
            Prop::Str(s) => Some(s),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct Node {
    name: String,
    props: Vec<Prop>,
    children: Vec<Node>,
}

impl Node {
    fn child(&self, name: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.name == name)
    }

    fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8], pos: usize) -> Self {
        Self { data, pos }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], ParseError> {
        let end = self.pos.checked_add(n).filter(|&e| e <= self.data.len()).ok_or(ParseError::Truncated {
            expected: self.pos.saturating_add(n),
            actual: self.data.len(),
        })?;
        let s = &self.data[self.pos..end];
        self.pos = end;
        Ok(s)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], ParseError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, ParseError> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> Result<u32, ParseError> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    fn u64(&mut self) -> Result<u64, ParseError> {
        Ok(u64::from_le_bytes(self.array()?))
    }

    /// Offset-sized header field.
    fn word(&mut self, wide: bool) -> Result<u64, ParseError> {
        if wide { self.u64() } else { self.u32().map(u64::from) }
    }
}

fn read_document(bytes: &[u8], version: u32) -> Result<Vec<Node>, ParseError> {
    let wide = version >= WIDE_HEADER_VERSION;
    let mut r = Reader::new(bytes, FIRST_NODE);
    let mut nodes = Vec::new();
    while let Some(node) = read_node(&mut r, wide, 0)? {
        nodes.push(node);
    }
    Ok(nodes)
}

/// One node record, or `None` at a null terminator or end of data.
fn read_node(r: &mut Reader, wide: bool, depth: usize) -> Result<Option<Node>, ParseError> {
    let header = if wide { 25 } else { 13 };
    if r.pos + header > r.data.len() {
        return Ok(None);
    }
    if depth > MAX_DEPTH {
        return Err(malformed("node nesting too deep"));
    }

    let end = r.word(wide)?;
    let end = usize::try_from(end).map_err(|_| malformed(format!("node end offset {end} out of range")))?;
    let num_props = r.word(wide)?;
    let _prop_bytes = r.word(wide)?;
    let name_len = r.u8()? as usize;
    if end == 0 {
        return Ok(None);
    }
    if end > r.data.len() || end < r.pos {
        return Err(malformed(format!("node end offset {end} out of range")));
    }

    let name = String::from_utf8_lossy(r.take(name_len)?).into_owned();
    let mut props = Vec::with_capacity(num_props.min(64) as usize);
    for _ in 0..num_props {
        props.push(read_prop(r)?);
    }

    let mut children = Vec::new();
    while r.pos < end {
        match read_node(r, wide, depth + 1)? {
            Some(child) => children.push(child),
            None => break,
        }
    }
    r.pos = end;

    Ok(Some(Node { name, props, children }))
}

fn read_prop(r: &mut Reader) -> Result<Prop, ParseError> {
    let code = r.u8()?;
    Ok(match code {
        b'C' => Prop::Int(r.u8()? as i64),
        b'Y' => Prop::Int(i16::from_le_bytes(r.array()?) as i64),
        b'I' => Prop::Int(i32::from_le_bytes(r.array()?) as i64),
        b'L' => Prop::Int(i64::from_le_bytes(r.array()?)),
        b'F' => Prop::Float(f32::from_le_bytes(r.array()?) as f64),
        b'D' => Prop::Float(f64::from_le_bytes(r.array()?)),
        b'S' => {
            let len = r.u32()? as usize;
            Prop::Str(String::from_utf8_lossy(r.take(len)?).into_owned())
        }
        b'R' => {
            let len = r.u32()? as usize;
            r.take(len)?;
            Prop::Raw
        }
        b'f' => Prop::Floats(read_array(r, 4)?.chunks_exact(4).map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]) as f64).collect()),
        b'd' => Prop::Floats(read_array(r, 8)?.chunks_exact(8).map(|c| f64::from_le_bytes(c.try_into().unwrap_or([0; 8]))).collect()),
        b'i' => Prop::Ints(read_array(r, 4)?.chunks_exact(4).map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]) as i64).collect()),
        b'l' => Prop::Ints(read_array(r, 8)?.chunks_exact(8).map(|c| i64::from_le_bytes(c.try_into().unwrap_or([0; 8]))).collect()),
        b'b' => Prop::Ints(read_array(r, 1)?.iter().map(|&b| b as i64).collect()),
        other => return Err(malformed(format!("unknown property type 0x{other:02x}"))),
    })
}

/// Array payload, inflated when zlib-encoded.
fn read_array(r: &mut Reader, elem: usize) -> Result<Vec<u8>, ParseError> {
    let len = r.u32()? as usize;
    let encoding = r.u32()?;
    let stored = r.u32()? as usize;
    let raw = r.take(stored)?;
    let expected = len.checked_mul(elem).ok_or_else(|| malformed("array length overflow"))?;

    let data = match encoding {
        0 => raw.to_vec(),
        1 => {
            // Declared length is untrusted: bound both the allocation and the inflate.
            let mut out = Vec::with_capacity(expected.min(raw.len().saturating_mul(16)));
            ZlibDecoder::new(raw).take(expected as u64 + 1).read_to_end(&mut out)?;
            out
        }
        e => return Err(malformed(format!("unknown array encoding {e}"))),
    };
    if data.len() != expected {
        return Err(ParseError::Truncated { expected, actual: data.len() });
    }
    Ok(data)
}

// ----------------------------------------------------------------------------
// Scene assembly
// ----------------------------------------------------------------------------

struct ModelNode {
    name: String,
    local: Mat4,
}

fn vec3_prop(p: &Node) -> Option<Vec3> {
    let x = p.props.get(4)?.as_float()?;
    let y = p.props.get(5)?.as_float()?;
    let z = p.props.get(6)?.as_float()?;
    Some(Vec3::new(x as f32, y as f32, z as f32))
}

/// T * R * S from a Model's Properties70 block.
fn local_transform(model: &Node) -> Mat4 {
    let mut t = Vec3::ZERO;
    let mut r = Vec3::ZERO;
    let mut s = Vec3::ONE;
    if let Some(props) = model.child("Properties70") {
        for p in props.children_named("P") {
            let Some(value) = vec3_prop(p) else { continue };
            match p.props.first().and_then(Prop::as_str) {
                Some("Lcl Translation") => t = value,
                Some("Lcl Rotation") => r = value,
                Some("Lcl Scaling") => s = value,
                _ => {}
            }
        }
    }
    let rotation = Quat::from_euler(EulerRot::ZYX, r.z.to_radians(), r.y.to_radians(), r.x.to_radians());
    Mat4::from_scale_rotation_translation(s, rotation, t)
}

fn world_transform(id: i64, models: &HashMap<i64, ModelNode>, parents: &HashMap<i64, i64>) -> Mat4 {
    let mut m = Mat4::IDENTITY;
    let mut cur = Some(id);
    let mut depth = 0;
    while let Some(c) = cur {
        let Some(model) = models.get(&c) else { break };
        m = model.local * m;
        cur = parents.get(&c).copied();
        depth += 1;
        if depth > 256 {
            tracing::warn!("FBX model hierarchy too deep or cyclic, truncating");
            break;
        }
    }
    m
}

fn triangulate(polygon_index: &[i64], vertex_count: usize) -> Result<Vec<u32>, ParseError> {
    let mut indices = Vec::with_capacity(polygon_index.len() * 2);
    let mut poly: Vec<u32> = Vec::with_capacity(8);
    for &raw in polygon_index {
        let last = raw < 0;
        let idx = if last { !raw } else { raw };
        if idx < 0 || idx as usize >= vertex_count {
            return Err(malformed(format!("polygon index {idx} out of range")));
        }
        poly.push(idx as u32);
        if last {
            for i in 1..poly.len().saturating_sub(1) {
                indices.extend_from_slice(&[poly[0], poly[i], poly[i + 1]]);
            }
            poly.clear();
        }
    }
    Ok(indices)
}

fn build_meshes(nodes: &[Node]) -> Result<Vec<Mesh>, ParseError> {
    let Some(objects) = nodes.iter().find(|n| n.name == "Objects") else {
        return Ok(Vec::new());
    };

    let mut models = HashMap::new();
    for m in objects.children_named("Model") {
        if let Some(id) = m.props.first().and_then(Prop::as_int) {
            let name = m.props.get(1).and_then(Prop::as_str).unwrap_or("").to_string();
            let name = name.split('\0').next().unwrap_or("").to_string();
            models.insert(id, ModelNode { name, local: local_transform(m) });
        }
    }

    // child -> parents, from "OO" links only
    let mut links: Vec<(i64, i64)> = Vec::new();
    if let Some(conns) = nodes.iter().find(|n| n.name == "Connections") {
        for c in conns.children_named("C") {
            if c.props.first().and_then(Prop::as_str) != Some("OO") {
                continue;
            }
            if let (Some(child), Some(parent)) = (
                c.props.get(1).and_then(Prop::as_int),
                c.props.get(2).and_then(Prop::as_int),
            ) {
                links.push((child, parent));
            }
        }
    }
    let parents: HashMap<i64, i64> = links
        .iter()
        .filter(|(c, p)| models.contains_key(c) && models.contains_key(p))
        .copied()
        .collect();

    let mut meshes = Vec::new();
    for geom in objects.children_named("Geometry") {
        let Some(gid) = geom.props.first().and_then(Prop::as_int) else { continue };
        let (Some(Prop::Floats(verts)), Some(Prop::Ints(polys))) = (
            geom.child("Vertices").and_then(|n| n.props.first()),
            geom.child("PolygonVertexIndex").and_then(|n| n.props.first()),
        ) else {
            continue;
        };
        if verts.len() % 3 != 0 {
            return Err(malformed(format!("vertex array length {} not divisible by 3", verts.len())));
        }

        let positions: Vec<Vec3> = verts.chunks_exact(3).map(|c| Vec3::new(c[0] as f32, c[1] as f32, c[2] as f32)).collect();
        let indices = triangulate(polys, positions.len())?;
        if indices.is_empty() {
            continue;
        }

        let owners: Vec<i64> = links.iter().filter(|(c, p)| *c == gid && models.contains_key(p)).map(|(_, p)| *p).collect();
        let placements: Vec<(String, Mat4)> = if owners.is_empty() {
            vec![(format!("geometry{gid}"), Mat4::IDENTITY)]
        } else {
            owners.iter().map(|id| (models[id].name.clone(), world_transform(*id, &models, &parents))).collect()
        };

        for (name, xform) in placements {
            let baked = positions.iter().map(|p| xform.transform_point3(*p)).collect();
            let mut mesh = Mesh::new(name, baked, indices.clone());
            mesh.compute_normals();
            mesh.cast_shadow = true;
            mesh.receive_shadow = true;
            meshes.push(mesh);
        }
    }
    Ok(meshes)
}
