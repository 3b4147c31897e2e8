//! Binary FBX fixtures
//!
//! A minimal writer for the 7.x binary layout, so tests can describe scenes
//! in code instead of shipping binary files.

#![allow(dead_code)]

use std::io::Write;

use flate2::Compression;
use flate2::write::ZlibEncoder;

pub const TICKS_PER_SECOND: f64 = 46_186_158_000.0;

#[derive(Debug, Clone)]
pub enum Prop {
    I32(i32),
    I64(i64),
    F64(f64),
    Str(String),
    I32Array(Vec<i32>),
    I64Array(Vec<i64>),
    F32Array(Vec<f32>),
    F64Array(Vec<f64>),
    /// Zlib-compressed `d` array.
    F64ArrayZ(Vec<f64>),
    /// Zlib-compressed `i` array.
    I32ArrayZ(Vec<i32>),
}

impl From<&str> for Prop {
    fn from(s: &str) -> Self {
        Prop::Str(s.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub props: Vec<Prop>,
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            props: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn prop(mut self, prop: Prop) -> Self {
        self.props.push(prop);
        self
    }

    pub fn child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    /// A node holding a single property, e.g. `Vertices: *N { a: ... }`.
    pub fn leaf(name: &str, prop: Prop) -> Self {
        Self::new(name).prop(prop)
    }
}

// ============================================================================
// Encoding
// ============================================================================

pub fn header(version: u32) -> Vec<u8> {
    let mut out = b"Kaydara FBX Binary  \0".to_vec();
    out.extend_from_slice(&[0x1A, 0x00]);
    out.extend_from_slice(&version.to_le_bytes());
    out
}

/// Encodes a full file: header, top-level nodes and the closing sentinel.
pub fn encode(version: u32, nodes: &[Node]) -> Vec<u8> {
    let mut out = header(version);
    for node in nodes {
        write_node(&mut out, node);
    }
    out.extend_from_slice(&[0u8; 13]);
    out
}

fn write_node(out: &mut Vec<u8>, node: &Node) {
    let start = out.len();
    out.extend_from_slice(&[0u8; 12]);
    out.push(node.name.len() as u8);
    out.extend_from_slice(node.name.as_bytes());

    let props_start = out.len();
    for prop in &node.props {
        write_prop(out, prop);
    }
    let props_len = (out.len() - props_start) as u32;

    if !node.children.is_empty() {
        for child in &node.children {
            write_node(out, child);
        }
        out.extend_from_slice(&[0u8; 13]);
    }

    let end = out.len() as u32;
    out[start..start + 4].copy_from_slice(&end.to_le_bytes());
    out[start + 4..start + 8].copy_from_slice(&(node.props.len() as u32).to_le_bytes());
    out[start + 8..start + 12].copy_from_slice(&props_len.to_le_bytes());
}

fn write_prop(out: &mut Vec<u8>, prop: &Prop) {
    match prop {
        Prop::I32(v) => {
            out.push(b'I');
            out.extend_from_slice(&v.to_le_bytes());
        }
        Prop::I64(v) => {
            out.push(b'L');
            out.extend_from_slice(&v.to_le_bytes());
        }
        Prop::F64(v) => {
            out.push(b'D');
            out.extend_from_slice(&v.to_le_bytes());
        }
        Prop::Str(s) => {
            out.push(b'S');
            out.extend_from_slice(&(s.len() as u32).to_le_bytes());
            out.extend_from_slice(s.as_bytes());
        }
        Prop::I32Array(v) => write_array(out, b'i', v.len(), &bytes_of(v, |x| x.to_le_bytes()), false),
        Prop::I64Array(v) => write_array(out, b'l', v.len(), &bytes_of(v, |x| x.to_le_bytes()), false),
        Prop::F32Array(v) => write_array(out, b'f', v.len(), &bytes_of(v, |x| x.to_le_bytes()), false),
        Prop::F64Array(v) => write_array(out, b'd', v.len(), &bytes_of(v, |x| x.to_le_bytes()), false),
        Prop::F64ArrayZ(v) => write_array(out, b'd', v.len(), &bytes_of(v, |x| x.to_le_bytes()), true),
        Prop::I32ArrayZ(v) => write_array(out, b'i', v.len(), &bytes_of(v, |x| x.to_le_bytes()), true),
    }
}

fn bytes_of<T: Copy, const N: usize>(values: &[T], to_bytes: impl Fn(T) -> [u8; N]) -> Vec<u8> {
    values.iter().flat_map(|&v| to_bytes(v)).collect()
}

fn write_array(out: &mut Vec<u8>, tag: u8, count: usize, raw: &[u8], compress: bool) {
    let payload = if compress {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(raw).unwrap();
        encoder.finish().unwrap()
    } else {
        raw.to_vec()
    };

    out.push(tag);
    out.extend_from_slice(&(count as u32).to_le_bytes());
    out.extend_from_slice(&u32::from(compress).to_le_bytes());
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(&payload);
}

// ============================================================================
// Scene building blocks
// ============================================================================

fn object(kind: &str, id: i64, name: &str, class: &str, subtype: &str) -> Node {
    Node::new(kind)
        .prop(Prop::I64(id))
        .prop(Prop::Str(format!("{name}\0\u{1}{class}")))
        .prop(subtype.into())
}

fn p_vec3(name: &str, v: [f64; 3]) -> Node {
    Node::new("P")
        .prop(name.into())
        .prop(name.into())
        .prop("".into())
        .prop("A".into())
        .prop(Prop::F64(v[0]))
        .prop(Prop::F64(v[1]))
        .prop(Prop::F64(v[2]))
}

fn p_number(name: &str, v: f64) -> Node {
    Node::new("P")
        .prop(name.into())
        .prop("Number".into())
        .prop("".into())
        .prop("A".into())
        .prop(Prop::F64(v))
}

pub fn model(id: i64, name: &str) -> Node {
    object("Model", id, name, "Model", "Mesh")
}

/// Model with `Lcl Translation`, `Lcl Rotation` (degrees) and `Lcl Scaling`.
pub fn model_with_transform(id: i64, name: &str, t: [f64; 3], r_deg: [f64; 3], s: [f64; 3]) -> Node {
    model(id, name).child(
        Node::new("Properties70")
            .child(p_vec3("Lcl Translation", t))
            .child(p_vec3("Lcl Rotation", r_deg))
            .child(p_vec3("Lcl Scaling", s)),
    )
}

pub fn limb_attribute(id: i64, name: &str) -> Node {
    object("NodeAttribute", id, name, "NodeAttribute", "LimbNode")
}

pub fn geometry(id: i64, name: &str, vertices: Vec<f64>, polygon_vertex_index: Vec<i32>) -> Node {
    object("Geometry", id, name, "Geometry", "Mesh")
        .child(Node::leaf("Vertices", Prop::F64Array(vertices)))
        .child(Node::leaf("PolygonVertexIndex", Prop::I32Array(polygon_vertex_index)))
}

pub fn with_normals(geometry: Node, normals: Vec<f64>) -> Node {
    geometry.child(
        Node::new("LayerElementNormal")
            .prop(Prop::I32(0))
            .child(Node::leaf("MappingInformationType", "ByPolygonVertex".into()))
            .child(Node::leaf("Normals", Prop::F64Array(normals))),
    )
}

pub fn with_uvs(geometry: Node, uvs: Vec<f64>, uv_index: Vec<i32>) -> Node {
    geometry.child(
        Node::new("LayerElementUV")
            .prop(Prop::I32(0))
            .child(Node::leaf("UV", Prop::F64Array(uvs)))
            .child(Node::leaf("UVIndex", Prop::I32Array(uv_index))),
    )
}

/// Unit quad in the XY plane, one polygon over four control points.
pub fn quad_geometry(id: i64, name: &str) -> Node {
    geometry(
        id,
        name,
        vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0],
        vec![0, 1, 2, !3],
    )
}

pub fn skin(id: i64, name: &str) -> Node {
    object("Deformer", id, name, "Deformer", "Skin")
}

pub fn cluster(id: i64, name: &str, indexes: Vec<i32>, weights: Vec<f64>) -> Node {
    object("Deformer", id, name, "SubDeformer", "Cluster")
        .child(Node::leaf("Indexes", Prop::I32Array(indexes)))
        .child(Node::leaf("Weights", Prop::F64Array(weights)))
}

pub fn with_matrices(cluster: Node, transform: [f64; 16], transform_link: [f64; 16]) -> Node {
    cluster
        .child(Node::leaf("Transform", Prop::F64Array(transform.to_vec())))
        .child(Node::leaf("TransformLink", Prop::F64Array(transform_link.to_vec())))
}

pub fn translation_matrix(x: f64, y: f64, z: f64) -> [f64; 16] {
    [
        1.0, 0.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        x, y, z, 1.0,
    ]
}

pub fn animation_stack(id: i64, name: &str) -> Node {
    object("AnimationStack", id, name, "AnimStack", "")
}

pub fn animation_layer(id: i64, name: &str) -> Node {
    object("AnimationLayer", id, name, "AnimLayer", "")
}

/// Curve node `T`, `R` or `S` with per-axis defaults.
pub fn curve_node(id: i64, channel: &str, defaults: [f64; 3]) -> Node {
    object("AnimationCurveNode", id, channel, "AnimCurveNode", "").child(
        Node::new("Properties70")
            .child(p_number("d|X", defaults[0]))
            .child(p_number("d|Y", defaults[1]))
            .child(p_number("d|Z", defaults[2])),
    )
}

/// Curve with key times given in seconds.
pub fn curve(id: i64, times: &[f64], values: &[f32]) -> Node {
    let ticks = times.iter().map(|t| (t * TICKS_PER_SECOND).round() as i64).collect();
    object("AnimationCurve", id, "", "AnimCurve", "")
        .child(Node::leaf("KeyTime", Prop::I64Array(ticks)))
        .child(Node::leaf("KeyValueFloat", Prop::F32Array(values.to_vec())))
}

pub fn oo(from: i64, to: i64) -> Node {
    Node::new("C").prop("OO".into()).prop(Prop::I64(from)).prop(Prop::I64(to))
}

pub fn op(from: i64, to: i64, property: &str) -> Node {
    oo(from, to).prop(property.into())
}

/// A 7400 file with header noise, `Objects` and `Connections`.
pub fn document(objects: Vec<Node>, connections: Vec<Node>) -> Vec<u8> {
    document_with_version(7400, objects, connections)
}

pub fn document_with_version(version: u32, objects: Vec<Node>, connections: Vec<Node>) -> Vec<u8> {
    let header_extension = Node::new("FBXHeaderExtension")
        .child(Node::leaf("FBXVersion", Prop::I32(version as i32)))
        .child(Node::leaf("Creator", "kinesis tests".into()));

    let mut objects_node = Node::new("Objects");
    objects_node.children = objects;
    let mut connections_node = Node::new("Connections");
    connections_node.children = connections;

    encode(
        version,
        &[
            header_extension,
            Node::leaf("FileId", Prop::I32(0)),
            Node::leaf("CreationTime", "1970-01-01".into()),
            Node::leaf("Creator", "kinesis tests".into()),
            objects_node,
            connections_node,
        ],
    )
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
