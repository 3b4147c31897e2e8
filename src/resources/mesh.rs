use glam::{Vec2, Vec3, Vec4};

use crate::resources::deform::Deform;

/// Vertex layout tag consumed by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexKind {
    /// Position, normal and texture coordinates.
    PositionUv,
    /// Position, normal and per-vertex color.
    PositionColor,
}

/// A renderer-ready vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshVertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
    pub color: Vec4,
    pub tangent: Vec3,
    pub bitangent: Vec3,
    /// Index of the control point this vertex was compiled from.
    /// Skin influences ([`Deform`]) are keyed by this index.
    pub source_index: u32,
}

impl Default for MeshVertex {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            normal: Vec3::ZERO,
            uv: Vec2::ZERO,
            color: Vec4::ONE,
            tangent: Vec3::ZERO,
            bitangent: Vec3::ZERO,
            source_index: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

impl BoundingSphere {
    #[must_use]
    pub fn contains(&self, point: Vec3) -> bool {
        point.distance_squared(self.center) <= self.radius * self.radius
    }
}

/// Compiled, renderer-facing triangle mesh.
///
/// The vertex and index arrays are fixed once the mesh is built; only the
/// list of attached [`Deform`]s and the derived tangent frames change after
/// construction.
#[derive(Debug, Clone)]
pub struct Mesh {
    pub name: String,
    vertex_kind: VertexKind,
    vertices: Box<[MeshVertex]>,
    indices: Box<[u32]>,
    centroid: Vec3,
    bounding_sphere: BoundingSphere,
    deforms: Vec<Deform>,
}

impl Mesh {
    /// Creates a mesh and computes its centroid and bounding sphere.
    #[must_use]
    pub fn new(name: impl Into<String>, vertex_kind: VertexKind, vertices: Vec<MeshVertex>, indices: Vec<u32>) -> Self {
        let mut mesh = Self {
            name: name.into(),
            vertex_kind,
            vertices: vertices.into_boxed_slice(),
            indices: indices.into_boxed_slice(),
            centroid: Vec3::ZERO,
            bounding_sphere: BoundingSphere { center: Vec3::ZERO, radius: 0.0 },
            deforms: Vec::new(),
        };
        mesh.compute_bounding_volume();
        mesh
    }

    #[inline]
    #[must_use]
    pub fn vertex_kind(&self) -> VertexKind {
        self.vertex_kind
    }

    #[inline]
    #[must_use]
    pub fn vertices(&self) -> &[MeshVertex] {
        &self.vertices
    }

    #[inline]
    #[must_use]
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    #[inline]
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    #[inline]
    #[must_use]
    pub fn centroid(&self) -> Vec3 {
        self.centroid
    }

    #[inline]
    #[must_use]
    pub fn bounding_sphere(&self) -> BoundingSphere {
        self.bounding_sphere
    }

    #[inline]
    #[must_use]
    pub fn deforms(&self) -> &[Deform] {
        &self.deforms
    }

    /// A mesh is skinned when at least one bone deforms it.
    #[inline]
    #[must_use]
    pub fn is_skinned(&self) -> bool {
        !self.deforms.is_empty()
    }

    #[must_use]
    pub fn deform_by_name(&self, name: &str) -> Option<&Deform> {
        self.deforms.iter().find(|d| d.name == name)
    }

    /// Attaches a deform and assigns it the next bone palette slot.
    pub fn add_deform(&mut self, mut deform: Deform) -> u32 {
        let slot = self.deforms.len() as u32;
        deform.bone_index = slot;
        self.deforms.push(deform);
        slot
    }

    /// Centroid is the mean vertex position; the sphere is centered on it
    /// and reaches the farthest vertex.
    fn compute_bounding_volume(&mut self) {
        if self.vertices.is_empty() {
            self.centroid = Vec3::ZERO;
            self.bounding_sphere = BoundingSphere { center: Vec3::ZERO, radius: 0.0 };
            return;
        }

        let sum: Vec3 = self.vertices.iter().map(|v| v.position).sum();
        let centroid = sum / self.vertices.len() as f32;

        let radius = self
            .vertices
            .iter()
            .map(|v| v.position.distance(centroid))
            .fold(0.0_f32, f32::max);

        self.centroid = centroid;
        self.bounding_sphere = BoundingSphere { center: centroid, radius };
    }

    /// Computes per-vertex tangent and bitangent from positions and UVs.
    ///
    /// Triangles with a degenerate UV mapping contribute nothing. The tangent is
    /// orthogonalized against the normal; the bitangent keeps the handedness of
    /// the UV mapping.
    pub fn compute_tangents(&mut self) {
        let count = self.vertices.len();
        let mut tangents = vec![Vec3::ZERO; count];
        let mut bitangents = vec![Vec3::ZERO; count];

        for tri in self.indices.chunks_exact(3) {
            let (i0, i1, i2) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
            if i0 >= count || i1 >= count || i2 >= count {
                continue;
            }

            let (v0, v1, v2) = (&self.vertices[i0], &self.vertices[i1], &self.vertices[i2]);
            let e1 = v1.position - v0.position;
            let e2 = v2.position - v0.position;
            let d1 = v1.uv - v0.uv;
            let d2 = v2.uv - v0.uv;

            let det = d1.x * d2.y - d2.x * d1.y;
            if det.abs() < 1e-12 {
                continue;
            }
            let r = 1.0 / det;
            let t = (e1 * d2.y - e2 * d1.y) * r;
            let b = (e2 * d1.x - e1 * d2.x) * r;

            for i in [i0, i1, i2] {
                tangents[i] += t;
                bitangents[i] += b;
            }
        }

        for (i, vertex) in self.vertices.iter_mut().enumerate() {
            let n = vertex.normal;
            let t = (tangents[i] - n * n.dot(tangents[i])).normalize_or_zero();
            let handedness = if n.cross(t).dot(bitangents[i]) < 0.0 { -1.0 } else { 1.0 };

            vertex.tangent = t;
            vertex.bitangent = n.cross(t) * handedness;
        }
    }

    /// Merges several meshes into one.
    ///
    /// All inputs must share a vertex kind; a mixed set is reported and
    /// rejected. Deforms are concatenated and re-slotted in input order.
    #[must_use]
    pub fn merge(name: impl Into<String>, meshes: &[&Mesh]) -> Option<Mesh> {
        let first = meshes.first()?;
        let kind = first.vertex_kind;

        if meshes.iter().any(|m| m.vertex_kind != kind) {
            log::warn!("Refusing to merge {} meshes with mixed vertex kinds", meshes.len());
            return None;
        }

        let mut vertices = Vec::with_capacity(meshes.iter().map(|m| m.vertices.len()).sum());
        let mut indices = Vec::with_capacity(meshes.iter().map(|m| m.indices.len()).sum());

        for mesh in meshes {
            let base = vertices.len() as u32;
            vertices.extend_from_slice(&mesh.vertices);
            indices.extend(mesh.indices.iter().map(|i| i + base));
        }

        let mut merged = Mesh::new(name, kind, vertices, indices);
        for deform in meshes.iter().flat_map(|m| m.deforms.iter()) {
            merged.add_deform(deform.clone());
        }
        Some(merged)
    }
}
