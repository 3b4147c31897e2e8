use glam::{Vec2, Vec3, Vec4};
use smallvec::SmallVec;

use crate::resources::mesh::{Mesh, MeshVertex, VertexKind};

/// Triangles of a convex polygon with `corner_count` corners.
///
/// Every triangle is anchored at corner 0 and walks the fan; the last two
/// corners of each triangle are swapped so front faces wind clockwise, which
/// is what the left-handed renderer culls against.
///
/// For a quad this yields `[0, 2, 1]` and `[0, 3, 2]`.
pub fn fan_triangles(corner_count: usize) -> impl Iterator<Item = [usize; 3]> {
    (1..corner_count.saturating_sub(1)).map(|k| [0, k + 1, k])
}

/// Generic mesh assembly helper for procedurally built meshes.
///
/// Collects vertices and polygons, then triangulates with [`fan_triangles`]
/// and derives area-weighted vertex normals. Meshes with vertex colors are
/// tagged [`VertexKind::PositionColor`], all others [`VertexKind::PositionUv`].
#[derive(Debug, Clone, Default)]
pub struct MeshDescriptor {
    name: String,
    positions: Vec<Vec3>,
    uvs: Vec<Vec2>,
    colors: Vec<Vec4>,
    polygons: Vec<SmallVec<[u32; 4]>>,
}

impl MeshDescriptor {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn push_vertex(&mut self, position: Vec3) -> u32 {
        self.positions.push(position);
        (self.positions.len() - 1) as u32
    }

    pub fn push_vertex_uv(&mut self, position: Vec3, uv: Vec2) -> u32 {
        self.uvs.resize(self.positions.len(), Vec2::ZERO);
        self.uvs.push(uv);
        self.push_vertex(position)
    }

    pub fn push_vertex_color(&mut self, position: Vec3, color: Vec4) -> u32 {
        self.colors.resize(self.positions.len(), Vec4::ONE);
        self.colors.push(color);
        self.push_vertex(position)
    }

    /// Adds a polygon. Polygons with fewer than three corners are ignored.
    pub fn push_polygon(&mut self, corners: &[u32]) {
        if corners.len() < 3 {
            log::debug!("MeshDescriptor '{}': skipping polygon with {} corners", self.name, corners.len());
            return;
        }
        self.polygons.push(SmallVec::from_slice(corners));
    }

    #[inline]
    #[must_use]
    pub fn vertex_kind(&self) -> VertexKind {
        if self.colors.is_empty() {
            VertexKind::PositionUv
        } else {
            VertexKind::PositionColor
        }
    }

    #[must_use]
    pub fn build(&self) -> Mesh {
        let count = self.positions.len();
        let mut vertices: Vec<MeshVertex> = (0..count)
            .map(|i| MeshVertex {
                position: self.positions[i],
                uv: self.uvs.get(i).copied().unwrap_or(Vec2::ZERO),
                color: self.colors.get(i).copied().unwrap_or(Vec4::ONE),
                source_index: i as u32,
                ..Default::default()
            })
            .collect();

        let mut indices = Vec::new();
        for polygon in &self.polygons {
            if polygon.iter().any(|&c| c as usize >= count) {
                log::warn!("MeshDescriptor '{}': polygon references a missing vertex", self.name);
                continue;
            }
            for [a, b, c] in fan_triangles(polygon.len()) {
                indices.extend_from_slice(&[polygon[a], polygon[b], polygon[c]]);
            }
        }

        // Area-weighted normals: the cross product length is twice the triangle area.
        for tri in indices.chunks_exact(3) {
            let (i0, i1, i2) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
            let face = (vertices[i2].position - vertices[i0].position)
                .cross(vertices[i1].position - vertices[i0].position);
            vertices[i0].normal += face;
            vertices[i1].normal += face;
            vertices[i2].normal += face;
        }
        for vertex in &mut vertices {
            vertex.normal = vertex.normal.normalize_or_zero();
        }

        let mut mesh = Mesh::new(self.name.clone(), self.vertex_kind(), vertices, indices);
        if mesh.vertex_kind() == VertexKind::PositionUv {
            mesh.compute_tangents();
        }
        mesh
    }
}
