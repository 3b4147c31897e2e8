//! Polygon-soup to triangle-list compilation
//!
//! An FBX `Geometry` stores control points plus a polygon-vertex index array
//! in which the last corner of every polygon is bit-complemented. Normals and
//! UV indices are given per corner. Compilation expands corners into
//! renderer vertices, deduplicates identical ones and fans every polygon into
//! triangles.

use glam::{Vec2, Vec3};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use super::reader::{Property, RawNode};
use super::objects::object_header;
use crate::errors::Result;
use crate::resources::mesh_descriptor::fan_triangles;
use crate::resources::{Deform, Mesh, MeshKey, MeshRegistry, MeshVertex, VertexKind};

/// Exact identity of a compiled vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct VertexKey {
    position: [u32; 3],
    normal: [u32; 3],
    uv: [u32; 2],
    source_index: u32,
}

impl VertexKey {
    fn of(vertex: &MeshVertex) -> Self {
        Self {
            position: vertex.position.to_array().map(f32::to_bits),
            normal: vertex.normal.to_array().map(f32::to_bits),
            uv: vertex.uv.to_array().map(f32::to_bits),
            source_index: vertex.source_index,
        }
    }
}

#[derive(Debug, Clone)]
struct CompiledGeometry {
    revision: u64,
    vertices: Vec<MeshVertex>,
    indices: Vec<u32>,
}

#[derive(Debug, Clone, Copy)]
struct CachedMesh {
    key: MeshKey,
    revision: u64,
}

/// Raw geometry arrays with lazily compiled render data.
#[derive(Debug, Clone, Default)]
pub struct FbxGeometry {
    pub id: i64,
    pub name: String,

    positions: Vec<f64>,
    polygon_vertex_index: Vec<i32>,
    normals: Vec<f64>,
    uvs: Vec<f64>,
    uv_indices: Vec<i32>,

    /// Skin deformers bound to this geometry.
    pub(crate) skins: Vec<usize>,
    deforms: Vec<Deform>,

    /// Bumped whenever any input of the compiled mesh changes.
    revision: u64,
    compiled: Option<CompiledGeometry>,
    mesh: Option<CachedMesh>,
}

impl FbxGeometry {
    #[must_use]
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            ..Default::default()
        }
    }

    pub(crate) fn from_node(node: &RawNode) -> Option<Self> {
        let (id, name, _) = object_header(node)?;
        let mut geometry = Self::new(id, name);

        geometry.positions = node.child_property("Vertices").and_then(Property::to_f64_vec).unwrap_or_default();
        geometry.polygon_vertex_index = node
            .child_property("PolygonVertexIndex")
            .and_then(Property::to_i32_vec)
            .unwrap_or_default();

        if let Some(layer) = node.child("LayerElementNormal") {
            if let Some(mode) = layer.child_property("MappingInformationType").and_then(Property::as_str)
                && mode != "ByPolygonVertex"
            {
                log::debug!("FBX geometry '{}': normal mapping '{mode}' read as per corner", geometry.name);
            }
            geometry.normals = layer.child_property("Normals").and_then(Property::to_f64_vec).unwrap_or_default();
        }

        if let Some(layer) = node.child("LayerElementUV") {
            geometry.uvs = layer.child_property("UV").and_then(Property::to_f64_vec).unwrap_or_default();
            geometry.uv_indices = layer.child_property("UVIndex").and_then(Property::to_i32_vec).unwrap_or_default();
        }

        Some(geometry)
    }

    // ========================================================================
    // Raw data
    // ========================================================================

    /// Control point coordinates, three per point.
    pub fn set_positions(&mut self, positions: Vec<f64>) {
        self.positions = positions;
        self.invalidate();
    }

    /// Polygon corners as control point indices; a negative entry `i` closes
    /// its polygon and stands for index `!i`.
    pub fn set_polygon_vertex_index(&mut self, indices: Vec<i32>) {
        self.polygon_vertex_index = indices;
        self.invalidate();
    }

    /// Normals, three coordinates per polygon corner.
    pub fn set_normals(&mut self, normals: Vec<f64>) {
        self.normals = normals;
        self.invalidate();
    }

    /// UV table (two coordinates per entry) and per-corner indices into it.
    pub fn set_uvs(&mut self, uvs: Vec<f64>, uv_indices: Vec<i32>) {
        self.uvs = uvs;
        self.uv_indices = uv_indices;
        self.invalidate();
    }

    /// Attaches a skin deform. It is carried by the next compiled mesh.
    pub fn add_deform(&mut self, deform: Deform) {
        self.deforms.push(deform);
        self.invalidate();
    }

    #[inline]
    #[must_use]
    pub fn deforms(&self) -> &[Deform] {
        &self.deforms
    }

    /// Current revision of the raw data. Every setter advances it.
    #[inline]
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn invalidate(&mut self) {
        self.revision += 1;
    }

    // ========================================================================
    // Compiled data
    // ========================================================================

    /// Deduplicated vertices, compiled on first access after a change.
    pub fn vertices(&mut self) -> &[MeshVertex] {
        &self.compiled().vertices
    }

    /// Triangle list indexing [`vertices`](Self::vertices).
    pub fn triangles(&mut self) -> &[u32] {
        &self.compiled().indices
    }

    fn compiled(&mut self) -> &CompiledGeometry {
        let compiled = match self.compiled.take() {
            Some(compiled) if compiled.revision == self.revision => compiled,
            _ => self.compile(),
        };
        self.compiled.insert(compiled)
    }

    /// Builds a standalone [`Mesh`] from the current data.
    pub fn build_mesh(&mut self, compute_tangents: bool) -> Mesh {
        let name = self.name.clone();
        let deforms = self.deforms.clone();
        let compiled = self.compiled();

        let mut mesh = Mesh::new(name, VertexKind::PositionUv, compiled.vertices.clone(), compiled.indices.clone());
        if compute_tangents {
            mesh.compute_tangents();
        }
        for deform in deforms {
            mesh.add_deform(deform);
        }
        mesh
    }

    /// Registers the compiled mesh and returns its key.
    ///
    /// The key is cached: until the raw data changes, repeated calls return
    /// the same key without touching the registry. A stale mesh is released
    /// from the registry before its replacement is inserted.
    pub fn mesh_key(&mut self, registry: &mut MeshRegistry, compute_tangents: bool) -> Result<MeshKey> {
        if let Some(cached) = self.mesh
            && cached.revision == self.revision
            && registry.contains(cached.key)
        {
            return Ok(cached.key);
        }

        if let Some(stale) = self.mesh.take() {
            registry.remove(stale.key);
        }

        let mesh = self.build_mesh(compute_tangents);
        let key = registry.insert(mesh)?;
        self.mesh = Some(CachedMesh {
            key,
            revision: self.revision,
        });
        Ok(key)
    }

    // ========================================================================
    // Compilation
    // ========================================================================

    fn compile(&self) -> CompiledGeometry {
        let mut vertices = Vec::new();
        let mut indices = Vec::new();
        let mut lookup: FxHashMap<VertexKey, u32> = FxHashMap::default();
        let mut polygon: SmallVec<[usize; 8]> = SmallVec::new();

        let point_count = self.positions.len() / 3;

        let mut emit = |polygon: &[usize], vertices: &mut Vec<MeshVertex>, indices: &mut Vec<u32>| {
            if polygon.len() < 3 {
                log::debug!("FBX geometry '{}': skipping polygon with {} corners", self.name, polygon.len());
                return;
            }
            if let Some(&bad) = polygon
                .iter()
                .find(|&&corner| control_point(self.polygon_vertex_index[corner]) >= point_count)
            {
                log::warn!(
                    "FBX geometry '{}': corner {bad} references a missing control point, polygon skipped",
                    self.name
                );
                return;
            }

            for triangle in fan_triangles(polygon.len()) {
                for local in triangle {
                    let vertex = self.corner_vertex(polygon[local]);
                    let index = *lookup.entry(VertexKey::of(&vertex)).or_insert_with(|| {
                        vertices.push(vertex);
                        (vertices.len() - 1) as u32
                    });
                    indices.push(index);
                }
            }
        };

        for (corner, &raw) in self.polygon_vertex_index.iter().enumerate() {
            polygon.push(corner);
            if raw < 0 {
                emit(polygon.as_slice(), &mut vertices, &mut indices);
                polygon.clear();
            }
        }
        if !polygon.is_empty() {
            log::debug!("FBX geometry '{}': closing unterminated trailing polygon", self.name);
            emit(polygon.as_slice(), &mut vertices, &mut indices);
        }

        CompiledGeometry {
            revision: self.revision,
            vertices,
            indices,
        }
    }

    /// Vertex data of one polygon corner.
    fn corner_vertex(&self, corner: usize) -> MeshVertex {
        let point = control_point(self.polygon_vertex_index[corner]);

        let position = vec3_at(&self.positions, point).unwrap_or(Vec3::ZERO);
        let normal = vec3_at(&self.normals, corner).unwrap_or(Vec3::ZERO);

        let uv = if self.uv_indices.is_empty() {
            vec2_at(&self.uvs, corner)
        } else {
            self.uv_indices
                .get(corner)
                .and_then(|&i| usize::try_from(i).ok())
                .and_then(|i| vec2_at(&self.uvs, i))
        }
        .unwrap_or(Vec2::ZERO);

        MeshVertex {
            position,
            normal,
            uv,
            source_index: point as u32,
            ..Default::default()
        }
    }
}

#[inline]
fn control_point(raw: i32) -> usize {
    (if raw < 0 { !raw } else { raw }) as usize
}

fn vec3_at(values: &[f64], index: usize) -> Option<Vec3> {
    let v = values.get(index * 3..index * 3 + 3)?;
    Some(Vec3::new(v[0] as f32, v[1] as f32, v[2] as f32))
}

fn vec2_at(values: &[f64], index: usize) -> Option<Vec2> {
    let v = values.get(index * 2..index * 2 + 2)?;
    Some(Vec2::new(v[0] as f32, v[1] as f32))
}
