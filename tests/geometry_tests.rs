//! Geometry Tests
//!
//! Tests for:
//! - Fan triangulation order
//! - MeshDescriptor normals, vertex kinds and degenerate polygons
//! - FbxGeometry corner expansion, deduplication and lazy recompilation
//! - Mesh key caching and release against the registry
//! - Mesh bounds and merging

use glam::{Mat4, Vec2, Vec3, Vec4};

use kinesis::assets::loaders::fbx::FbxGeometry;
use kinesis::errors::KinesisError;
use kinesis::resources::{Deform, Mesh, MeshDescriptor, MeshRegistry, MeshVertex, VertexKind, fan_triangles};

const EPSILON: f32 = 1e-5;

fn unit_quad_descriptor() -> MeshDescriptor {
    let mut desc = MeshDescriptor::new("quad");
    let a = desc.push_vertex_uv(Vec3::new(0.0, 0.0, 0.0), Vec2::new(0.0, 0.0));
    let b = desc.push_vertex_uv(Vec3::new(1.0, 0.0, 0.0), Vec2::new(1.0, 0.0));
    let c = desc.push_vertex_uv(Vec3::new(1.0, 1.0, 0.0), Vec2::new(1.0, 1.0));
    let d = desc.push_vertex_uv(Vec3::new(0.0, 1.0, 0.0), Vec2::new(0.0, 1.0));
    desc.push_polygon(&[a, b, c, d]);
    desc
}

fn quad_geometry() -> FbxGeometry {
    let mut geometry = FbxGeometry::new(1, "quad");
    geometry.set_positions(vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0]);
    geometry.set_polygon_vertex_index(vec![0, 1, 2, !3]);
    geometry
}

// ============================================================================
// Triangulation
// ============================================================================

#[test]
fn fan_of_quad_is_two_triangles() {
    let triangles: Vec<[usize; 3]> = fan_triangles(4).collect();
    assert_eq!(triangles, vec![[0, 2, 1], [0, 3, 2]]);
}

#[test]
fn fan_of_n_gon_has_n_minus_two_triangles() {
    assert_eq!(fan_triangles(3).count(), 1);
    assert_eq!(fan_triangles(7).count(), 5);
    assert_eq!(fan_triangles(2).count(), 0);
    assert_eq!(fan_triangles(0).count(), 0);
}

// ============================================================================
// MeshDescriptor
// ============================================================================

#[test]
fn descriptor_quad_builds_two_triangles_with_normals() {
    let mesh = unit_quad_descriptor().build();

    assert_eq!(mesh.vertex_kind(), VertexKind::PositionUv);
    assert_eq!(mesh.triangle_count(), 2);
    assert_eq!(mesh.indices(), &[0, 2, 1, 0, 3, 2]);

    for vertex in mesh.vertices() {
        assert!(vertex.normal.abs_diff_eq(Vec3::Z, EPSILON), "normal {:?}", vertex.normal);
        assert!(vertex.tangent.length() > 0.5, "tangent should be derived from UVs");
    }
}

#[test]
fn descriptor_with_colors_is_position_color() {
    let mut desc = MeshDescriptor::new("tri");
    let a = desc.push_vertex_color(Vec3::ZERO, Vec4::new(1.0, 0.0, 0.0, 1.0));
    let b = desc.push_vertex_color(Vec3::X, Vec4::new(0.0, 1.0, 0.0, 1.0));
    let c = desc.push_vertex_color(Vec3::Y, Vec4::new(0.0, 0.0, 1.0, 1.0));
    desc.push_polygon(&[a, b, c]);

    let mesh = desc.build();
    assert_eq!(mesh.vertex_kind(), VertexKind::PositionColor);
    assert_eq!(mesh.vertices()[1].color, Vec4::new(0.0, 1.0, 0.0, 1.0));
}

#[test]
fn descriptor_ignores_degenerate_polygons() {
    let mut desc = MeshDescriptor::new("lines");
    let a = desc.push_vertex(Vec3::ZERO);
    let b = desc.push_vertex(Vec3::X);
    desc.push_polygon(&[a, b]);
    desc.push_polygon(&[a, b, 7]);

    let mesh = desc.build();
    assert_eq!(mesh.triangle_count(), 0);
}

// ============================================================================
// FbxGeometry
// ============================================================================

#[test]
fn geometry_quad_dedups_shared_corners() {
    let mut geometry = quad_geometry();

    assert_eq!(geometry.vertices().len(), 4);
    assert_eq!(geometry.triangles().len(), 6);
    for (i, vertex) in geometry.vertices().iter().enumerate() {
        assert!(vertex.source_index < 4, "vertex {i} has source {}", vertex.source_index);
    }
}

#[test]
fn geometry_repeated_access_reuses_compiled_arrays() {
    let mut geometry = quad_geometry();
    let revision = geometry.revision();

    let vertices = geometry.vertices().to_vec();
    let vertices_ptr = geometry.vertices().as_ptr();
    let triangles = geometry.triangles().to_vec();
    let triangles_ptr = geometry.triangles().as_ptr();

    assert_eq!(geometry.vertices(), vertices.as_slice());
    assert_eq!(geometry.vertices().as_ptr(), vertices_ptr);
    assert_eq!(geometry.triangles(), triangles.as_slice());
    assert_eq!(geometry.triangles().as_ptr(), triangles_ptr);
    assert_eq!(geometry.revision(), revision);

    geometry.set_normals(vec![0.0, 0.0, 1.0].repeat(4));
    assert!(geometry.revision() > revision);
    assert_eq!(geometry.vertices().len(), 4);
    assert!(geometry.vertices().iter().all(|v| v.normal.abs_diff_eq(Vec3::Z, EPSILON)));
}

#[test]
fn geometry_corners_with_distinct_normals_are_kept_apart() {
    let mut geometry = FbxGeometry::new(2, "two_tris");
    geometry.set_positions(vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0]);
    geometry.set_polygon_vertex_index(vec![0, 1, !2, 1, 3, !2]);
    // Second triangle flips its normals, so shared points do not merge.
    geometry.set_normals(vec![
        0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, //
        0.0, 0.0, -1.0, 0.0, 0.0, -1.0, 0.0, 0.0, -1.0,
    ]);

    assert_eq!(geometry.vertices().len(), 6);

    geometry.set_normals(vec![0.0, 0.0, 1.0].repeat(6));
    assert_eq!(geometry.vertices().len(), 4);
}

#[test]
fn geometry_uv_index_selects_table_entry() {
    let mut geometry = FbxGeometry::new(3, "tri");
    geometry.set_positions(vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
    geometry.set_polygon_vertex_index(vec![0, 1, !2]);
    geometry.set_uvs(vec![0.25, 0.75, 0.5, 0.5], vec![1, 0, 1]);

    let uvs: Vec<Vec2> = geometry.vertices().iter().map(|v| v.uv).collect();
    // Emission order is corners 0, 2, 1.
    assert_eq!(uvs, vec![Vec2::new(0.5, 0.5), Vec2::new(0.5, 0.5), Vec2::new(0.25, 0.75)]);
}

#[test]
fn geometry_polygon_with_missing_point_is_skipped() {
    let mut geometry = FbxGeometry::new(4, "broken");
    geometry.set_positions(vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
    geometry.set_polygon_vertex_index(vec![0, 1, !2, 0, 1, !9]);

    assert_eq!(geometry.triangles().len(), 3);
}

// ============================================================================
// Mesh Caching
// ============================================================================

#[test]
fn mesh_key_is_cached_until_data_changes() {
    let mut registry = MeshRegistry::new();
    let mut geometry = quad_geometry();

    let first = geometry.mesh_key(&mut registry, false).unwrap();
    let again = geometry.mesh_key(&mut registry, false).unwrap();
    assert_eq!(first, again);
    assert_eq!(registry.len(), 1);

    geometry.set_polygon_vertex_index(vec![0, 1, !2]);
    let rebuilt = geometry.mesh_key(&mut registry, false).unwrap();

    assert_ne!(first, rebuilt);
    assert!(!registry.contains(first), "stale mesh should be released");
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.get(rebuilt).unwrap().triangle_count(), 1);
}

#[test]
fn mesh_key_carries_deforms() {
    let mut registry = MeshRegistry::new();
    let mut geometry = quad_geometry();
    geometry.add_deform(Deform::from_parallel("bone", Mat4::IDENTITY, &[0, 1], &[1.0, 1.0]).unwrap());

    let key = geometry.mesh_key(&mut registry, true).unwrap();
    let mesh = registry.get(key).unwrap();
    assert!(mesh.is_skinned());
    assert_eq!(mesh.deform_by_name("bone").unwrap().bone_index(), 0);
}

#[test]
fn mesh_key_fails_when_registry_full() {
    let mut registry = MeshRegistry::with_capacity(0);
    let mut geometry = quad_geometry();

    let result = geometry.mesh_key(&mut registry, false);
    assert!(matches!(result, Err(KinesisError::RegistryFull { capacity: 0 })));
}

// ============================================================================
// Mesh
// ============================================================================

fn vertex_at(position: Vec3) -> MeshVertex {
    MeshVertex {
        position,
        ..Default::default()
    }
}

#[test]
fn mesh_bounds_enclose_vertices() {
    let mesh = Mesh::new(
        "pts",
        VertexKind::PositionUv,
        vec![vertex_at(Vec3::new(-1.0, 0.0, 0.0)), vertex_at(Vec3::new(1.0, 0.0, 0.0))],
        vec![],
    );

    assert!(mesh.centroid().abs_diff_eq(Vec3::ZERO, EPSILON));
    let sphere = mesh.bounding_sphere();
    assert!((sphere.radius - 1.0).abs() < EPSILON);
    assert!(sphere.contains(Vec3::new(0.5, 0.0, 0.0)));
    assert!(!sphere.contains(Vec3::new(0.0, 2.0, 0.0)));
}

#[test]
fn merge_offsets_indices_and_reslots_deforms() {
    let mut a = unit_quad_descriptor().build();
    let mut b = unit_quad_descriptor().build();
    a.add_deform(Deform::new("left", Mat4::IDENTITY, vec![]));
    b.add_deform(Deform::new("right", Mat4::IDENTITY, vec![]));

    let merged = Mesh::merge("both", &[&a, &b]).unwrap();
    assert_eq!(merged.vertices().len(), 8);
    assert_eq!(merged.triangle_count(), 4);
    assert_eq!(&merged.indices()[6..9], &[4, 6, 5]);
    assert_eq!(merged.deform_by_name("right").unwrap().bone_index(), 1);
}

#[test]
fn merge_rejects_mixed_vertex_kinds() {
    let uv = unit_quad_descriptor().build();
    let color = Mesh::new("c", VertexKind::PositionColor, vec![], vec![]);

    assert!(Mesh::merge("mixed", &[&uv, &color]).is_none());
    assert!(Mesh::merge("none", &[]).is_none());
}
