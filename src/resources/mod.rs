//! Renderer-facing resources
//!
//! - [`Mesh`]: compiled triangle mesh with its skin bindings
//! - [`Deform`]: one bone's influence on a mesh
//! - [`MeshRegistry`]: bounded, generation-checked store of live meshes
//! - [`MeshDescriptor`]: procedural mesh assembly

pub mod deform;
pub mod mesh;
pub mod mesh_descriptor;
pub mod registry;

pub use deform::{Deform, VertexInfluence};
pub use mesh::{BoundingSphere, Mesh, MeshVertex, VertexKind};
pub use mesh_descriptor::{MeshDescriptor, fan_triangles};
pub use registry::{DEFAULT_MESH_CAPACITY, MeshKey, MeshRegistry};
