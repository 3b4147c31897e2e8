//! Scene nodes and the animated mesh group
//!
//! - [`MeshObject`]: static node description produced by importers
//! - [`Transform`]: TRS component with cached, dirty-checked matrices
//! - [`MeshGroup`]: runtime hierarchy driven by animation tracks

pub mod mesh_group;
pub mod mesh_object;
pub mod transform;

pub use mesh_group::{AnimationNode, MeshGroup, NodeParent};
pub use mesh_object::MeshObject;
pub use transform::Transform;
