//! Render submission boundary
//!
//! The engine does not draw anything itself. Once per frame a mesh group
//! hands every visible mesh to a [`RenderQueue`] implemented by the renderer.

use glam::Mat4;
use slotmap::new_key_type;

use crate::resources::{Deform, MeshKey};

new_key_type! {
    /// Opaque handle of a renderer-side material.
    pub struct MaterialKey;
}

/// Current model matrix of one bone together with its skin binding.
#[derive(Debug, Clone, Copy)]
pub struct BoneTransform<'a> {
    pub model_matrix: Mat4,
    pub deform: &'a Deform,
}

impl BoneTransform<'_> {
    /// Matrix that moves a bind-pose vertex to its current model-space position.
    #[must_use]
    pub fn skinning_matrix(&self) -> Mat4 {
        self.model_matrix * self.deform.inverse_bind_matrix
    }
}

/// Receiver of draw submissions.
pub trait RenderQueue {
    fn submit_mesh(&mut self, mesh: MeshKey, material: Option<MaterialKey>, model_matrix: Mat4);

    /// `bones` holds one entry per deform of the mesh that matched a node,
    /// in the mesh's bone palette order.
    fn submit_skinned_mesh(
        &mut self,
        mesh: MeshKey,
        material: Option<MaterialKey>,
        model_matrix: Mat4,
        bones: &[BoneTransform<'_>],
    );
}
