use glam::Mat4;

/// One vertex influenced by a bone.
///
/// `vertex` refers to the *source* (control point) index of the mesh, i.e.
/// [`MeshVertex::source_index`](crate::resources::mesh::MeshVertex::source_index),
/// not to the position of a compiled vertex in the vertex array.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexInfluence {
    pub vertex: u32,
    pub weight: f32,
}

/// Compiled skin binding of a single bone.
///
/// A `Deform` is matched to a runtime node by name: the renderer receives the
/// node's model matrix together with this deform's inverse bind matrix.
#[derive(Debug, Clone)]
pub struct Deform {
    pub name: String,
    pub inverse_bind_matrix: Mat4,
    pub influences: Vec<VertexInfluence>,

    /// Bone palette slot, assigned by [`Mesh::add_deform`](crate::resources::Mesh::add_deform).
    pub(crate) bone_index: u32,
}

impl Deform {
    #[must_use]
    pub fn new(name: impl Into<String>, inverse_bind_matrix: Mat4, influences: Vec<VertexInfluence>) -> Self {
        Self {
            name: name.into(),
            inverse_bind_matrix,
            influences,
            bone_index: 0,
        }
    }

    /// Builds a deform from parallel index / weight arrays.
    ///
    /// Returns `None` when the arrays differ in length.
    #[must_use]
    pub fn from_parallel(name: impl Into<String>, inverse_bind_matrix: Mat4, indices: &[i32], weights: &[f64]) -> Option<Self> {
        if indices.len() != weights.len() {
            return None;
        }

        let influences = indices
            .iter()
            .zip(weights)
            .filter(|(index, _)| **index >= 0)
            .map(|(&index, &weight)| VertexInfluence {
                vertex: index as u32,
                weight: weight as f32,
            })
            .collect();

        Some(Self::new(name, inverse_bind_matrix, influences))
    }

    /// Bone palette slot of this deform inside its mesh.
    #[inline]
    #[must_use]
    pub fn bone_index(&self) -> u32 {
        self.bone_index
    }

    /// Weight applied to the given source vertex, zero if it is not influenced.
    #[must_use]
    pub fn weight_of(&self, vertex: u32) -> f32 {
        self.influences
            .iter()
            .filter(|influence| influence.vertex == vertex)
            .map(|influence| influence.weight)
            .sum()
    }
}
