use glam::Vec3;

use crate::animation::values::Pose;
use crate::resources::MeshKey;

/// Static description of one scene node, as produced by an importer.
///
/// A list of `MeshObject`s forms a hierarchy through `parent`, an index into
/// the same list.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshObject {
    pub name: String,
    pub position: Vec3,
    /// Euler angles in radians.
    pub rotation: Vec3,
    pub scale: Vec3,
    pub mesh: Option<MeshKey>,
    pub parent: Option<usize>,
    pub is_bone: bool,
}

impl MeshObject {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
            mesh: None,
            parent: None,
            is_bone: false,
        }
    }

    /// The authored local transform.
    #[must_use]
    pub fn rest_pose(&self) -> Pose {
        Pose::from_euler(self.position, self.rotation, self.scale)
    }
}
