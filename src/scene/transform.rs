use glam::{Affine3A, Mat4, Quat, Vec3};

use crate::animation::values::{Pose, euler_from_quat, quat_from_euler};

/// Transform component
///
/// Wraps a node's position, rotation and scale (TRS) together with the cached
/// local and world matrices and the shadow state used for dirty checking.
#[derive(Debug, Clone)]
pub struct Transform {
    // === Public properties ===
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,

    // === Matrix cache ===
    pub(crate) local_matrix: Affine3A,
    pub(crate) world_matrix: Affine3A,

    // === Dirty-check state ===
    last_position: Vec3,
    last_rotation: Quat,
    last_scale: Vec3,
    force_update: bool,
}

impl Transform {
    #[must_use]
    pub fn new() -> Self {
        Self::from_pose(&Pose::IDENTITY)
    }

    #[must_use]
    pub fn from_pose(pose: &Pose) -> Self {
        Self {
            position: pose.position,
            rotation: pose.rotation,
            scale: pose.scale,

            local_matrix: Affine3A::IDENTITY,
            world_matrix: Affine3A::IDENTITY,

            last_position: pose.position,
            last_rotation: pose.rotation,
            last_scale: pose.scale,
            force_update: true,
        }
    }

    // ========================================================================
    // Dirty-checked update
    // ========================================================================

    /// Rebuilds the local matrix if position, rotation or scale changed.
    /// Returns whether it was rebuilt.
    pub fn update_local_matrix(&mut self) -> bool {
        let changed = self.position != self.last_position
            || self.rotation != self.last_rotation
            || self.scale != self.last_scale
            || self.force_update;

        if changed {
            self.local_matrix = Affine3A::from_scale_rotation_translation(self.scale, self.rotation, self.position);

            self.last_position = self.position;
            self.last_rotation = self.rotation;
            self.last_scale = self.scale;
            self.force_update = false;
        }

        changed
    }

    // ========================================================================
    // Getters & Helpers
    // ========================================================================

    #[must_use]
    pub fn pose(&self) -> Pose {
        Pose {
            position: self.position,
            rotation: self.rotation,
            scale: self.scale,
        }
    }

    pub fn set_pose(&mut self, pose: &Pose) {
        self.position = pose.position;
        self.rotation = pose.rotation;
        self.scale = pose.scale;
    }

    /// Sets rotation from Euler angles in radians (X, then Y, then Z).
    pub fn set_rotation_euler(&mut self, euler: Vec3) {
        self.rotation = quat_from_euler(euler);
    }

    #[must_use]
    pub fn rotation_euler(&self) -> Vec3 {
        euler_from_quat(self.rotation)
    }

    #[inline]
    #[must_use]
    pub fn local_matrix(&self) -> &Affine3A {
        &self.local_matrix
    }

    #[inline]
    #[must_use]
    pub fn world_matrix(&self) -> &Affine3A {
        &self.world_matrix
    }

    /// World matrix as `Mat4`, the form handed to the renderer.
    #[inline]
    #[must_use]
    pub fn world_matrix_as_mat4(&self) -> Mat4 {
        Mat4::from(self.world_matrix)
    }

    pub fn set_world_matrix(&mut self, mat: Affine3A) {
        self.world_matrix = mat;
    }

    pub fn mark_dirty(&mut self) {
        self.force_update = true;
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}
