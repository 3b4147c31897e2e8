use slotmap::{SlotMap, new_key_type};

use crate::errors::{KinesisError, Result};
use crate::resources::mesh::Mesh;

new_key_type! {
    /// Generation-checked handle of a mesh living in a [`MeshRegistry`].
    pub struct MeshKey;
}

/// Default number of meshes that may be alive at the same time.
pub const DEFAULT_MESH_CAPACITY: usize = 4096;

/// Bounded store of every live mesh.
///
/// Renderer-side caches address meshes by [`MeshKey`] instead of by pointer.
/// Keys carry a generation, so a key whose mesh was removed never resolves
/// again, even after its slot is reused by a new mesh.
///
/// The registry is an explicit object passed to whoever creates or reads
/// meshes; it is not thread-guarded and belongs to the simulation thread.
pub struct MeshRegistry {
    meshes: SlotMap<MeshKey, Mesh>,
    capacity: usize,
}

impl Default for MeshRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MeshRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MESH_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            meshes: SlotMap::with_capacity_and_key(capacity.min(DEFAULT_MESH_CAPACITY)),
            capacity,
        }
    }

    /// Registers a mesh, failing when every slot is in use.
    pub fn insert(&mut self, mesh: Mesh) -> Result<MeshKey> {
        if self.meshes.len() >= self.capacity {
            log::warn!("Mesh registry full, dropping mesh '{}'", mesh.name);
            return Err(KinesisError::RegistryFull { capacity: self.capacity });
        }
        Ok(self.meshes.insert(mesh))
    }

    /// Releases a mesh. Returns `None` if the key was already released.
    pub fn remove(&mut self, key: MeshKey) -> Option<Mesh> {
        self.meshes.remove(key)
    }

    #[inline]
    #[must_use]
    pub fn get(&self, key: MeshKey) -> Option<&Mesh> {
        self.meshes.get(key)
    }

    #[inline]
    pub fn get_mut(&mut self, key: MeshKey) -> Option<&mut Mesh> {
        self.meshes.get_mut(key)
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, key: MeshKey) -> bool {
        self.meshes.contains_key(key)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = (MeshKey, &Mesh)> {
        self.meshes.iter()
    }
}
