use std::sync::Arc;

use glam::Affine3A;
use rustc_hash::FxHashMap;

use crate::animation::{Animation, AnimationMixer, AnimationSettings, AnimationTrack, Pose, TrackHandle};
use crate::render::{BoneTransform, MaterialKey, RenderQueue};
use crate::resources::{MeshKey, MeshRegistry};
use crate::scene::mesh_object::MeshObject;
use crate::scene::transform::Transform;

/// Parent of a runtime node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeParent {
    /// Attached directly to the mesh group.
    Group,
    /// Index of another node of the same group.
    Node(usize),
}

/// Runtime instance of a [`MeshObject`] inside a [`MeshGroup`].
#[derive(Debug, Clone)]
pub struct AnimationNode {
    pub name: String,
    pub mesh: Option<MeshKey>,
    pub is_bone: bool,
    pub transform: Transform,
    rest_pose: Pose,
    skinned: bool,
    parent: NodeParent,
}

impl AnimationNode {
    /// Pose recorded when the node was instantiated.
    #[inline]
    #[must_use]
    pub fn rest_pose(&self) -> &Pose {
        &self.rest_pose
    }

    /// Whether the node's mesh has at least one deform.
    #[inline]
    #[must_use]
    pub fn is_skinned(&self) -> bool {
        self.skinned
    }

    #[inline]
    #[must_use]
    pub fn parent(&self) -> NodeParent {
        self.parent
    }
}

/// A hierarchy of animated nodes driven by a set of animation tracks.
///
/// Per frame, call [`on_process`](Self::on_process) and then
/// [`on_render_queue`](Self::on_render_queue). Blending mutates the same
/// nodes rendering reads, so the borrow checker keeps the two ordered.
pub struct MeshGroup {
    pub name: String,
    /// Entity-level transform; parentless nodes hang off it.
    pub transform: Transform,
    pub material: Option<MaterialKey>,

    nodes: Vec<AnimationNode>,
    name_lookup: FxHashMap<String, usize>,
    mixer: AnimationMixer,
}

impl MeshGroup {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_settings(name, AnimationSettings::default())
    }

    #[must_use]
    pub fn with_settings(name: impl Into<String>, settings: AnimationSettings) -> Self {
        Self {
            name: name.into(),
            transform: Transform::new(),
            material: None,
            nodes: Vec::new(),
            name_lookup: FxHashMap::default(),
            mixer: AnimationMixer::with_settings(settings),
        }
    }

    // ========================================================================
    // Hierarchy
    // ========================================================================

    /// Replaces the node hierarchy with runtime copies of `objects`.
    ///
    /// Parent links are re-created by position: node `i` gets the parent the
    /// `i`-th object names. Objects without a valid parent attach to the group.
    pub fn set_mesh_list(&mut self, objects: &[MeshObject], registry: &MeshRegistry) {
        self.nodes.clear();
        self.name_lookup.clear();

        for (index, object) in objects.iter().enumerate() {
            let parent = match object.parent {
                Some(p) if p < objects.len() && p != index => NodeParent::Node(p),
                Some(p) => {
                    log::warn!("MeshGroup '{}': node '{}' has invalid parent index {p}", self.name, object.name);
                    NodeParent::Group
                }
                None => NodeParent::Group,
            };

            let skinned = object
                .mesh
                .and_then(|key| registry.get(key))
                .is_some_and(|mesh| mesh.is_skinned());

            let rest_pose = object.rest_pose();

            self.name_lookup.entry(object.name.clone()).or_insert(index);
            self.nodes.push(AnimationNode {
                name: object.name.clone(),
                mesh: object.mesh,
                is_bone: object.is_bone,
                transform: Transform::from_pose(&rest_pose),
                rest_pose,
                skinned,
                parent,
            });
        }

        self.update_world_matrices();
    }

    #[inline]
    #[must_use]
    pub fn nodes(&self) -> &[AnimationNode] {
        &self.nodes
    }

    #[must_use]
    pub fn node_by_name(&self, name: &str) -> Option<&AnimationNode> {
        self.name_lookup.get(name).map(|&i| &self.nodes[i])
    }

    // ========================================================================
    // Tracks
    // ========================================================================

    pub fn create_animation_track(&mut self, animation: Arc<Animation>) -> TrackHandle {
        self.mixer.create_track(animation)
    }

    pub fn remove_animation_track(&mut self, handle: TrackHandle) -> Option<AnimationTrack> {
        self.mixer.remove_track(handle)
    }

    #[must_use]
    pub fn track(&self, handle: TrackHandle) -> Option<&AnimationTrack> {
        self.mixer.track(handle)
    }

    pub fn track_mut(&mut self, handle: TrackHandle) -> Option<&mut AnimationTrack> {
        self.mixer.track_mut(handle)
    }

    #[inline]
    #[must_use]
    pub fn mixer(&self) -> &AnimationMixer {
        &self.mixer
    }

    // ========================================================================
    // Frame
    // ========================================================================

    /// Advances tracks, blends every node and refreshes world matrices.
    pub fn on_process(&mut self, delta: f32) {
        self.mixer.process(delta);

        if self.mixer.any_playing() {
            for node in &mut self.nodes {
                let pose = self.mixer.blend(&node.name, &node.rest_pose);
                node.transform.set_pose(&pose);
            }
        } else {
            for node in &mut self.nodes {
                node.transform.set_pose(&node.rest_pose);
            }
        }

        self.update_world_matrices();
    }

    /// Recomputes world matrices, parents before children.
    fn update_world_matrices(&mut self) {
        self.transform.update_local_matrix();
        let root = self.transform.local_matrix;
        self.transform.set_world_matrix(root);

        let count = self.nodes.len();
        let mut done = vec![false; count];
        let mut chain: Vec<usize> = Vec::new();

        for start in 0..count {
            let mut current = start;
            while !done[current] {
                chain.push(current);
                match self.nodes[current].parent {
                    NodeParent::Node(p) if !chain.contains(&p) => current = p,
                    _ => break,
                }
            }

            while let Some(index) = chain.pop() {
                let parent_world: Affine3A = match self.nodes[index].parent {
                    NodeParent::Node(p) if done[p] => self.nodes[p].transform.world_matrix,
                    _ => root,
                };

                let node = &mut self.nodes[index];
                node.transform.update_local_matrix();
                node.transform.world_matrix = parent_world * node.transform.local_matrix;
                done[index] = true;
            }
        }
    }

    /// Submits every node that carries a mesh.
    ///
    /// Skinned meshes receive one [`BoneTransform`] per deform whose name
    /// matches a node of this group; deforms without a node are left out.
    pub fn on_render_queue<Q: RenderQueue + ?Sized>(&self, registry: &MeshRegistry, queue: &mut Q) {
        for node in &self.nodes {
            let Some(key) = node.mesh else {
                continue;
            };
            let Some(mesh) = registry.get(key) else {
                log::debug!("MeshGroup '{}': node '{}' refers to a released mesh", self.name, node.name);
                continue;
            };

            let model_matrix = node.transform.world_matrix_as_mat4();

            if node.skinned {
                let bones: Vec<BoneTransform<'_>> = mesh
                    .deforms()
                    .iter()
                    .filter_map(|deform| {
                        let &bone = self.name_lookup.get(&deform.name)?;
                        Some(BoneTransform {
                            model_matrix: self.nodes[bone].transform.world_matrix_as_mat4(),
                            deform,
                        })
                    })
                    .collect();

                queue.submit_skinned_mesh(key, self.material, model_matrix, &bones);
            } else {
                queue.submit_mesh(key, self.material, model_matrix);
            }
        }
    }
}
