use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::FbxImportOptions;
use super::animation::BakeSource;
use super::geometry::FbxGeometry;
use super::objects::{
    DeformerKind, FbxAnimationCurve, FbxAnimationCurveNode, FbxAnimationLayer, FbxAnimationStack, FbxDeformer,
    FbxModel, FbxNodeAttribute, axis_index,
};
use super::reader::{Property, RawNode};
use crate::animation::Animation;
use crate::errors::{KinesisError, Result};
use crate::resources::{Deform, MeshKey, MeshRegistry};
use crate::scene::MeshObject;

/// Imported scene: the node list plus every baked animation.
#[derive(Debug, Clone, Default)]
pub struct FbxScene {
    /// Nodes in file order; `parent` indexes this list.
    pub objects: Vec<MeshObject>,
    pub animations: Vec<Arc<Animation>>,
}

impl FbxScene {
    #[must_use]
    pub fn object_by_name(&self, name: &str) -> Option<&MeshObject> {
        self.objects.iter().find(|o| o.name == name)
    }

    #[must_use]
    pub fn animation_by_name(&self, name: &str) -> Option<&Arc<Animation>> {
        self.animations.iter().find(|a| a.name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ObjectKind {
    Model,
    Geometry,
    Deformer,
    NodeAttribute,
    AnimationCurve,
    AnimationCurveNode,
    AnimationLayer,
    AnimationStack,
}

/// Position of an object in its per-kind list.
#[derive(Debug, Clone, Copy)]
struct NodeRef {
    kind: ObjectKind,
    index: usize,
}

/// Typed objects of one file, linked by the `Connections` section.
#[derive(Debug, Default)]
pub struct SceneResolver {
    pub models: Vec<FbxModel>,
    pub geometries: Vec<FbxGeometry>,
    pub deformers: Vec<FbxDeformer>,
    pub attributes: Vec<FbxNodeAttribute>,
    pub curves: Vec<FbxAnimationCurve>,
    pub curve_nodes: Vec<FbxAnimationCurveNode>,
    pub layers: Vec<FbxAnimationLayer>,
    pub stacks: Vec<FbxAnimationStack>,

    ids: FxHashMap<i64, NodeRef>,
}

impl SceneResolver {
    /// Builds and links every object of a parsed document.
    ///
    /// `Objects` and `Connections` must both be present.
    pub fn from_document(nodes: &[RawNode]) -> Result<Self> {
        let objects = nodes
            .iter()
            .find(|n| n.name == "Objects")
            .ok_or(KinesisError::MissingSection("Objects"))?;
        let connections = nodes
            .iter()
            .find(|n| n.name == "Connections")
            .ok_or(KinesisError::MissingSection("Connections"))?;

        let mut resolver = Self::default();
        for object in &objects.children {
            resolver.add_object(object);
        }
        for connection in connections.children_named("C") {
            resolver.add_connection(connection);
        }

        log::debug!(
            "FBX resolved {} models, {} geometries, {} deformers, {} curve nodes, {} layers",
            resolver.models.len(),
            resolver.geometries.len(),
            resolver.deformers.len(),
            resolver.curve_nodes.len(),
            resolver.layers.len()
        );

        Ok(resolver)
    }

    // ========================================================================
    // Objects
    // ========================================================================

    fn add_object(&mut self, node: &RawNode) {
        let Some(id) = node.property(0).and_then(Property::as_i64) else {
            log::warn!("FBX object '{}' has no id, skipped", node.name);
            return;
        };
        if self.ids.contains_key(&id) {
            log::warn!("FBX object id {id} is declared twice, keeping the first");
            return;
        }

        let entry = match node.name.as_str() {
            "Model" => FbxModel::from_node(node).map(|o| push(&mut self.models, o, ObjectKind::Model)),
            "Geometry" => FbxGeometry::from_node(node).map(|o| push(&mut self.geometries, o, ObjectKind::Geometry)),
            "Deformer" => FbxDeformer::from_node(node).map(|o| push(&mut self.deformers, o, ObjectKind::Deformer)),
            "NodeAttribute" => {
                FbxNodeAttribute::from_node(node).map(|o| push(&mut self.attributes, o, ObjectKind::NodeAttribute))
            }
            "AnimationCurve" => {
                FbxAnimationCurve::from_node(node).map(|o| push(&mut self.curves, o, ObjectKind::AnimationCurve))
            }
            "AnimationCurveNode" => FbxAnimationCurveNode::from_node(node)
                .map(|o| push(&mut self.curve_nodes, o, ObjectKind::AnimationCurveNode)),
            "AnimationLayer" => {
                FbxAnimationLayer::from_node(node).map(|o| push(&mut self.layers, o, ObjectKind::AnimationLayer))
            }
            "AnimationStack" => {
                FbxAnimationStack::from_node(node).map(|o| push(&mut self.stacks, o, ObjectKind::AnimationStack))
            }
            other => {
                log::debug!("Ignoring FBX object {id} of kind '{other}'");
                None
            }
        };

        if let Some(node_ref) = entry {
            self.ids.insert(id, node_ref);
        }
    }

    // ========================================================================
    // Connections
    // ========================================================================

    fn add_connection(&mut self, node: &RawNode) {
        let (Some(from), Some(to)) = (
            node.property(1).and_then(Property::as_i64),
            node.property(2).and_then(Property::as_i64),
        ) else {
            log::warn!("FBX connection record without both ids, skipped");
            return;
        };
        let property = node.property(3).and_then(Property::as_str);

        // Id 0 is the implicit scene root.
        if to == 0 {
            return;
        }

        match (self.ids.get(&from).copied(), self.ids.get(&to).copied()) {
            (Some(src), Some(dst)) => {
                if !self.connect(src, dst, property) {
                    log::warn!("Unhandled FBX connection {:?} {from} -> {:?} {to}", src.kind, dst.kind);
                }
            }
            _ => log::debug!("FBX connection {from} -> {to} involves an ignored object"),
        }
    }

    /// Applies one link. Returns `false` when the pair is not meaningful.
    fn connect(&mut self, src: NodeRef, dst: NodeRef, property: Option<&str>) -> bool {
        use ObjectKind as K;

        match (src.kind, dst.kind) {
            (K::Model, K::Model) => {
                self.models[src.index].parent = Some(dst.index);
            }
            (K::Model, K::Deformer) => {
                self.deformers[dst.index].bone_model = Some(src.index);
            }
            (K::Geometry, K::Model) => {
                self.models[dst.index].geometry = Some(src.index);
            }
            (K::AnimationLayer, K::AnimationStack) => {
                self.stacks[dst.index].layers.push(src.index);
                self.layers[src.index].stack = Some(dst.index);
            }
            (K::AnimationCurveNode, K::Model) => {
                self.models[dst.index].curve_nodes.push(src.index);
                self.curve_nodes[src.index].affected_models.push(dst.index);
            }
            (K::AnimationCurveNode, K::AnimationLayer) => {
                self.layers[dst.index].curve_nodes.push(src.index);
            }
            (K::AnimationCurve, K::AnimationCurveNode) => {
                let Some(axis) = property.and_then(axis_index) else {
                    return false;
                };
                self.curve_nodes[dst.index].curves[axis] = Some(src.index);
            }
            (K::Deformer, K::Deformer) => {
                self.deformers[dst.index].children.push(src.index);
            }
            (K::Deformer, K::Geometry) => {
                self.geometries[dst.index].skins.push(src.index);
            }
            (K::NodeAttribute, K::Model) => {
                if self.attributes[src.index].is_limb() {
                    self.models[dst.index].is_limb = true;
                }
            }
            _ => return false,
        }
        true
    }

    // ========================================================================
    // Output
    // ========================================================================

    /// Deforms of every cluster reachable from a geometry's skins.
    fn collect_deforms(&self, geometry: &FbxGeometry) -> Vec<Deform> {
        let clusters = geometry.skins.iter().flat_map(|&skin| {
            let deformer = &self.deformers[skin];
            match deformer.kind {
                DeformerKind::Cluster => vec![skin],
                _ => deformer.children.clone(),
            }
        });

        clusters
            .filter_map(|cluster_index| {
                let cluster = &self.deformers[cluster_index];
                if cluster.kind != DeformerKind::Cluster {
                    return None;
                }

                let name = cluster
                    .bone_model
                    .map_or(cluster.name.as_str(), |m| self.models[m].name.as_str());

                let deform =
                    Deform::from_parallel(name, cluster.inverse_bind_matrix(), &cluster.indices, &cluster.weights);
                if deform.is_none() {
                    log::warn!(
                        "FBX cluster '{}': {} indices for {} weights, deform skipped",
                        cluster.name,
                        cluster.indices.len(),
                        cluster.weights.len()
                    );
                }
                deform
            })
            .collect()
    }

    /// Compiles meshes into `registry` and produces the scene.
    ///
    /// On failure every mesh this call inserted is released again.
    pub fn into_scene(mut self, registry: &mut MeshRegistry, options: &FbxImportOptions) -> Result<FbxScene> {
        for g in 0..self.geometries.len() {
            let deforms = self.collect_deforms(&self.geometries[g]);
            for deform in deforms {
                self.geometries[g].add_deform(deform);
            }
        }

        let mut inserted: Vec<MeshKey> = Vec::new();
        match self.build_objects(registry, options, &mut inserted) {
            Ok(objects) => {
                let animations = if options.skip_animations {
                    Vec::new()
                } else {
                    BakeSource {
                        models: &self.models,
                        stacks: &self.stacks,
                        layers: &self.layers,
                        curve_nodes: &self.curve_nodes,
                        curves: &self.curves,
                    }
                    .bake()
                    .into_iter()
                    .map(Arc::new)
                    .collect()
                };
                Ok(FbxScene { objects, animations })
            }
            Err(err) => {
                for key in inserted {
                    registry.remove(key);
                }
                Err(err)
            }
        }
    }

    fn build_objects(
        &mut self,
        registry: &mut MeshRegistry,
        options: &FbxImportOptions,
        inserted: &mut Vec<MeshKey>,
    ) -> Result<Vec<MeshObject>> {
        let mut objects = Vec::with_capacity(self.models.len());

        for model in &self.models {
            let mesh = match model.geometry {
                Some(g) => {
                    let geometry = &mut self.geometries[g];
                    let key = geometry.mesh_key(registry, options.compute_tangents)?;
                    if !inserted.contains(&key) {
                        inserted.push(key);
                    }
                    Some(key)
                }
                None => None,
            };

            objects.push(MeshObject {
                name: model.name.clone(),
                position: model.position,
                rotation: model.rotation,
                scale: model.scale,
                mesh,
                parent: model.parent,
                is_bone: model.is_limb,
            });
        }

        Ok(objects)
    }
}

fn push<T>(list: &mut Vec<T>, object: T, kind: ObjectKind) -> NodeRef {
    list.push(object);
    NodeRef {
        kind,
        index: list.len() - 1,
    }
}
