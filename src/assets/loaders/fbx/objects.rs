//! Typed FBX objects built from `Objects` children
//!
//! Cross references between objects are array indices into the resolver's
//! per-kind vectors, filled in once the `Connections` section is read.

use glam::{Mat4, Vec3};
use smallvec::SmallVec;

use super::reader::{Property, RawNode};

/// Ticks per second of FBX time values.
pub const FBX_TICKS_PER_SECOND: f64 = 46_186_158_000.0;

/// Converts FBX ticks to seconds.
#[inline]
#[must_use]
pub fn ticks_to_seconds(ticks: i64) -> f64 {
    ticks as f64 / FBX_TICKS_PER_SECOND
}

/// Object name without the `\0\x01Class` suffix FBX appends.
#[must_use]
pub fn object_name(raw: &str) -> &str {
    raw.split_once("\0\u{1}").map_or(raw, |(name, _)| name)
}

/// `(id, name, subtype)` of an object record.
pub(crate) fn object_header(node: &RawNode) -> Option<(i64, &str, &str)> {
    let id = node.property(0)?.as_i64()?;
    let name = node.property(1).and_then(Property::as_str).map_or("", object_name);
    let subtype = node.property(2).and_then(Property::as_str).unwrap_or("");
    Some((id, name, subtype))
}

/// Iterates the `P` records of a `Properties70` block as `(name, values)`,
/// where `values` starts after the four descriptive strings.
fn properties70(node: &RawNode) -> impl Iterator<Item = (&str, &[Property])> {
    node.child("Properties70")
        .into_iter()
        .flat_map(|block| block.children_named("P"))
        .filter_map(|p| {
            let name = p.property(0)?.as_str()?;
            Some((name, p.properties.get(4..).unwrap_or(&[])))
        })
}

fn vec3_from(values: &[Property]) -> Option<Vec3> {
    let x = values.first()?.as_f64()?;
    let y = values.get(1)?.as_f64()?;
    let z = values.get(2)?.as_f64()?;
    Some(Vec3::new(x as f32, y as f32, z as f32))
}

fn matrix_from(node: &RawNode, name: &str) -> Option<Mat4> {
    let values = node.child_property(name)?.to_f64_vec()?;
    if values.len() != 16 {
        log::warn!("FBX matrix '{name}' has {} elements", values.len());
        return None;
    }
    let mut cols = [0.0f32; 16];
    for (dst, src) in cols.iter_mut().zip(&values) {
        *dst = *src as f32;
    }
    Some(Mat4::from_cols_array(&cols))
}

// ============================================================================
// Model
// ============================================================================

#[derive(Debug, Clone)]
pub struct FbxModel {
    pub id: i64,
    pub name: String,
    pub position: Vec3,
    /// Euler angles in radians.
    pub rotation: Vec3,
    pub scale: Vec3,
    pub parent: Option<usize>,
    pub geometry: Option<usize>,
    pub is_limb: bool,
    pub curve_nodes: Vec<usize>,
}

impl FbxModel {
    #[must_use]
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
            parent: None,
            geometry: None,
            is_limb: false,
            curve_nodes: Vec::new(),
        }
    }

    pub(crate) fn from_node(node: &RawNode) -> Option<Self> {
        let (id, name, _) = object_header(node)?;
        let mut model = Self::new(id, name);

        for (property, values) in properties70(node) {
            match property {
                "Lcl Translation" => model.position = vec3_from(values).unwrap_or(model.position),
                "Lcl Rotation" => {
                    if let Some(degrees) = vec3_from(values) {
                        model.rotation = degrees * std::f32::consts::PI / 180.0;
                    }
                }
                "Lcl Scaling" => model.scale = vec3_from(values).unwrap_or(model.scale),
                _ => {}
            }
        }

        Some(model)
    }
}

// ============================================================================
// Node attribute
// ============================================================================

#[derive(Debug, Clone)]
pub struct FbxNodeAttribute {
    pub id: i64,
    pub name: String,
    pub attribute_type: String,
}

impl FbxNodeAttribute {
    pub const LIMB_NODE: &'static str = "LimbNode";

    pub(crate) fn from_node(node: &RawNode) -> Option<Self> {
        let (id, name, subtype) = object_header(node)?;
        Some(Self {
            id,
            name: name.to_string(),
            attribute_type: subtype.to_string(),
        })
    }

    #[inline]
    #[must_use]
    pub fn is_limb(&self) -> bool {
        self.attribute_type == Self::LIMB_NODE
    }
}

// ============================================================================
// Deformer
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeformerKind {
    Skin,
    Cluster,
    Other,
}

#[derive(Debug, Clone)]
pub struct FbxDeformer {
    pub id: i64,
    pub name: String,
    pub kind: DeformerKind,
    pub indices: Vec<i32>,
    pub weights: Vec<f64>,
    pub transform: Option<Mat4>,
    pub transform_link: Option<Mat4>,
    /// Clusters of this skin, in connection order.
    pub children: Vec<usize>,
    /// Model acting as the bone of this cluster.
    pub bone_model: Option<usize>,
}

impl FbxDeformer {
    #[must_use]
    pub fn new(id: i64, name: impl Into<String>, kind: DeformerKind) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            indices: Vec::new(),
            weights: Vec::new(),
            transform: None,
            transform_link: None,
            children: Vec::new(),
            bone_model: None,
        }
    }

    pub(crate) fn from_node(node: &RawNode) -> Option<Self> {
        let (id, name, subtype) = object_header(node)?;
        let kind = match subtype {
            "Skin" => DeformerKind::Skin,
            "Cluster" => DeformerKind::Cluster,
            _ => DeformerKind::Other,
        };

        let mut deformer = Self::new(id, name, kind);
        if kind == DeformerKind::Cluster {
            deformer.indices = node.child_property("Indexes").and_then(Property::to_i32_vec).unwrap_or_default();
            deformer.weights = node.child_property("Weights").and_then(Property::to_f64_vec).unwrap_or_default();
            deformer.transform = matrix_from(node, "Transform");
            deformer.transform_link = matrix_from(node, "TransformLink");
        }
        Some(deformer)
    }

    /// Matrix taking a mesh vertex from bind space into the bone's local space.
    ///
    /// `TransformLink⁻¹ · Transform` when both are present, `Transform` alone
    /// otherwise, identity when neither is.
    #[must_use]
    pub fn inverse_bind_matrix(&self) -> Mat4 {
        match (self.transform, self.transform_link) {
            (Some(transform), Some(link)) => link.inverse() * transform,
            (Some(transform), None) => transform,
            _ => Mat4::IDENTITY,
        }
    }
}

// ============================================================================
// Animation
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct FbxAnimationCurve {
    pub id: i64,
    /// Key times in seconds.
    pub times: Vec<f64>,
    pub values: Vec<f32>,
}

impl FbxAnimationCurve {
    pub(crate) fn from_node(node: &RawNode) -> Option<Self> {
        let (id, _, _) = object_header(node)?;
        let times: Vec<f64> = node
            .child_property("KeyTime")
            .and_then(Property::to_i64_vec)
            .unwrap_or_default()
            .into_iter()
            .map(ticks_to_seconds)
            .collect();
        let values = node.child_property("KeyValueFloat").and_then(Property::to_f32_vec).unwrap_or_default();

        if times.len() != values.len() {
            log::warn!(
                "FBX curve {id}: {} key times for {} values, truncating",
                times.len(),
                values.len()
            );
        }
        let len = times.len().min(values.len());
        let (mut times, mut values) = (times, values);
        times.truncate(len);
        values.truncate(len);

        Some(Self { id, times, values })
    }
}

/// Transform channel a curve node drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurveNodeChannel {
    Translation,
    Rotation,
    Scaling,
    Other,
}

impl CurveNodeChannel {
    fn from_name(name: &str) -> Self {
        match name {
            "T" => Self::Translation,
            "R" => Self::Rotation,
            "S" => Self::Scaling,
            _ => Self::Other,
        }
    }

    /// Value of an axis that has no curve and no declared default.
    #[must_use]
    pub fn fallback_default(self) -> f32 {
        match self {
            Self::Scaling => 1.0,
            _ => 0.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FbxAnimationCurveNode {
    pub id: i64,
    pub name: String,
    pub channel: CurveNodeChannel,
    /// Per-axis values used where no curve is connected.
    pub defaults: [f32; 3],
    pub curves: [Option<usize>; 3],
    pub affected_models: SmallVec<[usize; 1]>,
}

impl FbxAnimationCurveNode {
    #[must_use]
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        let name = name.into();
        let channel = CurveNodeChannel::from_name(&name);
        let fallback = channel.fallback_default();
        Self {
            id,
            name,
            channel,
            defaults: [fallback; 3],
            curves: [None; 3],
            affected_models: SmallVec::new(),
        }
    }

    pub(crate) fn from_node(node: &RawNode) -> Option<Self> {
        let (id, name, _) = object_header(node)?;
        let mut curve_node = Self::new(id, name);

        for (property, values) in properties70(node) {
            let Some(axis) = axis_index(property) else {
                continue;
            };
            if let Some(value) = values.first().and_then(Property::as_f64) {
                curve_node.defaults[axis] = value as f32;
            }
        }

        Some(curve_node)
    }
}

/// Maps `d|X`, `d|Y` and `d|Z` to an axis index.
#[must_use]
pub fn axis_index(name: &str) -> Option<usize> {
    match name {
        "d|X" => Some(0),
        "d|Y" => Some(1),
        "d|Z" => Some(2),
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct FbxAnimationLayer {
    pub id: i64,
    pub name: String,
    pub curve_nodes: Vec<usize>,
    pub stack: Option<usize>,
}

impl FbxAnimationLayer {
    pub(crate) fn from_node(node: &RawNode) -> Option<Self> {
        let (id, name, _) = object_header(node)?;
        Some(Self {
            id,
            name: name.to_string(),
            curve_nodes: Vec::new(),
            stack: None,
        })
    }
}

#[derive(Debug, Clone)]
pub struct FbxAnimationStack {
    pub id: i64,
    pub name: String,
    pub layers: Vec<usize>,
}

impl FbxAnimationStack {
    pub(crate) fn from_node(node: &RawNode) -> Option<Self> {
        let (id, name, _) = object_header(node)?;
        Some(Self {
            id,
            name: name.to_string(),
            layers: Vec::new(),
        })
    }
}
