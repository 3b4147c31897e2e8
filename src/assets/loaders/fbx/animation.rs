//! Baking of FBX curve networks into [`Animation`]s
//!
//! FBX animates each axis of each channel with an independent curve. The
//! engine wants one keyframe per node holding a full transform, so all
//! curves of a layer are resampled on the union of their key times.

use std::collections::BTreeMap;

use glam::Vec3;

use super::objects::{
    CurveNodeChannel, FbxAnimationCurve, FbxAnimationCurveNode, FbxAnimationLayer, FbxAnimationStack, FbxModel,
};
use crate::animation::{Animation, AnimationKeyTransform};

/// Samples a curve at `time` (seconds).
///
/// Before the first key the first value is held, after the last key the last
/// value is held, and in between neighbouring keys are blended linearly.
/// An empty curve has no value.
#[must_use]
pub fn curve_lerped(curve: &FbxAnimationCurve, time: f64) -> Option<f32> {
    let last = *curve.values.last()?;

    let Some(next) = curve.times.iter().position(|&t| t > time) else {
        return Some(last);
    };
    if next == 0 {
        return curve.values.first().copied();
    }

    let (t0, t1) = (curve.times[next - 1], curve.times[next]);
    let (v0, v1) = (curve.values[next - 1], curve.values[next]);
    let s = ((time - t0) / (t1 - t0)) as f32;
    Some(v0 * (1.0 - s) + v1 * s)
}

/// Borrowed view of the resolved objects involved in baking.
pub(crate) struct BakeSource<'a> {
    pub models: &'a [FbxModel],
    pub stacks: &'a [FbxAnimationStack],
    pub layers: &'a [FbxAnimationLayer],
    pub curve_nodes: &'a [FbxAnimationCurveNode],
    pub curves: &'a [FbxAnimationCurve],
}

impl BakeSource<'_> {
    /// One animation per distinct layer name, in order of first appearance
    /// along [`layer_order`](Self::layer_order).
    pub(crate) fn bake(&self) -> Vec<Animation> {
        let mut groups: Vec<(&str, Vec<usize>)> = Vec::new();
        for layer in self.layer_order().into_iter().map(|l| &self.layers[l]) {
            match groups.iter_mut().find(|(name, _)| *name == layer.name) {
                Some((_, curve_nodes)) => curve_nodes.extend_from_slice(&layer.curve_nodes),
                None => groups.push((&layer.name, layer.curve_nodes.clone())),
            }
        }

        groups
            .into_iter()
            .map(|(name, curve_nodes)| self.bake_layer(name, &curve_nodes))
            .collect()
    }

    /// Layers of each stack in connection order, stacks in file order.
    /// Layers outside any stack follow in file order.
    fn layer_order(&self) -> Vec<usize> {
        let stacked = self.stacks.iter().flat_map(|stack| stack.layers.iter().copied());
        let loose = (0..self.layers.len()).filter(|&l| self.layers[l].stack.is_none());

        let mut seen = vec![false; self.layers.len()];
        stacked
            .chain(loose)
            .filter(|&l| !std::mem::replace(&mut seen[l], true))
            .collect()
    }

    fn bake_layer(&self, name: &str, curve_nodes: &[usize]) -> Animation {
        let mut animation = Animation::new(name);

        let mut times: Vec<f64> = curve_nodes
            .iter()
            .flat_map(|&cn| self.curve_nodes[cn].curves.iter().flatten())
            .flat_map(|&curve| self.curves[curve].times.iter().copied())
            .collect();
        times.sort_by(f64::total_cmp);
        times.dedup();

        log::debug!(
            "Baking FBX layer '{name}': {} curve nodes, {} sample times",
            curve_nodes.len(),
            times.len()
        );

        for &time in &times {
            // Keyed by model index so flushing is deterministic.
            let mut pending: BTreeMap<usize, AnimationKeyTransform> = BTreeMap::new();

            for &cn in curve_nodes {
                let curve_node = &self.curve_nodes[cn];
                if curve_node.channel == CurveNodeChannel::Other {
                    continue;
                }

                let value = self.sample_curve_node(curve_node, time);

                for &model_index in &curve_node.affected_models {
                    let model = &self.models[model_index];
                    let key = pending.entry(model_index).or_insert_with(|| AnimationKeyTransform {
                        time: time as f32,
                        position: model.position,
                        rotation: model.rotation,
                        scale: model.scale,
                    });

                    match curve_node.channel {
                        CurveNodeChannel::Translation => key.position = value,
                        CurveNodeChannel::Rotation => key.rotation = value * std::f32::consts::PI / 180.0,
                        CurveNodeChannel::Scaling => key.scale = value,
                        CurveNodeChannel::Other => {}
                    }
                }
            }

            for (model_index, key) in pending {
                animation.target_or_insert(&self.models[model_index].name).push_key(key);
            }
        }

        animation
    }

    /// Per-axis value of a curve node; axes without a curve use the default.
    fn sample_curve_node(&self, curve_node: &FbxAnimationCurveNode, time: f64) -> Vec3 {
        let axis = |i: usize| {
            curve_node.curves[i]
                .and_then(|curve| curve_lerped(&self.curves[curve], time))
                .unwrap_or(curve_node.defaults[i])
        };
        Vec3::new(axis(0), axis(1), axis(2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve(times: &[f64], values: &[f32]) -> FbxAnimationCurve {
        FbxAnimationCurve {
            id: 0,
            times: times.to_vec(),
            values: values.to_vec(),
        }
    }

    #[test]
    fn test_curve_lerped_holds_ends_and_interpolates() {
        let c = curve(&[0.0, 1.0, 2.0], &[0.0, 10.0, 30.0]);
        assert_eq!(curve_lerped(&c, -1.0), Some(0.0));
        assert_eq!(curve_lerped(&c, 0.5), Some(5.0));
        assert_eq!(curve_lerped(&c, 1.5), Some(20.0));
        assert_eq!(curve_lerped(&c, 5.0), Some(30.0));
    }

    #[test]
    fn test_curve_lerped_at_key_time_hits_key() {
        let c = curve(&[0.0, 1.0], &[2.0, 4.0]);
        assert_eq!(curve_lerped(&c, 0.0), Some(2.0));
        assert_eq!(curve_lerped(&c, 1.0), Some(4.0));
    }

    #[test]
    fn test_empty_curve_has_no_value() {
        assert_eq!(curve_lerped(&curve(&[], &[]), 0.0), None);
    }
}
