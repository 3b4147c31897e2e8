use glam::Vec3;
use rustc_hash::FxHashMap;

use crate::animation::values::{Interpolatable, Pose, quat_from_euler};

/// One resampled keyframe of a node.
///
/// Rotation is stored as Euler angles in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationKeyTransform {
    pub time: f32,
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl AnimationKeyTransform {
    #[must_use]
    pub fn pose(&self) -> Pose {
        Pose::from_euler(self.position, self.rotation, self.scale)
    }
}

/// How rotation is interpolated between two keys of a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RotationInterpolation {
    /// Spherical interpolation between the keys' quaternions.
    #[default]
    Spherical,
    /// Component-wise interpolation of the Euler angles.
    Euler,
}

/// Keyframe track of a single named node.
#[derive(Debug, Clone)]
pub struct AnimationTarget {
    name: String,
    keys: Vec<AnimationKeyTransform>,
    pub rotation_interpolation: RotationInterpolation,
}

impl AnimationTarget {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            keys: Vec::new(),
            rotation_interpolation: RotationInterpolation::default(),
        }
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn keys(&self) -> &[AnimationKeyTransform] {
        &self.keys
    }

    /// Inserts a key, keeping the keys ordered by time.
    pub fn push_key(&mut self, key: AnimationKeyTransform) {
        match self.keys.last() {
            Some(last) if key.time < last.time => {
                let at = self.keys.partition_point(|k| k.time <= key.time);
                self.keys.insert(at, key);
            }
            _ => self.keys.push(key),
        }
    }

    /// Time of the last key, zero when empty.
    #[must_use]
    pub fn time_length(&self) -> f32 {
        self.keys.last().map_or(0.0, |k| k.time)
    }

    /// Samples the target at `time`.
    ///
    /// Before the first key the first key's pose is returned (no
    /// extrapolation); at or after the last key the last pose is held.
    /// Returns `None` for a target without keys.
    #[must_use]
    pub fn transform_at(&self, time: f32) -> Option<Pose> {
        let last = self.keys.last()?;

        for (i, key) in self.keys.iter().enumerate() {
            if key.time <= time {
                continue;
            }
            if i == 0 {
                return Some(key.pose());
            }

            let prev = &self.keys[i - 1];
            let t = (time - prev.time) / (key.time - prev.time);

            let rotation = match self.rotation_interpolation {
                RotationInterpolation::Spherical => {
                    Interpolatable::interpolate_linear(quat_from_euler(prev.rotation), quat_from_euler(key.rotation), t)
                }
                RotationInterpolation::Euler => quat_from_euler(prev.rotation.lerp(key.rotation, t)),
            };

            return Some(Pose {
                position: prev.position.lerp(key.position, t),
                rotation,
                scale: prev.scale.lerp(key.scale, t),
            });
        }

        Some(last.pose())
    }
}

/// A named animation: one keyframe track per animated node.
#[derive(Debug, Clone, Default)]
pub struct Animation {
    pub name: String,
    targets: Vec<AnimationTarget>,
    lookup: FxHashMap<String, usize>,
}

impl Animation {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            targets: Vec::new(),
            lookup: FxHashMap::default(),
        }
    }

    /// Adds a target, replacing any existing target of the same node.
    pub fn add_target(&mut self, target: AnimationTarget) {
        if let Some(&index) = self.lookup.get(target.name()) {
            self.targets[index] = target;
        } else {
            self.lookup.insert(target.name().to_string(), self.targets.len());
            self.targets.push(target);
        }
    }

    /// Returns the target of `name`, creating an empty one on first use.
    pub fn target_or_insert(&mut self, name: &str) -> &mut AnimationTarget {
        let index = match self.lookup.get(name) {
            Some(&index) => index,
            None => {
                self.lookup.insert(name.to_string(), self.targets.len());
                self.targets.push(AnimationTarget::new(name));
                self.targets.len() - 1
            }
        };
        &mut self.targets[index]
    }

    #[must_use]
    pub fn target(&self, name: &str) -> Option<&AnimationTarget> {
        self.lookup.get(name).map(|&i| &self.targets[i])
    }

    #[inline]
    #[must_use]
    pub fn targets(&self) -> &[AnimationTarget] {
        &self.targets
    }

    /// Total length in seconds: the latest key over all targets.
    #[must_use]
    pub fn time_length(&self) -> f32 {
        self.targets
            .iter()
            .map(AnimationTarget::time_length)
            .fold(0.0_f32, f32::max)
    }
}
