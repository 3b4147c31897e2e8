use std::sync::Arc;

use glam::Vec3;
use slotmap::{SlotMap, new_key_type};

use crate::animation::clip::Animation;
use crate::animation::settings::AnimationSettings;
use crate::animation::track::AnimationTrack;
use crate::animation::values::{Interpolatable, Pose};

new_key_type! {
    pub struct TrackHandle;
}

/// Owns the tracks of one mesh group and blends them per node.
///
/// Tracks are blended in creation order. The rotation accumulation is a chain
/// of slerps and therefore order-dependent.
#[derive(Default)]
pub struct AnimationMixer {
    tracks: SlotMap<TrackHandle, AnimationTrack>,
    order: Vec<TrackHandle>,
    settings: AnimationSettings,
}

impl AnimationMixer {
    #[must_use]
    pub fn new() -> Self {
        Self::with_settings(AnimationSettings::default())
    }

    #[must_use]
    pub fn with_settings(settings: AnimationSettings) -> Self {
        Self {
            tracks: SlotMap::with_key(),
            order: Vec::new(),
            settings,
        }
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &AnimationSettings {
        &self.settings
    }

    /// Creates a stopped track for `animation` using the mixer's settings.
    pub fn create_track(&mut self, animation: Arc<Animation>) -> TrackHandle {
        let track = AnimationTrack::with_settings(animation, &self.settings);
        self.add_track(track)
    }

    pub fn add_track(&mut self, track: AnimationTrack) -> TrackHandle {
        let handle = self.tracks.insert(track);
        self.order.push(handle);
        handle
    }

    pub fn remove_track(&mut self, handle: TrackHandle) -> Option<AnimationTrack> {
        let track = self.tracks.remove(handle)?;
        self.order.retain(|&h| h != handle);
        Some(track)
    }

    #[inline]
    #[must_use]
    pub fn track(&self, handle: TrackHandle) -> Option<&AnimationTrack> {
        self.tracks.get(handle)
    }

    #[inline]
    pub fn track_mut(&mut self, handle: TrackHandle) -> Option<&mut AnimationTrack> {
        self.tracks.get_mut(handle)
    }

    /// Tracks in creation order.
    pub fn tracks(&self) -> impl Iterator<Item = &AnimationTrack> {
        self.order.iter().filter_map(|&h| self.tracks.get(h))
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    #[must_use]
    pub fn any_playing(&self) -> bool {
        self.tracks().any(AnimationTrack::is_playing)
    }

    /// Advances every track by `delta` seconds.
    pub fn process(&mut self, delta: f32) {
        for track in self.tracks.values_mut() {
            track.process(delta);
        }
    }

    /// Blends every playing track that animates `node_name` on top of `rest`.
    ///
    /// The rest pose receives whatever share of the weight budget the tracks
    /// leave unclaimed (`max(0, 1 - Σw)`), so fading tracks never collapse
    /// the node toward a zero transform.
    #[must_use]
    pub fn blend(&self, node_name: &str, rest: &Pose) -> Pose {
        if !self.any_playing() {
            return *rest;
        }

        let mut total_weight: f32 = self
            .tracks()
            .filter(|t| t.is_playing() && t.animation().target(node_name).is_some())
            .map(AnimationTrack::weight)
            .sum();

        let initial_take = (1.0 - total_weight).max(0.0);
        total_weight += initial_take;

        let mut position = if initial_take > 0.0 { rest.position * initial_take } else { Vec3::ZERO };
        let mut scale = if initial_take > 0.0 { rest.scale * initial_take } else { Vec3::ZERO };
        let mut rotation = rest.rotation;

        for track in self.tracks().filter(|t| t.is_playing()) {
            let Some(target) = track.animation().target(node_name) else {
                continue;
            };
            if track.weight() <= 0.0 {
                continue;
            }
            let Some(pose) = target.transform_at(track.play_time) else {
                continue;
            };

            let share = track.weight() / total_weight;
            position += pose.position * share;
            scale += pose.scale * share;
            rotation = Interpolatable::interpolate_linear(rotation, pose.rotation, share);
        }

        Pose { position, rotation, scale }
    }
}
