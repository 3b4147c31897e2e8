use std::sync::Arc;

use crate::animation::clip::Animation;
use crate::animation::settings::AnimationSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackState {
    Stopped,
    Playing,
    Looping,
}

/// Runtime playback of an [`Animation`].
///
/// A track owns its own time cursor, speed and blend weight; several tracks
/// may play the same animation independently.
#[derive(Debug, Clone)]
pub struct AnimationTrack {
    animation: Arc<Animation>,
    time_length: f32,
    state: TrackState,

    pub play_time: f32,
    pub speed: f32,
    pub weight_switch_speed: f32,

    weight: f32,
    target_weight: f32,
}

impl AnimationTrack {
    #[must_use]
    pub fn new(animation: Arc<Animation>) -> Self {
        Self::with_settings(animation, &AnimationSettings::default())
    }

    #[must_use]
    pub fn with_settings(animation: Arc<Animation>, settings: &AnimationSettings) -> Self {
        let time_length = animation.time_length();
        let weight = settings.initial_weight.max(0.0);
        Self {
            animation,
            time_length,
            state: TrackState::Stopped,
            play_time: 0.0,
            speed: settings.speed,
            weight_switch_speed: settings.weight_switch_speed,
            weight,
            target_weight: weight,
        }
    }

    #[must_use]
    pub fn animation(&self) -> &Arc<Animation> {
        &self.animation
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> TrackState {
        self.state
    }

    /// Playing or looping.
    #[inline]
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.state != TrackState::Stopped
    }

    #[inline]
    #[must_use]
    pub fn is_looping(&self) -> bool {
        self.state == TrackState::Looping
    }

    /// Plays once from the start; the track stops itself at the end.
    pub fn play(&mut self) {
        self.play_time = 0.0;
        self.state = TrackState::Playing;
    }

    /// Plays from the start and wraps around forever.
    pub fn play_looped(&mut self) {
        self.play_time = 0.0;
        self.state = TrackState::Looping;
    }

    pub fn stop(&mut self) {
        self.state = TrackState::Stopped;
    }

    #[inline]
    #[must_use]
    pub fn weight(&self) -> f32 {
        self.weight
    }

    #[inline]
    #[must_use]
    pub fn target_weight(&self) -> f32 {
        self.target_weight
    }

    /// Sets the weight the track fades toward. Negative values become zero.
    pub fn set_weight(&mut self, weight: f32) {
        self.target_weight = weight.max(0.0);
    }

    /// Sets the current weight without fading. The target follows.
    pub fn set_weight_immediate(&mut self, weight: f32) {
        self.weight = weight.max(0.0);
        self.target_weight = self.weight;
    }

    /// Advances weight and time by `delta` seconds.
    pub fn process(&mut self, delta: f32) {
        let step = delta * self.weight_switch_speed;
        if self.weight < self.target_weight {
            self.weight = (self.weight + step).min(self.target_weight);
        } else if self.weight > self.target_weight {
            self.weight = (self.weight - step).max(self.target_weight);
        }

        if !self.is_playing() {
            return;
        }

        self.play_time += delta * self.speed;

        let length = self.time_length;
        if self.play_time <= length {
            return;
        }

        match self.state {
            TrackState::Looping => {
                if length > 0.0 {
                    self.play_time %= length;
                } else {
                    self.play_time = 0.0;
                }
            }
            TrackState::Playing => self.state = TrackState::Stopped,
            TrackState::Stopped => {}
        }
    }
}
