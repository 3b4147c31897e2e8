//! Animation playback defaults
//!
//! ```rust,ignore
//! use kinesis::animation::AnimationSettings;
//!
//! // Snappier cross-fades than the default
//! let settings = AnimationSettings {
//!     weight_switch_speed: 10.0,
//!     ..Default::default()
//! };
//! let group = MeshGroup::with_settings("hero", settings);
//! ```

/// Defaults applied to every track created by a mesh group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationSettings {
    /// Playback speed multiplier of new tracks.
    pub speed: f32,
    /// Weight units per second a track's weight moves toward its target.
    pub weight_switch_speed: f32,
    /// Initial weight and target weight of new tracks.
    pub initial_weight: f32,
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self {
            speed: 1.0,
            weight_switch_speed: 4.0,
            initial_weight: 1.0,
        }
    }
}
