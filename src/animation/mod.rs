//! Skeletal animation
//!
//! - [`Animation`] / [`AnimationTarget`]: resampled per-node keyframes
//! - [`AnimationTrack`]: playback state, speed and fading weight
//! - [`AnimationMixer`]: weighted blend of all tracks of a mesh group

pub mod clip;
pub mod mixer;
pub mod settings;
pub mod track;
pub mod values;

pub use clip::{Animation, AnimationKeyTransform, AnimationTarget, RotationInterpolation};
pub use mixer::{AnimationMixer, TrackHandle};
pub use settings::AnimationSettings;
pub use track::{AnimationTrack, TrackState};
pub use values::{Interpolatable, Pose, euler_from_quat, quat_from_euler};
