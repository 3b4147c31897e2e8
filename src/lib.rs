#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod animation;
pub mod assets;
pub mod errors;
pub mod render;
pub mod resources;
pub mod scene;

pub use animation::{
    Animation, AnimationKeyTransform, AnimationMixer, AnimationSettings, AnimationTarget, AnimationTrack, Pose,
    TrackHandle, TrackState,
};
pub use assets::{FbxImportOptions, FbxLoader, FbxScene};
pub use errors::{KinesisError, Result};
pub use render::{BoneTransform, MaterialKey, RenderQueue};
pub use resources::{Deform, Mesh, MeshDescriptor, MeshKey, MeshRegistry, MeshVertex, VertexKind};
pub use scene::{MeshGroup, MeshObject, Transform};
