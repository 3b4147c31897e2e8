pub mod fbx;

pub use fbx::{FbxImportOptions, FbxLoader, FbxScene};
