pub mod loaders;

pub use loaders::{FbxImportOptions, FbxLoader, FbxScene};
