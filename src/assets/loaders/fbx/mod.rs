//! Binary FBX importer
//!
//! Loading runs in three stages:
//!
//! 1. [`reader`] parses the byte stream into a tree of raw nodes.
//! 2. [`scene`] turns `Objects` into typed objects and links them through
//!    `Connections`.
//! 3. Geometries are compiled into registry meshes and animation layers are
//!    baked into [`Animation`](crate::animation::Animation)s.
//!
//! Any fatal error aborts the whole load; no partial scene is returned.

pub mod animation;
pub mod geometry;
pub mod objects;
pub mod reader;
pub mod scene;

use std::fs;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;

pub use animation::curve_lerped;
pub use geometry::FbxGeometry;
pub use reader::{FBX_SUPPORTED_VERSION, NodeReader, Property, RawNode};
pub use scene::{FbxScene, SceneResolver};

use crate::errors::{KinesisError, Result};
use crate::resources::MeshRegistry;

/// Import options for [`FbxLoader`].
///
/// # Example
///
/// ```rust,ignore
/// let options = FbxImportOptions {
///     skip_animations: true,
///     ..Default::default()
/// };
/// let scene = FbxLoader::with_options(&mut registry, options).load("hero.fbx")?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FbxImportOptions {
    /// Derive per-vertex tangent frames for compiled meshes.
    ///
    /// Default: `true`
    pub compute_tangents: bool,

    /// Leave animation layers unbaked.
    ///
    /// Default: `false`
    pub skip_animations: bool,

    /// Reject files older than the supported version instead of warning.
    ///
    /// Default: `false`
    pub strict_version: bool,
}

impl Default for FbxImportOptions {
    fn default() -> Self {
        Self {
            compute_tangents: true,
            skip_animations: false,
            strict_version: false,
        }
    }
}

/// Loads binary FBX files into meshes, scene nodes and animations.
pub struct FbxLoader<'a> {
    registry: &'a mut MeshRegistry,
    options: FbxImportOptions,
}

impl<'a> FbxLoader<'a> {
    pub fn new(registry: &'a mut MeshRegistry) -> Self {
        Self::with_options(registry, FbxImportOptions::default())
    }

    pub fn with_options(registry: &'a mut MeshRegistry, options: FbxImportOptions) -> Self {
        Self { registry, options }
    }

    #[inline]
    #[must_use]
    pub fn options(&self) -> &FbxImportOptions {
        &self.options
    }

    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<FbxScene> {
        let path = path.as_ref();
        let file = fs::File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => KinesisError::AssetNotFound(path.display().to_string()),
            _ => KinesisError::IoError(e),
        })?;

        log::info!("Loading FBX file: {}", path.display());
        self.load_from_reader(BufReader::new(file))
    }

    pub fn load_from_bytes(&mut self, bytes: &[u8]) -> Result<FbxScene> {
        self.load_from_reader(Cursor::new(bytes))
    }

    pub fn load_from_reader<R: Read + Seek>(&mut self, reader: R) -> Result<FbxScene> {
        let nodes = read_document(reader, &self.options)?;
        let resolver = SceneResolver::from_document(&nodes)?;
        let scene = resolver.into_scene(self.registry, &self.options)?;

        log::info!(
            "FBX import finished: {} objects, {} animations",
            scene.objects.len(),
            scene.animations.len()
        );
        Ok(scene)
    }
}

/// Checks the header against the version policy and parses every node.
pub fn read_document<R: Read + Seek>(mut reader: R, options: &FbxImportOptions) -> Result<Vec<RawNode>> {
    let version = reader::read_header(&mut reader)?;
    check_version(version, options)?;

    NodeReader::new(reader)?.read_document()
}

fn check_version(version: u32, options: &FbxImportOptions) -> Result<()> {
    let unsupported = KinesisError::UnsupportedVersion {
        found: version,
        supported: FBX_SUPPORTED_VERSION,
    };

    match version.cmp(&FBX_SUPPORTED_VERSION) {
        std::cmp::Ordering::Greater => Err(unsupported),
        std::cmp::Ordering::Less if options.strict_version => Err(unsupported),
        std::cmp::Ordering::Less => {
            log::warn!("FBX version {version} is older than {FBX_SUPPORTED_VERSION}, attempting to read it anyway");
            Ok(())
        }
        std::cmp::Ordering::Equal => Ok(()),
    }
}
