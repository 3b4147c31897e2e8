//! Error Types
//!
//! This module defines the error types used throughout the engine.
//!
//! # Overview
//!
//! The main error type [`KinesisError`] covers the fatal failure modes:
//! - Asset file I/O errors
//! - FBX header, version and node-structure errors
//! - Missing mandatory scene sections
//! - Mesh registry exhaustion
//!
//! Recoverable anomalies (an unknown connection, a deformer with mismatched
//! index/weight arrays, a merge of meshes with different vertex kinds) are not
//! errors: they are reported through `log` and the offending item is skipped.
//!
//! # Usage
//!
//! All fallible public APIs return [`Result<T>`] which is an alias for
//! `std::result::Result<T, KinesisError>`.
//!
//! ```rust,ignore
//! use kinesis::errors::Result;
//!
//! fn load_asset() -> Result<()> {
//!     // Operations that may fail return Result
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// The main error type for the Kinesis engine.
#[derive(Error, Debug)]
pub enum KinesisError {
    // ========================================================================
    // I/O Errors
    // ========================================================================
    /// File I/O error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// The requested asset was not found.
    #[error("Asset not found: {0}")]
    AssetNotFound(String),

    // ========================================================================
    // FBX Format Errors
    // ========================================================================
    /// The file does not start with the binary FBX magic and code bytes.
    #[error("Invalid FBX header: {0}")]
    InvalidHeader(String),

    /// The file declares a format version newer than the reader understands.
    #[error("Unsupported FBX version {found} (newest supported: {supported})")]
    UnsupportedVersion {
        /// Version read from the file header
        found: u32,
        /// Newest version this reader accepts
        supported: u32,
    },

    /// A node record is truncated or otherwise corrupt.
    #[error("Malformed FBX node at offset {offset}: {reason}")]
    MalformedNode {
        /// Byte offset of the record that failed to parse
        offset: u64,
        /// What went wrong
        reason: String,
    },

    /// One of the mandatory top-level sections is absent.
    #[error("FBX file is missing the '{0}' section")]
    MissingSection(&'static str),

    // ========================================================================
    // Resource Errors
    // ========================================================================
    /// The mesh registry has no free slot left.
    #[error("Mesh registry is full (capacity: {capacity})")]
    RegistryFull {
        /// Maximum number of live meshes
        capacity: usize,
    },
}

/// Alias for `Result<T, KinesisError>`.
pub type Result<T> = std::result::Result<T, KinesisError>;
