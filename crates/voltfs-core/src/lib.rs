//! Voltfs Core - Shared types for the voltfs in-memory filesystem.
//!
//! This crate provides:
//! - Identifier types (InodeId, HandleId, MountId)
//! - The filesystem error taxonomy
//! - File kinds and metadata snapshots
//! - Path splitting and validation

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod ids;
pub mod meta;
pub mod path;

pub use ids::{HandleId, InodeId, MountId};
pub use meta::{FileKind, Metadata, Timestamps};

use thiserror::Error;

/// Default block size for a mounted namespace, in bytes.
pub const DEFAULT_BLOCK_SIZE: u32 = 4096;

/// Errors from filesystem operations.
///
/// Every operation fails deterministically; there are no transient errors
/// and no internal retries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FsError {
    /// No entry with the given name or path
    #[error("Not found: {0}")]
    NotFound(String),

    /// An entry with the given name already exists
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// A directory operation was attempted on a non-directory
    #[error("Not a directory: {0}")]
    NotADirectory(String),

    /// A file operation was attempted on a directory
    #[error("Is a directory: {0}")]
    IsADirectory(String),

    /// rmdir or rename over a directory that still has entries
    #[error("Directory not empty: {0}")]
    DirectoryNotEmpty(String),

    /// A write would exceed the configured capacity ceiling
    #[error("Out of space")]
    OutOfSpace,

    /// Malformed argument (bad path, bad counter write, kind mismatch)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation attempted while the namespace is unmounting or unmounted
    #[error("Busy: namespace is not mounted")]
    Busy,

    /// Reserved for credential checks; uid/gid/mode are stored, not enforced
    #[error("Permission denied")]
    PermissionDenied,
}

/// Convenience result alias for filesystem operations.
pub type FsResult<T> = Result<T, FsError>;
