//! Voltfs Store - In-memory byte storage for regular-file content.
//!
//! Provides a capacity-bounded arena of extents, one per regular file.
//! The store knows nothing about names or hierarchy; it is addressed by
//! handle, offset, and length.

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod config;
pub mod extent;

pub use config::StoreConfig;
pub use extent::{BlockStore, ExtentHandle};

use thiserror::Error;

/// Errors from storage operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A write or truncate would exceed the per-extent capacity ceiling
    #[error("Out of space: extent capacity {0} bytes exceeded")]
    OutOfSpace(u64),

    /// The handle does not name a live extent
    #[error("Invalid extent handle: {0}")]
    InvalidHandle(u64),
}

impl From<StoreError> for voltfs_core::FsError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::OutOfSpace(_) => voltfs_core::FsError::OutOfSpace,
            StoreError::InvalidHandle(h) => {
                voltfs_core::FsError::InvalidArgument(format!("stale extent handle {h}"))
            }
        }
    }
}
