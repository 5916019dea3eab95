//! Voltfs VFS - In-memory hierarchical filesystem core.
//!
//! Implements one mounted namespace held entirely in volatile memory:
//! - Inode records and their Created/Live/Orphaned/Freed lifecycle
//! - Directory edges with lookup/create/unlink/rmdir/link/rename
//! - Mount/unmount via an explicit superblock state machine
//! - Open-file handles bridging resolved inodes to extent storage
//!
//! Nothing persists: the whole namespace is discarded at unmount, by design.

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod dir;
pub mod file;
pub mod inode;
pub mod ops;
pub mod superblock;
pub mod vfs;

pub use dir::DirectoryTree;
pub use file::{HandleTable, OpenFile};
pub use inode::{Inode, InodePayload, InodeTable};
pub use ops::{mount_demo, populate_counters};
pub use superblock::{MountOptions, MountState, Superblock};
pub use vfs::Namespace;
