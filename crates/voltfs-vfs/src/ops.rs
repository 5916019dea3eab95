//! High-level mount helpers.
//!
//! The original prototype pre-created a pair of counter files at mount
//! time; `populate_counters` reproduces that layout through the public
//! populate hook.

use voltfs_core::FsResult;

use crate::superblock::MountOptions;
use crate::vfs::Namespace;

/// Pre-populates the classic demonstration layout: a `counter` file at the
/// root and a `subdir/subcounter` beneath it.
pub fn populate_counters(ns: &Namespace) -> FsResult<()> {
    ns.create_special("/counter", 0o644)?;
    ns.mkdir("/subdir", 0o644)?;
    ns.create_special("/subdir/subcounter", 0o644)?;
    Ok(())
}

/// Mounts a namespace pre-populated with the counter files.
pub fn mount_demo(name: impl Into<String>, options: MountOptions) -> FsResult<Namespace> {
    Namespace::mount_with(name, options, populate_counters)
}
