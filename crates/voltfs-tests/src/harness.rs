//! A mounted namespace with convenience helpers for scenario tests.

use std::ops::Deref;

use voltfs_core::{FileKind, FsResult};
use voltfs_vfs::{mount_demo, MountOptions, Namespace};

/// A test namespace. Derefs to [`Namespace`], so every session operation is
/// available directly; the helpers below wrap the common open/op/close
/// dances.
pub struct TestFs {
    ns: Namespace,
}

impl TestFs {
    /// Mounts an empty namespace with default options.
    pub fn new() -> Self {
        Self {
            ns: Namespace::mount("testfs", MountOptions::default()),
        }
    }

    /// Mounts an empty namespace with a small per-file capacity, for
    /// out-of-space scenarios.
    pub fn with_capacity(extent_capacity: u64) -> Self {
        let options = MountOptions {
            extent_capacity,
            ..MountOptions::default()
        };
        Self {
            ns: Namespace::mount("testfs", options),
        }
    }

    /// Mounts a namespace pre-populated with the counter files.
    pub fn with_counters() -> Self {
        Self {
            ns: mount_demo("uxfs", MountOptions::default()).expect("populate fresh namespace"),
        }
    }

    /// Creates a regular file and writes `contents` through a fresh handle.
    pub fn write_file(&self, path: &str, contents: &[u8]) -> FsResult<()> {
        self.ns.create(path, 0o644)?;
        let handle = self.ns.open(path)?;
        self.ns.write(handle, contents)?;
        self.ns.close(handle)
    }

    /// Reads the whole file at `path` through a fresh handle.
    ///
    /// Counter files replay their snapshot on every read, so they are read
    /// exactly once instead of until an empty chunk.
    pub fn read_file(&self, path: &str) -> FsResult<Vec<u8>> {
        let kind = self.ns.stat(path)?.kind;
        let handle = self.ns.open(path)?;
        let mut out = Vec::new();
        if kind == FileKind::Special {
            out.extend_from_slice(&self.ns.read(handle, 64)?);
        } else {
            loop {
                let chunk = self.ns.read(handle, 4096)?;
                if chunk.is_empty() {
                    break;
                }
                out.extend_from_slice(&chunk);
            }
        }
        self.ns.close(handle)?;
        Ok(out)
    }
}

impl Default for TestFs {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for TestFs {
    type Target = Namespace;

    fn deref(&self) -> &Namespace {
        &self.ns
    }
}
