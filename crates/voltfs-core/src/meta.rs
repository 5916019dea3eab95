//! File kinds and metadata snapshots.

use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::ids::InodeId;

/// The kind of filesystem object an inode represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileKind {
    /// Regular file backed by an in-memory extent
    Regular,
    /// Directory holding named edges to child inodes
    Directory,
    /// Symbolic link holding a target path string
    Symlink,
    /// Special file backed by a self-incrementing counter
    Special,
}

impl FileKind {
    /// Returns true for directories.
    pub fn is_dir(&self) -> bool {
        matches!(self, FileKind::Directory)
    }
}

/// Access, modification, and change times for an inode.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Timestamps {
    /// Last access time
    pub atime: SystemTime,
    /// Last data modification time
    pub mtime: SystemTime,
    /// Last metadata change time
    pub ctime: SystemTime,
}

impl Timestamps {
    /// Timestamps with all three fields set to now.
    pub fn now() -> Self {
        let now = SystemTime::now();
        Self {
            atime: now,
            mtime: now,
            ctime: now,
        }
    }

    /// Updates modification and change times.
    pub fn touch(&mut self) {
        let now = SystemTime::now();
        self.mtime = now;
        self.ctime = now;
    }
}

impl Default for Timestamps {
    fn default() -> Self {
        Self::now()
    }
}

/// Point-in-time metadata snapshot of an inode, as returned by `stat`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    /// Inode identity
    pub inode: InodeId,
    /// Object kind
    pub kind: FileKind,
    /// Mode bits
    pub mode: u32,
    /// Owner user id
    pub uid: u32,
    /// Owner group id
    pub gid: u32,
    /// Logical size in bytes
    pub size: u64,
    /// Number of directory edges referencing this inode
    pub nlink: u32,
    /// Timestamps at snapshot time
    pub times: Timestamps,
}
