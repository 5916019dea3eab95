//! Superblock: the administrative record of one mounted namespace.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{RwLock, RwLockReadGuard};

use voltfs_core::{FsError, FsResult, InodeId, MountId, DEFAULT_BLOCK_SIZE};

/// Mount lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountState {
    /// Namespace is live; operations proceed
    Mounted,
    /// Teardown in progress; new operations fail `Busy`
    Unmounting,
    /// Teardown finished; the namespace is gone
    Unmounted,
}

/// Mount-time options.
#[derive(Debug, Clone)]
pub struct MountOptions {
    /// Block size constant reported by the superblock
    pub block_size: u32,
    /// Per-file capacity ceiling in bytes
    pub extent_capacity: u64,
    /// Owner uid for the root and default for new entries
    pub uid: u32,
    /// Owner gid for the root and default for new entries
    pub gid: u32,
    /// Mode bits for the root directory
    pub root_mode: u32,
}

impl Default for MountOptions {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            extent_capacity: 16 * 1024 * 1024,
            uid: 0,
            gid: 0,
            root_mode: 0o755,
        }
    }
}

/// Identifies and guards one mounted namespace.
///
/// Every ordinary operation holds the state read lock for its duration, so
/// unmount (which takes the write lock) waits for in-flight operations and
/// no operation can begin once teardown has started.
pub struct Superblock {
    /// Mount identity, unique per process
    pub mount_id: MountId,
    /// Filesystem name given at mount time
    pub name: String,
    /// Block size constant
    pub block_size: u32,
    /// Root directory inode
    pub root: InodeId,
    state: RwLock<MountState>,
}

impl Superblock {
    /// Creates a mounted superblock rooted at `root`.
    pub fn new(name: impl Into<String>, block_size: u32, root: InodeId) -> Self {
        static NEXT_MOUNT_ID: AtomicU64 = AtomicU64::new(1);
        Self {
            mount_id: MountId::new(NEXT_MOUNT_ID.fetch_add(1, Ordering::Relaxed)),
            name: name.into(),
            block_size,
            root,
            state: RwLock::new(MountState::Mounted),
        }
    }

    /// Current mount state.
    pub fn state(&self) -> MountState {
        *self.state.read()
    }

    /// Begins an ordinary operation, failing `Busy` unless mounted.
    ///
    /// The returned guard must be held for the duration of the operation.
    pub fn begin_op(&self) -> FsResult<RwLockReadGuard<'_, MountState>> {
        let guard = self.state.read();
        match *guard {
            MountState::Mounted => Ok(guard),
            _ => Err(FsError::Busy),
        }
    }

    /// Transitions Mounted -> Unmounting, waiting out in-flight operations.
    pub fn begin_unmount(&self) -> FsResult<()> {
        let mut state = self.state.write();
        if *state != MountState::Mounted {
            return Err(FsError::Busy);
        }
        *state = MountState::Unmounting;
        Ok(())
    }

    /// Transitions Unmounting -> Unmounted once teardown is complete.
    pub fn finish_unmount(&self) {
        let mut state = self.state.write();
        debug_assert_eq!(*state, MountState::Unmounting);
        *state = MountState::Unmounted;
    }
}
