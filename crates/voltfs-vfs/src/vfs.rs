//! The path/handle call surface of one mounted namespace.
//!
//! A [`Namespace`] is what a host environment talks to: it owns the
//! superblock, the inode table, the directory tree, and the open handles of
//! one mount, and resolves caller paths component-wise from the root.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, info};

use voltfs_core::{path, FileKind, FsError, FsResult, HandleId, InodeId, Metadata};
use voltfs_store::{BlockStore, StoreConfig};

use crate::dir::DirectoryTree;
use crate::file::HandleTable;
use crate::inode::{InodePayload, InodeTable};
use crate::superblock::{MountOptions, Superblock};

/// One mounted in-memory namespace.
pub struct Namespace {
    superblock: Superblock,
    table: Arc<InodeTable>,
    tree: DirectoryTree,
    handles: HandleTable,
    options: MountOptions,
}

impl Namespace {
    /// Mounts a fresh empty namespace.
    pub fn mount(name: impl Into<String>, options: MountOptions) -> Self {
        let name = name.into();
        let store = Arc::new(BlockStore::new(StoreConfig::with_capacity(
            options.extent_capacity,
        )));
        let table = Arc::new(InodeTable::new(store));

        // Root directory: link count 2 by directory convention, anchored
        // with no parent edge. It is never removable.
        let root = table.create(FileKind::Directory, options.root_mode, options.uid, options.gid);
        table.inc_link(root.id).expect("fresh root inode");
        table.inc_link(root.id).expect("fresh root inode");

        let superblock = Superblock::new(name, options.block_size, root.id);
        info!(
            mount = %superblock.mount_id,
            name = %superblock.name,
            root = %root.id,
            "mounted namespace"
        );
        Self {
            superblock,
            tree: DirectoryTree::new(table.clone()),
            handles: HandleTable::new(table.clone()),
            table,
            options,
        }
    }

    /// Mounts a namespace and runs a populate hook over it, mirroring
    /// filesystems that pre-create static entries at mount time.
    pub fn mount_with(
        name: impl Into<String>,
        options: MountOptions,
        populate: impl FnOnce(&Namespace) -> FsResult<()>,
    ) -> FsResult<Self> {
        let ns = Self::mount(name, options);
        populate(&ns)?;
        Ok(ns)
    }

    /// Returns the superblock.
    pub fn superblock(&self) -> &Superblock {
        &self.superblock
    }

    /// Returns the root inode identity.
    pub fn root(&self) -> InodeId {
        self.superblock.root
    }

    /// Returns the inode table.
    pub fn table(&self) -> &Arc<InodeTable> {
        &self.table
    }

    fn resolve(&self, path_str: &str) -> FsResult<InodeId> {
        let mut current = self.root();
        for component in path::split(path_str)? {
            current = self.tree.lookup(current, component)?;
        }
        Ok(current)
    }

    fn resolve_parent<'p>(&self, path_str: &'p str) -> FsResult<(InodeId, &'p str)> {
        let (components, name) = path::split_parent(path_str)?;
        let mut current = self.root();
        for component in components {
            current = self.tree.lookup(current, component)?;
        }
        Ok((current, name))
    }

    /// Resolves a path to an inode identity.
    pub fn lookup(&self, path_str: &str) -> FsResult<InodeId> {
        let _op = self.superblock.begin_op()?;
        self.resolve(path_str)
    }

    /// Returns a metadata snapshot for the object at `path_str`.
    pub fn stat(&self, path_str: &str) -> FsResult<Metadata> {
        let _op = self.superblock.begin_op()?;
        let id = self.resolve(path_str)?;
        Ok(self.table.get(id)?.metadata())
    }

    /// Creates a regular file.
    pub fn create(&self, path_str: &str, mode: u32) -> FsResult<InodeId> {
        let _op = self.superblock.begin_op()?;
        let (parent, name) = self.resolve_parent(path_str)?;
        let inode = self.tree.create_entry(
            parent,
            name,
            FileKind::Regular,
            mode,
            self.options.uid,
            self.options.gid,
        )?;
        Ok(inode.id)
    }

    /// Creates a counter special file.
    pub fn create_special(&self, path_str: &str, mode: u32) -> FsResult<InodeId> {
        let _op = self.superblock.begin_op()?;
        let (parent, name) = self.resolve_parent(path_str)?;
        let inode = self.tree.create_entry(
            parent,
            name,
            FileKind::Special,
            mode,
            self.options.uid,
            self.options.gid,
        )?;
        Ok(inode.id)
    }

    /// Creates a directory.
    pub fn mkdir(&self, path_str: &str, mode: u32) -> FsResult<InodeId> {
        let _op = self.superblock.begin_op()?;
        let (parent, name) = self.resolve_parent(path_str)?;
        let inode = self
            .tree
            .mkdir(parent, name, mode, self.options.uid, self.options.gid)?;
        Ok(inode.id)
    }

    /// Creates a symbolic link at `path_str` pointing at `target`.
    pub fn symlink(&self, target: &str, path_str: &str) -> FsResult<InodeId> {
        let _op = self.superblock.begin_op()?;
        let (parent, name) = self.resolve_parent(path_str)?;
        let inode = self
            .tree
            .symlink(parent, name, target, self.options.uid, self.options.gid)?;
        Ok(inode.id)
    }

    /// Reads a symlink's target. Resolution never follows symlinks; this is
    /// the only way to observe one's payload.
    pub fn read_link(&self, path_str: &str) -> FsResult<String> {
        let _op = self.superblock.begin_op()?;
        let id = self.resolve(path_str)?;
        match self.table.get(id)?.payload() {
            InodePayload::Symlink(target) => Ok(target.clone()),
            _ => Err(FsError::InvalidArgument(format!(
                "{path_str} is not a symlink"
            ))),
        }
    }

    /// Removes an empty directory.
    pub fn rmdir(&self, path_str: &str) -> FsResult<()> {
        let _op = self.superblock.begin_op()?;
        let (parent, name) = self.resolve_parent(path_str)?;
        self.tree.rmdir(parent, name)
    }

    /// Removes a non-directory entry.
    pub fn unlink(&self, path_str: &str) -> FsResult<()> {
        let _op = self.superblock.begin_op()?;
        let (parent, name) = self.resolve_parent(path_str)?;
        self.tree.unlink(parent, name)
    }

    /// Creates a hard link at `new_path` to the inode at `existing_path`.
    pub fn link(&self, existing_path: &str, new_path: &str) -> FsResult<()> {
        let _op = self.superblock.begin_op()?;
        let target = self.resolve(existing_path)?;
        let (parent, name) = self.resolve_parent(new_path)?;
        self.tree.link(target, parent, name)
    }

    /// Atomically moves `old_path` to `new_path`.
    pub fn rename(&self, old_path: &str, new_path: &str) -> FsResult<()> {
        let _op = self.superblock.begin_op()?;
        let (src_parent, src_name) = self.resolve_parent(old_path)?;
        let (dst_parent, dst_name) = self.resolve_parent(new_path)?;
        self.tree.rename(src_parent, src_name, dst_parent, dst_name)
    }

    /// Lists a directory's entries in name order.
    pub fn read_dir(&self, path_str: &str) -> FsResult<Vec<(String, InodeId)>> {
        let _op = self.superblock.begin_op()?;
        let id = self.resolve(path_str)?;
        self.tree.read_dir(id)
    }

    /// Opens the file at `path_str` for reading and writing.
    pub fn open(&self, path_str: &str) -> FsResult<HandleId> {
        let _op = self.superblock.begin_op()?;
        let id = self.resolve(path_str)?;
        let inode = self.table.get(id)?;
        self.handles.open(inode)
    }

    /// Reads up to `length` bytes at the handle's cursor.
    pub fn read(&self, handle: HandleId, length: usize) -> FsResult<Bytes> {
        let _op = self.superblock.begin_op()?;
        self.handles.read(handle, length)
    }

    /// Writes at the handle's cursor, returning the bytes written.
    pub fn write(&self, handle: HandleId, bytes: &[u8]) -> FsResult<usize> {
        let _op = self.superblock.begin_op()?;
        self.handles.write(handle, bytes)
    }

    /// Moves the handle's cursor to an absolute offset.
    pub fn seek(&self, handle: HandleId, offset: u64) -> FsResult<()> {
        let _op = self.superblock.begin_op()?;
        self.handles.seek(handle, offset)
    }

    /// Closes an open handle.
    pub fn close(&self, handle: HandleId) -> FsResult<()> {
        let _op = self.superblock.begin_op()?;
        self.handles.close(handle)
    }

    /// Unmounts the namespace, discarding everything.
    ///
    /// Waits for in-flight operations, then walks the tree from the root
    /// releasing every edge and inode regardless of open handles; nothing
    /// is flushed because nothing persists. Fails `Busy` if teardown has
    /// already started or finished.
    pub fn unmount(&self) -> FsResult<()> {
        self.superblock.begin_unmount()?;

        self.handles.clear();
        self.detach_from(self.root());
        self.table.clear();

        self.superblock.finish_unmount();
        info!(
            mount = %self.superblock.mount_id,
            name = %self.superblock.name,
            "unmounted namespace"
        );
        Ok(())
    }

    /// Severs every edge reachable from `dir`, depth first. Records are
    /// then released wholesale by the table, orphans included.
    fn detach_from(&self, dir: InodeId) {
        let Ok(inode) = self.table.get(dir) else {
            return;
        };
        let Ok(edges) = inode.edges() else {
            return;
        };
        let children: Vec<InodeId> = {
            let mut edges = edges.lock();
            let children = edges.values().copied().collect();
            edges.clear();
            children
        };
        for child in children {
            if self.table.get(child).map(|c| c.is_dir()).unwrap_or(false) {
                self.detach_from(child);
            }
        }
        debug!(dir = %dir, "detached directory");
    }
}
