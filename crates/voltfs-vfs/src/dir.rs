//! Directory tree: named edges between inodes.
//!
//! All namespace edits go through this module. Each directory's edge set is
//! the unit of serializability: an operation holds the edge mutex of every
//! directory it touches for the whole call. Operations that need more than
//! one directory (rename, rmdir) acquire the locks in ascending inode-id
//! order, discovering the lock set optimistically and revalidating after
//! locking, retrying if a concurrent edit moved the namespace underneath.
//! Directory moves additionally serialize on a tree-wide rename lock, so
//! the ancestry check stays valid while the edge locks are acquired.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use tracing::debug;

use voltfs_core::{path, FileKind, FsError, FsResult, InodeId};

use crate::inode::{Inode, InodeTable};

type EdgeMap = BTreeMap<String, InodeId>;

/// Guards over several directories' edge sets, locked in id order.
struct EdgeGuards<'a> {
    guards: Vec<(InodeId, MutexGuard<'a, EdgeMap>)>,
}

impl<'a> EdgeGuards<'a> {
    fn lock(dirs: &[&'a Arc<Inode>]) -> FsResult<Self> {
        let mut dirs: Vec<&Arc<Inode>> = dirs.to_vec();
        dirs.sort_by_key(|d| d.id);
        dirs.dedup_by_key(|d| d.id);
        let mut guards = Vec::with_capacity(dirs.len());
        for dir in dirs {
            guards.push((dir.id, dir.edges()?.lock()));
        }
        Ok(Self { guards })
    }

    fn get(&self, id: InodeId) -> &EdgeMap {
        &self
            .guards
            .iter()
            .find(|(gid, _)| *gid == id)
            .expect("directory lock held")
            .1
    }

    fn get_mut(&mut self, id: InodeId) -> &mut EdgeMap {
        &mut self
            .guards
            .iter_mut()
            .find(|(gid, _)| *gid == id)
            .expect("directory lock held")
            .1
    }
}

/// Graph edits over the namespace owned by one [`InodeTable`].
pub struct DirectoryTree {
    table: Arc<InodeTable>,
    // Held across every directory move; only renames change an existing
    // directory's ancestry, so holding this keeps the ancestry check stable
    // until the move commits.
    rename_lock: Mutex<()>,
}

impl DirectoryTree {
    /// Creates a tree over the given table.
    pub fn new(table: Arc<InodeTable>) -> Self {
        Self {
            table,
            rename_lock: Mutex::new(()),
        }
    }

    /// Returns the underlying inode table.
    pub fn table(&self) -> &Arc<InodeTable> {
        &self.table
    }

    fn dir(&self, id: InodeId) -> FsResult<Arc<Inode>> {
        let inode = self.table.get(id)?;
        inode.edges()?;
        Ok(inode)
    }

    /// Resolves `name` in `parent` to an inode identity.
    pub fn lookup(&self, parent: InodeId, name: &str) -> FsResult<InodeId> {
        let dir = self.dir(parent)?;
        let edges = dir.edges()?.lock();
        edges
            .get(name)
            .copied()
            .ok_or_else(|| FsError::NotFound(name.to_string()))
    }

    /// Lists the edges of `parent` in name order.
    pub fn read_dir(&self, parent: InodeId) -> FsResult<Vec<(String, InodeId)>> {
        let dir = self.dir(parent)?;
        let edges = dir.edges()?.lock();
        Ok(edges.iter().map(|(n, id)| (n.clone(), *id)).collect())
    }

    /// Creates a new inode of `kind` and binds it as `name` in `parent`.
    ///
    /// A regular/symlink/special entry gets link count 1; a new directory
    /// gets 2 (its self reference) and increments the parent by 1.
    pub fn create_entry(
        &self,
        parent: InodeId,
        name: &str,
        kind: FileKind,
        mode: u32,
        uid: u32,
        gid: u32,
    ) -> FsResult<Arc<Inode>> {
        path::validate_name(name)?;
        let dir = self.dir(parent)?;
        let mut edges = dir.edges()?.lock();
        if edges.contains_key(name) {
            return Err(FsError::AlreadyExists(name.to_string()));
        }

        let child = self.table.create(kind, mode, uid, gid);
        edges.insert(name.to_string(), child.id);
        self.table.inc_link(child.id)?;
        if child.is_dir() {
            self.table.inc_link(child.id)?;
            self.table.inc_link(parent)?;
        }
        dir.with_attrs(|a| a.times.touch());
        debug!(parent = %parent, name, child = %child.id, kind = ?kind, "created entry");
        Ok(child)
    }

    /// As [`DirectoryTree::create_entry`] with kind Directory.
    pub fn mkdir(&self, parent: InodeId, name: &str, mode: u32, uid: u32, gid: u32) -> FsResult<Arc<Inode>> {
        self.create_entry(parent, name, FileKind::Directory, mode, uid, gid)
    }

    /// Creates a symlink entry pointing at `target`.
    pub fn symlink(
        &self,
        parent: InodeId,
        name: &str,
        target: &str,
        uid: u32,
        gid: u32,
    ) -> FsResult<Arc<Inode>> {
        path::validate_name(name)?;
        let dir = self.dir(parent)?;
        let mut edges = dir.edges()?.lock();
        if edges.contains_key(name) {
            return Err(FsError::AlreadyExists(name.to_string()));
        }

        let child = self.table.create_symlink(target, 0o777, uid, gid);
        edges.insert(name.to_string(), child.id);
        self.table.inc_link(child.id)?;
        dir.with_attrs(|a| a.times.touch());
        debug!(parent = %parent, name, target, "created symlink");
        Ok(child)
    }

    /// Removes the non-directory entry `name` from `parent`.
    ///
    /// The target inode loses one link; with open handles remaining it
    /// lingers in the Orphaned state until the last close.
    pub fn unlink(&self, parent: InodeId, name: &str) -> FsResult<()> {
        let dir = self.dir(parent)?;
        let mut edges = dir.edges()?.lock();
        let child_id = *edges
            .get(name)
            .ok_or_else(|| FsError::NotFound(name.to_string()))?;
        let child = self
            .table
            .get(child_id)
            .expect("directory edge points at a live inode");
        if child.is_dir() {
            return Err(FsError::IsADirectory(name.to_string()));
        }

        edges.remove(name);
        self.table.dec_link(child_id)?;
        dir.with_attrs(|a| a.times.touch());
        debug!(parent = %parent, name, child = %child_id, "unlinked entry");
        Ok(())
    }

    /// Removes the empty directory `name` from `parent`.
    pub fn rmdir(&self, parent: InodeId, name: &str) -> FsResult<()> {
        let dir = self.dir(parent)?;
        loop {
            let child_id = {
                let edges = dir.edges()?.lock();
                *edges
                    .get(name)
                    .ok_or_else(|| FsError::NotFound(name.to_string()))?
            };
            // The edge lock was dropped after the id read, so the inode may
            // have been freed by a concurrent removal; re-discover.
            let Ok(child) = self.table.get(child_id) else {
                continue;
            };
            if !child.is_dir() {
                return Err(FsError::NotADirectory(name.to_string()));
            }

            let mut guards = EdgeGuards::lock(&[&dir, &child])?;
            if guards.get(parent).get(name) != Some(&child_id) {
                // Raced with a concurrent rename or unlink; re-discover.
                continue;
            }
            if !guards.get(child_id).is_empty() {
                return Err(FsError::DirectoryNotEmpty(name.to_string()));
            }

            guards.get_mut(parent).remove(name);
            // Subdirectory count on the parent, then the child's parent edge
            // and self reference, driving it to zero.
            self.table.dec_link(parent)?;
            self.table.dec_link(child_id)?;
            self.table.dec_link(child_id)?;
            dir.with_attrs(|a| a.times.touch());
            debug!(parent = %parent, name, child = %child_id, "removed directory");
            return Ok(());
        }
    }

    /// Binds `new_name` in `parent` as an additional edge to `target`.
    pub fn link(&self, target: InodeId, parent: InodeId, new_name: &str) -> FsResult<()> {
        path::validate_name(new_name)?;
        let inode = self.table.get(target)?;
        if inode.is_dir() {
            return Err(FsError::IsADirectory(target.to_string()));
        }
        let dir = self.dir(parent)?;
        let mut edges = dir.edges()?.lock();
        if edges.contains_key(new_name) {
            return Err(FsError::AlreadyExists(new_name.to_string()));
        }

        self.table.inc_link(target)?;
        edges.insert(new_name.to_string(), target);
        inode.with_attrs(|a| a.times.touch());
        dir.with_attrs(|a| a.times.touch());
        debug!(target = %target, parent = %parent, name = new_name, "hard linked");
        Ok(())
    }

    /// Atomically moves `src_name` in `src_parent` to `dst_name` in
    /// `dst_parent`, replacing a compatible existing destination.
    ///
    /// A concurrent lookup on either path observes the old or the new
    /// binding, never an intermediate state.
    pub fn rename(
        &self,
        src_parent: InodeId,
        src_name: &str,
        dst_parent: InodeId,
        dst_name: &str,
    ) -> FsResult<()> {
        path::validate_name(dst_name)?;
        let src_dir = self.dir(src_parent)?;
        let dst_dir = self.dir(dst_parent)?;

        if src_parent == dst_parent && src_name == dst_name {
            // Renaming an entry onto itself leaves the namespace untouched.
            self.lookup(src_parent, src_name)?;
            return Ok(());
        }

        loop {
            let moved_id = {
                let edges = src_dir.edges()?.lock();
                *edges
                    .get(src_name)
                    .ok_or_else(|| FsError::NotFound(src_name.to_string()))?
            };
            // Freed in the window after the id read means a concurrent
            // removal won; re-discover.
            let Ok(moved) = self.table.get(moved_id) else {
                continue;
            };

            // Moving a directory changes its subtree's ancestry, so those
            // moves serialize tree-wide and reject a destination inside the
            // moved subtree, which would detach it into an unreachable cycle.
            let _topology = if moved.is_dir() {
                Some(self.rename_lock.lock())
            } else {
                None
            };
            if moved.is_dir()
                && (dst_parent == moved_id || self.subtree_contains(&moved, dst_parent))
            {
                return Err(FsError::InvalidArgument(format!(
                    "cannot move {src_name} into its own subtree"
                )));
            }

            let victim_id = {
                let edges = dst_dir.edges()?.lock();
                edges.get(dst_name).copied()
            };

            if victim_id == Some(moved_id) {
                // Both names already link the same inode; nothing to move.
                return Ok(());
            }

            let victim = match victim_id {
                Some(id) => match self.table.get(id) {
                    Ok(victim) => Some(victim),
                    Err(_) => continue,
                },
                None => None,
            };

            // Replacing a directory requires its emptiness check under its
            // own lock, so it joins the ordered lock set.
            let mut to_lock = vec![&src_dir, &dst_dir];
            if let Some(v) = &victim {
                if v.is_dir() && moved.is_dir() {
                    to_lock.push(v);
                }
            }
            let mut guards = EdgeGuards::lock(&to_lock)?;

            if guards.get(src_parent).get(src_name) != Some(&moved_id) {
                continue;
            }
            if guards.get(dst_parent).get(dst_name).copied() != victim_id {
                continue;
            }

            if let Some(victim) = &victim {
                match (moved.is_dir(), victim.is_dir()) {
                    (false, false) => {
                        guards.get_mut(dst_parent).remove(dst_name);
                        self.table.dec_link(victim.id)?;
                    }
                    (true, true) => {
                        if !guards.get(victim.id).is_empty() {
                            return Err(FsError::DirectoryNotEmpty(dst_name.to_string()));
                        }
                        guards.get_mut(dst_parent).remove(dst_name);
                        // The replaced directory loses its parent edge and
                        // its self reference; the destination parent loses
                        // one subdirectory.
                        self.table.dec_link(dst_parent)?;
                        self.table.dec_link(victim.id)?;
                        self.table.dec_link(victim.id)?;
                    }
                    _ => {
                        return Err(FsError::InvalidArgument(format!(
                            "cannot replace {dst_name}: kind mismatch"
                        )))
                    }
                }
            }

            guards.get_mut(src_parent).remove(src_name);
            guards
                .get_mut(dst_parent)
                .insert(dst_name.to_string(), moved_id);

            if moved.is_dir() && src_parent != dst_parent {
                self.table.dec_link(src_parent)?;
                self.table.inc_link(dst_parent)?;
            }
            src_dir.with_attrs(|a| a.times.touch());
            dst_dir.with_attrs(|a| a.times.touch());
            debug!(
                src = %src_parent, src_name, dst = %dst_parent, dst_name,
                moved = %moved_id, "renamed entry"
            );
            return Ok(());
        }
    }

    /// Walks the directory subtree under `root` looking for `needle`.
    ///
    /// Callers hold the rename lock and no edge locks, so each edge set can
    /// be locked transiently, one at a time, during the walk.
    fn subtree_contains(&self, root: &Arc<Inode>, needle: InodeId) -> bool {
        let mut stack = vec![root.clone()];
        while let Some(dir) = stack.pop() {
            let Ok(edges) = dir.edges() else {
                continue;
            };
            let children: Vec<InodeId> = edges.lock().values().copied().collect();
            for child in children {
                if child == needle {
                    return true;
                }
                if let Ok(inode) = self.table.get(child) {
                    if inode.is_dir() {
                        stack.push(inode);
                    }
                }
            }
        }
        false
    }
}
