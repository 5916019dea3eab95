//! Inode records and the table that owns them.
//!
//! Every filesystem object is an [`Inode`] owned exclusively by the
//! [`InodeTable`]. Directory edges and open file handles reference inodes by
//! identity; the table arbitrates the lifecycle:
//!
//! Created (link 0, unreachable) -> Live (link >= 1) -> Orphaned (link 0,
//! handles > 0) -> Freed. Live -> Freed happens directly when the last link
//! drops with no handles open. Freed is terminal; any further reference
//! fails `NotFound`.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use voltfs_core::{FileKind, FsError, FsResult, InodeId, Metadata, Timestamps};
use voltfs_store::{BlockStore, ExtentHandle};

/// Kind-specific payload of an inode.
pub enum InodePayload {
    /// Regular file content, stored in the block store
    Regular(ExtentHandle),
    /// Directory edge set: name to child inode identity
    Directory(Mutex<BTreeMap<String, InodeId>>),
    /// Symbolic link target path
    Symlink(String),
    /// Self-incrementing counter file
    Special(AtomicI64),
}

/// Mutable attributes guarded by a per-inode mutex.
#[derive(Debug, Clone)]
pub struct Attrs {
    /// Mode bits
    pub mode: u32,
    /// Owner user id
    pub uid: u32,
    /// Owner group id
    pub gid: u32,
    /// Logical size in bytes (regular files)
    pub size: u64,
    /// Access/modify/change times
    pub times: Timestamps,
}

/// Link and handle counts plus the terminal freed flag.
///
/// All transitions happen under this mutex, so the Freed transition is
/// decided exactly once, by whichever mutation observes link = 0 and
/// handles = 0.
#[derive(Debug)]
struct LinkState {
    nlink: u32,
    handles: u32,
    freed: bool,
}

/// A filesystem object record.
pub struct Inode {
    /// Identity, unique within one superblock
    pub id: InodeId,
    /// Object kind, fixed at creation
    pub kind: FileKind,
    payload: InodePayload,
    attrs: Mutex<Attrs>,
    links: Mutex<LinkState>,
}

impl Inode {
    fn new(id: InodeId, kind: FileKind, payload: InodePayload, mode: u32, uid: u32, gid: u32) -> Self {
        Self {
            id,
            kind,
            payload,
            attrs: Mutex::new(Attrs {
                mode,
                uid,
                gid,
                size: 0,
                times: Timestamps::now(),
            }),
            links: Mutex::new(LinkState {
                nlink: 0,
                handles: 0,
                freed: false,
            }),
        }
    }

    /// Returns the payload.
    pub fn payload(&self) -> &InodePayload {
        &self.payload
    }

    /// Returns the directory edge set, or `NotADirectory`.
    pub fn edges(&self) -> FsResult<&Mutex<BTreeMap<String, InodeId>>> {
        match &self.payload {
            InodePayload::Directory(edges) => Ok(edges),
            _ => Err(FsError::NotADirectory(self.id.to_string())),
        }
    }

    /// Returns the backing extent, or `InvalidArgument` for non-regular inodes.
    pub fn extent(&self) -> FsResult<ExtentHandle> {
        match &self.payload {
            InodePayload::Regular(handle) => Ok(*handle),
            _ => Err(FsError::InvalidArgument(format!(
                "inode {} has no file content",
                self.id
            ))),
        }
    }

    /// Returns true for directories.
    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }

    /// Runs a closure over the mutable attributes.
    pub fn with_attrs<R>(&self, f: impl FnOnce(&mut Attrs) -> R) -> R {
        f(&mut self.attrs.lock())
    }

    /// Current link count.
    pub fn nlink(&self) -> u32 {
        self.links.lock().nlink
    }

    /// Current open-handle count.
    pub fn handle_count(&self) -> u32 {
        self.links.lock().handles
    }

    /// Point-in-time metadata snapshot.
    pub fn metadata(&self) -> Metadata {
        let attrs = self.attrs.lock().clone();
        let size = match &self.payload {
            InodePayload::Regular(_) => attrs.size,
            InodePayload::Directory(edges) => edges.lock().len() as u64,
            InodePayload::Symlink(target) => target.len() as u64,
            InodePayload::Special(counter) => {
                format!("{}\n", counter.load(Ordering::Relaxed)).len() as u64
            }
        };
        Metadata {
            inode: self.id,
            kind: self.kind,
            mode: attrs.mode,
            uid: attrs.uid,
            gid: attrs.gid,
            size,
            nlink: self.nlink(),
            times: attrs.times,
        }
    }
}

/// Owns every inode record of one mounted namespace.
pub struct InodeTable {
    store: Arc<BlockStore>,
    inodes: RwLock<HashMap<InodeId, Arc<Inode>>>,
    next_id: AtomicU64,
}

impl InodeTable {
    /// Creates an empty table backed by the given store.
    pub fn new(store: Arc<BlockStore>) -> Self {
        Self {
            store,
            inodes: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(InodeId::ROOT.raw()),
        }
    }

    /// Returns the backing store.
    pub fn store(&self) -> &Arc<BlockStore> {
        &self.store
    }

    fn insert(&self, inode: Inode) -> Arc<Inode> {
        let inode = Arc::new(inode);
        self.inodes.write().insert(inode.id, inode.clone());
        debug!(inode = %inode.id, kind = ?inode.kind, "created inode");
        inode
    }

    /// Creates a new inode of the given kind with link count 0.
    ///
    /// The first directory edge created for it brings the link count to 1.
    /// Use [`InodeTable::create_symlink`] for symlinks.
    pub fn create(&self, kind: FileKind, mode: u32, uid: u32, gid: u32) -> Arc<Inode> {
        let id = InodeId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let payload = match kind {
            FileKind::Regular => InodePayload::Regular(self.store.allocate()),
            FileKind::Directory => InodePayload::Directory(Mutex::new(BTreeMap::new())),
            FileKind::Special => InodePayload::Special(AtomicI64::new(0)),
            FileKind::Symlink => InodePayload::Symlink(String::new()),
        };
        self.insert(Inode::new(id, kind, payload, mode, uid, gid))
    }

    /// Creates a new symlink inode pointing at `target`.
    pub fn create_symlink(
        &self,
        target: impl Into<String>,
        mode: u32,
        uid: u32,
        gid: u32,
    ) -> Arc<Inode> {
        let id = InodeId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let payload = InodePayload::Symlink(target.into());
        self.insert(Inode::new(id, FileKind::Symlink, payload, mode, uid, gid))
    }

    /// Gets a live inode record by identity.
    pub fn get(&self, id: InodeId) -> FsResult<Arc<Inode>> {
        self.inodes
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| FsError::NotFound(format!("inode {id}")))
    }

    /// Increments the link count; fails `NotFound` once the inode is freed.
    pub fn inc_link(&self, id: InodeId) -> FsResult<()> {
        let inode = self.get(id)?;
        let mut links = inode.links.lock();
        if links.freed {
            return Err(FsError::NotFound(format!("inode {id}")));
        }
        links.nlink += 1;
        Ok(())
    }

    /// Decrements the link count, freeing the inode if it reaches zero with
    /// no open handles.
    pub fn dec_link(&self, id: InodeId) -> FsResult<()> {
        let inode = self.get(id)?;
        let free = {
            let mut links = inode.links.lock();
            if links.freed {
                return Err(FsError::NotFound(format!("inode {id}")));
            }
            assert!(links.nlink > 0, "dec_link on inode {id} with zero links");
            links.nlink -= 1;
            if links.nlink == 0 && links.handles == 0 {
                links.freed = true;
                true
            } else {
                false
            }
        };
        if free {
            self.release(&inode);
        } else if inode.nlink() == 0 {
            debug!(inode = %id, "inode orphaned, kept alive by open handles");
        }
        Ok(())
    }

    /// Increments the open-handle count; fails `NotFound` once freed.
    pub fn open(&self, id: InodeId) -> FsResult<()> {
        let inode = self.get(id)?;
        let mut links = inode.links.lock();
        if links.freed {
            return Err(FsError::NotFound(format!("inode {id}")));
        }
        links.handles += 1;
        Ok(())
    }

    /// Decrements the open-handle count, freeing an orphaned inode on the
    /// last close.
    pub fn close(&self, id: InodeId) -> FsResult<()> {
        let inode = self.get(id)?;
        let free = {
            let mut links = inode.links.lock();
            if links.freed {
                return Err(FsError::NotFound(format!("inode {id}")));
            }
            assert!(links.handles > 0, "close on inode {id} with zero handles");
            links.handles -= 1;
            if links.nlink == 0 && links.handles == 0 {
                links.freed = true;
                true
            } else {
                false
            }
        };
        if free {
            self.release(&inode);
        }
        Ok(())
    }

    /// Removes the record and frees any backing storage. The freed flag is
    /// already set; callers arrive here exactly once per inode.
    fn release(&self, inode: &Arc<Inode>) {
        self.inodes.write().remove(&inode.id);
        if let InodePayload::Regular(handle) = &inode.payload {
            // The extent exists for the whole life of the inode.
            self.store
                .free(*handle)
                .expect("regular inode backed by a live extent");
        }
        debug!(inode = %inode.id, "freed inode");
    }

    /// Releases every record unconditionally. Used by unmount teardown,
    /// which discards in-flight handles rather than flushing them.
    pub fn clear(&self) {
        let drained: Vec<Arc<Inode>> = self.inodes.write().drain().map(|(_, i)| i).collect();
        for inode in drained {
            let already_freed = {
                let mut links = inode.links.lock();
                std::mem::replace(&mut links.freed, true)
            };
            if already_freed {
                continue;
            }
            if let InodePayload::Regular(handle) = &inode.payload {
                let _ = self.store.free(*handle);
            }
        }
    }

    /// Number of live records, for diagnostics and tests.
    pub fn len(&self) -> usize {
        self.inodes.read().len()
    }

    /// Returns true when no records are live.
    pub fn is_empty(&self) -> bool {
        self.inodes.read().is_empty()
    }
}
