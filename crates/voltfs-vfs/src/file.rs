//! Open-file handles and the regular-file data path.
//!
//! A handle pairs a resolved inode with a read/write cursor. Its existence
//! holds the inode's open-handle count up, which is what keeps an unlinked
//! inode alive (the Orphaned state) until the last close.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use tracing::debug;

use voltfs_core::{FsError, FsResult, HandleId};

use crate::inode::{Inode, InodePayload, InodeTable};

struct CursorState {
    offset: u64,
    /// Rendered counter text captured on the first read of a special file.
    /// Later reads through the same handle replay this snapshot instead of
    /// observing the incremented counter.
    counter_snapshot: Option<Bytes>,
}

/// One open file: a referenced inode plus a cursor.
pub struct OpenFile {
    /// Handle identity
    pub id: HandleId,
    inode: Arc<Inode>,
    cursor: Mutex<CursorState>,
}

impl OpenFile {
    /// The inode this handle references.
    pub fn inode(&self) -> &Arc<Inode> {
        &self.inode
    }

    /// Current cursor offset.
    pub fn offset(&self) -> u64 {
        self.cursor.lock().offset
    }
}

/// Owns every open handle of one namespace session.
pub struct HandleTable {
    table: Arc<InodeTable>,
    handles: RwLock<HashMap<HandleId, Arc<OpenFile>>>,
    next_handle: AtomicU64,
}

impl HandleTable {
    /// Creates an empty handle table over the given inode table.
    pub fn new(table: Arc<InodeTable>) -> Self {
        Self {
            table,
            handles: RwLock::new(HashMap::new()),
            next_handle: AtomicU64::new(1),
        }
    }

    /// Opens a handle on a resolved inode, incrementing its handle count.
    ///
    /// Directories fail `IsADirectory`; symlinks fail `InvalidArgument`
    /// (their target is read with `read_link`, not through a handle).
    pub fn open(&self, inode: Arc<Inode>) -> FsResult<HandleId> {
        match inode.payload() {
            InodePayload::Directory(_) => {
                return Err(FsError::IsADirectory(inode.id.to_string()))
            }
            InodePayload::Symlink(_) => {
                return Err(FsError::InvalidArgument(format!(
                    "cannot open symlink inode {}",
                    inode.id
                )))
            }
            InodePayload::Regular(_) | InodePayload::Special(_) => {}
        }

        self.table.open(inode.id)?;
        let id = HandleId::new(self.next_handle.fetch_add(1, Ordering::Relaxed));
        let open = Arc::new(OpenFile {
            id,
            inode,
            cursor: Mutex::new(CursorState {
                offset: 0,
                counter_snapshot: None,
            }),
        });
        debug!(handle = %id, inode = %open.inode.id, "opened handle");
        self.handles.write().insert(id, open);
        Ok(id)
    }

    fn get(&self, handle: HandleId) -> FsResult<Arc<OpenFile>> {
        self.handles
            .read()
            .get(&handle)
            .cloned()
            .ok_or_else(|| FsError::InvalidArgument(format!("bad handle {handle}")))
    }

    /// Reads up to `length` bytes at the cursor, advancing it.
    ///
    /// Short reads happen only at end-of-data. For a counter file, the very
    /// first read through the handle increments the counter and returns the
    /// pre-increment value rendered as text; later reads replay the same
    /// snapshot.
    pub fn read(&self, handle: HandleId, length: usize) -> FsResult<Bytes> {
        let open = self.get(handle)?;
        open.inode
            .with_attrs(|a| a.times.atime = std::time::SystemTime::now());

        match open.inode.payload() {
            InodePayload::Regular(extent) => {
                let mut state = open.cursor.lock();
                let bytes = self.table.store().read(*extent, state.offset, length)?;
                state.offset += bytes.len() as u64;
                Ok(bytes)
            }
            InodePayload::Special(counter) => {
                let mut state = open.cursor.lock();
                let snapshot = if state.offset == 0 {
                    let value = counter.fetch_add(1, Ordering::SeqCst);
                    let rendered = Bytes::from(format!("{value}\n"));
                    state.counter_snapshot = Some(rendered.clone());
                    rendered
                } else {
                    state
                        .counter_snapshot
                        .clone()
                        .unwrap_or_else(|| {
                            // Cursor moved without a read (seek); render the
                            // last-returned value, one behind the counter.
                            Bytes::from(format!("{}\n", counter.load(Ordering::SeqCst) - 1))
                        })
                };
                let served = snapshot.slice(..snapshot.len().min(length));
                state.offset += served.len() as u64;
                Ok(served)
            }
            _ => Err(FsError::InvalidArgument(format!(
                "handle {handle} is not readable"
            ))),
        }
    }

    /// Writes `bytes` at the cursor, advancing it and extending the file.
    ///
    /// Counter files accept writes only at cursor 0 and set the counter
    /// from the parsed decimal input.
    pub fn write(&self, handle: HandleId, bytes: &[u8]) -> FsResult<usize> {
        let open = self.get(handle)?;

        match open.inode.payload() {
            InodePayload::Regular(extent) => {
                let mut state = open.cursor.lock();
                let written = self.table.store().write(*extent, state.offset, bytes)?;
                state.offset += written as u64;
                let end = state.offset;
                open.inode.with_attrs(|a| {
                    a.size = a.size.max(end);
                    a.times.touch();
                });
                Ok(written)
            }
            InodePayload::Special(counter) => {
                let state = open.cursor.lock();
                if state.offset != 0 {
                    return Err(FsError::InvalidArgument(
                        "counter write accepted only at offset 0".to_string(),
                    ));
                }
                let text = std::str::from_utf8(bytes)
                    .map_err(|_| FsError::InvalidArgument("counter write not UTF-8".to_string()))?;
                let value: i64 = text
                    .trim()
                    .parse()
                    .map_err(|_| FsError::InvalidArgument(format!("bad counter value: {text}")))?;
                counter.store(value, Ordering::SeqCst);
                open.inode.with_attrs(|a| a.times.touch());
                Ok(bytes.len())
            }
            _ => Err(FsError::InvalidArgument(format!(
                "handle {handle} is not writable"
            ))),
        }
    }

    /// Moves the cursor to an absolute offset.
    pub fn seek(&self, handle: HandleId, offset: u64) -> FsResult<()> {
        let open = self.get(handle)?;
        open.cursor.lock().offset = offset;
        Ok(())
    }

    /// Closes the handle, decrementing the inode's handle count and freeing
    /// an orphaned inode on the last close.
    pub fn close(&self, handle: HandleId) -> FsResult<()> {
        let open = self
            .handles
            .write()
            .remove(&handle)
            .ok_or_else(|| FsError::InvalidArgument(format!("bad handle {handle}")))?;
        self.table.close(open.inode.id)?;
        debug!(handle = %handle, inode = %open.inode.id, "closed handle");
        Ok(())
    }

    /// Drops every handle without touching inode counts. Used by unmount,
    /// which releases all inodes wholesale.
    pub fn clear(&self) {
        self.handles.write().clear();
    }

    /// Number of open handles, for diagnostics and tests.
    pub fn len(&self) -> usize {
        self.handles.read().len()
    }

    /// Returns true when no handles are open.
    pub fn is_empty(&self) -> bool {
        self.handles.read().is_empty()
    }
}
