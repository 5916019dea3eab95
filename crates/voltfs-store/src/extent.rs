//! Extent arena implementation.
//!
//! Each regular file owns one extent: a growable byte vector bounded by the
//! configured capacity ceiling. Reads and writes are per-call atomic; a
//! per-extent RwLock lets reads proceed concurrently with other reads but
//! never with a write, so readers observe pre- or post-write state, never a
//! torn mix.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::RwLock;
use tracing::debug;

use crate::{StoreConfig, StoreError};

/// Handle naming one allocated extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExtentHandle(pub u64);

impl std::fmt::Display for ExtentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// In-memory extent arena for regular-file content.
pub struct BlockStore {
    config: StoreConfig,
    extents: RwLock<HashMap<ExtentHandle, Arc<RwLock<Vec<u8>>>>>,
    next_handle: AtomicU64,
}

impl BlockStore {
    /// Creates an empty store with the given configuration.
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            extents: RwLock::new(HashMap::new()),
            next_handle: AtomicU64::new(1),
        }
    }

    /// Returns the store configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Allocates a fresh empty extent.
    pub fn allocate(&self) -> ExtentHandle {
        let handle = ExtentHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        self.extents
            .write()
            .insert(handle, Arc::new(RwLock::new(Vec::new())));
        debug!(extent = %handle, "allocated extent");
        handle
    }

    fn extent(&self, handle: ExtentHandle) -> Result<Arc<RwLock<Vec<u8>>>, StoreError> {
        self.extents
            .read()
            .get(&handle)
            .cloned()
            .ok_or(StoreError::InvalidHandle(handle.0))
    }

    /// Reads up to `length` bytes starting at `offset`.
    ///
    /// Returns fewer bytes than requested only at end-of-data, and an empty
    /// buffer past it; never an error.
    pub fn read(
        &self,
        handle: ExtentHandle,
        offset: u64,
        length: usize,
    ) -> Result<Bytes, StoreError> {
        let extent = self.extent(handle)?;
        let data = extent.read();
        let start = (offset as usize).min(data.len());
        let end = start.saturating_add(length).min(data.len());
        Ok(Bytes::copy_from_slice(&data[start..end]))
    }

    /// Writes `bytes` at `offset`, zero-filling any gap past the current
    /// logical size and growing the extent as needed.
    ///
    /// Returns the number of bytes written. Fails `OutOfSpace` if the write
    /// would exceed the capacity ceiling, in which case nothing is written.
    pub fn write(
        &self,
        handle: ExtentHandle,
        offset: u64,
        bytes: &[u8],
    ) -> Result<usize, StoreError> {
        let extent = self.extent(handle)?;
        let end = offset
            .checked_add(bytes.len() as u64)
            .ok_or(StoreError::OutOfSpace(self.config.extent_capacity))?;
        if end > self.config.extent_capacity {
            return Err(StoreError::OutOfSpace(self.config.extent_capacity));
        }

        let mut data = extent.write();
        if (data.len() as u64) < end {
            data.resize(end as usize, 0);
        }
        data[offset as usize..end as usize].copy_from_slice(bytes);
        debug!(extent = %handle, offset, len = bytes.len(), "wrote extent");
        Ok(bytes.len())
    }

    /// Truncates or zero-extends the extent to `new_size`.
    pub fn truncate(&self, handle: ExtentHandle, new_size: u64) -> Result<(), StoreError> {
        if new_size > self.config.extent_capacity {
            return Err(StoreError::OutOfSpace(self.config.extent_capacity));
        }
        let extent = self.extent(handle)?;
        extent.write().resize(new_size as usize, 0);
        Ok(())
    }

    /// Returns the current logical size of the extent.
    pub fn len(&self, handle: ExtentHandle) -> Result<u64, StoreError> {
        Ok(self.extent(handle)?.read().len() as u64)
    }

    /// Returns true if the extent holds no data.
    pub fn is_empty(&self, handle: ExtentHandle) -> Result<bool, StoreError> {
        Ok(self.len(handle)? == 0)
    }

    /// Releases the extent. Further references fail `InvalidHandle`.
    pub fn free(&self, handle: ExtentHandle) -> Result<(), StoreError> {
        self.extents
            .write()
            .remove(&handle)
            .ok_or(StoreError::InvalidHandle(handle.0))?;
        debug!(extent = %handle, "freed extent");
        Ok(())
    }

    /// Number of live extents, for diagnostics and tests.
    pub fn extent_count(&self) -> usize {
        self.extents.read().len()
    }
}
