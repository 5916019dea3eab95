//! Storage configuration.

/// Store configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Capacity ceiling per extent, in bytes
    pub extent_capacity: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            // 16 MiB per file by default; the prototypes fixed a single
            // 1 KiB block, generalized here to a configurable ceiling.
            extent_capacity: 16 * 1024 * 1024,
        }
    }
}

impl StoreConfig {
    /// Creates a configuration with the given per-extent capacity.
    pub fn with_capacity(extent_capacity: u64) -> Self {
        Self { extent_capacity }
    }
}
