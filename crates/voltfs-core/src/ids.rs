//! Identifier types for inodes, open handles, and mounts.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Macro to define a u64 identifier newtype with common implementations.
macro_rules! define_id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(pub u64);

        impl $name {
            /// Creates an identifier from a raw value.
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            /// Returns the raw value.
            pub const fn raw(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> u64 {
                id.0
            }
        }
    };
}

define_id_type!(
    /// Inode identifier, unique within one superblock.
    InodeId
);

define_id_type!(
    /// Open-file handle identifier, unique within one namespace session.
    HandleId
);

define_id_type!(
    /// Mount identifier for one superblock instance.
    MountId
);

impl InodeId {
    /// Root inode identifier.
    pub const ROOT: InodeId = InodeId(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_roundtrip() {
        let id = InodeId::new(42);
        assert_eq!(u64::from(id), 42);
        assert_eq!(InodeId::from(42u64), id);
        assert_eq!(id.to_string(), "42");
    }

    #[test]
    fn test_ids_are_distinct_types() {
        assert_eq!(InodeId::ROOT.raw(), 1);
        assert_eq!(HandleId::new(1).raw(), 1);
    }
}
