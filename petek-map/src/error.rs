use std::fmt;

use petek::StoreError;

/// Typed errors for map operations.
#[derive(Debug)]
pub enum MapError {
    /// The caller supplied a key longer than the configured width. The map is
    /// unchanged.
    KeyTooLong {
        /// Configured maximum key width in bytes.
        max: usize,
        /// Length of the supplied key.
        actual: usize,
    },
    /// The caller supplied a value longer than the configured width. The map
    /// is unchanged.
    ValueTooLong {
        /// Configured maximum value width in bytes.
        max: usize,
        /// Length of the supplied value.
        actual: usize,
    },
    /// The directory is at its maximum size and the filled bucket cannot
    /// chain further under the load-factor limit. Fatal for the insertion;
    /// the map stays usable for reads and removes.
    MapFull {
        /// Directory size at the time of the failure.
        table_size: u64,
        /// Configured directory cap.
        max_table_size: u64,
    },
    /// A directory resize would overflow the addressable region.
    CapacityOverflow {
        /// The requested directory size.
        requested: u64,
    },
    /// Propagated from the backing store, unchanged.
    Io(StoreError),
}

impl fmt::Display for MapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapError::KeyTooLong { max, actual } => {
                write!(f, "key length {} exceeds the maximum of {}", actual, max)
            }
            MapError::ValueTooLong { max, actual } => {
                write!(f, "value length {} exceeds the maximum of {}", actual, max)
            }
            MapError::MapFull {
                table_size,
                max_table_size,
            } => {
                write!(
                    f,
                    "map is full: cannot grow the hash table past {} (max {})",
                    table_size, max_table_size
                )
            }
            MapError::CapacityOverflow { requested } => {
                write!(
                    f,
                    "hash table size {} overflows the addressable region",
                    requested
                )
            }
            MapError::Io(err) => write!(f, "store failure: {}", err),
        }
    }
}

impl std::error::Error for MapError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MapError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for MapError {
    fn from(err: StoreError) -> Self {
        MapError::Io(err)
    }
}
