use petek::{LoadedBuffer, MemStore, Store};

use crate::error::MapError;
use crate::layout::{read_u64, write_u64};

/// Bytes per directory entry.
const ADDRESS_LENGTH: u64 = 8;

/// The directory: a dense, contiguous array of 64-bit bucket addresses.
///
/// The entry for a key is `hash & (table_size - 1)`. Resizing doubles the
/// array and initialises the new high half as a duplicate of the low half, so
/// every slot keeps pointing at a bucket whose id matches the slot's low
/// `depth` bits; later splits redirect one of the two aliased slots.
///
/// The whole directory is kept in a single loaded window and flushed after
/// mutation.
pub struct HashTable<S: Store = MemStore> {
    store: S,
    window: LoadedBuffer,
    table_size: u64,
}

impl HashTable<MemStore> {
    /// Creates an in-memory directory with `table_size` zeroed entries.
    pub fn new(table_size: u64) -> Result<Self, MapError> {
        Self::new_in(MemStore::new(), table_size)
    }
}

impl<S: Store> HashTable<S> {
    /// Creates a directory with `table_size` zeroed entries over `store`.
    pub fn new_in(store: S, table_size: u64) -> Result<Self, MapError> {
        let length = table_length(table_size)?;
        let mut table = HashTable {
            store,
            window: LoadedBuffer::new(),
            table_size,
        };
        table.window.load(&mut table.store, 0, length as usize)?;
        table.window.write_back(&mut table.store)?;
        Ok(table)
    }

    /// Number of directory entries.
    pub fn table_size(&self) -> u64 {
        self.table_size
    }

    /// Byte length of the directory.
    pub fn length(&self) -> u64 {
        self.table_size * ADDRESS_LENGTH
    }

    /// Bucket address stored at `index`.
    pub fn bucket_address(&self, index: u64) -> u64 {
        debug_assert!(index < self.table_size);
        read_u64(self.window.bytes(), (index * ADDRESS_LENGTH) as usize)
    }

    /// Stores `address` at `index`.
    pub fn set_bucket_address(&mut self, index: u64, address: u64) -> Result<(), MapError> {
        debug_assert!(index < self.table_size);
        write_u64(
            self.window.bytes_mut(),
            (index * ADDRESS_LENGTH) as usize,
            address,
        );
        self.window.write_back(&mut self.store)?;
        Ok(())
    }

    /// Doubles the directory until it reaches `new_size`, duplicating the low
    /// half into each new high half. Fails with
    /// [`MapError::CapacityOverflow`] when the resulting byte length would
    /// overflow a signed 64-bit length.
    pub fn resize(&mut self, new_size: u64) -> Result<(), MapError> {
        table_length(new_size)?;
        while self.table_size < new_size {
            let length = self.table_size * ADDRESS_LENGTH;
            let low_half = &self.window.bytes()[..length as usize];
            self.store.write(low_half, length)?;
            self.table_size *= 2;
            self.window
                .load(&mut self.store, 0, (self.table_size * ADDRESS_LENGTH) as usize)?;
        }
        Ok(())
    }

    /// Zeroes all entries without shrinking the directory.
    pub fn clear(&mut self) -> Result<(), MapError> {
        self.window.bytes_mut().fill(0);
        self.window.write_back(&mut self.store)?;
        Ok(())
    }

    /// Releases the backing store.
    pub fn close(&mut self) {
        self.store.close();
    }
}

fn table_length(table_size: u64) -> Result<i64, MapError> {
    let overflow = MapError::CapacityOverflow {
        requested: table_size,
    };
    let entries = i64::try_from(table_size).map_err(|_| overflow)?;
    entries
        .checked_mul(ADDRESS_LENGTH as i64)
        .ok_or(MapError::CapacityOverflow {
            requested: table_size,
        })
}
