use petek::{MemStore, Store};

use crate::bucket_array::BucketArray;
use crate::config::{MapConfig, MAX_TABLE_SIZE};
use crate::error::MapError;
use crate::hash_table::HashTable;
use crate::types::{KeyHandler, ValueHandler};

/// A map over manually managed bucket storage, grown by extensible hashing.
///
/// The directory maps the low bits of a key's hash to a bucket address; a
/// filled bucket is split in place, raising its local depth and relocating
/// the blocks whose hash has the new bit set. When the split would need a
/// directory entry that does not exist yet, the map either chains an overflow
/// bucket (while the load factor is below the configured limit) or doubles
/// the directory.
///
/// Keys and values move through pre-staged [`KeyHandler`] and
/// [`ValueHandler`] instances; the typed fronts ([`U64U64Map`] and friends)
/// stage them from strongly typed arguments. The map is single-writer: every
/// operation takes `&mut self` and there are no internal locks.
///
/// Call [`close`](PetekMap::close) when done; dropping an unclosed map
/// releases the stores but logs an error, since the owner skipped its
/// explicit lifecycle step.
///
/// [`U64U64Map`]: crate::U64U64Map
pub struct PetekMap<K: KeyHandler, V: ValueHandler, S: Store = MemStore> {
    key_handler: K,
    split_key_handler: K,
    value_handler: V,
    prev_value_handler: V,
    hash_table: HashTable<S>,
    bucket_array: BucketArray<S>,
    table_size: u64,
    max_table_size: u64,
    mask: u64,
    load_factor_overflow_limit: f32,
    closed: bool,
}

impl<K, V> PetekMap<K, V, MemStore>
where
    K: KeyHandler + Clone,
    V: ValueHandler + Clone,
{
    /// Creates an in-memory map. Key and value widths are taken from the
    /// handler instances.
    pub fn new(config: &MapConfig, key_handler: K, value_handler: V) -> Result<Self, MapError> {
        Self::new_in(
            MemStore::new(),
            MemStore::new(),
            config,
            key_handler,
            value_handler,
        )
    }
}

impl<K, V, S> PetekMap<K, V, S>
where
    K: KeyHandler + Clone,
    V: ValueHandler + Clone,
    S: Store,
{
    /// Creates a map whose directory lives in `table_store` and whose bucket
    /// arena lives in `bucket_store`.
    pub fn new_in(
        table_store: S,
        bucket_store: S,
        config: &MapConfig,
        key_handler: K,
        value_handler: V,
    ) -> Result<Self, MapError> {
        let max_table_size = ensure_power_of_two(config.max_table_size, MAX_TABLE_SIZE);
        let table_size = ensure_power_of_two(config.initial_table_size, max_table_size);

        let hash_table = HashTable::new_in(table_store, table_size)?;
        let bucket_array = BucketArray::new_in(
            bucket_store,
            config.min_block_count_per_bucket,
            key_handler.key_length(),
            value_handler.value_length(),
        );

        let mut map = PetekMap {
            split_key_handler: key_handler.clone(),
            prev_value_handler: value_handler.clone(),
            key_handler,
            value_handler,
            hash_table,
            bucket_array,
            table_size,
            max_table_size,
            mask: table_size - 1,
            load_factor_overflow_limit: config.load_factor_overflow_limit,
            closed: false,
        };
        map.init()?;
        Ok(map)
    }

    fn init(&mut self) -> Result<(), MapError> {
        let bucket_address = self.bucket_array.allocate_new_bucket(0, 0)?;
        for index in 0..self.table_size {
            self.hash_table.set_bucket_address(index, bucket_address)?;
        }
        Ok(())
    }

    /// The staged key handler. Fronts stage the key here before an operation.
    pub fn key_handler_mut(&mut self) -> &mut K {
        &mut self.key_handler
    }

    /// The staged value handler. Holds the value to insert before `put`, and
    /// the value read back after a successful `get` or `remove`.
    pub fn value_handler(&self) -> &V {
        &self.value_handler
    }

    /// Mutable access to the staged value handler.
    pub fn value_handler_mut(&mut self) -> &mut V {
        &mut self.value_handler
    }

    /// After a `put` that replaced an existing block, holds the value that
    /// was overwritten.
    pub fn prev_value_handler(&self) -> &V {
        &self.prev_value_handler
    }

    /// Inserts the staged key and value. Returns `true` when an existing
    /// block was updated in place (its prior value is left in
    /// [`prev_value_handler`](PetekMap::prev_value_handler)), `false` when a
    /// new block was inserted.
    pub fn put(&mut self) -> Result<bool, MapError> {
        let hash = self.key_handler.hash();
        let mut bucket_id = hash & self.mask;

        let mut is_updated = false;
        let mut is_put = false;
        let mut scan_for_key = true;

        while !is_put && !is_updated {
            let bucket_address = self.hash_table.bucket_address(bucket_id);

            if scan_for_key {
                match self.find_block_in_bucket(bucket_address)? {
                    Some((address, offset)) => {
                        self.bucket_array
                            .read_value(&mut self.prev_value_handler, address, offset)?;
                        self.bucket_array
                            .update_value(&self.value_handler, address, offset)?;
                        is_updated = true;
                    }
                    None => scan_for_key = false,
                }
            } else {
                is_put =
                    self.bucket_array
                        .add_block(bucket_address, &self.key_handler, &self.value_handler)?;

                if !is_put {
                    self.split_bucket(bucket_address)?;
                    // a split may have doubled the directory, so the bucket id
                    // is re-derived from the current mask
                    bucket_id = hash & self.mask;
                    scan_for_key = true;
                }
            }
        }
        Ok(is_updated)
    }

    /// Looks up the staged key. On a hit the value is read into
    /// [`value_handler`](PetekMap::value_handler) and `true` is returned.
    pub fn get(&mut self) -> Result<bool, MapError> {
        match self.find_block()? {
            Some((address, offset)) => {
                self.bucket_array
                    .read_value(&mut self.value_handler, address, offset)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Removes the staged key. On a hit the prior value is read into
    /// [`value_handler`](PetekMap::value_handler) before the block is
    /// compacted away, and `true` is returned. Overflow buckets are never
    /// merged back.
    pub fn remove(&mut self) -> Result<bool, MapError> {
        match self.find_block()? {
            Some((address, offset)) => {
                self.bucket_array
                    .read_value(&mut self.value_handler, address, offset)?;
                self.bucket_array.remove_block(address, offset)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn find_block(&mut self) -> Result<Option<(u64, usize)>, MapError> {
        let bucket_id = self.key_handler.hash() & self.mask;
        let bucket_address = self.hash_table.bucket_address(bucket_id);
        self.find_block_in_bucket(bucket_address)
    }

    fn find_block_in_bucket(
        &mut self,
        mut bucket_address: u64,
    ) -> Result<Option<(u64, usize)>, MapError> {
        loop {
            let fill_count = self.bucket_array.bucket_fill_count(bucket_address)?;
            let mut offset = self.bucket_array.first_block_offset();

            for _ in 0..fill_count {
                if self
                    .bucket_array
                    .key_equals(&self.key_handler, bucket_address, offset)?
                {
                    return Ok(Some((bucket_address, offset)));
                }
                offset += self.bucket_array.block_length_at(bucket_address, offset)?;
            }

            bucket_address = self.bucket_array.bucket_overflow_pointer(bucket_address)?;
            if bucket_address == 0 {
                return Ok(None);
            }
        }
    }

    fn split_bucket(&mut self, filled_bucket_address: u64) -> Result<(), MapError> {
        let filled_bucket_id = self.bucket_array.bucket_id(filled_bucket_address)?;
        let bucket_depth = self.bucket_array.bucket_depth(filled_bucket_address)?;

        let new_bucket_id = (1u64 << bucket_depth) | filled_bucket_id;
        let new_bucket_depth = bucket_depth + 1;

        if new_bucket_id < self.table_size {
            return self.create_new_bucket(
                filled_bucket_address,
                bucket_depth,
                new_bucket_id,
                new_bucket_depth,
            );
        }

        // the pre-split load factor decides between chaining and doubling
        let load_factor = self.bucket_array.load_factor();
        if load_factor < self.load_factor_overflow_limit {
            self.bucket_array.overflow(filled_bucket_address)?;
            return Ok(());
        }

        let new_table_size = self.table_size << 1;
        if new_table_size > self.max_table_size {
            return Err(MapError::MapFull {
                table_size: self.table_size,
                max_table_size: self.max_table_size,
            });
        }

        self.table_size = new_table_size;
        self.mask = new_table_size - 1;
        self.hash_table.resize(new_table_size)?;
        self.create_new_bucket(
            filled_bucket_address,
            bucket_depth,
            new_bucket_id,
            new_bucket_depth,
        )
    }

    fn create_new_bucket(
        &mut self,
        filled_bucket_address: u64,
        bucket_depth: u32,
        new_bucket_id: u64,
        new_bucket_depth: u32,
    ) -> Result<(), MapError> {
        self.bucket_array
            .set_bucket_depth(filled_bucket_address, new_bucket_depth)?;

        let new_bucket_address = self
            .bucket_array
            .allocate_new_bucket(new_bucket_id, new_bucket_depth)?;

        self.distribute_entries(filled_bucket_address, new_bucket_address, bucket_depth)?;

        // redirect every directory slot that aliases the new bucket id
        let stride = 1u64 << new_bucket_depth;
        let mut index = new_bucket_id;
        while index < self.table_size {
            self.hash_table.set_bucket_address(index, new_bucket_address)?;
            index += stride;
        }
        Ok(())
    }

    fn distribute_entries(
        &mut self,
        filled_bucket_address: u64,
        new_bucket_address: u64,
        bucket_depth: u32,
    ) -> Result<(), MapError> {
        // the split bit is taken against the old depth: set routes a block to
        // the new bucket, clear keeps it
        let split_mask = 1u64 << bucket_depth;

        let mut bucket_address = filled_bucket_address;
        loop {
            let mut offset = self.bucket_array.first_block_offset();
            loop {
                // relocation compacts the source, so the data end is refetched
                // on every pass rather than precomputed
                let fill_count = self.bucket_array.bucket_fill_count(bucket_address)? as usize;
                let data_end = self.bucket_array.first_block_offset()
                    + fill_count * self.bucket_array.block_length();
                if offset >= data_end {
                    break;
                }

                self.bucket_array
                    .read_key(&mut self.split_key_handler, bucket_address, offset)?;

                if self.split_key_handler.hash() & split_mask == split_mask {
                    self.bucket_array
                        .relocate_block(bucket_address, offset, new_bucket_address)?;
                    // the next block has shifted into this offset
                } else {
                    offset += self.bucket_array.block_length_at(bucket_address, offset)?;
                }
            }

            bucket_address = self.bucket_array.bucket_overflow_pointer(bucket_address)?;
            if bucket_address == 0 {
                return Ok(());
            }
        }
    }

    /// Current directory size in entries.
    pub fn table_size(&self) -> u64 {
        self.table_size
    }

    /// Byte length of the directory.
    pub fn hash_table_size(&self) -> u64 {
        self.hash_table.length()
    }

    /// Buckets allocated in the arena, overflow buckets included.
    pub fn bucket_count(&self) -> u64 {
        self.bucket_array.bucket_count()
    }

    /// Total bytes in use across the directory and the arena.
    pub fn size(&self) -> u64 {
        self.hash_table.length() + self.bucket_array.used_bytes()
    }

    /// The directory, for inspection.
    pub fn hash_table(&self) -> &HashTable<S> {
        &self.hash_table
    }

    /// The bucket arena, for inspection.
    pub fn bucket_array_mut(&mut self) -> &mut BucketArray<S> {
        &mut self.bucket_array
    }

    /// Empties the map, keeping the backing regions.
    pub fn clear(&mut self) -> Result<(), MapError> {
        self.hash_table.clear()?;
        self.bucket_array.clear();
        self.init()
    }

    /// Releases the directory and arena stores. Idempotent; operations after
    /// `close` fail with a store error.
    pub fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.hash_table.close();
            self.bucket_array.close();
        }
    }
}

impl<K: KeyHandler, V: ValueHandler, S: Store> Drop for PetekMap<K, V, S> {
    fn drop(&mut self) {
        if !self.closed {
            log::error!(
                "map dropped without close(); releasing the backing stores in drop"
            );
            self.closed = true;
            self.hash_table.close();
            self.bucket_array.close();
        }
    }
}

fn ensure_power_of_two(table_size: u64, max_table_size: u64) -> u64 {
    let power_of_two = table_size.max(1).next_power_of_two();
    if power_of_two != table_size {
        log::warn!(
            "table size {} is not a power of two, using {} instead",
            table_size,
            power_of_two
        );
    }
    if power_of_two > max_table_size {
        log::warn!(
            "table size {} is greater than the maximum, using {} instead",
            power_of_two,
            max_table_size
        );
        max_table_size
    } else {
        power_of_two
    }
}
