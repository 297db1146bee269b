use petek::{LoadedBuffer, MemStore, Store};

use crate::error::MapError;
use crate::layout::{
    block_length, block_value_offset, bucket_length, read_u32, read_u64, write_u32, write_u64,
    BLOCK_KEY_OFFSET, BLOCK_LENGTH_OFFSET, BUCKET_DATA_OFFSET, BUCKET_DEPTH_OFFSET,
    BUCKET_FILL_COUNT_OFFSET, BUCKET_ID_OFFSET, BUCKET_OVERFLOW_OFFSET,
};
use crate::types::{KeyHandler, ValueHandler};

/// Reserved bytes at the arena base. Keeps bucket address zero out of
/// circulation, so a zero overflow pointer always means "no overflow bucket".
const ARENA_BASE: u64 = 16;

/// The bucket arena: an append-only sequence of fixed-size buckets.
///
/// Each bucket holds a header (id, depth, fill count, overflow pointer)
/// followed by a dense run of equally sized blocks. A bucket's address, once
/// issued, is stable for the life of the arena; buckets are never freed.
/// Removals compact within a bucket only.
///
/// All access goes through a single cached window: a bucket is loaded,
/// inspected or mutated in memory, and flushed back to the store.
pub struct BucketArray<S: Store = MemStore> {
    store: S,
    window: LoadedBuffer,
    relocation_scratch: Vec<u8>,
    bucket_length: usize,
    block_length: usize,
    blocks_per_bucket: usize,
    max_key_length: usize,
    max_value_length: usize,
    high_water: u64,
    bucket_count: u64,
    primary_bucket_count: u64,
    occupied_block_bytes: u64,
}

impl BucketArray<MemStore> {
    /// Creates an in-memory arena for buckets of `blocks_per_bucket` blocks
    /// with the given key and value widths.
    pub fn new(blocks_per_bucket: usize, max_key_length: usize, max_value_length: usize) -> Self {
        Self::new_in(
            MemStore::new(),
            blocks_per_bucket,
            max_key_length,
            max_value_length,
        )
    }
}

impl<S: Store> BucketArray<S> {
    /// Creates an arena over `store`.
    pub fn new_in(
        store: S,
        blocks_per_bucket: usize,
        max_key_length: usize,
        max_value_length: usize,
    ) -> Self {
        BucketArray {
            store,
            window: LoadedBuffer::new(),
            relocation_scratch: Vec::new(),
            bucket_length: bucket_length(blocks_per_bucket, max_key_length, max_value_length),
            block_length: block_length(max_key_length, max_value_length),
            blocks_per_bucket,
            max_key_length,
            max_value_length,
            high_water: ARENA_BASE,
            bucket_count: 0,
            primary_bucket_count: 0,
            occupied_block_bytes: 0,
        }
    }

    fn load_bucket(&mut self, address: u64) -> Result<(), MapError> {
        debug_assert!(address >= ARENA_BASE && address < self.high_water);
        self.window
            .ensure_loaded(&mut self.store, address, self.bucket_length)?;
        Ok(())
    }

    /// Offset of the first block within a bucket.
    pub fn first_block_offset(&self) -> usize {
        BUCKET_DATA_OFFSET
    }

    /// Fixed byte length of a block, header included.
    pub fn block_length(&self) -> usize {
        self.block_length
    }

    /// Fixed byte length of a bucket.
    pub fn bucket_length(&self) -> usize {
        self.bucket_length
    }

    /// Blocks that fit one bucket.
    pub fn blocks_per_bucket(&self) -> usize {
        self.blocks_per_bucket
    }

    /// Total buckets allocated, overflow buckets included.
    pub fn bucket_count(&self) -> u64 {
        self.bucket_count
    }

    /// Blocks currently stored across all buckets.
    pub fn block_count(&self) -> u64 {
        self.occupied_block_bytes / self.block_length as u64
    }

    /// Bytes of the arena in use, headers and reserved base included.
    pub fn used_bytes(&self) -> u64 {
        self.high_water
    }

    /// Occupied block bytes over the allocated block capacity of primary
    /// buckets. Overflow buckets add usage without adding capacity, so long
    /// chains push the factor up until directory doubling wins.
    pub fn load_factor(&self) -> f32 {
        if self.primary_bucket_count == 0 {
            return 0.0;
        }
        self.occupied_block_bytes as f32
            / (self.primary_bucket_count * self.bucket_length as u64) as f32
    }

    /// Id of the bucket at `address`.
    pub fn bucket_id(&mut self, address: u64) -> Result<u64, MapError> {
        self.load_bucket(address)?;
        Ok(read_u64(self.window.bytes(), BUCKET_ID_OFFSET))
    }

    /// Local depth of the bucket at `address`.
    pub fn bucket_depth(&mut self, address: u64) -> Result<u32, MapError> {
        self.load_bucket(address)?;
        Ok(read_u32(self.window.bytes(), BUCKET_DEPTH_OFFSET))
    }

    /// Raises the local depth of the bucket at `address`.
    pub fn set_bucket_depth(&mut self, address: u64, depth: u32) -> Result<(), MapError> {
        self.load_bucket(address)?;
        write_u32(self.window.bytes_mut(), BUCKET_DEPTH_OFFSET, depth);
        self.window.write_back(&mut self.store)?;
        Ok(())
    }

    /// Number of blocks stored in the bucket at `address`.
    pub fn bucket_fill_count(&mut self, address: u64) -> Result<u32, MapError> {
        self.load_bucket(address)?;
        Ok(read_u32(self.window.bytes(), BUCKET_FILL_COUNT_OFFSET))
    }

    /// Address of the next bucket in the overflow chain, zero when the chain
    /// ends.
    pub fn bucket_overflow_pointer(&mut self, address: u64) -> Result<u64, MapError> {
        self.load_bucket(address)?;
        Ok(read_u64(self.window.bytes(), BUCKET_OVERFLOW_OFFSET))
    }

    /// Stored length of the block at `offset`, header included.
    pub fn block_length_at(&mut self, address: u64, offset: usize) -> Result<usize, MapError> {
        self.load_bucket(address)?;
        Ok(read_u32(self.window.bytes(), offset + BLOCK_LENGTH_OFFSET) as usize)
    }

    /// Allocates a zero-initialised bucket with the given id and depth and
    /// returns its address.
    pub fn allocate_new_bucket(&mut self, id: u64, depth: u32) -> Result<u64, MapError> {
        self.allocate(id, depth, false)
    }

    fn allocate(&mut self, id: u64, depth: u32, is_overflow: bool) -> Result<u64, MapError> {
        let address = self.high_water;
        let mut bucket = vec![0u8; self.bucket_length];
        write_u64(&mut bucket, BUCKET_ID_OFFSET, id);
        write_u32(&mut bucket, BUCKET_DEPTH_OFFSET, depth);
        self.store.write(&bucket, address)?;
        self.high_water += self.bucket_length as u64;
        self.bucket_count += 1;
        if !is_overflow {
            self.primary_bucket_count += 1;
        }
        Ok(address)
    }

    /// Extends the overflow chain of the bucket at `address` with a fresh
    /// bucket of the same id and depth, and returns the new bucket's address.
    pub fn overflow(&mut self, address: u64) -> Result<u64, MapError> {
        let mut tail = address;
        loop {
            let next = self.bucket_overflow_pointer(tail)?;
            if next == 0 {
                break;
            }
            tail = next;
        }
        let id = self.bucket_id(tail)?;
        let depth = self.bucket_depth(tail)?;
        let overflow_address = self.allocate(id, depth, true)?;

        self.load_bucket(tail)?;
        write_u64(
            self.window.bytes_mut(),
            BUCKET_OVERFLOW_OFFSET,
            overflow_address,
        );
        self.window.write_back(&mut self.store)?;
        Ok(overflow_address)
    }

    /// Appends a block holding the staged key and value to the first free
    /// slot of the bucket at `address` or its overflow chain. Returns `false`
    /// when the whole chain is full; the caller splits.
    pub fn add_block<K: KeyHandler, V: ValueHandler>(
        &mut self,
        address: u64,
        key: &K,
        value: &V,
    ) -> Result<bool, MapError> {
        let mut address = address;
        loop {
            self.load_bucket(address)?;
            let fill = read_u32(self.window.bytes(), BUCKET_FILL_COUNT_OFFSET) as usize;

            if fill < self.blocks_per_bucket {
                let offset = BUCKET_DATA_OFFSET + fill * self.block_length;
                let value_offset = offset + block_value_offset(self.max_key_length);
                let key_offset = offset + BLOCK_KEY_OFFSET;
                let buf = self.window.bytes_mut();
                write_u32(buf, offset + BLOCK_LENGTH_OFFSET, self.block_length as u32);
                key.write_to(&mut buf[key_offset..key_offset + self.max_key_length]);
                value.write_to(&mut buf[value_offset..value_offset + self.max_value_length]);
                write_u32(buf, BUCKET_FILL_COUNT_OFFSET, (fill + 1) as u32);
                self.window.write_back(&mut self.store)?;
                self.occupied_block_bytes += self.block_length as u64;
                return Ok(true);
            }

            address = read_u64(self.window.bytes(), BUCKET_OVERFLOW_OFFSET);
            if address == 0 {
                return Ok(false);
            }
        }
    }

    /// Overwrites the value bytes of the block at `offset` in place. The key
    /// width is fixed, so the offset is stable.
    pub fn update_value<V: ValueHandler>(
        &mut self,
        value: &V,
        address: u64,
        offset: usize,
    ) -> Result<(), MapError> {
        self.load_bucket(address)?;
        let value_offset = offset + block_value_offset(self.max_key_length);
        let buf = self.window.bytes_mut();
        value.write_to(&mut buf[value_offset..value_offset + self.max_value_length]);
        self.window.write_back(&mut self.store)?;
        Ok(())
    }

    /// Loads the key of the block at `offset` into `key`.
    pub fn read_key<K: KeyHandler>(
        &mut self,
        key: &mut K,
        address: u64,
        offset: usize,
    ) -> Result<(), MapError> {
        self.load_bucket(address)?;
        let key_offset = offset + BLOCK_KEY_OFFSET;
        key.read_from(&self.window.bytes()[key_offset..key_offset + self.max_key_length]);
        Ok(())
    }

    /// Loads the value of the block at `offset` into `value`.
    pub fn read_value<V: ValueHandler>(
        &mut self,
        value: &mut V,
        address: u64,
        offset: usize,
    ) -> Result<(), MapError> {
        self.load_bucket(address)?;
        let value_offset = offset + block_value_offset(self.max_key_length);
        value.read_from(&self.window.bytes()[value_offset..value_offset + self.max_value_length]);
        Ok(())
    }

    /// Compares the staged key against the key of the block at `offset`.
    pub fn key_equals<K: KeyHandler>(
        &mut self,
        key: &K,
        address: u64,
        offset: usize,
    ) -> Result<bool, MapError> {
        self.load_bucket(address)?;
        let key_offset = offset + BLOCK_KEY_OFFSET;
        Ok(key.key_equals(&self.window.bytes()[key_offset..key_offset + self.max_key_length]))
    }

    /// Removes the block at `offset`, shifting all trailing blocks of the
    /// same bucket down by one block length. Overflow chain members are not
    /// pulled back into this bucket.
    pub fn remove_block(&mut self, address: u64, offset: usize) -> Result<(), MapError> {
        self.load_bucket(address)?;
        let fill = read_u32(self.window.bytes(), BUCKET_FILL_COUNT_OFFSET) as usize;
        debug_assert!(fill > 0 && offset < BUCKET_DATA_OFFSET + fill * self.block_length);
        let data_end = BUCKET_DATA_OFFSET + fill * self.block_length;
        let buf = self.window.bytes_mut();
        buf.copy_within(offset + self.block_length..data_end, offset);
        write_u32(buf, BUCKET_FILL_COUNT_OFFSET, (fill - 1) as u32);
        self.window.write_back(&mut self.store)?;
        self.occupied_block_bytes -= self.block_length as u64;
        Ok(())
    }

    /// Copies the block at `src_offset` into the next free slot of the
    /// destination chain, then compacts the source bucket as if by
    /// [`remove_block`](BucketArray::remove_block). A full destination grows
    /// an overflow bucket first.
    pub fn relocate_block(
        &mut self,
        src_address: u64,
        src_offset: usize,
        dst_address: u64,
    ) -> Result<(), MapError> {
        self.load_bucket(src_address)?;
        let length = read_u32(self.window.bytes(), src_offset + BLOCK_LENGTH_OFFSET) as usize;
        self.relocation_scratch.clear();
        self.relocation_scratch
            .extend_from_slice(&self.window.bytes()[src_offset..src_offset + length]);

        let mut dst = dst_address;
        loop {
            self.load_bucket(dst)?;
            let fill = read_u32(self.window.bytes(), BUCKET_FILL_COUNT_OFFSET) as usize;
            if fill < self.blocks_per_bucket {
                let offset = BUCKET_DATA_OFFSET + fill * self.block_length;
                let buf = self.window.bytes_mut();
                buf[offset..offset + length].copy_from_slice(&self.relocation_scratch);
                write_u32(buf, BUCKET_FILL_COUNT_OFFSET, (fill + 1) as u32);
                self.window.write_back(&mut self.store)?;
                self.occupied_block_bytes += length as u64;
                break;
            }
            let next = read_u64(self.window.bytes(), BUCKET_OVERFLOW_OFFSET);
            dst = if next != 0 { next } else { self.overflow(dst)? };
        }

        self.remove_block(src_address, src_offset)
    }

    /// Resets the arena without freeing the backing store.
    pub fn clear(&mut self) {
        self.high_water = ARENA_BASE;
        self.bucket_count = 0;
        self.primary_bucket_count = 0;
        self.occupied_block_bytes = 0;
        self.window.invalidate();
    }

    /// Releases the backing store.
    pub fn close(&mut self) {
        self.store.close();
    }
}
