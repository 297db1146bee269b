use crate::error::StoreError;
use crate::store::Store;

/// Growth granularity of the backing arena.
const PAGE_SIZE: usize = 4096;

/// An in-memory store backed by a page-granular byte arena.
///
/// The arena grows in [`PAGE_SIZE`] increments; the reported length is the
/// high-water mark of writes, not the allocated capacity.
pub struct MemStore {
    data: Vec<u8>,
    length: u64,
    closed: bool,
}

impl MemStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        MemStore {
            data: Vec::new(),
            length: 0,
            closed: false,
        }
    }

    /// Creates an empty store with `capacity` bytes preallocated (rounded up
    /// to whole pages).
    pub fn with_capacity(capacity: usize) -> Self {
        let mut store = MemStore::new();
        store.data.reserve(pages(capacity));
        store
    }

    fn ensure_capacity(&mut self, end: usize) {
        if self.data.len() < end {
            self.data.resize(pages(end), 0);
        }
    }
}

fn pages(len: usize) -> usize {
    (len + PAGE_SIZE - 1) / PAGE_SIZE * PAGE_SIZE
}

impl Store for MemStore {
    fn read(&mut self, dst: &mut [u8], position: u64) -> Result<usize, StoreError> {
        if self.closed {
            return Err(StoreError::Closed);
        }
        let available = self.length.saturating_sub(position) as usize;
        let count = dst.len().min(available);
        if count == 0 {
            return Ok(0);
        }
        let start = position as usize;
        dst[..count].copy_from_slice(&self.data[start..start + count]);
        Ok(count)
    }

    fn write(&mut self, src: &[u8], position: u64) -> Result<usize, StoreError> {
        if self.closed {
            return Err(StoreError::Closed);
        }
        let start = position as usize;
        let end = start + src.len();
        self.ensure_capacity(end);
        self.data[start..end].copy_from_slice(src);
        self.length = self.length.max(end as u64);
        Ok(src.len())
    }

    fn length(&self) -> u64 {
        self.length
    }

    fn close(&mut self) {
        self.data = Vec::new();
        self.length = 0;
        self.closed = true;
    }
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grows_in_page_increments() {
        let mut store = MemStore::new();
        store.write(&[7u8; 10], 0).unwrap();
        assert_eq!(store.length(), 10);
        assert_eq!(store.data.len(), PAGE_SIZE);

        store.write(&[7u8; 10], PAGE_SIZE as u64).unwrap();
        assert_eq!(store.data.len(), 2 * PAGE_SIZE);
    }

    #[test]
    fn gap_reads_back_as_zeroes() {
        let mut store = MemStore::new();
        store.write(&[1], 100).unwrap();

        let mut dst = [0xffu8; 4];
        let count = store.read(&mut dst, 50).unwrap();
        assert_eq!(count, 4);
        assert_eq!(dst, [0, 0, 0, 0]);
    }
}
